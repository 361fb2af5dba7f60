//! Id arithmetic for the marker suffix.

use super::ChicoryOptions;

impl ChicoryOptions {
    /// Whether `specifier` names a file with the custom extension.
    #[must_use]
    pub fn claims(&self, specifier: &str) -> bool {
        specifier.ends_with(&self.extension)
    }

    /// Whether `id` is a synthetic id produced by [`mark`](Self::mark).
    #[must_use]
    pub fn is_marked(&self, id: &str) -> bool {
        id.ends_with(&self.marked_suffix)
    }

    /// Append the marker. An already-marked id is returned unchanged, so the
    /// marker is never stacked.
    #[must_use]
    pub fn mark(&self, path: &str) -> String {
        if self.is_marked(path) {
            return path.to_string();
        }
        format!("{path}{}", self.marker)
    }

    /// Remove exactly the marker from a synthetic id, recovering the path.
    #[must_use]
    pub fn strip<'a>(&self, id: &'a str) -> Option<&'a str> {
        if !self.is_marked(id) {
            return None;
        }
        id.strip_suffix(self.marker.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_and_marked() {
        let opts = ChicoryOptions::default();
        assert!(opts.claims("./App.chic"));
        assert!(!opts.claims("./App.jsx"));
        assert!(!opts.claims("./App.chic.jsx"));

        assert!(opts.is_marked("/src/App.chic.jsx"));
        assert!(!opts.is_marked("/src/App.jsx"));
        assert!(!opts.is_marked("/src/App.chic"));
    }

    #[test]
    fn test_mark_is_idempotent() {
        let opts = ChicoryOptions::default();
        let once = opts.mark("/src/App.chic");
        assert_eq!(once, "/src/App.chic.jsx");
        assert_eq!(opts.mark(&once), once);
    }

    #[test]
    fn test_strip_inverts_mark() {
        let opts = ChicoryOptions::default();
        for path in [
            "/src/App.chic",
            "/a b/with spaces.chic",
            "C:\\proj\\Widget.chic",
            "/x/.chic",
            "/deep/nested/dir/y.chic",
        ] {
            assert_eq!(opts.strip(&opts.mark(path)), Some(path));
        }
        assert_eq!(opts.strip("/src/App.jsx"), None);
        assert_eq!(opts.strip("/src/App.chic"), None);
    }

    #[test]
    fn test_custom_marker() {
        let opts = ChicoryOptions::new(".chic", ".chic-virtual.tsx").unwrap();
        let marked = opts.mark("/src/App.chic");
        assert_eq!(marked, "/src/App.chic.chic-virtual.tsx");
        assert!(opts.is_marked(&marked));
        assert_eq!(opts.strip(&marked), Some("/src/App.chic"));
    }
}
