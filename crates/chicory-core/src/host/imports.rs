//! Import specifier scanner.
//!
//! Finds static imports, re-exports and dynamic `import()` calls in module
//! code without a full parse. Best-effort: comments are not skipped.

use regex_lite::Regex;
use rustc_hash::FxHashSet as HashSet;
use std::sync::OnceLock;

/// An import found in module code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Specifier exactly as written.
    pub specifier: String,
    /// `import("...")` rather than a static import.
    pub dynamic: bool,
}

struct Patterns {
    from_clause: Regex,
    side_effect: Regex,
    dynamic: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        from_clause: Regex::new(r#"\b(?:import|export)\b[^;'"]*?\bfrom\s*["']([^"'\n]+)["']"#)
            .unwrap_or_else(|e| unreachable!("from-clause pattern: {e}")),
        side_effect: Regex::new(r#"\bimport\s*["']([^"'\n]+)["']"#)
            .unwrap_or_else(|e| unreachable!("side-effect pattern: {e}")),
        dynamic: Regex::new(r#"\bimport\s*\(\s*["']([^"'\n]+)["']\s*\)"#)
            .unwrap_or_else(|e| unreachable!("dynamic pattern: {e}")),
    })
}

/// Scan `code` for import specifiers.
///
/// Returns imports in first-appearance order, deduplicated by specifier.
#[must_use]
pub fn scan_imports(code: &str) -> Vec<Import> {
    let p = patterns();
    let mut found: Vec<(usize, &str, bool)> = Vec::new();

    for (regex, dynamic) in [(&p.from_clause, false), (&p.side_effect, false), (&p.dynamic, true)] {
        for caps in regex.captures_iter(code) {
            if let Some(m) = caps.get(1) {
                found.push((m.start(), m.as_str(), dynamic));
            }
        }
    }
    found.sort_by_key(|(pos, _, _)| *pos);

    let mut seen = HashSet::default();
    found
        .into_iter()
        .filter(|(_, spec, _)| seen.insert(*spec))
        .map(|(_, spec, dynamic)| Import {
            specifier: spec.to_string(),
            dynamic,
        })
        .collect()
}
