use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

/// Read a source file as text, replacing invalid UTF-8 sequences with U+FFFD.
///
/// The file handle is dropped before returning, on success and on error alike.
///
/// # Errors
/// Returns an error if the file cannot be opened or read.
pub fn read_source(path: &Path) -> io::Result<String> {
    let mut bytes = Vec::new();
    {
        let mut file = File::open(path)?;
        file.read_to_end(&mut bytes)?;
    }
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => Ok(String::from_utf8_lossy(err.as_bytes()).into_owned()),
    }
}

/// Write `bytes` to `path` through a sibling temp file and a rename, so readers
/// see either the old contents or the new ones.
///
/// # Errors
/// Returns an error if the temp file cannot be written or renamed.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("output");
    let temp_path = parent.join(format!(".{name}.tmp.{}", std::process::id()));

    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    if let Err(err) = fs::rename(&temp_path, path) {
        if cfg!(windows) {
            // rename over an existing file fails on Windows
            fs::copy(&temp_path, path)?;
            let _ = fs::remove_file(&temp_path);
            return Ok(());
        }
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_read_source_valid_utf8() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"let x = 1").unwrap();
        file.flush().unwrap();

        assert_eq!(read_source(file.path()).unwrap(), "let x = 1");
    }

    #[test]
    fn test_read_source_invalid_utf8_is_lossy() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0x6c, 0x65, 0x74, 0x80, 0x81]).unwrap();
        file.flush().unwrap();

        let text = read_source(file.path()).unwrap();
        assert!(text.starts_with("let"));
        assert!(text.contains('\u{FFFD}'));
    }

    #[test]
    fn test_read_source_missing_file() {
        let dir = tempdir().unwrap();
        let err = read_source(&dir.path().join("nope.chic")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_atomic_write_replaces_and_leaves_no_temp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.json");

        atomic_write(&path, b"{}").unwrap();
        atomic_write(&path, b"{\"ok\":true}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"ok\":true}");

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
