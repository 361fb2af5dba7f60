//! Default specifier resolution for the host.
//!
//! Resolves import specifiers to absolute file paths when no plugin claims
//! them.
//!
//! ## Specifier Types
//!
//! - Relative: `./utils`, `../lib/foo`
//! - Absolute: `/abs/path/to/module`
//! - Bare: `lodash`, `@scope/pkg`, `react/jsx-runtime`
//! - Builtin: `node:fs`

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

/// Extensions probed when a specifier names a file without its extension.
const PROBE_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs"];

/// Index files probed when a specifier names a directory.
const INDEX_FILES: &[&str] = &["index.ts", "index.tsx", "index.js", "index.jsx"];

/// Result of resolving an import specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveResult {
    /// Successfully resolved to a file path.
    Found(PathBuf),
    /// Built-in module (node:fs, etc.).
    Builtin(String),
}

/// Error during resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot resolve '{specifier}' from '{from}': {message}")]
pub struct ResolveError {
    pub specifier: String,
    pub from: String,
    pub message: String,
}

impl ResolveError {
    fn new(specifier: &str, from: &Path, message: impl Into<String>) -> Self {
        Self {
            specifier: specifier.to_string(),
            from: from.display().to_string(),
            message: message.into(),
        }
    }
}

/// Filesystem resolver with a per-instance cache.
#[derive(Debug, Default)]
pub struct Resolver {
    cache: RwLock<HashMap<(String, PathBuf), ResolveResult>>,
}

impl Resolver {
    /// Create a new resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve an import specifier.
    ///
    /// # Arguments
    /// - `specifier`: the import specifier (e.g. `"./utils"`, `"lodash"`)
    /// - `base_dir`: directory of the importing module
    /// - `cwd`: the project root, where `node_modules` lookup stops
    pub fn resolve(
        &self,
        specifier: &str,
        base_dir: &Path,
        cwd: &Path,
    ) -> Result<ResolveResult, ResolveError> {
        let key = (specifier.to_string(), base_dir.to_path_buf());
        if let Ok(cache) = self.cache.read() {
            if let Some(hit) = cache.get(&key) {
                return Ok(hit.clone());
            }
        }

        let result = resolve_uncached(specifier, base_dir, cwd)?;

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key, result.clone());
        }
        Ok(result)
    }
}

fn resolve_uncached(
    specifier: &str,
    base_dir: &Path,
    cwd: &Path,
) -> Result<ResolveResult, ResolveError> {
    if specifier.starts_with("node:") {
        return Ok(ResolveResult::Builtin(specifier.to_string()));
    }

    if specifier.starts_with("./") || specifier.starts_with("../") {
        let target = base_dir.join(specifier);
        return resolve_file_or_directory(&target, specifier, base_dir);
    }

    if specifier.starts_with('/') || Path::new(specifier).is_absolute() {
        return resolve_file_or_directory(Path::new(specifier), specifier, base_dir);
    }

    resolve_bare(specifier, base_dir, cwd)
}

/// Resolve a bare specifier by walking up looking for `node_modules`.
fn resolve_bare(
    specifier: &str,
    base_dir: &Path,
    cwd: &Path,
) -> Result<ResolveResult, ResolveError> {
    let (pkg_name, subpath) = parse_bare_specifier(specifier);

    let mut current = Some(base_dir);
    while let Some(dir) = current {
        let pkg_dir = dir.join("node_modules").join(&pkg_name);
        if pkg_dir.is_dir() {
            if let Some(sub) = &subpath {
                return resolve_file_or_directory(&pkg_dir.join(sub), specifier, base_dir);
            }
            if let Some(entry) = package_entry(&pkg_dir) {
                return canonical(&entry, specifier, base_dir).map(ResolveResult::Found);
            }
            return resolve_file_or_directory(&pkg_dir, specifier, base_dir);
        }

        if dir == cwd {
            break;
        }
        current = dir.parent();
    }

    Err(ResolveError::new(
        specifier,
        base_dir,
        format!("Cannot find package '{pkg_name}' in node_modules"),
    ))
}

/// Split a bare specifier into package name and subpath.
fn parse_bare_specifier(specifier: &str) -> (String, Option<String>) {
    let take = if specifier.starts_with('@') { 3 } else { 2 };
    let parts: Vec<&str> = specifier.splitn(take, '/').collect();
    if take == 3 && parts.len() >= 2 {
        let pkg = format!("{}/{}", parts[0], parts[1]);
        return (pkg, parts.get(2).map(ToString::to_string));
    }
    if take == 2 {
        return (parts[0].to_string(), parts.get(1).map(ToString::to_string));
    }
    (specifier.to_string(), None)
}

/// Entry file named by `package.json` (`exports["."]`, `module`, `main`).
fn package_entry(pkg_dir: &Path) -> Option<PathBuf> {
    let content = std::fs::read_to_string(pkg_dir.join("package.json")).ok()?;
    let json: serde_json::Value = serde_json::from_str(&content).ok()?;

    let from_exports = json.get("exports").and_then(|exports| match exports {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(map) => map
            .get(".")
            .or_else(|| map.get("import"))
            .or_else(|| map.get("default"))
            .and_then(export_target),
        _ => None,
    });

    [
        from_exports,
        json.get("module").and_then(|v| v.as_str()).map(String::from),
        json.get("main").and_then(|v| v.as_str()).map(String::from),
    ]
    .into_iter()
    .flatten()
    .map(|entry| pkg_dir.join(entry))
    .find(|path| path.is_file())
}

/// A single export value, preferring `import` > `default` > `require`.
fn export_target(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(map) => map
            .get("import")
            .or_else(|| map.get("default"))
            .or_else(|| map.get("require"))
            .and_then(export_target),
        _ => None,
    }
}

/// Resolve a path that might be a file, a file missing its extension, or a
/// directory with an index file.
fn resolve_file_or_directory(
    target: &Path,
    specifier: &str,
    from: &Path,
) -> Result<ResolveResult, ResolveError> {
    if target.is_file() {
        return canonical(target, specifier, from).map(ResolveResult::Found);
    }

    for ext in PROBE_EXTENSIONS {
        let with_ext = PathBuf::from(format!("{}{ext}", target.display()));
        if with_ext.is_file() {
            return canonical(&with_ext, specifier, from).map(ResolveResult::Found);
        }
    }

    if target.is_dir() {
        for index in INDEX_FILES {
            let index_path = target.join(index);
            if index_path.is_file() {
                return canonical(&index_path, specifier, from).map(ResolveResult::Found);
            }
        }
    }

    Err(ResolveError::new(specifier, from, "File not found"))
}

fn canonical(path: &Path, specifier: &str, from: &Path) -> Result<PathBuf, ResolveError> {
    dunce::canonicalize(path).map_err(|e| ResolveError::new(specifier, from, e.to_string()))
}
