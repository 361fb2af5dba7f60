//! `chicory check` command implementation.
//!
//! Compiles every claimed file under a directory and reports all failures,
//! not just the first.

use super::compile::compile_file;
use super::{
    absolutize, diagnostic_sink, drain, load_project, plugin_container, print_error, print_json,
    DiagnosticJson, ErrorJson, PluginArgs,
};
use chicory_core::version::SCHEMA_VERSION;
use miette::Result;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

#[derive(Serialize)]
struct CheckResultJson {
    ok: bool,
    schema_version: u32,
    dir: String,
    files: usize,
    failures: Vec<ErrorJson>,
    diagnostics: Vec<DiagnosticJson>,
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name == "node_modules" || name.starts_with('.'))
}

/// Files under `dir` with `extension`, sorted.
pub fn find_sources(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e))
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(extension))
        })
        .map(DirEntry::into_path)
        .collect();
    files.sort();
    files
}

/// Run the check command.
pub fn run(cwd: &Path, dir: Option<&Path>, args: &PluginArgs, json: bool) -> Result<()> {
    let dir = dir.map_or_else(|| cwd.to_path_buf(), |d| absolutize(cwd, d));
    let (sink, collected) = diagnostic_sink(json);

    let outcome = load_project(cwd, args).and_then(|project| {
        let container = plugin_container(cwd, &project, sink)?;
        let files = find_sources(&dir, &project.extension);
        tracing::debug!(dir = %dir.display(), files = files.len(), "checking");

        let failures: Vec<ErrorJson> = files
            .par_iter()
            .filter_map(|file| compile_file(&container, &project, file).err())
            .collect();
        Ok((files.len(), failures))
    });

    let (files, failures) = match outcome {
        Ok(counts) => counts,
        Err(err) => {
            let err = ErrorJson::config(&err);
            if json {
                print_json(&CheckResultJson {
                    ok: false,
                    schema_version: SCHEMA_VERSION,
                    dir: dir.display().to_string(),
                    files: 0,
                    failures: vec![err],
                    diagnostics: drain(collected.as_ref()),
                })?;
            } else {
                print_error(&err);
            }
            std::process::exit(1);
        }
    };

    let ok = failures.is_empty();
    if json {
        print_json(&CheckResultJson {
            ok,
            schema_version: SCHEMA_VERSION,
            dir: dir.display().to_string(),
            files,
            failures,
            diagnostics: drain(collected.as_ref()),
        })?;
    } else {
        for failure in &failures {
            print_error(failure);
        }
        println!("  {files} files checked, {} failed", failures.len());
    }

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_find_sources_skips_hidden_and_node_modules() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for sub in ["src/ui", "node_modules/pkg", ".cache"] {
            std::fs::create_dir_all(root.join(sub)).unwrap();
        }
        for file in [
            "src/App.chic",
            "src/ui/Button.chic",
            "src/main.js",
            "node_modules/pkg/Dep.chic",
            ".cache/Old.chic",
        ] {
            std::fs::write(root.join(file), "x").unwrap();
        }

        let found = find_sources(root, ".chic");
        assert_eq!(
            found,
            vec![root.join("src/App.chic"), root.join("src/ui/Button.chic")]
        );
    }
}
