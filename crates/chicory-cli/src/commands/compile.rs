//! `chicory compile` command implementation.
//!
//! Runs one claimed file through the plugin container the way the host would
//! (resolve, load, transform) and prints the module body.

use super::{
    absolutize, codes, diagnostic_sink, drain, load_project, plugin_container, print_error,
    print_json, DiagnosticJson, ErrorJson, PluginArgs,
};
use chicory_core::host::codes as host_codes;
use chicory_core::plugin::{PluginContainer, PluginError};
use chicory_core::version::SCHEMA_VERSION;
use chicory_core::ProjectConfig;
use miette::Result;
use serde::Serialize;
use std::path::Path;

/// A module body produced by the plugin pipeline.
#[derive(Debug, Clone)]
pub struct Compiled {
    /// Id the host would record, marker included.
    pub id: String,
    pub code: String,
    pub map: Option<String>,
}

#[derive(Serialize)]
struct CompileResultJson {
    ok: bool,
    schema_version: u32,
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    map: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorJson>,
    diagnostics: Vec<DiagnosticJson>,
}

fn plugin_error(err: PluginError, id: &str) -> ErrorJson {
    let path = err.id.clone().unwrap_or_else(|| id.to_string());
    ErrorJson::new(host_codes::PLUGIN_ERROR, err.to_string(), Some(path))
}

/// Resolve, load and transform `path` through `container`.
pub fn compile_file(
    container: &PluginContainer,
    project: &ProjectConfig,
    path: &Path,
) -> Result<Compiled, ErrorJson> {
    let file = path.display().to_string();
    if !file.ends_with(&project.extension) {
        return Err(ErrorJson::new(
            codes::UNCLAIMED_FILE,
            format!("{file} does not end with {}", project.extension),
            Some(file),
        ));
    }

    let id = container
        .resolve_id(&file, None)
        .map_err(|e| plugin_error(e, &file))?
        .filter(|r| !r.external)
        .map(|r| r.id)
        .ok_or_else(|| {
            ErrorJson::new(
                codes::FILE_NOT_FOUND,
                format!("Cannot find {file}"),
                Some(file.clone()),
            )
        })?;

    let (code, load_map) = match container.load(&id).map_err(|e| plugin_error(e, &id))? {
        Some(loaded) => (loaded.code, loaded.map),
        None => {
            let code = chicory_util::fs::read_source(Path::new(&id)).map_err(|e| {
                ErrorJson::new(
                    host_codes::READ_ERROR,
                    format!("Cannot read {id}: {e}"),
                    Some(id.clone()),
                )
            })?;
            (code, None)
        }
    };

    let transformed = container
        .transform(&code, &id)
        .map_err(|e| plugin_error(e, &id))?;

    tracing::debug!(%id, bytes = transformed.code.len(), "compiled");
    Ok(Compiled {
        id,
        code: transformed.code,
        map: transformed.map.or(load_map),
    })
}

/// Run the compile command.
pub fn run(cwd: &Path, file: &Path, args: &PluginArgs, json: bool) -> Result<()> {
    let path = absolutize(cwd, file);
    let (sink, collected) = diagnostic_sink(json);

    let result = load_project(cwd, args)
        .and_then(|project| {
            let container = plugin_container(cwd, &project, sink)?;
            Ok((project, container))
        })
        .map_err(|e| ErrorJson::config(&e))
        .and_then(|(project, container)| compile_file(&container, &project, &path));

    match result {
        Ok(compiled) => {
            if json {
                print_json(&CompileResultJson {
                    ok: true,
                    schema_version: SCHEMA_VERSION,
                    file: path.display().to_string(),
                    id: Some(compiled.id),
                    code: Some(compiled.code),
                    map: compiled.map,
                    error: None,
                    diagnostics: drain(collected.as_ref()),
                })?;
            } else {
                print!("{}", compiled.code);
            }
            Ok(())
        }
        Err(err) => {
            if json {
                print_json(&CompileResultJson {
                    ok: false,
                    schema_version: SCHEMA_VERSION,
                    file: path.display().to_string(),
                    id: None,
                    code: None,
                    map: None,
                    error: Some(err),
                    diagnostics: drain(collected.as_ref()),
                })?;
            } else {
                print_error(&err);
            }
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chicory_core::compiler::{CompileError, CompileOutput, Compiler};
    use chicory_core::{ChicoryOptions, ChicoryPlugin, ChicoryTransformPlugin, Variant};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn upper() -> Arc<dyn Compiler> {
        Arc::new(|source: &str| -> Result<CompileOutput, CompileError> {
            Ok(CompileOutput {
                code: source.to_uppercase(),
                map: Some("{}".to_string()),
            })
        })
    }

    fn container(root: &Path, variant: Variant) -> PluginContainer {
        let mut container = PluginContainer::new(root.to_path_buf());
        match variant {
            Variant::Dual => {
                container.add(Box::new(ChicoryPlugin::new(ChicoryOptions::default(), upper())));
            }
            Variant::Transform => container.add(Box::new(
                ChicoryTransformPlugin::new(ChicoryOptions::default(), upper()).unwrap(),
            )),
        }
        container
    }

    #[test]
    fn test_compile_file_both_variants() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("App.chic");
        std::fs::write(&path, "view").unwrap();
        let project = ProjectConfig::default();

        let dual = compile_file(&container(dir.path(), Variant::Dual), &project, &path).unwrap();
        assert!(dual.id.ends_with("App.chic.jsx"));
        assert_eq!(dual.code, "VIEW");
        assert_eq!(dual.map.as_deref(), Some("{}"));

        let single =
            compile_file(&container(dir.path(), Variant::Transform), &project, &path).unwrap();
        assert!(single.id.ends_with("App.chic"));
        assert_eq!(single.code, "VIEW");
        assert!(single.map.is_none());
    }

    #[test]
    fn test_compile_file_rejects_other_extensions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("main.js");
        std::fs::write(&path, "x").unwrap();

        let err = compile_file(
            &container(dir.path(), Variant::Dual),
            &ProjectConfig::default(),
            &path,
        )
        .unwrap_err();
        assert_eq!(err.code, codes::UNCLAIMED_FILE);
    }

    #[test]
    fn test_compile_file_missing() {
        let dir = tempdir().unwrap();
        let err = compile_file(
            &container(dir.path(), Variant::Dual),
            &ProjectConfig::default(),
            &dir.path().join("Nope.chic"),
        )
        .unwrap_err();
        assert_eq!(err.code, codes::FILE_NOT_FOUND);
    }
}
