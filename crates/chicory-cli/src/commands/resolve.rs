//! `chicory resolve` command implementation.

use super::{
    absolutize, diagnostic_sink, drain, load_project, plugin_container, print_error, print_json,
    DiagnosticJson, ErrorJson, PluginArgs,
};
use chicory_core::host::codes;
use chicory_core::plugin::ResolveIdResult;
use chicory_core::version::SCHEMA_VERSION;
use miette::Result;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ResolveResultJson {
    ok: bool,
    schema_version: u32,
    specifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    importer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    external: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorJson>,
    diagnostics: Vec<DiagnosticJson>,
}

/// Run the resolve command.
pub fn run(
    cwd: &Path,
    specifier: &str,
    importer: Option<&Path>,
    args: &PluginArgs,
    json: bool,
) -> Result<()> {
    let importer = importer.map(|p| absolutize(cwd, p).display().to_string());
    let (sink, collected) = diagnostic_sink(json);

    let result = (|| -> Result<ResolveIdResult, ErrorJson> {
        let project = load_project(cwd, args).map_err(|e| ErrorJson::config(&e))?;
        let container =
            plugin_container(cwd, &project, sink).map_err(|e| ErrorJson::config(&e))?;

        let from = importer.as_deref();
        container
            .resolve_id(specifier, from)
            .map_err(|e| ErrorJson::new(codes::PLUGIN_ERROR, e.to_string(), e.id.clone()))?
            .ok_or_else(|| {
                let from = from.unwrap_or(".");
                ErrorJson::new(
                    codes::UNRESOLVED_IMPORT,
                    format!("Cannot resolve '{specifier}' from '{from}'"),
                    importer.clone(),
                )
            })
    })();

    let diagnostics = drain(collected.as_ref());
    match result {
        Ok(resolved) => {
            if json {
                print_json(&ResolveResultJson {
                    ok: true,
                    schema_version: SCHEMA_VERSION,
                    specifier: specifier.to_string(),
                    importer,
                    id: Some(resolved.id),
                    external: resolved.external,
                    error: None,
                    diagnostics,
                })?;
            } else if resolved.external {
                println!("{} (external)", resolved.id);
            } else {
                println!("{}", resolved.id);
            }
            Ok(())
        }
        Err(err) => {
            if json {
                print_json(&ResolveResultJson {
                    ok: false,
                    schema_version: SCHEMA_VERSION,
                    specifier: specifier.to_string(),
                    importer,
                    id: None,
                    external: false,
                    error: Some(err),
                    diagnostics,
                })?;
            } else {
                print_error(&err);
            }
            std::process::exit(1);
        }
    }
}
