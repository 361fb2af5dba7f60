//! `chicory build` command implementation.
//!
//! Builds the module graph reachable from an entry point with the chicory
//! plugin installed, and prints (or writes) a manifest of every module.

use super::{
    absolutize, codes, diagnostic_sink, drain, load_project, plugin_container, print_error,
    print_json, DiagnosticJson, ErrorJson, PluginArgs,
};
use chicory_core::host::{BuildOutput, Host, HostConfig, Loader};
use chicory_core::version::SCHEMA_VERSION;
use chicory_core::ProjectConfig;
use miette::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Build command action.
#[derive(Debug, Clone)]
pub struct BuildAction {
    /// Entry point file.
    pub entry: PathBuf,
    /// Working directory.
    pub cwd: PathBuf,
    /// Manifest file (if None, prints to stdout).
    pub outfile: Option<PathBuf>,
    pub plugin: PluginArgs,
}

/// The build manifest: one entry per module, in discovery order.
#[derive(Debug, Serialize)]
pub struct Manifest {
    pub schema_version: u32,
    pub entry: String,
    pub variant: &'static str,
    pub modules: Vec<ModuleJson>,
    pub externals: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ModuleJson {
    pub id: String,
    pub loader: Loader,
    pub hash: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<String>,
    pub dependencies: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dynamic_dependencies: Vec<String>,
}

impl Manifest {
    fn new(output: BuildOutput, project: &ProjectConfig) -> Self {
        let modules = output
            .graph
            .iter()
            .map(|m| ModuleJson {
                id: m.id.clone(),
                loader: m.loader,
                hash: m.hash.clone(),
                code: m.code.clone(),
                map: m.map.clone(),
                dependencies: m.dependencies.clone(),
                dynamic_dependencies: m.dynamic_dependencies.clone(),
            })
            .collect();
        Self {
            schema_version: SCHEMA_VERSION,
            entry: output.entry,
            variant: project.variant.as_str(),
            modules,
            externals: output.externals,
        }
    }
}

/// JSON output for the build command.
#[derive(Serialize)]
struct BuildResultJson {
    ok: bool,
    schema_version: u32,
    entry: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    outfile: Option<String>,
    modules: usize,
    duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    manifest: Option<Manifest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorJson>,
    diagnostics: Vec<DiagnosticJson>,
}

fn build(
    action: &BuildAction,
    json: bool,
) -> (Result<Manifest, ErrorJson>, Vec<DiagnosticJson>) {
    let (sink, collected) = diagnostic_sink(json);

    let result = (|| -> Result<Manifest, ErrorJson> {
        let project =
            load_project(&action.cwd, &action.plugin).map_err(|e| ErrorJson::config(&e))?;
        let container =
            plugin_container(&action.cwd, &project, sink).map_err(|e| ErrorJson::config(&e))?;

        let mut config = HostConfig::new(action.cwd.clone());
        config.external.clone_from(&project.external);
        let host = Host::new(container, config)?;

        let output = host.build(&action.entry)?;
        Ok(Manifest::new(output, &project))
    })();

    (result, drain(collected.as_ref()))
}

fn write_manifest(path: &Path, manifest: &Manifest) -> Result<(), ErrorJson> {
    let write_error = |message: String| {
        ErrorJson::new(codes::WRITE_ERROR, message, Some(path.display().to_string()))
    };
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)
                .map_err(|e| write_error(format!("Cannot create {}: {e}", parent.display())))?;
        }
    }
    let mut text =
        serde_json::to_string_pretty(manifest).map_err(|e| write_error(e.to_string()))?;
    text.push('\n');
    chicory_util::fs::atomic_write(path, text.as_bytes())
        .map_err(|e| write_error(format!("Cannot write {}: {e}", path.display())))
}

/// Run the build command.
pub fn run(action: BuildAction, json: bool) -> Result<()> {
    let start = Instant::now();
    let outfile = action.outfile.as_ref().map(|p| absolutize(&action.cwd, p));

    let (result, diagnostics) = build(&action, json);
    let result = result.and_then(|manifest| match &outfile {
        Some(path) => write_manifest(path, &manifest).map(|()| manifest),
        None => Ok(manifest),
    });

    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    match result {
        Ok(manifest) => {
            tracing::info!(
                entry = %manifest.entry,
                modules = manifest.modules.len(),
                duration_ms,
                "build finished"
            );
            if json {
                print_json(&BuildResultJson {
                    ok: true,
                    schema_version: SCHEMA_VERSION,
                    entry: manifest.entry.clone(),
                    outfile: outfile.as_ref().map(|p| p.display().to_string()),
                    modules: manifest.modules.len(),
                    duration_ms,
                    manifest: outfile.is_none().then_some(manifest),
                    error: None,
                    diagnostics,
                })?;
            } else if let Some(path) = &outfile {
                println!(
                    "  {} -> {} ({} modules, {}ms)",
                    action.entry.display(),
                    path.display(),
                    manifest.modules.len(),
                    duration_ms
                );
            } else {
                for module in &manifest.modules {
                    println!("// {} ({})", module.id, module.loader.as_str());
                    println!("{}", module.code.trim_end());
                }
            }
            Ok(())
        }
        Err(err) => {
            if json {
                print_json(&BuildResultJson {
                    ok: false,
                    schema_version: SCHEMA_VERSION,
                    entry: action.entry.display().to_string(),
                    outfile: outfile.as_ref().map(|p| p.display().to_string()),
                    modules: 0,
                    duration_ms,
                    manifest: None,
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
