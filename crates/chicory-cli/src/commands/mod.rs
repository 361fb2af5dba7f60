pub mod build;
pub mod check;
pub mod compile;
pub mod resolve;
pub mod version;

use crate::diagnostics::TracingSink;
use chicory_core::diagnostics::{CollectingSink, Diagnostic, DiagnosticSink};
use chicory_core::host::BuildError;
use chicory_core::plugin::{PluginContainer, PluginContext};
use chicory_core::{chicory, Error, OutputFormat, ProjectConfig, Variant};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Error codes raised by the CLI itself. Build failures carry the host's codes.
pub mod codes {
    pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
    pub const FILE_NOT_FOUND: &str = "FILE_NOT_FOUND";
    pub const UNCLAIMED_FILE: &str = "UNCLAIMED_FILE";
    pub const WRITE_ERROR: &str = "WRITE_ERROR";
}

/// Plugin flags shared by the commands that install the plugin.
/// They take precedence over `chicory.json`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct PluginArgs {
    /// Plugin variant: dual or transform
    #[arg(long)]
    pub variant: Option<Variant>,

    /// External compiler command
    #[arg(long, value_name = "CMD", env = "CHICORY_COMPILER")]
    pub compiler: Option<String>,

    /// Argument for the compiler command (repeatable)
    #[arg(long = "compiler-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub compiler_args: Vec<String>,

    /// How to read the compiler's stdout: json or code
    #[arg(long, value_name = "FORMAT")]
    pub compiler_output: Option<OutputFormat>,

    /// Packages kept out of the graph (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub external: Vec<String>,
}

impl PluginArgs {
    /// Overlay the flags onto a project config.
    ///
    /// A new `--compiler` drops the file's compiler args, since they belonged
    /// to a different program.
    pub fn apply(&self, project: &mut ProjectConfig) {
        if let Some(variant) = self.variant {
            project.variant = variant;
        }
        if let Some(command) = &self.compiler {
            project.compiler.command = command.clone();
        }
        if self.compiler.is_some() || !self.compiler_args.is_empty() {
            project.compiler.args = self.compiler_args.clone();
        }
        if let Some(output) = self.compiler_output {
            project.compiler.output = output;
        }
        for external in &self.external {
            if !project.external.contains(external) {
                project.external.push(external.clone());
            }
        }
    }
}

/// Read `chicory.json` from `cwd` and apply the command-line flags.
pub fn load_project(cwd: &Path, args: &PluginArgs) -> Result<ProjectConfig, Error> {
    let mut project = ProjectConfig::load(cwd)?;
    args.apply(&mut project);
    project.options()?;
    tracing::debug!(
        variant = project.variant.as_str(),
        extension = %project.extension,
        compiler = %project.compiler.command,
        "project configured"
    );
    Ok(project)
}

/// Where plugin diagnostics go: collected for JSON output, logged otherwise.
pub fn diagnostic_sink(json: bool) -> (Arc<dyn DiagnosticSink>, Option<Arc<CollectingSink>>) {
    if json {
        let sink = Arc::new(CollectingSink::new());
        (Arc::clone(&sink) as Arc<dyn DiagnosticSink>, Some(sink))
    } else {
        (Arc::new(TracingSink), None)
    }
}

/// A container with the configured chicory plugin installed.
pub fn plugin_container(
    cwd: &Path,
    project: &ProjectConfig,
    sink: Arc<dyn DiagnosticSink>,
) -> Result<PluginContainer, Error> {
    let options = project.options()?;
    let compiler = Arc::new(project.compiler.to_command());
    let plugin = chicory::plugin(project.variant, options, compiler)?;

    let mut ctx = PluginContext::new(cwd.to_path_buf());
    ctx.diagnostics = sink;

    let mut container = PluginContainer::with_context(ctx);
    container.set_external(project.external.clone());
    container.add(plugin);
    Ok(container)
}

/// `path` made absolute against `cwd`.
pub fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Error object in JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorJson {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ErrorJson {
    pub fn new(code: &str, message: impl Into<String>, path: Option<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            path,
        }
    }

    pub fn config(err: &Error) -> Self {
        let path = match err {
            Error::ConfigRead { path, .. } | Error::ConfigParse { path, .. } => {
                Some(path.display().to_string())
            }
            _ => None,
        };
        Self::new(codes::CONFIG_ERROR, err.to_string(), path)
    }
}

impl From<BuildError> for ErrorJson {
    fn from(err: BuildError) -> Self {
        Self {
            code: err.code.to_string(),
            message: err.message,
            path: err.path,
        }
    }
}

/// Plugin diagnostic in JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticJson {
    pub severity: &'static str,
    pub plugin: String,
    pub hook: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub message: String,
}

impl From<Diagnostic> for DiagnosticJson {
    fn from(d: Diagnostic) -> Self {
        Self {
            severity: d.severity.as_str(),
            plugin: d.plugin,
            hook: d.hook,
            id: d.id,
            message: d.message,
        }
    }
}

/// Drain collected diagnostics for JSON output.
pub fn drain(collected: Option<&Arc<CollectingSink>>) -> Vec<DiagnosticJson> {
    collected
        .map(|sink| sink.take().into_iter().map(DiagnosticJson::from).collect())
        .unwrap_or_default()
}

/// Print a value as one line of JSON.
pub fn print_json<T: Serialize>(value: &T) -> miette::Result<()> {
    let line = serde_json::to_string(value).map_err(|e| miette::miette!("{e}"))?;
    println!("{line}");
    Ok(())
}

/// Human-readable failure on stderr.
pub fn print_error(err: &ErrorJson) {
    eprintln!("error[{}]: {}", err.code, err.message);
    if let Some(path) = &err.path {
        eprintln!("  at {path}");
    }
}
