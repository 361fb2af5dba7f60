use crate::chicory::{ChicoryOptions, Variant};
use crate::compiler::{CommandCompiler, OutputFormat};
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the optional project configuration.
pub const PROJECT_CONFIG_FILE: &str = "chicory.json";

/// Runtime configuration for the chicory CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}

/// How to invoke the external compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    pub command: String,
    pub args: Vec<String>,
    pub output: OutputFormat,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            command: "chicoryc".to_string(),
            args: Vec::new(),
            output: OutputFormat::Json,
        }
    }
}

impl CompilerConfig {
    #[must_use]
    pub fn to_command(&self) -> CommandCompiler {
        CommandCompiler::new(&self.command)
            .args(self.args.iter().cloned())
            .output(self.output)
    }
}

/// Project configuration, read from `chicory.json` when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Source extension claimed by the plugin.
    pub extension: String,
    /// Marker appended to resolved ids.
    pub marker: String,
    /// Which plugin variant to install.
    pub variant: Variant,
    /// Bare specifiers kept out of the graph.
    pub external: Vec<String>,
    pub compiler: CompilerConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        let options = ChicoryOptions::default();
        Self {
            extension: options.extension,
            marker: options.marker,
            variant: Variant::default(),
            external: Vec::new(),
            compiler: CompilerConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Load `chicory.json` from `dir`, or defaults when the file is absent.
    pub fn load(dir: &Path) -> Result<Self, Error> {
        let path = dir.join(PROJECT_CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    /// Load a config file at an explicit path.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.options()?;
        Ok(config)
    }

    /// Validated plugin options.
    pub fn options(&self) -> Result<ChicoryOptions, Error> {
        ChicoryOptions::new(&self.extension, &self.marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.extension, ".chic");
        assert_eq!(config.marker, ".jsx");
        assert_eq!(config.variant, Variant::Dual);
    }

    #[test]
    fn test_partial_file_merges_with_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            r#"{"variant": "transform", "external": ["react"], "compiler": {"command": "chic-compile", "output": "code"}}"#,
        )
        .unwrap();

        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.variant, Variant::Transform);
        assert_eq!(config.external, vec!["react".to_string()]);
        assert_eq!(config.compiler.command, "chic-compile");
        assert!(config.compiler.args.is_empty());
        assert_eq!(config.compiler.output, OutputFormat::Code);
        assert_eq!(config.extension, ".chic");
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(PROJECT_CONFIG_FILE), "{ nope").unwrap();

        let err = ProjectConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
        assert!(err.to_string().contains(PROJECT_CONFIG_FILE));
    }

    #[test]
    fn test_invalid_options_rejected() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            r#"{"extension": ".chic", "marker": ".chic"}"#,
        )
        .unwrap();

        assert!(matches!(
            ProjectConfig::load(dir.path()),
            Err(Error::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_config_builder() {
        let config = Config::new(PathBuf::from("/tmp"))
            .with_verbosity(2)
            .with_json_logs(true);
        assert_eq!(config.cwd, PathBuf::from("/tmp"));
        assert_eq!(config.verbosity, 2);
        assert!(config.json_logs);
    }
}
