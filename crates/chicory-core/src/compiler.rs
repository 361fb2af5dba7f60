//! The external compiler seam.
//!
//! The plugin never compiles anything itself. It hands source text to a
//! [`Compiler`] and forwards whatever comes back. [`CommandCompiler`] runs an
//! external program; closures implement the trait too, which is what tests
//! and embedders use.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};
use thiserror::Error;

/// What a compiler produces from one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileOutput {
    /// Generated code.
    pub code: String,
    /// Source map as JSON text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<String>,
}

impl CompileOutput {
    /// Output with code and no map.
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            map: None,
        }
    }
}

/// Failure of a compile call. Compilation is deterministic, so a failure is
/// final for the given input.
#[derive(Error, Debug)]
pub enum CompileError {
    /// The compiler rejected the source.
    #[error("{message}")]
    Rejected { message: String },

    #[error("failed to start compiler `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("compiler I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("compiler output is not valid JSON: {source}")]
    Output {
        #[source]
        source: serde_json::Error,
    },
}

impl CompileError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

/// Turns custom-extension source text into host-consumable code.
pub trait Compiler: Send + Sync {
    fn compile(&self, source: &str) -> Result<CompileOutput, CompileError>;
}

impl<F> Compiler for F
where
    F: Fn(&str) -> Result<CompileOutput, CompileError> + Send + Sync,
{
    fn compile(&self, source: &str) -> Result<CompileOutput, CompileError> {
        self(source)
    }
}

/// How to read a [`CommandCompiler`]'s stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `{"code": "...", "map": ...}`
    #[default]
    Json,
    /// stdout is the generated code.
    Code,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "code" => Ok(Self::Code),
            other => Err(format!("unknown compiler output format: {other} (expected json or code)")),
        }
    }
}

#[derive(Deserialize)]
struct JsonOutput {
    code: String,
    #[serde(default)]
    map: Option<serde_json::Value>,
}

/// Runs an external compiler: source on stdin, result on stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCompiler {
    pub program: String,
    pub args: Vec<String>,
    pub output: OutputFormat,
}

impl CommandCompiler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            output: OutputFormat::default(),
        }
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    fn parse_stdout(&self, stdout: Vec<u8>) -> Result<CompileOutput, CompileError> {
        let text = String::from_utf8_lossy(&stdout).into_owned();
        match self.output {
            OutputFormat::Code => Ok(CompileOutput::code(text)),
            OutputFormat::Json => {
                let parsed: JsonOutput = serde_json::from_str(&text)
                    .map_err(|source| CompileError::Output { source })?;
                let map = match parsed.map {
                    None | Some(serde_json::Value::Null) => None,
                    Some(serde_json::Value::String(s)) => Some(s),
                    Some(other) => Some(other.to_string()),
                };
                Ok(CompileOutput {
                    code: parsed.code,
                    map,
                })
            }
        }
    }
}

impl Compiler for CommandCompiler {
    fn compile(&self, source: &str) -> Result<CompileOutput, CompileError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CompileError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdin = child.stdin.take();
        let (written, output) = std::thread::scope(|scope| {
            // feed stdin from a second thread so a chatty compiler cannot
            // deadlock on a full stdout pipe
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(source.as_bytes()),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
            (written, output)
        });
        let output = output?;
        if let Err(e) = written {
            // a compiler may exit before reading all input; its status says why
            if e.kind() != std::io::ErrorKind::BrokenPipe || output.status.success() {
                return Err(e.into());
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("`{}` exited with {}", self.program, output.status)
            } else {
                stderr
            };
            return Err(CompileError::Rejected { message });
        }

        self.parse_stdout(output.stdout)
    }
}
