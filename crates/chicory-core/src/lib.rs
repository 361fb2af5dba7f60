#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod chicory;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod host;
pub mod plugin;
pub mod version;

pub use chicory::{ChicoryOptions, ChicoryPlugin, ChicoryTransformPlugin, Variant};
pub use compiler::{CommandCompiler, CompileError, CompileOutput, Compiler, OutputFormat};
pub use config::{Config, ProjectConfig};
pub use error::Error;
pub use host::{BuildError, BuildOutput, Host, HostConfig, Loader};
pub use plugin::{Plugin, PluginContainer};
pub use version::VERSION;
