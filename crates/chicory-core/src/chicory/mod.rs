//! The `.chic` extension-remapping plugin.
//!
//! Makes files with a custom source extension importable by handing their
//! text to an external [`Compiler`] and returning the output as the module
//! body. Two designs of the same thing are provided:
//!
//! - [`ChicoryPlugin`] (dual-hook, the default): `resolve_id` turns
//!   `/src/App.chic` into `/src/App.chic.jsx`, an id no default loader
//!   handles, and `load` strips the marker again, reads the file and compiles
//!   it. The `.jsx` marker also makes the host parse the output as JSX.
//! - [`ChicoryTransformPlugin`] (single-hook): `transform` replaces the body
//!   of every `.chic` module, and its `config` hook tells the host to parse
//!   `.chic` ids with the JSX loader, since the id keeps its own extension.
//!
//! The hook logic lives in plain functions returning explicit outcomes
//! ([`ResolveOutcome`], [`LoadOutcome`], [`TransformOutcome`]) so each branch
//! is testable without a host.

mod load;
mod plugin;
mod resolve;
mod sentinel;

pub use load::{load_sentinel, transform_sentinel, LoadOutcome, TransformOutcome};
pub use plugin::{ChicoryPlugin, ChicoryTransformPlugin};
pub use resolve::{resolve_sentinel, ResolveOutcome};

use crate::compiler::{CompileError, Compiler};
use crate::error::Error;
use crate::plugin::Plugin;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Extension claimed by default.
pub const CHIC_EXTENSION: &str = ".chic";

/// Marker appended to resolved ids by default.
pub const MARKER_SUFFIX: &str = ".jsx";

/// Name both plugin variants register under.
pub const PLUGIN_NAME: &str = "chicory";

/// Extension and marker the plugin works with. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChicoryOptions {
    pub extension: String,
    pub marker: String,
    /// `extension + marker`, the suffix of every synthetic id.
    marked_suffix: String,
}

impl ChicoryOptions {
    /// Validate and build options.
    ///
    /// Both strings must be non-empty, start with `.`, and differ.
    pub fn new(extension: &str, marker: &str) -> Result<Self, Error> {
        for (what, value) in [("extension", extension), ("marker", marker)] {
            if value.len() < 2 || !value.starts_with('.') {
                return Err(Error::invalid_options(format!(
                    "{what} must start with '.' and name a suffix, got {value:?}"
                )));
            }
        }
        if extension == marker {
            return Err(Error::invalid_options(format!(
                "marker must differ from the extension, both are {extension:?}"
            )));
        }
        Ok(Self {
            extension: extension.to_string(),
            marker: marker.to_string(),
            marked_suffix: format!("{extension}{marker}"),
        })
    }
}

impl Default for ChicoryOptions {
    fn default() -> Self {
        Self {
            extension: CHIC_EXTENSION.to_string(),
            marker: MARKER_SUFFIX.to_string(),
            marked_suffix: format!("{CHIC_EXTENSION}{MARKER_SUFFIX}"),
        }
    }
}

/// Which plugin design to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// `resolve_id` + `load`.
    #[default]
    Dual,
    /// `transform` + a loader rule from `config`.
    Transform,
}

impl Variant {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dual => "dual",
            Self::Transform => "transform",
        }
    }
}

impl std::str::FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dual" => Ok(Self::Dual),
            "transform" => Ok(Self::Transform),
            other => Err(format!("unknown plugin variant: {other} (expected dual or transform)")),
        }
    }
}

/// A claimed file that could not be turned into a module body.
#[derive(Error, Debug)]
pub enum ChicoryError {
    #[error("Error reading Chicory file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error compiling Chicory file {path}: {source}")]
    Compile {
        path: String,
        #[source]
        source: CompileError,
    },
}

impl ChicoryError {
    /// The on-disk path (never the marked id).
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Read { path, .. } | Self::Compile { path, .. } => path,
        }
    }
}

/// Build the plugin for `variant`.
pub fn plugin(
    variant: Variant,
    options: ChicoryOptions,
    compiler: Arc<dyn Compiler>,
) -> Result<Box<dyn Plugin>, Error> {
    Ok(match variant {
        Variant::Dual => Box::new(ChicoryPlugin::new(options, compiler)),
        Variant::Transform => Box::new(ChicoryTransformPlugin::new(options, compiler)?),
    })
}
