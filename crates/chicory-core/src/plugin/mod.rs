//! Plugin contract between the module host and its plugins.
//!
//! A Rollup/Vite-shaped interface: `resolve_id`, `load` and `transform` hooks
//! plus a `config` hook that contributes to the host configuration. Every hook
//! returns `Ok(None)` to decline, which lets the next plugin (and finally the
//! host's own default behavior) handle the request.
//!
//! ## Example
//!
//! ```ignore
//! use chicory_core::plugin::{HookContext, HookResult, Plugin, TransformResult};
//!
//! struct Shout;
//!
//! impl Plugin for Shout {
//!     fn name(&self) -> &str { "shout" }
//!
//!     fn transform(&self, code: &str, id: &str, _ctx: &HookContext<'_>) -> HookResult<Option<TransformResult>> {
//!         if id.ends_with(".txt") {
//!             return Ok(Some(TransformResult::code(format!("export default {:?};", code.to_uppercase()))));
//!         }
//!         Ok(None)
//!     }
//! }
//! ```

mod container;

pub use container::{HookContext, PluginContainer};

use crate::host::HostConfig;
use rustc_hash::FxHashMap as HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::diagnostics::{DiagnosticSink, DiscardSink};

/// Result type for plugin hooks.
pub type HookResult<T> = Result<T, PluginError>;

/// Error from a plugin hook. Returning it aborts the build.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[{plugin}] {hook}: {message}")]
pub struct PluginError {
    /// Plugin name that caused the error.
    pub plugin: String,
    /// Hook that failed.
    pub hook: &'static str,
    /// Module id being processed, if any.
    pub id: Option<String>,
    /// Error message.
    pub message: String,
}

impl PluginError {
    pub fn new(plugin: impl Into<String>, hook: &'static str, message: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            hook,
            id: None,
            message: message.into(),
        }
    }

    /// Attach the module id the hook was working on.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// State shared by every hook invocation of one container.
pub struct PluginContext {
    /// Working directory.
    pub cwd: PathBuf,
    /// Whether this is a watch/dev build.
    pub watch: bool,
    /// Where hook diagnostics go.
    pub diagnostics: Arc<dyn DiagnosticSink>,
}

impl PluginContext {
    /// Create a new plugin context that discards diagnostics.
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            watch: false,
            diagnostics: Arc::new(DiscardSink),
        }
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("cwd", &self.cwd)
            .field("watch", &self.watch)
            .finish_non_exhaustive()
    }
}

impl Default for PluginContext {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_default())
    }
}

/// Free-form metadata carried alongside a resolved id.
pub type ModuleMeta = HashMap<String, String>;

/// Result of the resolve hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveIdResult {
    /// Resolved module id (usually an absolute file path).
    pub id: String,
    /// Whether this module is external (don't load it).
    pub external: bool,
    /// Metadata from whoever resolved the id.
    pub meta: ModuleMeta,
}

impl ResolveIdResult {
    /// Create a resolved module result.
    pub fn resolved(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            external: false,
            meta: ModuleMeta::default(),
        }
    }

    /// Create an external module result.
    pub fn external(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            external: true,
            meta: ModuleMeta::default(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

/// Options for nested resolution from inside a hook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Skip the calling plugin, so it cannot recurse into itself.
    pub skip_self: bool,
}

/// Result of the load hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
    /// Module source code.
    pub code: String,
    /// Optional source map (JSON text).
    pub map: Option<String>,
}

impl LoadResult {
    /// Create a load result with code only.
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            map: None,
        }
    }
}

/// Result of the transform hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResult {
    /// Transformed code.
    pub code: String,
    /// Optional source map (JSON text).
    pub map: Option<String>,
}

impl TransformResult {
    /// Create a transform result with code only.
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            map: None,
        }
    }
}

/// Plugin enforcement ordering. Mirrors Vite's `enforce` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum PluginEnforce {
    /// Runs before normal plugins.
    Pre,
    #[default]
    Normal,
    /// Runs after normal plugins.
    Post,
}

/// The main plugin trait.
///
/// All hooks have no-op defaults, so a plugin only implements the hooks it
/// cares about.
pub trait Plugin: Send + Sync {
    /// Plugin name for diagnostics and error messages.
    fn name(&self) -> &str;

    /// Plugin ordering: `Pre`, `Normal` (default), or `Post`.
    fn enforce(&self) -> PluginEnforce {
        PluginEnforce::Normal
    }

    /// Contribute to the host configuration. Called once, before the build.
    fn config(&self, _config: &mut HostConfig) -> HookResult<()> {
        Ok(())
    }

    /// Called at the start of the build.
    fn build_start(&self, _ctx: &HookContext<'_>) -> HookResult<()> {
        Ok(())
    }

    /// Resolve a module specifier to an id.
    ///
    /// Return `Some(result)` to handle this resolution, or `None` to let
    /// the next plugin or the default resolver handle it.
    fn resolve_id(
        &self,
        _specifier: &str,
        _importer: Option<&str>,
        _ctx: &HookContext<'_>,
    ) -> HookResult<Option<ResolveIdResult>> {
        Ok(None)
    }

    /// Load a module by id.
    ///
    /// Return `Some(result)` to provide the module body, or `None` to let
    /// the next plugin or the default loader handle it.
    fn load(&self, _id: &str, _ctx: &HookContext<'_>) -> HookResult<Option<LoadResult>> {
        Ok(None)
    }

    /// Transform module source code.
    ///
    /// Return `Some(result)` to replace the code, or `None` to pass it through.
    /// Multiple plugins can transform the same module in sequence.
    fn transform(
        &self,
        _code: &str,
        _id: &str,
        _ctx: &HookContext<'_>,
    ) -> HookResult<Option<TransformResult>> {
        Ok(None)
    }

    /// Called at the end of the build, including failed builds.
    fn build_end(&self, _ctx: &HookContext<'_>) -> HookResult<()> {
        Ok(())
    }
}
