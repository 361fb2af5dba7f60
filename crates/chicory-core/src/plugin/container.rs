use super::{
    HookResult, LoadResult, Plugin, PluginContext, PluginError, ResolveIdResult,
    ResolveOptions, TransformResult,
};
use crate::diagnostics::{Diagnostic, Severity};
use crate::host::{HostConfig, ResolveResult, Resolver};
use std::path::{Path, PathBuf};

/// A container for managing multiple plugins.
///
/// Plugins are kept sorted by their `enforce()` ordering: `Pre` → `Normal` → `Post`.
/// Within the same enforcement level, insertion order is preserved.
///
/// When no plugin resolves a specifier the container falls back to the
/// host's filesystem [`Resolver`], so nested resolution from a hook behaves
/// like a full resolution minus the skipped plugins.
pub struct PluginContainer {
    plugins: Vec<Box<dyn Plugin>>,
    ctx: PluginContext,
    resolver: Resolver,
    external: Vec<String>,
}

impl PluginContainer {
    /// Create a new plugin container.
    pub fn new(cwd: PathBuf) -> Self {
        Self::with_context(PluginContext::new(cwd))
    }

    /// Create a container around an existing context.
    pub fn with_context(ctx: PluginContext) -> Self {
        Self {
            plugins: Vec::new(),
            ctx,
            resolver: Resolver::new(),
            external: Vec::new(),
        }
    }

    /// Add a plugin. Plugins are kept sorted by enforce order.
    pub fn add(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
        // stable: insertion order holds within a level
        self.plugins.sort_by_key(|p| p.enforce());
    }

    /// Bare specifiers (and their subpaths) the default resolver marks external.
    pub fn set_external(&mut self, external: Vec<String>) {
        self.external = external;
    }

    /// Plugin names in dispatch order.
    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    fn hook_context<'a>(&'a self, index: usize, skip: &'a [usize]) -> HookContext<'a> {
        HookContext {
            container: self,
            plugin: index,
            skip,
        }
    }

    /// Call `config` on all plugins, letting each contribute to the config.
    pub fn call_config(&self, config: &mut HostConfig) -> HookResult<()> {
        for plugin in &self.plugins {
            plugin.config(config)?;
        }
        Ok(())
    }

    /// Call `build_start` on all plugins.
    pub fn build_start(&self) -> HookResult<()> {
        for (index, plugin) in self.plugins.iter().enumerate() {
            plugin.build_start(&self.hook_context(index, &[]))?;
        }
        Ok(())
    }

    /// Call `build_end` on all plugins.
    pub fn build_end(&self) -> HookResult<()> {
        for (index, plugin) in self.plugins.iter().enumerate() {
            plugin.build_end(&self.hook_context(index, &[]))?;
        }
        Ok(())
    }

    /// Resolve a specifier through plugins, then the default resolver.
    /// Returns `None` if nothing could resolve it.
    pub fn resolve_id(
        &self,
        specifier: &str,
        importer: Option<&str>,
    ) -> HookResult<Option<ResolveIdResult>> {
        self.resolve_id_skipping(specifier, importer, &[])
    }

    fn resolve_id_skipping(
        &self,
        specifier: &str,
        importer: Option<&str>,
        skip: &[usize],
    ) -> HookResult<Option<ResolveIdResult>> {
        for (index, plugin) in self.plugins.iter().enumerate() {
            if skip.contains(&index) {
                continue;
            }
            let ctx = self.hook_context(index, skip);
            if let Some(result) = plugin.resolve_id(specifier, importer, &ctx)? {
                return Ok(Some(result));
            }
        }
        Ok(self.default_resolve(specifier, importer))
    }

    /// The host's own resolution: configured externals, then the filesystem.
    fn default_resolve(&self, specifier: &str, importer: Option<&str>) -> Option<ResolveIdResult> {
        if self.is_external(specifier) {
            return Some(ResolveIdResult::external(specifier));
        }

        let base_dir = importer
            .and_then(|i| Path::new(i).parent())
            .unwrap_or(self.ctx.cwd.as_path());

        match self.resolver.resolve(specifier, base_dir, &self.ctx.cwd) {
            Ok(ResolveResult::Found(path)) => {
                Some(ResolveIdResult::resolved(path.display().to_string()))
            }
            Ok(ResolveResult::Builtin(id)) => {
                Some(ResolveIdResult::external(id))
            }
            Err(_) => None,
        }
    }

    fn is_external(&self, specifier: &str) -> bool {
        self.external.iter().any(|e| {
            specifier == e
                || specifier
                    .strip_prefix(e.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    /// Try to load a module through plugins.
    /// Returns `None` if no plugin handled the load.
    pub fn load(&self, id: &str) -> HookResult<Option<LoadResult>> {
        for (index, plugin) in self.plugins.iter().enumerate() {
            if let Some(result) = plugin.load(id, &self.hook_context(index, &[]))? {
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    /// Transform code through all plugins.
    ///
    /// Each plugin's output is passed to the next plugin. The map of the last
    /// plugin that produced one is kept; maps are not composed.
    pub fn transform(&self, code: &str, id: &str) -> HookResult<TransformResult> {
        let mut current = TransformResult::code(code);
        for (index, plugin) in self.plugins.iter().enumerate() {
            if let Some(result) =
                plugin.transform(&current.code, id, &self.hook_context(index, &[]))?
            {
                current.code = result.code;
                if result.map.is_some() {
                    current.map = result.map;
                }
            }
        }
        Ok(current)
    }
}

impl Default for PluginContainer {
    fn default() -> Self {
        Self::with_context(PluginContext::default())
    }
}

/// Per-call capabilities handed to a hook.
///
/// Knows which plugin is running, so errors are attributed to it and nested
/// resolution can skip it.
pub struct HookContext<'a> {
    container: &'a PluginContainer,
    plugin: usize,
    skip: &'a [usize],
}

impl HookContext<'_> {
    /// Name of the plugin whose hook is running.
    pub fn plugin_name(&self) -> &str {
        self.container
            .plugins
            .get(self.plugin)
            .map_or("", |p| p.name())
    }

    /// Working directory of the build.
    pub fn cwd(&self) -> &Path {
        &self.container.ctx.cwd
    }

    /// Whether this is a watch/dev build.
    pub fn watch(&self) -> bool {
        self.container.ctx.watch
    }

    /// Resolve `specifier` through the rest of the pipeline.
    ///
    /// Plugins already skipped by an outer nested resolution stay skipped.
    pub fn resolve(
        &self,
        specifier: &str,
        importer: Option<&str>,
        options: ResolveOptions,
    ) -> HookResult<Option<ResolveIdResult>> {
        let mut skip = self.skip.to_vec();
        if options.skip_self && !skip.contains(&self.plugin) {
            skip.push(self.plugin);
        }
        self.container
            .resolve_id_skipping(specifier, importer, &skip)
    }

    /// Report an error to the host's diagnostic channel and return it for
    /// propagation. The build stops once the error reaches the host.
    pub fn error(
        &self,
        hook: &'static str,
        id: Option<&str>,
        message: impl Into<String>,
    ) -> PluginError {
        let message = message.into();
        self.report(Severity::Error, hook, id, message.clone());
        let err = PluginError::new(self.plugin_name(), hook, message);
        match id {
            Some(id) => err.with_id(id),
            None => err,
        }
    }

    /// Report a warning to the host's diagnostic channel.
    pub fn warn(&self, hook: &'static str, id: Option<&str>, message: impl Into<String>) {
        self.report(Severity::Warning, hook, id, message.into());
    }

    fn report(&self, severity: Severity, hook: &'static str, id: Option<&str>, message: String) {
        self.container.ctx.diagnostics.report(&Diagnostic {
            severity,
            plugin: self.plugin_name().to_string(),
            hook,
            id: id.map(ToString::to_string),
            message,
        });
    }
}
