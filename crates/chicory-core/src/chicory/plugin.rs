use super::{
    load_sentinel, resolve_sentinel, transform_sentinel, ChicoryOptions, LoadOutcome,
    ResolveOutcome, TransformOutcome, PLUGIN_NAME,
};
use crate::compiler::Compiler;
use crate::error::Error;
use crate::host::{HostConfig, Loader, LoaderRule};
use crate::plugin::{
    HookContext, HookResult, LoadResult, Plugin, PluginEnforce, ResolveIdResult, TransformResult,
};
use regex_lite::Regex;
use std::sync::Arc;

/// Dual-hook plugin: marks claimed ids in `resolve_id`, compiles them in `load`.
///
/// Runs in the `Pre` phase so it sees claimed specifiers before any other
/// resolver does.
pub struct ChicoryPlugin {
    options: ChicoryOptions,
    compiler: Arc<dyn Compiler>,
}

impl ChicoryPlugin {
    pub fn new(options: ChicoryOptions, compiler: Arc<dyn Compiler>) -> Self {
        Self { options, compiler }
    }
}

impl Plugin for ChicoryPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn enforce(&self) -> PluginEnforce {
        PluginEnforce::Pre
    }

    fn resolve_id(
        &self,
        specifier: &str,
        importer: Option<&str>,
        ctx: &HookContext<'_>,
    ) -> HookResult<Option<ResolveIdResult>> {
        resolve_sentinel(&self.options, specifier, importer, ctx)
            .map(ResolveOutcome::into_hook_result)
    }

    fn load(&self, id: &str, ctx: &HookContext<'_>) -> HookResult<Option<LoadResult>> {
        match load_sentinel(&self.options, self.compiler.as_ref(), id) {
            LoadOutcome::Decline => Ok(None),
            LoadOutcome::Loaded(result) => Ok(Some(result)),
            LoadOutcome::Fatal(err) => Err(ctx.error("load", Some(err.path()), err.to_string())),
        }
    }
}

/// Single-hook plugin: compiles claimed modules in `transform`.
///
/// The id keeps its own extension, so the host would not know how to parse
/// the output. The `config` hook registers a loader rule for that.
pub struct ChicoryTransformPlugin {
    options: ChicoryOptions,
    compiler: Arc<dyn Compiler>,
    fragment: LoaderRule,
}

impl ChicoryTransformPlugin {
    pub fn new(options: ChicoryOptions, compiler: Arc<dyn Compiler>) -> Result<Self, Error> {
        let pattern = format!("{}$", regex_lite::escape(&options.extension));
        let include = Regex::new(&pattern)
            .map_err(|e| Error::invalid_options(format!("bad extension pattern {pattern}: {e}")))?;
        Ok(Self {
            options,
            compiler,
            fragment: LoaderRule {
                include,
                loader: Loader::Jsx,
            },
        })
    }

    /// The loader rule contributed by `config`.
    #[must_use]
    pub fn fragment(&self) -> &LoaderRule {
        &self.fragment
    }
}

impl Plugin for ChicoryTransformPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn enforce(&self) -> PluginEnforce {
        PluginEnforce::Pre
    }

    fn config(&self, config: &mut HostConfig) -> HookResult<()> {
        config.loaders.push(self.fragment.clone());
        Ok(())
    }

    fn transform(
        &self,
        code: &str,
        id: &str,
        ctx: &HookContext<'_>,
    ) -> HookResult<Option<TransformResult>> {
        match transform_sentinel(&self.options, self.compiler.as_ref(), code, id) {
            TransformOutcome::Decline => Ok(None),
            TransformOutcome::Transformed(result) => Ok(Some(result)),
            TransformOutcome::Fatal(err) => {
                Err(ctx.error("transform", Some(id), err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{CompileError, CompileOutput};
    use crate::diagnostics::{CollectingSink, DiagnosticSink, Severity};
    use crate::host::{codes, Host};
    use crate::plugin::{PluginContainer, PluginContext, ResolveOptions};
    use std::path::{Path, PathBuf};
    use tempfile::{tempdir, TempDir};

    /// Stands in for the real compiler: `<p>` becomes a JSX element export.
    fn jsx_compiler() -> Arc<dyn Compiler> {
        Arc::new(|source: &str| -> Result<CompileOutput, CompileError> {
            if source.contains("let =") {
                return Err(CompileError::rejected("expected identifier at 1:5"));
            }
            Ok(CompileOutput {
                code: format!("export default () => <p>{}</p>;", source.trim()),
                map: Some(r#"{"version":3,"sources":["chic"],"mappings":"AAAA"}"#.to_string()),
            })
        })
    }

    fn project() -> TempDir {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("main.js"),
            "import React from 'react';\nimport Widget from './Widget.chic';\nexport default Widget;",
        )
        .unwrap();
        std::fs::write(dir.path().join("Widget.chic"), "hello chicory\n").unwrap();
        dir
    }

    fn container_with(root: &Path, plugin: Box<dyn Plugin>) -> PluginContainer {
        let mut container = PluginContainer::new(root.to_path_buf());
        container.add(plugin);
        container
    }

    fn host_with(root: &Path, plugin: Box<dyn Plugin>) -> Host {
        let mut config = HostConfig::new(root.to_path_buf());
        config.external = vec!["react".to_string()];
        Host::new(container_with(root, plugin), config).unwrap()
    }

    fn dual() -> Box<dyn Plugin> {
        Box::new(ChicoryPlugin::new(ChicoryOptions::default(), jsx_compiler()))
    }

    fn single() -> Box<dyn Plugin> {
        Box::new(ChicoryTransformPlugin::new(ChicoryOptions::default(), jsx_compiler()).unwrap())
    }

    fn importer(dir: &TempDir) -> String {
        dir.path().join("main.js").display().to_string()
    }

    #[test]
    fn test_resolve_marks_claimed_file() {
        let dir = project();
        let container = container_with(dir.path(), dual());

        let resolved = container
            .resolve_id("./Widget.chic", Some(&importer(&dir)))
            .unwrap()
            .unwrap();
        assert!(resolved.id.ends_with("Widget.chic.jsx"));
        assert!(!resolved.external);
    }

    /// Tags every `.chic` file it resolves with a `lang` entry.
    struct LangTagger;

    impl Plugin for LangTagger {
        fn name(&self) -> &str {
            "lang-tagger"
        }

        fn resolve_id(
            &self,
            specifier: &str,
            importer: Option<&str>,
            ctx: &HookContext<'_>,
        ) -> HookResult<Option<ResolveIdResult>> {
            if !specifier.ends_with(".chic") {
                return Ok(None);
            }
            let nested = ResolveOptions { skip_self: true };
            Ok(ctx
                .resolve(specifier, importer, nested)?
                .map(|resolved| resolved.with_meta("lang", "chicory")))
        }
    }

    #[test]
    fn test_resolve_keeps_metadata_from_other_resolvers() {
        let dir = project();
        let mut container = container_with(dir.path(), Box::new(LangTagger));
        container.add(dual());
        assert_eq!(container.plugin_names(), vec!["chicory", "lang-tagger"]);

        let resolved = container
            .resolve_id("./Widget.chic", Some(&importer(&dir)))
            .unwrap()
            .unwrap();
        assert!(resolved.id.ends_with("Widget.chic.jsx"));
        assert_eq!(resolved.meta.get("lang").map(String::as_str), Some("chicory"));
    }

    #[test]
    fn test_marked_id_passes_through_unchanged() {
        let dir = project();
        let container = container_with(dir.path(), dual());

        let marked = container
            .resolve_id("./Widget.chic", Some(&importer(&dir)))
            .unwrap()
            .unwrap();

        // Nothing on disk answers to the marked name, so the pipeline declines
        // it, and the plugin must not mark it a second time.
        let again = container.resolve_id(&marked.id, None).unwrap();
        assert!(again.is_none());
        assert!(!marked.id.ends_with(".chic.jsx.jsx"));
    }

    #[test]
    fn test_unclaimed_and_unresolvable_specifiers_are_declined() {
        let dir = project();
        let container = container_with(dir.path(), dual());
        let from = importer(&dir);

        assert!(container
            .resolve_id("./Missing.chic", Some(&from))
            .unwrap()
            .is_none());

        let plain = container.resolve_id("./main.js", None).unwrap().unwrap();
        assert!(plain.id.ends_with("main.js"));
    }

    #[test]
    fn test_external_claimed_specifier_is_declined() {
        let dir = project();
        let mut container = container_with(dir.path(), dual());
        container.set_external(vec!["ui-kit".to_string()]);

        let resolved = container
            .resolve_id("ui-kit/Button.chic", None)
            .unwrap()
            .unwrap();
        assert!(resolved.external);
        assert_eq!(resolved.id, "ui-kit/Button.chic");
    }

    #[test]
    fn test_load_ignores_unmarked_ids() {
        let dir = project();
        let container = container_with(dir.path(), dual());
        let raw = dir.path().join("Widget.chic").display().to_string();

        assert!(container.load(&raw).unwrap().is_none());
        assert!(container.load(&importer(&dir)).unwrap().is_none());
    }

    #[test]
    fn test_dual_build_compiles_widget() {
        let dir = project();
        let host = host_with(dir.path(), dual());

        let output = host.build(Path::new("main.js")).unwrap();
        assert_eq!(output.graph.len(), 2);
        assert_eq!(output.externals, vec!["react".to_string()]);

        let widget = output
            .graph
            .iter()
            .find(|m| m.id.ends_with("Widget.chic.jsx"))
            .unwrap();
        assert_eq!(widget.code, "export default () => <p>hello chicory</p>;");
        assert_eq!(widget.loader, Loader::Jsx);
        assert!(widget.map.as_deref().unwrap().contains("\"mappings\":\"AAAA\""));

        let entry = output.graph.get(&output.entry).unwrap();
        assert_eq!(entry.dependencies, vec![widget.id.clone()]);
    }

    #[test]
    fn test_chic_entry_point() {
        let dir = project();
        let host = host_with(dir.path(), dual());

        let output = host.build(Path::new("Widget.chic")).unwrap();
        assert!(output.entry.ends_with("Widget.chic.jsx"));
        assert_eq!(output.graph.len(), 1);
    }

    #[test]
    fn test_compile_failure_aborts_build_with_path() {
        let dir = project();
        std::fs::write(dir.path().join("Widget.chic"), "let = 1").unwrap();

        let sink = Arc::new(CollectingSink::new());
        let mut ctx = PluginContext::new(dir.path().to_path_buf());
        ctx.diagnostics = Arc::clone(&sink) as Arc<dyn DiagnosticSink>;
        let mut container = PluginContainer::with_context(ctx);
        container.add(dual());
        let mut config = HostConfig::new(dir.path().to_path_buf());
        config.external = vec!["react".to_string()];
        let host = Host::new(container, config).unwrap();

        let err = host.build(Path::new("main.js")).unwrap_err();
        assert_eq!(err.code, codes::PLUGIN_ERROR);

        let path = err.path.unwrap();
        assert!(path.ends_with("Widget.chic"));
        assert!(err.message.contains("Error compiling Chicory file"));
        assert!(err.message.contains(&path));
        assert!(err.message.contains("expected identifier at 1:5"));

        let reported = sink.take();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].severity, Severity::Error);
        assert_eq!(reported[0].plugin, PLUGIN_NAME);
        assert_eq!(reported[0].hook, "load");
    }

    #[test]
    fn test_transform_variant_registers_loader_rule() {
        let dir = project();
        let host = host_with(dir.path(), single());

        assert_eq!(host.config().loaders.len(), 1);
        assert_eq!(host.config().loader_for("/x/Widget.chic"), Some(Loader::Jsx));
        assert_eq!(host.config().loader_for("/x/widget.chic.js"), Some(Loader::Js));

        let output = host.build(Path::new("main.js")).unwrap();
        let widget = output
            .graph
            .iter()
            .find(|m| m.id.ends_with("Widget.chic"))
            .unwrap();
        assert_eq!(widget.code, "export default () => <p>hello chicory</p>;");
        assert_eq!(widget.loader, Loader::Jsx);
        assert!(widget.map.is_none());
    }

    /// The single-hook variant without its config fragment.
    struct TransformOnly(ChicoryTransformPlugin);

    impl Plugin for TransformOnly {
        fn name(&self) -> &str {
            self.0.name()
        }

        fn transform(
            &self,
            code: &str,
            id: &str,
            ctx: &HookContext<'_>,
        ) -> HookResult<Option<TransformResult>> {
            self.0.transform(code, id, ctx)
        }
    }

    #[test]
    fn test_transform_without_loader_rule_fails() {
        let dir = project();
        let plugin =
            ChicoryTransformPlugin::new(ChicoryOptions::default(), jsx_compiler()).unwrap();
        let host = host_with(dir.path(), Box::new(TransformOnly(plugin)));

        let err = host.build(Path::new("main.js")).unwrap_err();
        assert_eq!(err.code, codes::NO_LOADER);
        assert!(err.path.unwrap().ends_with("Widget.chic"));
    }

    #[test]
    fn test_transform_failure_names_id() {
        let dir = project();
        std::fs::write(dir.path().join("Widget.chic"), "let = 1").unwrap();
        let host = host_with(dir.path(), single());

        let err = host.build(Path::new("main.js")).unwrap_err();
        assert_eq!(err.code, codes::PLUGIN_ERROR);
        assert!(err.path.as_deref().unwrap().ends_with("Widget.chic"));
        assert!(err.message.starts_with("[chicory] transform: Error compiling Chicory file"));
    }

    #[test]
    fn test_fragment_escapes_extension() {
        let options = ChicoryOptions::new(".c+c", ".jsx").unwrap();
        let plugin = ChicoryTransformPlugin::new(options, jsx_compiler()).unwrap();
        assert!(plugin.fragment().include.is_match("/src/a.c+c"));
        assert!(!plugin.fragment().include.is_match("/src/a.ccc"));
        assert!(!plugin.fragment().include.is_match("/src/a.c+c.js"));
    }

    #[test]
    fn test_plugin_factory_picks_variant() {
        use crate::chicory::{plugin, Variant};

        let dual = plugin(Variant::Dual, ChicoryOptions::default(), jsx_compiler()).unwrap();
        let single = plugin(Variant::Transform, ChicoryOptions::default(), jsx_compiler()).unwrap();
        assert_eq!(dual.name(), PLUGIN_NAME);
        assert_eq!(single.enforce(), PluginEnforce::Pre);

        let mut config = HostConfig::new(PathBuf::from("/"));
        dual.config(&mut config).unwrap();
        assert!(config.loaders.is_empty());
        single.config(&mut config).unwrap();
        assert_eq!(config.loaders.len(), 1);
    }
}
