//! A minimal module host that drives a [`PluginContainer`].
//!
//! Stands in for the bundler/dev-server side of the plugin contract: it
//! resolves an entry, loads and transforms every reachable module through the
//! plugins, decides how each body is parsed, and records the module graph.
//!
//! ## Pipeline per module
//!
//! 1. **Load** - `load` hooks, else read the id as a file
//! 2. **Transform** - every `transform` hook in order
//! 3. **Loader** - configured rules, else the id's extension
//! 4. **Imports** - scan and resolve each specifier through the plugins
//!
//! Modules of one breadth-first frontier are processed in parallel.

mod graph;
mod imports;
mod resolve;

pub use graph::{Module, ModuleGraph, ModuleIndex};
pub use imports::{scan_imports, Import};
pub use resolve::{ResolveError, ResolveResult, Resolver};

use crate::plugin::{PluginContainer, PluginError};
use rayon::prelude::*;
use regex_lite::Regex;
use rustc_hash::FxHashSet as HashSet;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// How the host's fast-transform step parses a module body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    Js,
    Jsx,
    Ts,
    Tsx,
    Json,
}

impl Loader {
    /// Loader implied by a file extension (without the dot).
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "js" | "mjs" | "cjs" => Some(Self::Js),
            "jsx" => Some(Self::Jsx),
            "ts" | "mts" | "cts" => Some(Self::Ts),
            "tsx" => Some(Self::Tsx),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Js => "js",
            Self::Jsx => "jsx",
            Self::Ts => "ts",
            Self::Tsx => "tsx",
            Self::Json => "json",
        }
    }
}

/// "Parse ids matching `include` with `loader`."
#[derive(Debug, Clone)]
pub struct LoaderRule {
    pub include: Regex,
    pub loader: Loader,
}

/// Host configuration. Plugins contribute to it through the `config` hook.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Project root; relative entries resolve against it.
    pub root: PathBuf,
    /// Bare specifiers kept out of the graph.
    pub external: Vec<String>,
    /// Loader overrides, consulted before the extension.
    pub loaders: Vec<LoaderRule>,
}

impl HostConfig {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            external: Vec::new(),
            loaders: Vec::new(),
        }
    }

    /// The loader for `id`: the first matching rule, else the extension.
    #[must_use]
    pub fn loader_for(&self, id: &str) -> Option<Loader> {
        if let Some(rule) = self.loaders.iter().find(|r| r.include.is_match(id)) {
            return Some(rule.loader);
        }
        Path::new(id)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Loader::from_extension)
    }
}

/// A build failure. The build produces no output once one occurs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct BuildError {
    /// Stable SCREAMING_SNAKE_CASE code.
    pub code: &'static str,
    pub message: String,
    /// Module the failure is attributed to.
    pub path: Option<String>,
}

impl BuildError {
    fn new(code: &'static str, message: impl Into<String>, path: Option<&str>) -> Self {
        Self {
            code,
            message: message.into(),
            path: path.map(ToString::to_string),
        }
    }

    fn plugin(err: PluginError, fallback_id: Option<&str>) -> Self {
        let path = err.id.clone().or_else(|| fallback_id.map(ToString::to_string));
        Self {
            code: codes::PLUGIN_ERROR,
            message: err.to_string(),
            path,
        }
    }
}

/// Build error codes.
pub mod codes {
    pub const ENTRY_NOT_FOUND: &str = "ENTRY_NOT_FOUND";
    pub const READ_ERROR: &str = "READ_ERROR";
    pub const PLUGIN_ERROR: &str = "PLUGIN_ERROR";
    pub const NO_LOADER: &str = "NO_LOADER";
    pub const UNRESOLVED_IMPORT: &str = "UNRESOLVED_IMPORT";
}

/// Result of a successful build.
#[derive(Debug)]
pub struct BuildOutput {
    /// Resolved id of the entry module.
    pub entry: String,
    pub graph: ModuleGraph,
    /// External ids referenced by the graph, in discovery order.
    pub externals: Vec<String>,
}

/// The module host.
pub struct Host {
    container: PluginContainer,
    config: HostConfig,
}

struct Processed {
    module: Module,
    externals: Vec<String>,
}

impl Host {
    /// Create a host, running every plugin's `config` hook once.
    pub fn new(mut container: PluginContainer, mut config: HostConfig) -> Result<Self, BuildError> {
        container
            .call_config(&mut config)
            .map_err(|e| BuildError::plugin(e, None))?;
        container.set_external(config.external.clone());
        Ok(Self { container, config })
    }

    /// Configuration after the `config` hooks ran.
    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Build the module graph reachable from `entry`.
    ///
    /// `build_end` runs whether or not the graph could be built.
    pub fn build(&self, entry: &Path) -> Result<BuildOutput, BuildError> {
        self.container
            .build_start()
            .map_err(|e| BuildError::plugin(e, None))?;

        let result = self.build_graph(entry);
        let end = self.container.build_end();

        let output = result?;
        end.map_err(|e| BuildError::plugin(e, None))?;
        Ok(output)
    }

    fn build_graph(&self, entry: &Path) -> Result<BuildOutput, BuildError> {
        let entry_path = if entry.is_absolute() {
            entry.to_path_buf()
        } else {
            self.config.root.join(entry)
        };
        let specifier = entry_path.display().to_string();

        let entry_id = self
            .container
            .resolve_id(&specifier, None)
            .map_err(|e| BuildError::plugin(e, Some(&specifier)))?
            .filter(|r| !r.external)
            .map(|r| r.id)
            .ok_or_else(|| {
                BuildError::new(
                    codes::ENTRY_NOT_FOUND,
                    format!("Cannot find entry point: {specifier}"),
                    Some(&specifier),
                )
            })?;

        let mut graph = ModuleGraph::new();
        let mut externals: Vec<String> = Vec::new();
        let mut queued: HashSet<String> = HashSet::default();
        queued.insert(entry_id.clone());
        let mut frontier = vec![entry_id.clone()];

        while !frontier.is_empty() {
            let processed: Vec<Result<Processed, BuildError>> =
                frontier.par_iter().map(|id| self.process(id)).collect();

            let mut next = Vec::new();
            for item in processed {
                let Processed {
                    module,
                    externals: module_externals,
                } = item?;

                for dep in module
                    .dependencies
                    .iter()
                    .chain(&module.dynamic_dependencies)
                {
                    if queued.insert(dep.clone()) {
                        next.push(dep.clone());
                    }
                }
                for ext in module_externals {
                    if !externals.contains(&ext) {
                        externals.push(ext);
                    }
                }
                graph.add(module);
            }
            frontier = next;
        }

        Ok(BuildOutput {
            entry: entry_id,
            graph,
            externals,
        })
    }

    /// Load, transform and scan one module.
    fn process(&self, id: &str) -> Result<Processed, BuildError> {
        let (code, load_map) = match self
            .container
            .load(id)
            .map_err(|e| BuildError::plugin(e, Some(id)))?
        {
            Some(loaded) => (loaded.code, loaded.map),
            None => {
                let code = chicory_util::fs::read_source(Path::new(id)).map_err(|e| {
                    BuildError::new(
                        codes::READ_ERROR,
                        format!("Cannot read {id}: {e}"),
                        Some(id),
                    )
                })?;
                (code, None)
            }
        };

        let transformed = self
            .container
            .transform(&code, id)
            .map_err(|e| BuildError::plugin(e, Some(id)))?;
        let code = transformed.code;
        let map = transformed.map.or(load_map);

        let loader = self.config.loader_for(id).ok_or_else(|| {
            BuildError::new(
                codes::NO_LOADER,
                format!("No loader is configured for {id}"),
                Some(id),
            )
        })?;

        let mut dependencies = Vec::new();
        let mut dynamic_dependencies = Vec::new();
        let mut externals = Vec::new();

        let imports = if loader == Loader::Json {
            Vec::new()
        } else {
            scan_imports(&code)
        };
        for import in imports {
            let resolved = self
                .container
                .resolve_id(&import.specifier, Some(id))
                .map_err(|e| BuildError::plugin(e, Some(id)))?
                .ok_or_else(|| {
                    BuildError::new(
                        codes::UNRESOLVED_IMPORT,
                        format!("Cannot resolve '{}' from '{id}'", import.specifier),
                        Some(id),
                    )
                })?;

            if resolved.external {
                externals.push(resolved.id);
            } else if import.dynamic {
                dynamic_dependencies.push(resolved.id);
            } else {
                dependencies.push(resolved.id);
            }
        }

        let hash = chicory_util::hash::blake3_bytes(code.as_bytes());
        Ok(Processed {
            module: Module {
                id: id.to_string(),
                code,
                map,
                loader,
                hash,
                dependencies,
                dynamic_dependencies,
            },
            externals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{HookContext, HookResult, LoadResult, Plugin, ResolveIdResult};
    use tempfile::tempdir;

    /// Serves `virtual:answer` from memory.
    struct Answer;

    impl Plugin for Answer {
        fn name(&self) -> &str {
            "answer"
        }

        fn resolve_id(
            &self,
            specifier: &str,
            _importer: Option<&str>,
            _ctx: &HookContext<'_>,
        ) -> HookResult<Option<ResolveIdResult>> {
            Ok((specifier == "virtual:answer").then(|| ResolveIdResult::resolved("\0answer.js")))
        }

        fn load(&self, id: &str, _ctx: &HookContext<'_>) -> HookResult<Option<LoadResult>> {
            Ok((id == "\0answer.js").then(|| LoadResult::code("export default 42;")))
        }
    }

    fn host_in(root: &Path, plugins: Vec<Box<dyn Plugin>>) -> Host {
        let mut container = PluginContainer::new(root.to_path_buf());
        for plugin in plugins {
            container.add(plugin);
        }
        let mut config = HostConfig::new(root.to_path_buf());
        config.external = vec!["react".to_string()];
        Host::new(container, config).unwrap()
    }

    #[test]
    fn test_loader_for_rules_then_extension() {
        let mut config = HostConfig::new(PathBuf::from("/"));
        assert_eq!(config.loader_for("/a/b.tsx"), Some(Loader::Tsx));
        assert_eq!(config.loader_for("/a/b.chic"), None);

        config.loaders.push(LoaderRule {
            include: Regex::new(r"\.chic$").unwrap(),
            loader: Loader::Jsx,
        });
        assert_eq!(config.loader_for("/a/b.chic"), Some(Loader::Jsx));
        assert_eq!(config.loader_for("/a/b.js"), Some(Loader::Js));
    }

    #[test]
    fn test_build_walks_graph() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("main.js"),
            "import React from 'react';\nimport answer from 'virtual:answer';\nimport { f } from './lib.js';\nconst lazy = () => import('./lazy.js');",
        )
        .unwrap();
        std::fs::write(dir.path().join("lib.js"), "export const f = 1;").unwrap();
        std::fs::write(dir.path().join("lazy.js"), "export default 2;").unwrap();

        let host = host_in(dir.path(), vec![Box::new(Answer)]);
        let output = host.build(Path::new("main.js")).unwrap();

        assert_eq!(output.graph.len(), 4);
        assert_eq!(output.externals, vec!["react".to_string()]);
        assert_eq!(
            output.graph.get("\0answer.js").unwrap().code,
            "export default 42;"
        );

        let entry = output.graph.get(&output.entry).unwrap();
        assert_eq!(entry.loader, Loader::Js);
        assert_eq!(entry.dependencies.len(), 2);
        assert_eq!(entry.dynamic_dependencies.len(), 1);
        assert!(entry.dynamic_dependencies[0].ends_with("lazy.js"));
    }

    #[test]
    fn test_unresolved_import_aborts() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("main.js"), "import './missing.js';").unwrap();

        let host = host_in(dir.path(), Vec::new());
        let err = host.build(Path::new("main.js")).unwrap_err();
        assert_eq!(err.code, codes::UNRESOLVED_IMPORT);
        assert!(err.message.contains("./missing.js"));
    }

    #[test]
    fn test_missing_entry() {
        let dir = tempdir().unwrap();
        let host = host_in(dir.path(), Vec::new());
        let err = host.build(Path::new("nope.js")).unwrap_err();
        assert_eq!(err.code, codes::ENTRY_NOT_FOUND);
    }
}
