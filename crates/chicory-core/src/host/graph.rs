//! Module graph built by the host.

use super::Loader;
use rustc_hash::FxHashMap as HashMap;

/// Index of a module in the graph.
pub type ModuleIndex = usize;

/// A loaded module.
#[derive(Debug, Clone)]
pub struct Module {
    /// Module id as resolved (may carry a plugin's marker suffix).
    pub id: String,
    /// Final module body after load and transform hooks.
    pub code: String,
    /// Source map produced by the load/transform hooks, if any.
    pub map: Option<String>,
    /// How the host parses the body.
    pub loader: Loader,
    /// BLAKE3 of `code`.
    pub hash: String,
    /// Resolved ids of static imports.
    pub dependencies: Vec<String>,
    /// Resolved ids of dynamic imports.
    pub dynamic_dependencies: Vec<String>,
}

/// The module graph, in discovery order.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    modules: Vec<Module>,
    id_to_index: HashMap<String, ModuleIndex>,
}

impl ModuleGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module, returning its index. Re-adding an id replaces the module.
    pub fn add(&mut self, module: Module) -> ModuleIndex {
        if let Some(&index) = self.id_to_index.get(&module.id) {
            self.modules[index] = module;
            return index;
        }
        let index = self.modules.len();
        self.id_to_index.insert(module.id.clone(), index);
        self.modules.push(module);
        index
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Module> {
        self.id_to_index.get(id).map(|&i| &self.modules[i])
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.id_to_index.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(id: &str, code: &str) -> Module {
        Module {
            id: id.to_string(),
            code: code.to_string(),
            map: None,
            loader: Loader::Js,
            hash: String::new(),
            dependencies: Vec::new(),
            dynamic_dependencies: Vec::new(),
        }
    }

    #[test]
    fn test_add_dedupes_by_id() {
        let mut graph = ModuleGraph::new();
        assert_eq!(graph.add(module("/a.js", "1")), 0);
        assert_eq!(graph.add(module("/b.js", "2")), 1);
        assert_eq!(graph.add(module("/a.js", "3")), 0);

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.get("/a.js").unwrap().code, "3");
        assert!(graph.contains("/b.js"));
        assert!(!graph.contains("/c.js"));
    }
}
