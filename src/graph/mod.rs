mod builder;
mod resolver;

pub use builder::{DependencyGraphBuilder, GraphBuild};
pub use resolver::{normalize_path, ModuleResolver, RESOLVE_EXTENSIONS};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// File-level import graph.
///
/// Nodes are absolute file paths from the discovered set; an edge `a → b`
/// means `a` imports `b`. petgraph keeps incoming adjacency alongside the
/// outgoing lists, which serves as the reverse (importers) index. Cycles are
/// allowed.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// The underlying directed graph
    inner: DiGraph<PathBuf, ()>,

    /// Map from file path to node index
    node_map: HashMap<PathBuf, NodeIndex>,
}

impl DependencyGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file node; adding the same path twice returns the existing node
    pub fn add_file(&mut self, path: &Path) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(path) {
            return idx;
        }
        let idx = self.inner.add_node(path.to_path_buf());
        self.node_map.insert(path.to_path_buf(), idx);
        idx
    }

    /// Record that `from` imports `to`.
    ///
    /// Both files must already be nodes; returns `false` otherwise. Repeated
    /// imports of the same target collapse into one edge.
    pub fn add_import(&mut self, from: &Path, to: &Path) -> bool {
        let (Some(&from_idx), Some(&to_idx)) = (self.node_map.get(from), self.node_map.get(to))
        else {
            return false;
        };
        self.inner.update_edge(from_idx, to_idx, ());
        true
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.node_map.contains_key(path)
    }

    /// Files imported by `path`, sorted
    pub fn imports_of(&self, path: &Path) -> Vec<&Path> {
        self.neighbors(path, Direction::Outgoing)
    }

    /// Files that import `path`, sorted
    pub fn importers_of(&self, path: &Path) -> Vec<&Path> {
        self.neighbors(path, Direction::Incoming)
    }

    fn neighbors(&self, path: &Path, direction: Direction) -> Vec<&Path> {
        let Some(&idx) = self.node_map.get(path) else {
            return Vec::new();
        };
        let mut out: Vec<&Path> = self
            .inner
            .neighbors_directed(idx, direction)
            .map(|n| self.inner[n].as_path())
            .collect();
        out.sort();
        out
    }

    /// All file paths in the graph
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.inner.node_weights().map(PathBuf::as_path)
    }

    pub fn file_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn import_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Get node index for a file path
    pub fn node_index(&self, path: &Path) -> Option<NodeIndex> {
        self.node_map.get(path).copied()
    }

    pub fn path_of(&self, idx: NodeIndex) -> Option<&Path> {
        self.inner.node_weight(idx).map(PathBuf::as_path)
    }

    /// Get the underlying petgraph for traversal and SCC algorithms
    pub fn inner(&self) -> &DiGraph<PathBuf, ()> {
        &self.inner
    }
}
