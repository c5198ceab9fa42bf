use super::{EntryPointSet, IssueKind, IssueRecord};
use crate::graph::DependencyGraph;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Message carried by every dead-file issue
pub const DEAD_FILE_MESSAGE: &str = "file is never imported by any other file";

/// Outcome of one traversal
#[derive(Debug, Clone, Default)]
pub struct Reachability {
    pub reachable: HashSet<PathBuf>,
    /// Files never visited, sorted
    pub dead: Vec<PathBuf>,
}

impl Reachability {
    pub fn is_reachable(&self, path: &Path) -> bool {
        self.reachable.contains(path)
    }

    /// One dead-file issue per unvisited file
    pub fn dead_file_issues(&self) -> Vec<IssueRecord> {
        self.dead
            .iter()
            .map(|path| IssueRecord::new(IssueKind::DeadFile, path, DEAD_FILE_MESSAGE))
            .collect()
    }
}

/// Marks files transitively imported from the entry points
#[derive(Debug, Default)]
pub struct ReachabilityAnalyzer;

impl ReachabilityAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Breadth-first traversal over forward edges from every entry point.
    ///
    /// Each node is enqueued at most once, so cycles terminate.
    pub fn analyze(&self, graph: &DependencyGraph, entry_points: &EntryPointSet) -> Reachability {
        let inner = graph.inner();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        for entry in entry_points.iter() {
            if let Some(idx) = graph.node_index(entry) {
                if visited.insert(idx) {
                    queue.push_back(idx);
                }
            }
        }

        while let Some(idx) = queue.pop_front() {
            for next in inner.neighbors(idx) {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        let reachable: HashSet<PathBuf> = visited
            .iter()
            .filter_map(|&idx| graph.path_of(idx))
            .map(Path::to_path_buf)
            .collect();

        let mut dead: Vec<PathBuf> = graph
            .files()
            .filter(|path| !reachable.contains(*path))
            .map(|path| {
                debug!("Unreachable: {}", path.display());
                path.to_path_buf()
            })
            .collect();

        // Sort for consistent output
        dead.sort();

        Reachability { reachable, dead }
    }
}
