// Dead cycle detector - finds groups of files that only import each other
//
// A dead cycle is a strongly connected component of two or more files where
// no member is reachable and nothing outside the component imports a member.
// Deleting one of these files alone leaves the rest still "used", so they
// are reported together.

use super::Reachability;
use crate::graph::DependencyGraph;
use petgraph::algo::tarjan_scc;
use petgraph::Direction;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::debug;

/// A closed group of unreachable files
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadCycle {
    /// Member files, sorted
    pub files: Vec<PathBuf>,
}

impl DeadCycle {
    pub fn size(&self) -> usize {
        self.files.len()
    }
}

/// Finds dead cycles in the dependency graph
#[derive(Debug, Default)]
pub struct CycleDetector;

impl CycleDetector {
    pub fn new() -> Self {
        Self
    }

    /// Dead cycles sorted largest first, ties by first member path
    pub fn find_dead_cycles(
        &self,
        graph: &DependencyGraph,
        reachability: &Reachability,
    ) -> Vec<DeadCycle> {
        let inner = graph.inner();
        let mut cycles = Vec::new();

        for scc in tarjan_scc(inner) {
            // Single files are not cycles
            if scc.len() < 2 {
                continue;
            }

            let members: HashSet<_> = scc.iter().copied().collect();

            let any_reachable = scc
                .iter()
                .filter_map(|&idx| graph.path_of(idx))
                .any(|path| reachability.is_reachable(path));
            if any_reachable {
                continue;
            }

            let has_external_importer = scc.iter().any(|&idx| {
                inner
                    .neighbors_directed(idx, Direction::Incoming)
                    .any(|from| !members.contains(&from))
            });
            if has_external_importer {
                continue;
            }

            let mut files: Vec<PathBuf> = scc
                .iter()
                .filter_map(|&idx| graph.path_of(idx))
                .map(|p| p.to_path_buf())
                .collect();
            files.sort();

            debug!("Found dead cycle with {} files: {:?}", files.len(), files);
            cycles.push(DeadCycle { files });
        }

        cycles.sort_by(|a, b| b.size().cmp(&a.size()).then_with(|| a.files.cmp(&b.files)));
        cycles
    }
}
