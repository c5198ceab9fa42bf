// Sequential dependency graph construction.
//
// Runs single-threaded: every edge must be in place before reachability
// starts, and the graph is never shared with workers.

use super::{DependencyGraph, ModuleResolver};
use crate::discovery::SourceFile;
use crate::parser::ImportExtractor;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, trace};

/// Result of building the graph over one file set
#[derive(Debug, Default)]
pub struct GraphBuild {
    pub graph: DependencyGraph,

    /// Local specifiers that matched no discovered file, as `(importer, specifier)`
    pub unresolved: Vec<(PathBuf, String)>,

    /// Files whose text was unavailable; they are nodes without outgoing edges
    pub unreadable: Vec<PathBuf>,
}

/// Builds a [`DependencyGraph`] from discovered files
pub struct DependencyGraphBuilder<'e> {
    extractor: &'e dyn ImportExtractor,
}

impl<'e> DependencyGraphBuilder<'e> {
    pub fn new(extractor: &'e dyn ImportExtractor) -> Self {
        Self { extractor }
    }

    pub fn build(&self, files: &[SourceFile]) -> GraphBuild {
        info!("Building dependency graph over {} files...", files.len());

        let known: HashSet<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
        let resolver = ModuleResolver::new(&known);

        let mut build = GraphBuild::default();

        // Every discovered file is a node, readable or not
        for file in files {
            build.graph.add_file(&file.path);
        }

        for file in files {
            let Some(text) = file.text() else {
                debug!("No text for {}, skipping its imports", file.path.display());
                build.unreadable.push(file.path.clone());
                continue;
            };

            for reference in self.extractor.references(&file.path, text) {
                if !reference.is_local() {
                    continue;
                }
                match resolver.resolve(&reference.specifier, &file.path) {
                    Some(target) => {
                        trace!("{} -> {}", file.path.display(), target.display());
                        build.graph.add_import(&file.path, &target);
                    }
                    None => {
                        trace!(
                            "Unresolved '{}' in {}",
                            reference.specifier,
                            file.path.display()
                        );
                        build.unresolved.push((file.path.clone(), reference.specifier));
                    }
                }
            }
        }

        info!(
            "Dependency graph: {} files, {} imports, {} unresolved",
            build.graph.file_count(),
            build.graph.import_count(),
            build.unresolved.len()
        );

        build
    }
}
