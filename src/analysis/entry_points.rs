use crate::graph::RESOLVE_EXTENSIONS;
use glob::Pattern;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Conventional entry file stems
const ENTRY_STEMS: &[&str] = &["index", "main", "app", "server"];

/// Directory names whose files are executables
const ENTRY_DIRS: &[&str] = &["bin", "cli"];

/// Files treated as roots for reachability
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPointSet {
    paths: BTreeSet<PathBuf>,
    fallback: bool,
}

impl EntryPointSet {
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// True when no file matched and every file was promoted to an entry point
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

/// Classifies files as entry points by name and location
#[derive(Debug, Default)]
pub struct EntryPointDetector {
    root: Option<PathBuf>,
    patterns: Vec<Pattern>,
}

impl EntryPointDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory segments and configured globs are matched relative to `root`
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Add glob patterns whose matches are always entry points
    pub fn with_patterns(mut self, patterns: &[String]) -> Self {
        for raw in patterns {
            match Pattern::new(raw) {
                Ok(p) => self.patterns.push(p),
                Err(e) => warn!("Invalid entry point pattern '{}': {}", raw, e),
            }
        }
        self
    }

    /// Select entry points from `files`.
    ///
    /// If nothing matches, every file becomes an entry point so that an
    /// unconventional layout never produces dead-file reports.
    pub fn detect<'p>(&self, files: impl IntoIterator<Item = &'p Path>) -> EntryPointSet {
        let all: Vec<&Path> = files.into_iter().collect();

        let paths: BTreeSet<PathBuf> = all
            .iter()
            .filter(|p| self.is_entry_point(p))
            .map(|p| {
                debug!("Entry point: {}", p.display());
                p.to_path_buf()
            })
            .collect();

        if paths.is_empty() && !all.is_empty() {
            info!(
                "No entry points matched; treating all {} files as entry points",
                all.len()
            );
            return EntryPointSet {
                paths: all.iter().map(|p| p.to_path_buf()).collect(),
                fallback: true,
            };
        }

        info!("Detected {} entry points", paths.len());
        EntryPointSet {
            paths,
            fallback: false,
        }
    }

    /// Whether a single file matches any entry point rule
    pub fn is_entry_point(&self, path: &Path) -> bool {
        let relative = self
            .root
            .as_deref()
            .and_then(|root| path.strip_prefix(root).ok())
            .unwrap_or(path);

        is_conventional_name(relative)
            || is_test_file(relative)
            || in_entry_dir(relative)
            || self.patterns.iter().any(|p| p.matches_path(relative))
    }
}

fn is_conventional_name(path: &Path) -> bool {
    let stem = path.file_stem().and_then(|s| s.to_str());
    let ext = path.extension().and_then(|e| e.to_str());
    match (stem, ext) {
        (Some(stem), Some(ext)) => ENTRY_STEMS.contains(&stem) && RESOLVE_EXTENSIONS.contains(&ext),
        _ => false,
    }
}

fn is_test_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if name.contains(".test.") || name.contains(".spec.") {
        return true;
    }
    path.components()
        .any(|c| matches!(c, Component::Normal(s) if s == "__tests__"))
}

fn in_entry_dir(path: &Path) -> bool {
    // Directory segments only; the file name itself is excluded
    let Some(parent) = path.parent() else {
        return false;
    };
    parent.components().any(|c| match c {
        Component::Normal(s) => s.to_str().map(|s| ENTRY_DIRS.contains(&s)).unwrap_or(false),
        _ => false,
    })
}
