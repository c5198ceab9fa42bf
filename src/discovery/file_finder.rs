use crate::cache::content_hash;
use crate::config::Config;
use glob::Pattern;
use ignore::WalkBuilder;
use miette::{miette, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// A discovered source file with its text already loaded.
///
/// Reading happens once during discovery; a file that cannot be read keeps
/// its place in the scan with `text == None` and the read error recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path to the file
    pub path: PathBuf,

    text: Option<String>,
    content_hash: Option<String>,
    read_error: Option<String>,
}

impl SourceFile {
    /// Build a file from text already in memory
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            path: path.into(),
            content_hash: Some(content_hash(&text)),
            text: Some(text),
            read_error: None,
        }
    }

    /// A file that was discovered but could not be read
    pub fn unreadable(path: impl Into<PathBuf>, error: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: None,
            content_hash: None,
            read_error: Some(error.into()),
        }
    }

    /// Read a file from disk; failures become an unreadable file
    pub fn read(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_text(path, text),
            Err(e) => {
                debug!("Failed to read {}: {}", path.display(), e);
                Self::unreadable(path, e.to_string())
            }
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Hex SHA-256 of the text
    pub fn content_hash(&self) -> Option<&str> {
        self.content_hash.as_deref()
    }

    pub fn read_error(&self) -> Option<&str> {
        self.read_error.as_deref()
    }
}

/// File finder for discovering JS/TS sources in a project
pub struct FileFinder {
    include: Vec<Pattern>,
    ignore: Vec<Pattern>,
}

impl FileFinder {
    pub fn new(config: &Config) -> Self {
        Self {
            include: compile_patterns(&config.include),
            ignore: compile_patterns(&config.ignore),
        }
    }

    /// Find and read every matching file under `root`, sorted by path
    pub fn find_files(&self, root: &Path) -> Result<Vec<SourceFile>> {
        if !root.is_dir() {
            return Err(miette!("Not a directory: {}", root.display()));
        }
        debug!("Scanning for files in: {}", root.display());

        let paths = self.find_paths(root);

        let mut files: Vec<SourceFile> = paths.par_iter().map(|p| SourceFile::read(p)).collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));

        debug!("Found {} files", files.len());
        Ok(files)
    }

    /// Walk `root` and return matching paths without reading them
    pub fn find_paths(&self, root: &Path) -> Vec<PathBuf> {
        let walker = WalkBuilder::new(root)
            .hidden(true)           // Skip hidden files
            .git_ignore(true)       // Respect .gitignore
            .git_global(true)       // Respect global gitignore
            .git_exclude(true)      // Respect .git/info/exclude
            .ignore(true)           // Respect .ignore files
            .parents(true)          // Check parent directories for ignore files
            .follow_links(false)    // Don't follow symlinks
            .build();

        walker
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| {
                let path = entry.path();
                let relative = path.strip_prefix(root).unwrap_or(path);

                if self.is_ignored(relative) {
                    trace!("Excluding: {}", path.display());
                    return None;
                }
                if !self.is_included(relative) {
                    return None;
                }

                trace!("Found: {}", path.display());
                Some(path.to_path_buf())
            })
            .collect()
    }

    /// Whether a root-relative path passes the include patterns
    pub fn is_included(&self, relative: &Path) -> bool {
        self.include.iter().any(|p| p.matches_path(relative))
    }

    /// Whether a root-relative path matches an ignore pattern
    pub fn is_ignored(&self, relative: &Path) -> bool {
        self.ignore.iter().any(|p| p.matches_path(relative))
    }
}

fn compile_patterns(patterns: &[String]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|raw| match Pattern::new(raw) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("Invalid glob pattern '{}': {}", raw, e);
                None
            }
        })
        .collect()
}
