mod cycles;
mod entry_points;
mod reachability;
pub mod detectors;

pub use cycles::{CycleDetector, DeadCycle};
pub use entry_points::{EntryPointDetector, EntryPointSet};
pub use reachability::{ReachabilityAnalyzer, Reachability, DEAD_FILE_MESSAGE};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A per-file analysis step run by the worker pool.
///
/// Implementations receive the file's text and absolute path and return the
/// issues they found. Returning `Err` marks only this analyzer as failed for
/// the file; other analyzers registered in the same pool still contribute.
pub trait Analyzer: Send + Sync {
    /// Stable name, used in warnings and in the cache fingerprint
    fn name(&self) -> &str;

    /// Analyze one file
    fn analyze(&self, text: &str, path: &Path) -> anyhow::Result<Vec<IssueRecord>>;
}

/// Kind of issue reported by the scanner
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    /// File is not reachable from any entry point
    DeadFile,

    /// Imported binding is never referenced in the file
    UnusedImport,

    /// Issue produced by an externally registered analyzer
    External(String),
}

impl IssueKind {
    pub fn as_str(&self) -> &str {
        match self {
            IssueKind::DeadFile => "dead-file",
            IssueKind::UnusedImport => "unused-import",
            IssueKind::External(name) => name,
        }
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            IssueKind::DeadFile => Severity::Warning,
            IssueKind::UnusedImport => Severity::Info,
            IssueKind::External(_) => Severity::Warning,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            IssueKind::DeadFile => "SX001",
            IssueKind::UnusedImport => "SX002",
            IssueKind::External(_) => "SX100",
        }
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity levels for issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single issue found in a file.
///
/// Every analyzer emits this shape. Records are immutable once produced and
/// are owned by the [`crate::scan::ScanReport`] they end up in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueRecord {
    pub kind: IssueKind,

    /// Absolute path of the file the issue belongs to
    pub file: PathBuf,

    /// 1-based line, when the issue points at a statement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    /// Offending identifier, when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,

    pub message: String,

    pub severity: Severity,

    /// Language flavor marker (e.g. `typescript` for type-only imports)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor: Option<String>,
}

impl IssueRecord {
    pub fn new(kind: IssueKind, file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        let severity = kind.default_severity();
        Self {
            kind,
            file: file.into(),
            line: None,
            symbol: None,
            message: message.into(),
            severity,
            flavor: None,
        }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_flavor(mut self, flavor: impl Into<String>) -> Self {
        self.flavor = Some(flavor.into());
        self
    }

    /// Total order used to make reports independent of worker completion order
    pub fn sort_key(&self) -> (&Path, &IssueKind, usize, Option<&str>, &str) {
        (
            self.file.as_path(),
            &self.kind,
            self.line.unwrap_or(0),
            self.symbol.as_deref(),
            self.message.as_str(),
        )
    }
}
