use crate::analysis::{DeadCycle, IssueKind, IssueRecord, Severity};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Category of a non-fatal problem met during a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    UnreadableFile,
    AnalyzerFailed,
    AnalyzerTimeout,
    WorkerCrashed,
    CacheError,
    EmptyScan,
    Cancelled,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::UnreadableFile => "unreadable-file",
            WarningKind::AnalyzerFailed => "analyzer-failed",
            WarningKind::AnalyzerTimeout => "analyzer-timeout",
            WarningKind::WorkerCrashed => "worker-crashed",
            WarningKind::CacheError => "cache-error",
            WarningKind::EmptyScan => "empty-scan",
            WarningKind::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A problem that did not stop the scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWarning {
    pub kind: WarningKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    pub message: String,
}

impl ScanWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            file: None,
            message: message.into(),
        }
    }

    pub fn for_file(kind: WarningKind, file: &Path, message: impl Into<String>) -> Self {
        Self {
            kind,
            file: Some(file.to_path_buf()),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    pub files_scanned: usize,
    pub unused_imports: usize,
    pub dead_files: usize,
    pub entry_points: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    /// Files that contributed no issues because of a per-file failure
    pub failed_files: usize,
}

/// Aggregated result of one scan
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub stats: ScanStats,

    /// All issues in a total order, see [`IssueRecord::sort_key`]
    pub issues: Vec<IssueRecord>,

    pub warnings: Vec<ScanWarning>,

    /// Groups of dead files that only import each other
    pub dead_cycles: Vec<DeadCycle>,

    /// Set when the scan was cancelled before finishing
    pub incomplete: bool,

    /// Set when no entry point matched and every file was treated as one
    pub entry_point_fallback: bool,
}

impl ScanReport {
    /// Files reported dead, in report order
    pub fn dead_files(&self) -> Vec<&Path> {
        self.issues
            .iter()
            .filter(|i| i.kind == IssueKind::DeadFile)
            .map(|i| i.file.as_path())
            .collect()
    }

    pub fn issues_of_kind<'a>(&'a self, kind: &'a IssueKind) -> impl Iterator<Item = &'a IssueRecord> {
        self.issues.iter().filter(move |i| &i.kind == kind)
    }

    /// Whether any issue is at or above `threshold`
    pub fn has_issues_at(&self, threshold: Severity) -> bool {
        self.issues.iter().any(|i| i.severity >= threshold)
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn warnings_of_kind(&self, kind: WarningKind) -> impl Iterator<Item = &ScanWarning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }
}
