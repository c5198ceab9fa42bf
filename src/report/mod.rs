mod json;
mod terminal;

pub use json::JsonReporter;
pub use terminal::TerminalReporter;

use crate::scan::ScanReport;
use miette::Result;
use std::path::{Path, PathBuf};

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Terminal,
    Json,
}

/// Renders a [`ScanReport`] in the selected format
pub struct Reporter {
    format: ReportFormat,
    output_path: Option<PathBuf>,
    root: PathBuf,
}

impl Reporter {
    /// Paths in the output are shown relative to `root`
    pub fn new(format: ReportFormat, output_path: Option<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            format,
            output_path,
            root: root.into(),
        }
    }

    pub fn report(&self, report: &ScanReport) -> Result<()> {
        match self.format {
            ReportFormat::Terminal => TerminalReporter::new(&self.root).report(report),
            ReportFormat::Json => JsonReporter::new(self.output_path.clone(), &self.root).report(report),
        }
    }
}

/// Path relative to the project root, falling back to the absolute path
pub(crate) fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
