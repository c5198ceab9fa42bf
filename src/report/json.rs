use super::display_path;
use crate::analysis::Severity;
use crate::scan::{ScanReport, ScanStats};
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// JSON reporter for programmatic output
pub struct JsonReporter {
    output_path: Option<PathBuf>,
    root: PathBuf,
}

impl JsonReporter {
    pub fn new(output_path: Option<PathBuf>, root: &Path) -> Self {
        Self {
            output_path,
            root: root.to_path_buf(),
        }
    }

    pub fn report(&self, report: &ScanReport) -> Result<()> {
        let json = self.render(report)?;

        if let Some(path) = &self.output_path {
            std::fs::write(path, &json)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to write report to {}", path.display()))?;
            eprintln!("Report written to: {}", path.display());
        } else {
            println!("{}", json);
        }

        Ok(())
    }

    /// Pretty-printed JSON document for a report
    pub fn render(&self, report: &ScanReport) -> Result<String> {
        let doc = JsonReport::from_scan(report, &self.root);
        serde_json::to_string_pretty(&doc).into_diagnostic()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    version: &'static str,
    stats: &'a ScanStats,
    incomplete: bool,
    entry_point_fallback: bool,
    issues: Vec<JsonIssue<'a>>,
    warnings: Vec<JsonWarning<'a>>,
    dead_cycles: Vec<Vec<String>>,
    summary: JsonSummary,
}

#[derive(Serialize)]
struct JsonIssue<'a> {
    code: &'static str,
    kind: &'a str,
    severity: &'static str,
    message: &'a str,
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    symbol: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flavor: Option<&'a str>,
}

#[derive(Serialize)]
struct JsonWarning<'a> {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    message: &'a str,
}

#[derive(Serialize)]
struct JsonSummary {
    errors: usize,
    warnings: usize,
    infos: usize,
}

impl<'a> JsonReport<'a> {
    fn from_scan(report: &'a ScanReport, root: &Path) -> Self {
        let issues = report
            .issues
            .iter()
            .map(|issue| JsonIssue {
                code: issue.kind.code(),
                kind: issue.kind.as_str(),
                severity: issue.severity.as_str(),
                message: &issue.message,
                file: display_path(&issue.file, root),
                line: issue.line,
                symbol: issue.symbol.as_deref(),
                flavor: issue.flavor.as_deref(),
            })
            .collect();

        let warnings = report
            .warnings
            .iter()
            .map(|w| JsonWarning {
                kind: w.kind.as_str(),
                file: w.file.as_deref().map(|f| display_path(f, root)),
                message: &w.message,
            })
            .collect();

        let dead_cycles = report
            .dead_cycles
            .iter()
            .map(|c| c.files.iter().map(|f| display_path(f, root)).collect())
            .collect();

        Self {
            version: env!("CARGO_PKG_VERSION"),
            stats: &report.stats,
            incomplete: report.incomplete,
            entry_point_fallback: report.entry_point_fallback,
            issues,
            warnings,
            dead_cycles,
            summary: JsonSummary {
                errors: report.count_by_severity(Severity::Error),
                warnings: report.count_by_severity(Severity::Warning),
                infos: report.count_by_severity(Severity::Info),
            },
        }
    }
}
