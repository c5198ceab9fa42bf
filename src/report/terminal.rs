use super::display_path;
use crate::analysis::{IssueRecord, Severity};
use crate::scan::ScanReport;
use colored::Colorize;
use miette::Result;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Terminal reporter with colored output
pub struct TerminalReporter {
    root: PathBuf,
}

impl TerminalReporter {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn report(&self, report: &ScanReport) -> Result<()> {
        print!("{}", self.render(report));
        Ok(())
    }

    pub fn render(&self, report: &ScanReport) -> String {
        let mut out = String::new();

        if report.incomplete {
            let _ = writeln!(out, "{}", "Scan was interrupted; results are partial.".red().bold());
            let _ = writeln!(out);
        }

        if report.issues.is_empty() {
            let _ = writeln!(out, "{}", "No issues found!".green().bold());
        } else {
            self.render_issues(&mut out, report);
        }

        self.render_cycles(&mut out, report);
        self.render_warnings(&mut out, report);
        self.render_summary(&mut out, report);
        out
    }

    fn render_issues(&self, out: &mut String, report: &ScanReport) {
        // Group by file, issues keep their report order
        let mut by_file: BTreeMap<&Path, Vec<&IssueRecord>> = BTreeMap::new();
        for issue in &report.issues {
            by_file.entry(issue.file.as_path()).or_default().push(issue);
        }

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{}",
            format!("Found {} issues:", report.issues.len()).yellow().bold()
        );
        let _ = writeln!(out);

        for (file, issues) in by_file {
            let _ = writeln!(out, "{}", display_path(file, &self.root).cyan().bold());
            for issue in issues {
                self.render_issue(out, issue);
            }
            let _ = writeln!(out);
        }
    }

    fn render_issue(&self, out: &mut String, issue: &IssueRecord) {
        let severity_str = match issue.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Info => "info".blue().bold(),
        };

        let location = match issue.line {
            Some(line) => format!("{:>4}", line),
            None => "   -".to_string(),
        };

        let flavor = match &issue.flavor {
            Some(flavor) => format!(" ({})", flavor).dimmed().to_string(),
            None => String::new(),
        };

        let _ = writeln!(
            out,
            "  {} {} [{}] {}{}",
            location.dimmed(),
            severity_str,
            issue.kind.code().dimmed(),
            issue.message,
            flavor
        );
    }

    fn render_cycles(&self, out: &mut String, report: &ScanReport) {
        if report.dead_cycles.is_empty() {
            return;
        }
        let _ = writeln!(
            out,
            "{}",
            format!("{} dead import cycles:", report.dead_cycles.len()).yellow()
        );
        for cycle in &report.dead_cycles {
            let members: Vec<String> = cycle
                .files
                .iter()
                .map(|f| display_path(f, &self.root))
                .collect();
            let _ = writeln!(out, "  {} {}", "↻".dimmed(), members.join(" → "));
        }
        let _ = writeln!(out);
    }

    fn render_warnings(&self, out: &mut String, report: &ScanReport) {
        if report.warnings.is_empty() {
            return;
        }
        let _ = writeln!(out, "{}", format!("{} warnings:", report.warnings.len()).yellow());
        for warning in &report.warnings {
            let file = warning
                .file
                .as_deref()
                .map(|f| format!("{}: ", display_path(f, &self.root)))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "  {} {}{}",
                format!("[{}]", warning.kind).dimmed(),
                file,
                warning.message
            );
        }
        let _ = writeln!(out);
    }

    fn render_summary(&self, out: &mut String, report: &ScanReport) {
        let stats = &report.stats;
        let _ = writeln!(out, "{}", "─".repeat(60).dimmed());

        let mut parts = Vec::new();
        let errors = report.count_by_severity(Severity::Error);
        let warnings = report.count_by_severity(Severity::Warning);
        let infos = report.count_by_severity(Severity::Info);
        if errors > 0 {
            parts.push(format!("{} errors", errors).red().to_string());
        }
        if warnings > 0 {
            parts.push(format!("{} warnings", warnings).yellow().to_string());
        }
        if infos > 0 {
            parts.push(format!("{} info", infos).blue().to_string());
        }
        if !parts.is_empty() {
            let _ = writeln!(out, "Summary: {}", parts.join(", "));
        }

        let _ = writeln!(
            out,
            "Files scanned: {}  Unused imports: {}  Dead files: {}",
            stats.files_scanned, stats.unused_imports, stats.dead_files
        );
        let _ = writeln!(
            out,
            "{}",
            format!(
                "Entry points: {}{}  Cache: {} hits, {} misses",
                stats.entry_points,
                if report.entry_point_fallback { " (fallback: all files)" } else { "" },
                stats.cache_hits,
                stats.cache_misses
            )
            .dimmed()
        );
    }
}
