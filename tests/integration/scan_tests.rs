//! End-to-end scan tests
//!
//! Each test lays out a small project in a temp directory and runs the full
//! pipeline: discovery, worker pool, cache, graph and reachability.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sweepstacx::analysis::{Analyzer, IssueKind, IssueRecord, Severity};
use sweepstacx::config::Config;
use sweepstacx::discovery::SourceFile;
use sweepstacx::scan::{CancellationToken, ScanReport, Scanner, WarningKind};
use tempfile::TempDir;

fn project(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    for (rel, text) in files {
        write(&root, rel, text);
    }
    (dir, root)
}

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn no_cache() -> Config {
    let mut config = Config::default();
    config.cache.enabled = false;
    config
}

fn unused_symbols(report: &ScanReport) -> Vec<(String, String)> {
    report
        .issues_of_kind(&IssueKind::UnusedImport)
        .map(|i| {
            (
                i.file.file_name().unwrap().to_string_lossy().into_owned(),
                i.symbol.clone().unwrap_or_default(),
            )
        })
        .collect()
}

/// Counts calls and reports nothing
struct Counting(Arc<AtomicUsize>);

impl Analyzer for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    fn analyze(&self, _text: &str, _path: &Path) -> anyhow::Result<Vec<IssueRecord>> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

/// Fails on files whose name starts with `bad`
struct FailsOnBad;

impl Analyzer for FailsOnBad {
    fn name(&self) -> &str {
        "fails-on-bad"
    }

    fn analyze(&self, _text: &str, path: &Path) -> anyhow::Result<Vec<IssueRecord>> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.starts_with("bad") {
            anyhow::bail!("cannot handle {}", name);
        }
        Ok(vec![IssueRecord::new(
            IssueKind::External("fails-on-bad".to_string()),
            path,
            "checked",
        )])
    }
}

/// Panics on files whose name starts with `boom`
struct PanicsOnBoom;

impl Analyzer for PanicsOnBoom {
    fn name(&self) -> &str {
        "panics-on-boom"
    }

    fn analyze(&self, _text: &str, path: &Path) -> anyhow::Result<Vec<IssueRecord>> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.starts_with("boom") {
            panic!("analyzer blew up on {}", name);
        }
        Ok(Vec::new())
    }
}

/// Flags every file as an error-level finding
struct Strict;

impl Analyzer for Strict {
    fn name(&self) -> &str {
        "strict"
    }

    fn analyze(&self, _text: &str, path: &Path) -> anyhow::Result<Vec<IssueRecord>> {
        Ok(vec![IssueRecord::new(IssueKind::External("strict".to_string()), path, "forbidden")
            .with_severity(Severity::Error)])
    }
}

/// Hangs on files whose name starts with `stuck`
struct HangsOnStuck;

impl Analyzer for HangsOnStuck {
    fn name(&self) -> &str {
        "hangs-on-stuck"
    }

    fn analyze(&self, _text: &str, path: &Path) -> anyhow::Result<Vec<IssueRecord>> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.starts_with("stuck") {
            std::thread::sleep(Duration::from_secs(10));
        }
        Ok(Vec::new())
    }
}

// ============================================================================
// Issue detection
// ============================================================================

#[test]
fn test_unused_named_import_is_reported() {
    let (_dir, root) = project(&[(
        "index.js",
        "import { join } from 'node:path';\nconsole.log('hello');\n",
    )]);

    let report = Scanner::new(&root, no_cache()).scan().unwrap();

    let issues: Vec<_> = report.issues_of_kind(&IssueKind::UnusedImport).collect();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].symbol.as_deref(), Some("join"));
    assert_eq!(issues[0].line, Some(1));
    assert_eq!(issues[0].file, root.join("index.js"));
    assert_eq!(report.stats.unused_imports, 1);
}

#[test]
fn test_used_import_is_not_reported() {
    let (_dir, root) = project(&[(
        "index.js",
        "import { join } from 'node:path';\nconsole.log(join('a', 'b'));\n",
    )]);

    let report = Scanner::new(&root, no_cache()).scan().unwrap();

    assert_eq!(report.stats.unused_imports, 0);
    assert!(report.issues.is_empty());
}

#[test]
fn test_index_used_dead_project() {
    let (_dir, root) = project(&[
        ("index.js", "import { used } from './used';\nused();\n"),
        ("used.js", "export const used = () => 1;\n"),
        ("dead.js", "export const dead = () => 2;\n"),
    ]);

    let report = Scanner::new(&root, no_cache()).scan().unwrap();

    assert_eq!(report.stats.files_scanned, 3);
    assert_eq!(report.dead_files(), vec![root.join("dead.js").as_path()]);
    assert_eq!(report.stats.dead_files, 1);
    assert!(unused_symbols(&report).is_empty());
    assert!(!report.incomplete);
}

#[test]
fn test_mixed_project_reports_both_kinds() {
    let (_dir, root) = project(&[
        (
            "src/main.ts",
            "import React from 'react';\nimport { format, parse } from './date';\nformat(new Date());\n",
        ),
        ("src/date.ts", "export const format = (d) => d;\nexport const parse = (s) => s;\n"),
        ("src/legacy/old.ts", "import { format } from '../date';\nexport default format;\n"),
    ]);

    let report = Scanner::new(&root, no_cache()).scan().unwrap();

    let mut unused = unused_symbols(&report);
    unused.sort();
    assert_eq!(
        unused,
        vec![
            ("main.ts".to_string(), "React".to_string()),
            ("main.ts".to_string(), "parse".to_string()),
        ]
    );
    assert_eq!(report.dead_files(), vec![root.join("src/legacy/old.ts").as_path()]);
}

#[test]
fn test_import_cycle_with_entry_point_completes() {
    let (_dir, root) = project(&[
        ("index.js", "import './a';\n"),
        ("a.js", "import { b } from './b';\nexport const a = () => b();\n"),
        ("b.js", "import { a } from './a';\nexport const b = () => a();\n"),
    ]);

    let report = Scanner::new(&root, no_cache()).scan().unwrap();

    assert!(report.dead_files().is_empty());
    assert!(report.dead_cycles.is_empty());
}

#[test]
fn test_no_entry_points_falls_back() {
    let (_dir, root) = project(&[
        ("lib/a.js", "export const a = 1;\n"),
        ("lib/b.js", "export const b = 2;\n"),
    ]);

    let report = Scanner::new(&root, no_cache()).scan().unwrap();

    assert!(report.entry_point_fallback);
    assert_eq!(report.stats.entry_points, 2);
    assert!(report.dead_files().is_empty());
}

#[test]
fn test_ignored_directories_are_not_scanned() {
    let (_dir, root) = project(&[
        ("index.js", "import x from 'lodash';\nx();\n"),
        ("node_modules/lodash/index.js", "module.exports = {};\n"),
        ("dist/bundle.js", "console.log(1);\n"),
    ]);

    let report = Scanner::new(&root, no_cache()).scan().unwrap();

    assert_eq!(report.stats.files_scanned, 1);
    assert!(report.issues.is_empty());
}

#[test]
fn test_empty_project_warns() {
    let (_dir, root) = project(&[("README.md", "# nothing here\n")]);

    let report = Scanner::new(&root, no_cache()).scan().unwrap();

    assert_eq!(report.stats.files_scanned, 0);
    assert_eq!(report.warnings_of_kind(WarningKind::EmptyScan).count(), 1);
}

#[test]
fn test_missing_root_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");

    assert!(Scanner::new(&missing, no_cache()).scan().is_err());
}

#[test]
fn test_issue_order_is_deterministic() {
    let files: Vec<(String, String)> = (0..20)
        .map(|i| {
            (
                format!("src/mod{i:02}.js"),
                "import { a, b } from 'x';\nimport c from 'y';\n".to_string(),
            )
        })
        .collect();
    let refs: Vec<(&str, &str)> = files.iter().map(|(p, t)| (p.as_str(), t.as_str())).collect();
    let (_dir, root) = project(&refs);

    let mut config = no_cache();
    config.max_workers = Some(4);
    let scanner = Scanner::new(&root, config);

    let first = scanner.scan().unwrap();
    let second = scanner.scan().unwrap();
    assert_eq!(first.issues, second.issues);
    assert_eq!(first.stats.unused_imports, 60);
}

// ============================================================================
// Cache
// ============================================================================

#[test]
fn test_second_scan_is_served_from_cache() {
    let (_dir, root) = project(&[
        ("index.js", "import { join } from 'path';\nimport './util';\n"),
        ("util.js", "export const u = 1;\n"),
        ("orphan.js", "export const o = 1;\n"),
    ]);

    let calls = Arc::new(AtomicUsize::new(0));
    let scanner = Scanner::new(&root, Config::default()).with_analyzer(Arc::new(Counting(calls.clone())));

    let first = scanner.scan().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(first.stats.cache_misses, 3);

    let second = scanner.scan().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3, "no analyzer runs on a warm cache");
    assert_eq!(second.stats.cache_hits, 3);
    assert_eq!(second.stats.cache_misses, 0);

    assert_eq!(first.issues, second.issues);
    assert_eq!(first.stats.unused_imports, second.stats.unused_imports);
    assert_eq!(first.stats.dead_files, second.stats.dead_files);
}

#[test]
fn test_content_change_invalidates_only_that_file() {
    let (_dir, root) = project(&[
        ("index.js", "import { a } from './a';\na();\n"),
        ("a.js", "export const a = () => 1;\n"),
    ]);

    let scanner = Scanner::new(&root, Config::default());
    let first = scanner.scan().unwrap();
    assert!(unused_symbols(&first).is_empty());

    write(&root, "index.js", "import { a } from './a';\nimport { b } from 'b';\na();\n");

    let second = scanner.scan().unwrap();
    assert_eq!(second.stats.cache_hits, 1);
    assert_eq!(second.stats.cache_misses, 1);
    assert_eq!(unused_symbols(&second), vec![("index.js".to_string(), "b".to_string())]);
}

#[test]
fn test_adding_an_analyzer_invalidates_the_cache() {
    let (_dir, root) = project(&[("index.js", "console.log(1);\n")]);

    Scanner::new(&root, Config::default()).scan().unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let report = Scanner::new(&root, Config::default())
        .with_analyzer(Arc::new(Counting(calls.clone())))
        .scan()
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.stats.cache_hits, 0);
}

#[test]
fn test_cache_disabled_never_writes() {
    let (_dir, root) = project(&[("index.js", "console.log(1);\n")]);

    let scanner = Scanner::new(&root, no_cache());
    scanner.scan().unwrap();
    let second = scanner.scan().unwrap();

    assert_eq!(second.stats.cache_hits, 0);
    assert!(!root.join(".sweepstacx").exists());
}

// ============================================================================
// Fault isolation
// ============================================================================

#[test]
fn test_failing_analyzer_is_isolated() {
    let (_dir, root) = project(&[
        ("index.js", "import './bad';\nimport './good';\n"),
        ("bad.js", "import { unused } from 'x';\n"),
        ("good.js", "export const g = 1;\n"),
    ]);

    let report = Scanner::new(&root, no_cache())
        .with_analyzer(Arc::new(FailsOnBad))
        .scan()
        .unwrap();

    let failures: Vec<_> = report.warnings_of_kind(WarningKind::AnalyzerFailed).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].file.as_deref(), Some(root.join("bad.js").as_path()));

    // The built-in analyzer still ran on the failing file
    assert_eq!(unused_symbols(&report), vec![("bad.js".to_string(), "unused".to_string())]);

    let external = IssueKind::External("fails-on-bad".to_string());
    assert_eq!(report.issues_of_kind(&external).count(), 2);
    assert_eq!(report.stats.failed_files, 0);
}

#[test]
fn test_failed_file_is_not_cached() {
    let (_dir, root) = project(&[("index.js", "import './bad';\n"), ("bad.js", "")]);

    let scanner = Scanner::new(&root, Config::default()).with_analyzer(Arc::new(FailsOnBad));
    scanner.scan().unwrap();
    let second = scanner.scan().unwrap();

    assert_eq!(second.stats.cache_hits, 1);
    assert_eq!(second.warnings_of_kind(WarningKind::AnalyzerFailed).count(), 1);
}

#[test]
fn test_panicking_analyzer_marks_file_failed() {
    let (_dir, root) = project(&[
        ("index.js", "import './boom';\nimport { x } from 'y';\n"),
        ("boom.js", "import { z } from 'w';\n"),
    ]);

    let report = Scanner::new(&root, no_cache())
        .with_analyzer(Arc::new(PanicsOnBoom))
        .scan()
        .unwrap();

    assert_eq!(report.warnings_of_kind(WarningKind::WorkerCrashed).count(), 1);
    assert_eq!(report.stats.failed_files, 1);
    assert_eq!(report.stats.files_scanned, 2);
    // Only the healthy file contributes issues
    assert_eq!(unused_symbols(&report), vec![("index.js".to_string(), "x".to_string())]);
    assert!(!report.incomplete);
}

#[test]
fn test_hung_analyzer_does_not_stall_the_scan() {
    let (_dir, root) = project(&[
        ("index.js", "import './stuck';\nimport { x } from 'y';\n"),
        ("stuck.js", "export const s = 1;\n"),
    ]);
    let mut config = no_cache();
    config.analyzer_timeout = 200;

    let started = Instant::now();
    let report = Scanner::new(&root, config)
        .with_analyzer(Arc::new(HangsOnStuck))
        .scan()
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    let timeouts: Vec<_> = report.warnings_of_kind(WarningKind::AnalyzerTimeout).collect();
    assert_eq!(timeouts.len(), 1);
    assert_eq!(timeouts[0].file.as_deref(), Some(root.join("stuck.js").as_path()));
    assert_eq!(report.stats.failed_files, 1);
    assert_eq!(unused_symbols(&report), vec![("index.js".to_string(), "x".to_string())]);
}

#[test]
fn test_external_analyzer_severity_drives_threshold() {
    let (_dir, root) = project(&[("index.js", "export const a = 1;\n")]);

    let plain = Scanner::new(&root, no_cache()).scan().unwrap();
    assert!(!plain.has_issues_at(Severity::Error));

    let report = Scanner::new(&root, no_cache())
        .with_analyzer(Arc::new(Strict))
        .scan()
        .unwrap();
    assert!(report.has_issues_at(Severity::Error));
    assert_eq!(report.count_by_severity(Severity::Error), 1);
}

#[test]
fn test_unreadable_file_is_reported() {
    let root = PathBuf::from("/virtual");
    let files = vec![
        SourceFile::from_text("/virtual/index.js", "import './gone';\n"),
        SourceFile::unreadable("/virtual/gone.js", "permission denied"),
    ];

    let report = Scanner::new(&root, no_cache()).scan_files(&files).unwrap();

    assert_eq!(report.warnings_of_kind(WarningKind::UnreadableFile).count(), 1);
    assert_eq!(report.stats.failed_files, 1);
    // Still a graph node, and reachable through the edge
    assert!(report.dead_files().is_empty());
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn test_cancelled_scan_is_incomplete() {
    let (_dir, root) = project(&[
        ("index.js", "import { x } from 'y';\n"),
        ("dead.js", "export const d = 1;\n"),
    ]);

    let token = CancellationToken::new();
    token.cancel();

    let report = Scanner::new(&root, no_cache())
        .with_cancellation(token)
        .scan()
        .unwrap();

    assert!(report.incomplete);
    assert_eq!(report.warnings_of_kind(WarningKind::Cancelled).count(), 1);
    assert!(report.dead_files().is_empty());
}

#[test]
fn test_progress_reaches_total() {
    let (_dir, root) = project(&[
        ("index.js", ""),
        ("a.js", ""),
        ("b.js", ""),
    ]);

    let last = Arc::new(AtomicUsize::new(0));
    let seen = last.clone();
    Scanner::new(&root, no_cache())
        .with_progress(Arc::new(move |done: usize, total: usize| {
            assert!(done <= total);
            seen.fetch_max(done, Ordering::SeqCst);
        }))
        .scan()
        .unwrap();

    assert_eq!(last.load(Ordering::SeqCst), 3);
}
