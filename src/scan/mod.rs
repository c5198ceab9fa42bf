//! Scan orchestration
//!
//! A scan runs in two phases. The worker pool analyzes every file in
//! parallel (cache-aware), then the dependency graph is built and traversed
//! on the calling thread. Both issue streams are merged and sorted so the
//! report does not depend on worker completion order.

mod pool;
mod report;

pub use pool::{FileOutcome, PoolRun, ProgressFn, WorkerPool};
pub use report::{ScanReport, ScanStats, ScanWarning, WarningKind};

use crate::analysis::{
    detectors::UnusedImportDetector, Analyzer, CycleDetector, EntryPointDetector, IssueKind,
    ReachabilityAnalyzer,
};
use crate::cache::{cache_key, CacheStore, CACHE_FORMAT};
use crate::config::Config;
use crate::discovery::{FileFinder, SourceFile};
use crate::graph::DependencyGraphBuilder;
use crate::parser::{ImportExtractor, LexicalExtractor};
use miette::{IntoDiagnostic, Result, WrapErr};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cache operation name for per-file pipeline results
pub const SCAN_OPERATION: &str = "scan";

/// Shared flag that stops a running scan from dispatching more files
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can drive another scan
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// In-progress and pending-rescan flags for repeated scans.
///
/// A request that arrives while a scan runs is folded into a single
/// follow-up scan, however many requests arrive.
#[derive(Debug, Default)]
pub struct ScanState {
    scanning: AtomicBool,
    pending: AtomicBool,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the scanner. Returns `false` and records a pending rescan if a
    /// scan is already running.
    pub fn try_begin(&self) -> bool {
        if self
            .scanning
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            true
        } else {
            self.pending.store(true, Ordering::SeqCst);
            false
        }
    }

    /// Release the scanner. Returns `true` if a rescan was requested
    /// meanwhile; the caller should then call [`ScanState::try_begin`] again.
    pub fn finish(&self) -> bool {
        self.scanning.store(false, Ordering::SeqCst);
        self.pending.swap(false, Ordering::SeqCst)
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }
}

/// Runs scans of one project root
pub struct Scanner {
    root: PathBuf,
    config: Config,
    extractor: Arc<dyn ImportExtractor>,
    analyzers: Vec<Arc<dyn Analyzer>>,
    cache: Option<CacheStore>,
    cancel: CancellationToken,
    progress: Option<Arc<ProgressFn>>,
}

impl Scanner {
    /// Scanner with the built-in unused-import analyzer registered
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        let extractor: Arc<dyn ImportExtractor> = Arc::new(LexicalExtractor::new());
        let unused = UnusedImportDetector::new()
            .with_extractor(extractor.clone())
            .check_type_imports(config.typescript.check_type_imports);

        Self {
            root: root.into(),
            config,
            extractor,
            analyzers: vec![Arc::new(unused)],
            cache: None,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    /// Register an extra per-file analyzer; it runs after those already added
    pub fn with_analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzers.push(analyzer);
        self
    }

    /// Use this cache store instead of the one derived from the config
    pub fn with_cache(mut self, cache: CacheStore) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: Arc<ProgressFn>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cache schema version: crate version, cache format and a digest of
    /// everything that changes what the pipeline produces
    pub fn schema_version(&self) -> String {
        let mut hasher = Sha256::new();
        for analyzer in &self.analyzers {
            hasher.update(analyzer.name().as_bytes());
            hasher.update([0u8]);
        }
        hasher.update([self.config.typescript.check_type_imports as u8]);
        let digest = hasher.finalize();
        let fingerprint: String = digest[..6].iter().map(|b| format!("{:02x}", b)).collect();

        format!(
            "{}+c{}+{}",
            env!("CARGO_PKG_VERSION"),
            CACHE_FORMAT,
            fingerprint
        )
    }

    /// The cache store this scanner reads and writes
    pub fn cache_store(&self) -> CacheStore {
        if let Some(cache) = &self.cache {
            return cache.clone();
        }
        if !self.config.cache.enabled {
            return CacheStore::disabled();
        }
        CacheStore::new(self.config.cache_dir(&self.root), self.schema_version())
            .with_max_age(self.config.cache_max_age())
    }

    /// Discover files under the root and scan them
    pub fn scan(&self) -> Result<ScanReport> {
        let files = FileFinder::new(&self.config)
            .find_files(&self.root)
            .wrap_err_with(|| format!("Failed to discover files in {}", self.root.display()))?;
        self.scan_files(&files)
    }

    /// Scan an already discovered file set
    pub fn scan_files(&self, files: &[SourceFile]) -> Result<ScanReport> {
        let mut report = ScanReport::default();

        if files.is_empty() {
            warn!("No files matched under {}", self.root.display());
            report.warnings.push(ScanWarning::new(
                WarningKind::EmptyScan,
                format!("no files matched under {}", self.root.display()),
            ));
            return Ok(report);
        }

        info!("Scanning {} files...", files.len());

        // Phase 1: per-file analysis
        let cache = self.cache_store();
        let pool = WorkerPool::new(
            self.config.worker_count(),
            self.analyzers.clone(),
            cache.clone(),
            self.config.analyzer_timeout(),
        )
        .into_diagnostic()
        .wrap_err("Failed to start worker pool")?;

        let run = pool.run(files, &self.cancel, self.progress.as_deref());

        for outcome in run.outcomes {
            report.stats.files_scanned += 1;
            if outcome.cache_hit {
                report.stats.cache_hits += 1;
            } else if outcome.analyzed {
                report.stats.cache_misses += 1;
            }
            if outcome.failed {
                report.stats.failed_files += 1;
            }
            report.issues.extend(outcome.issues);
            report.warnings.extend(outcome.warnings);
        }

        if self.cancel.is_cancelled() {
            warn!("Scan cancelled; {} files not analyzed", run.skipped);
            report.incomplete = true;
            report.warnings.push(ScanWarning::new(
                WarningKind::Cancelled,
                format!("scan cancelled; {} files not analyzed, dead files not computed", run.skipped),
            ));
            finalize(&mut report);
            return Ok(report);
        }

        if cache.is_enabled() {
            prune_cache(&cache, files, &mut report);
        }

        // Phase 2: graph and reachability, single-threaded
        let build = DependencyGraphBuilder::new(self.extractor.as_ref()).build(files);
        debug!("{} unresolved local imports", build.unresolved.len());

        let entry_points = EntryPointDetector::new()
            .with_root(&self.root)
            .with_patterns(&self.config.entry_points)
            .detect(build.graph.files());
        report.stats.entry_points = entry_points.len();
        report.entry_point_fallback = entry_points.is_fallback();

        let reachability = ReachabilityAnalyzer::new().analyze(&build.graph, &entry_points);
        report.issues.extend(reachability.dead_file_issues());
        report.dead_cycles = CycleDetector::new().find_dead_cycles(&build.graph, &reachability);

        finalize(&mut report);

        info!(
            "Scan complete: {} files, {} unused imports, {} dead files",
            report.stats.files_scanned, report.stats.unused_imports, report.stats.dead_files
        );

        Ok(report)
    }
}

/// Drop entries for content this file set no longer has, so edited files
/// do not leave their old results behind
fn prune_cache(cache: &CacheStore, files: &[SourceFile], report: &mut ScanReport) {
    let live: HashSet<String> = files
        .iter()
        .filter_map(|f| f.content_hash().map(|hash| cache_key(SCAN_OPERATION, &f.path, hash)))
        .collect();
    match cache.prune(&live) {
        Ok(0) => {}
        Ok(removed) => debug!("Pruned {} stale cache entries", removed),
        Err(e) => {
            warn!("Cache prune failed: {}", e);
            report
                .warnings
                .push(ScanWarning::new(WarningKind::CacheError, format!("could not prune cache: {e}")));
        }
    }
}

/// Impose the total order on issues and warnings and fill in the counters
fn finalize(report: &mut ScanReport) {
    report.issues.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    report.issues.dedup();
    report
        .warnings
        .sort_by(|a, b| (&a.file, a.kind, &a.message).cmp(&(&b.file, b.kind, &b.message)));

    report.stats.unused_imports = report
        .issues
        .iter()
        .filter(|i| i.kind == IssueKind::UnusedImport)
        .count();
    report.stats.dead_files = report
        .issues
        .iter()
        .filter(|i| i.kind == IssueKind::DeadFile)
        .count();
}
