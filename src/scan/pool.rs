// Bounded worker pool running the per-file analyzer pipeline.
//
// Workers share the cache store and the analyzer list read-only. Each file
// is independent: a failure only ever affects the file being processed.
// The pipeline itself runs on a short-lived helper thread so a worker can
// give up on a file that overruns its time budget.

use super::{CancellationToken, ScanWarning, WarningKind, SCAN_OPERATION};
use crate::analysis::{Analyzer, IssueRecord};
use crate::cache::CacheStore;
use crate::discovery::SourceFile;
use rayon::prelude::*;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Called after each file with `(completed, total)`
pub type ProgressFn = dyn Fn(usize, usize) + Send + Sync;

/// Attempts per file before a panicking pipeline is given up on
const MAX_ATTEMPTS: usize = 2;

/// What one file contributed to the scan
#[derive(Debug, Clone, Default)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub issues: Vec<IssueRecord>,
    pub warnings: Vec<ScanWarning>,
    pub cache_hit: bool,
    /// The analyzer pipeline ran (cache miss)
    pub analyzed: bool,
    /// Unreadable, crashed or timed out: contributed no issues
    pub failed: bool,
}

/// Result of running the pool over a file list
#[derive(Debug, Default)]
pub struct PoolRun {
    pub outcomes: Vec<FileOutcome>,
    /// Files never dispatched because the scan was cancelled
    pub skipped: usize,
}

struct PipelineRun {
    issues: Vec<IssueRecord>,
    warnings: Vec<ScanWarning>,
}

pub struct WorkerPool {
    pool: rayon::ThreadPool,
    analyzers: Vec<Arc<dyn Analyzer>>,
    cache: CacheStore,
    timeout: Duration,
}

impl WorkerPool {
    /// Create a pool with at most `workers` threads (never fewer than one)
    pub fn new(
        workers: usize,
        analyzers: Vec<Arc<dyn Analyzer>>,
        cache: CacheStore,
        timeout: Duration,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("sweepstacx-worker-{i}"))
            .build()?;

        Ok(Self {
            pool,
            analyzers,
            cache,
            timeout,
        })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Process every file, stopping dispatch once `cancel` is tripped
    pub fn run(
        &self,
        files: &[SourceFile],
        cancel: &CancellationToken,
        progress: Option<&ProgressFn>,
    ) -> PoolRun {
        let total = files.len();
        let completed = AtomicUsize::new(0);

        debug!("Dispatching {} files to {} workers", total, self.workers());

        let results: Vec<Option<FileOutcome>> = self.pool.install(|| {
            files
                .par_iter()
                .map(|file| {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    let outcome = self.process(file);
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(progress) = progress {
                        progress(done, total);
                    }
                    Some(outcome)
                })
                .collect()
        });

        let skipped = results.iter().filter(|r| r.is_none()).count();
        PoolRun {
            outcomes: results.into_iter().flatten().collect(),
            skipped,
        }
    }

    /// Cache lookup, then the analyzer pipeline on a miss
    pub fn process(&self, file: &SourceFile) -> FileOutcome {
        let mut outcome = FileOutcome {
            path: file.path.clone(),
            ..FileOutcome::default()
        };

        let (Some(text), Some(hash)) = (file.text(), file.content_hash()) else {
            let reason = file.read_error().unwrap_or("no text available");
            outcome.warnings.push(record(ScanWarning::for_file(
                WarningKind::UnreadableFile,
                &file.path,
                format!("could not read file: {reason}"),
            )));
            outcome.failed = true;
            return outcome;
        };

        match self.cache.get::<Vec<IssueRecord>>(SCAN_OPERATION, &file.path, hash) {
            Ok(Some(issues)) => {
                trace!("Cache hit: {}", file.path.display());
                outcome.issues = issues;
                outcome.cache_hit = true;
                return outcome;
            }
            Ok(None) => {}
            Err(e) => {
                outcome.warnings.push(record(ScanWarning::for_file(
                    WarningKind::CacheError,
                    &file.path,
                    format!("ignoring cache entry: {e}"),
                )));
            }
        }

        outcome.analyzed = true;
        let run = match self.run_isolated(text, file) {
            Isolated::Finished(run) => run,
            Isolated::Crashed(reason) => {
                outcome.warnings.push(record(ScanWarning::for_file(
                    WarningKind::WorkerCrashed,
                    &file.path,
                    reason,
                )));
                outcome.failed = true;
                return outcome;
            }
            Isolated::TimedOut => {
                outcome.warnings.push(record(ScanWarning::for_file(
                    WarningKind::AnalyzerTimeout,
                    &file.path,
                    format!("analysis exceeded the {}ms limit; file skipped", self.timeout.as_millis()),
                )));
                outcome.failed = true;
                return outcome;
            }
        };

        let clean = run.warnings.is_empty();
        outcome.warnings.extend(run.warnings);

        // Partial results are not cached so the next scan retries them
        if clean {
            if let Err(e) = self.cache.set(SCAN_OPERATION, &file.path, hash, &run.issues) {
                outcome.warnings.push(record(ScanWarning::for_file(
                    WarningKind::CacheError,
                    &file.path,
                    format!("could not store cache entry: {e}"),
                )));
            }
        }

        outcome.issues = run.issues;
        outcome
    }

    /// Run the pipeline on a helper thread and wait at most `timeout`.
    ///
    /// A helper that overruns is left detached; whatever it sends later is
    /// dropped with the channel.
    fn run_isolated(&self, text: &str, file: &SourceFile) -> Isolated {
        let (tx, rx) = mpsc::channel();
        let analyzers = self.analyzers.clone();
        let text = text.to_string();
        let path = file.path.clone();

        let spawned = thread::Builder::new()
            .name("sweepstacx-analyzer".to_string())
            .spawn(move || {
                let _ = tx.send(run_with_retry(&analyzers, &text, &path));
            });
        if let Err(e) = spawned {
            return Isolated::Crashed(format!("could not start analysis thread: {e}"));
        }

        match rx.recv_timeout(self.timeout) {
            Ok(Some(run)) => Isolated::Finished(run),
            Ok(None) => Isolated::Crashed(format!("analysis crashed {MAX_ATTEMPTS} times; file skipped")),
            Err(RecvTimeoutError::Timeout) => {
                debug!("Abandoning analysis of {}", file.path.display());
                Isolated::TimedOut
            }
            Err(RecvTimeoutError::Disconnected) => {
                Isolated::Crashed("analysis thread exited without a result".to_string())
            }
        }
    }
}

enum Isolated {
    Finished(PipelineRun),
    Crashed(String),
    TimedOut,
}

fn run_with_retry(analyzers: &[Arc<dyn Analyzer>], text: &str, path: &Path) -> Option<PipelineRun> {
    for attempt in 1..=MAX_ATTEMPTS {
        match catch_unwind(AssertUnwindSafe(|| run_pipeline(analyzers, text, path))) {
            Ok(run) => return Some(run),
            Err(payload) => {
                warn!(
                    "Worker panicked on {} (attempt {}/{}): {}",
                    path.display(),
                    attempt,
                    MAX_ATTEMPTS,
                    panic_message(payload.as_ref())
                );
            }
        }
    }
    None
}

/// Run every analyzer in order; an `Err` only drops that analyzer's issues
fn run_pipeline(analyzers: &[Arc<dyn Analyzer>], text: &str, path: &Path) -> PipelineRun {
    let mut run = PipelineRun {
        issues: Vec::new(),
        warnings: Vec::new(),
    };

    for analyzer in analyzers {
        match analyzer.analyze(text, path) {
            Ok(issues) => run.issues.extend(issues),
            Err(e) => run.warnings.push(record(ScanWarning::for_file(
                WarningKind::AnalyzerFailed,
                path,
                format!("analyzer '{}' failed: {:#}", analyzer.name(), e),
            ))),
        }
    }

    run
}

/// Log a warning as it is recorded
fn record(warning: ScanWarning) -> ScanWarning {
    match &warning.file {
        Some(file) => warn!("{}: {} ({})", warning.kind, warning.message, file.display()),
        None => warn!("{}: {}", warning.kind, warning.message),
    }
    warning
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
