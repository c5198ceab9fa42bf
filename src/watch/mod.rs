//! Watch mode for SweepstacX
//!
//! Re-runs the scan when matching source files change. Scans run on a
//! background thread; changes that arrive while one is running are folded
//! into a single follow-up scan through [`ScanState`].

use crate::config::Config;
use crate::discovery::FileFinder;
use crate::scan::{CancellationToken, ScanState};
use colored::Colorize;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Watch mode errors
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to create file watcher: {0}")]
    WatcherError(#[from] notify::Error),
    #[error("File watcher stopped unexpectedly")]
    Disconnected,
}

/// File watcher for continuous scanning
pub struct FileWatcher {
    root: PathBuf,
    finder: FileFinder,
}

/// Changes closer together than this are reported as one batch
const DEBOUNCE: Duration = Duration::from_millis(500);

impl FileWatcher {
    pub fn new(root: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            root: root.into(),
            finder: FileFinder::new(config),
        }
    }

    /// Check if a changed path should trigger a rescan
    fn should_trigger(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        self.finder.is_included(relative) && !self.finder.is_ignored(relative)
    }

    /// Watch the root and run `on_change` once up front and after each batch
    /// of relevant changes, until `stop` is cancelled
    pub fn watch<F>(&self, stop: &CancellationToken, on_change: F) -> Result<(), WatchError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let (tx, rx) = channel();

        // Create debounced watcher
        let mut debouncer = new_debouncer(DEBOUNCE, tx)?;
        debouncer.watcher().watch(&self.root, RecursiveMode::Recursive)?;

        println!();
        println!("{}", "👁  Watch mode active. Press Ctrl+C to stop.".cyan().bold());
        println!("{}", format!("   Watching: {}", self.root.display()).dimmed());
        println!();

        let state = Arc::new(ScanState::new());
        let on_change: Arc<dyn Fn() + Send + Sync> = Arc::new(on_change);
        let mut worker: Option<JoinHandle<()>> = None;

        // Initial scan
        trigger(&state, &on_change, &mut worker);

        while !stop.is_cancelled() {
            match rx.recv_timeout(Duration::from_millis(200)) {
                Ok(Ok(events)) => {
                    let relevant: Vec<_> = events
                        .iter()
                        .filter(|e| {
                            matches!(e.kind, DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous)
                                && self.should_trigger(&e.path)
                        })
                        .collect();

                    if relevant.is_empty() {
                        continue;
                    }

                    println!();
                    println!(
                        "{}",
                        format!("🔄 Changes detected in {} file(s), rescanning...", relevant.len()).yellow()
                    );
                    for event in relevant.iter().take(5) {
                        if let Some(name) = event.path.file_name() {
                            println!("   • {}", name.to_string_lossy().dimmed());
                        }
                    }
                    if relevant.len() > 5 {
                        println!("   • ... and {} more", relevant.len() - 5);
                    }
                    println!();

                    trigger(&state, &on_change, &mut worker);
                }
                Ok(Err(e)) => {
                    eprintln!("{}: {:?}", "Watch error".red(), e);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Err(WatchError::Disconnected),
            }
        }

        if let Some(handle) = worker.take() {
            let _ = handle.join();
        }
        Ok(())
    }
}

/// Start a scan thread, or mark a rescan pending if one is running
fn trigger(
    state: &Arc<ScanState>,
    on_change: &Arc<dyn Fn() + Send + Sync>,
    worker: &mut Option<JoinHandle<()>>,
) {
    if !state.try_begin() {
        debug!("Scan in progress; rescan queued");
        return;
    }
    let state = Arc::clone(state);
    let on_change = Arc::clone(on_change);
    *worker = Some(std::thread::spawn(move || run_scans(&state, on_change.as_ref())));
}

/// Run a claimed scan plus any rescans requested while it ran
fn run_scans(state: &ScanState, on_change: &(dyn Fn() + Send + Sync)) {
    loop {
        on_change();
        if !state.finish() || !state.try_begin() {
            break;
        }
    }
}
