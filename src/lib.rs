//! SweepstacX - Fast unused-import and dead-file detection for JavaScript/TypeScript
//!
//! # Architecture
//!
//! A scan consists of:
//! 1. **File Discovery** - Find all JS/TS files matching the configured globs
//! 2. **Per-file Analysis** - Unused imports and pluggable analyzers, run on a
//!    bounded worker pool with a content-hash cache in front
//! 3. **Graph Building** - Resolve local imports into a file dependency graph
//! 4. **Entry Point Detection** - Conventional names, bin/cli dirs, test files
//! 5. **Reachability Analysis** - Files not reachable from an entry point are dead
//! 6. **Reporting** - Terminal or JSON output

pub mod analysis;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod graph;
pub mod parser;
pub mod report;
pub mod scan;
pub mod watch;

pub use analysis::{Analyzer, IssueKind, IssueRecord, Severity};
pub use cache::{CacheError, CacheStore};
pub use config::Config;
pub use discovery::{FileFinder, SourceFile};
pub use graph::{DependencyGraph, DependencyGraphBuilder};
pub use parser::{ImportExtractor, LexicalExtractor};
pub use report::{ReportFormat, Reporter};
pub use scan::{CancellationToken, ScanReport, ScanState, ScanWarning, Scanner, WarningKind};
