use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use sweepstacx::analysis::Severity;
use sweepstacx::cache::CacheStore;
use sweepstacx::config::Config;
use sweepstacx::report::{ReportFormat, Reporter};
use sweepstacx::scan::{CancellationToken, ScanReport, Scanner};
use sweepstacx::watch::FileWatcher;

/// SweepstacX - Fast unused-import and dead-file detection for JavaScript/TypeScript
#[derive(Parser, Debug)]
#[command(name = "sweepstacx")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - only output results
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a project for unused imports and dead files
    Scan(ScanArgs),

    /// Manage the result cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Args, Debug, Clone)]
struct ScanArgs {
    /// Path to the project directory to scan
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Project directory, as an option (overrides the positional PATH)
    #[arg(long = "path", value_name = "DIR")]
    path_option: Option<PathBuf>,

    /// Patterns to exclude (can be specified multiple times)
    #[arg(short, long)]
    exclude: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "terminal")]
    format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long)]
    json: bool,

    /// Output file (for json format)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Disable the result cache for this run
    #[arg(long)]
    no_cache: bool,

    /// Clear the result cache before scanning
    #[arg(long)]
    clear_cache: bool,

    /// Maximum number of worker threads
    #[arg(long)]
    max_workers: Option<usize>,

    /// Watch mode - rescan on file changes
    #[arg(short, long)]
    watch: bool,

    /// Exit non-zero when issues at or above this severity exist
    #[arg(long, value_enum, default_value = "never")]
    fail_on: FailOn,
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Delete every cache entry for a project
    Clear {
        /// Path to the project directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Terminal,
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Terminal => ReportFormat::Terminal,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum FailOn {
    Error,
    Warning,
    Info,
    #[default]
    Never,
}

impl FailOn {
    fn threshold(self) -> Option<Severity> {
        match self {
            FailOn::Error => Some(Severity::Error),
            FailOn::Warning => Some(Severity::Warning),
            FailOn::Info => Some(Severity::Info),
            FailOn::Never => None,
        }
    }
}

impl ScanArgs {
    fn root(&self) -> &Path {
        self.path_option.as_deref().unwrap_or(&self.path)
    }

    fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.quiet);

    info!("SweepstacX v{}", env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Command::Scan(args) => {
            let root = resolve_root(args.root())?;
            let config = load_config(cli.config.as_deref(), &root, args)?;
            if args.watch {
                run_watch_mode(root, config, args.clone(), cli.quiet)?;
                Ok(ExitCode::SUCCESS)
            } else {
                run_scan(&root, config, args, cli.quiet)
            }
        }
        Command::Cache {
            action: CacheAction::Clear { path },
        } => {
            let root = resolve_root(path)?;
            let config = match cli.config.as_deref() {
                Some(path) => Config::from_file(path)?,
                None => Config::from_default_locations(&root)?,
            };
            let dir = config.cache_dir(&root);
            CacheStore::new(&dir, "")
                .invalidate_all()
                .into_diagnostic()
                .wrap_err("Failed to clear cache")?;
            println!("{}", format!("Cache cleared: {}", dir.display()).green());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_root(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Cannot access project directory: {}", path.display()))
}

fn load_config(config_path: Option<&Path>, root: &Path, args: &ScanArgs) -> Result<Config> {
    let mut config = if let Some(config_path) = config_path {
        Config::from_file(config_path)?
    } else {
        // Try to load from default locations
        Config::from_default_locations(root)?
    };

    // Override with CLI arguments
    config.ignore.extend(args.exclude.iter().cloned());
    if args.no_cache {
        config.cache.enabled = false;
    }
    if let Some(workers) = args.max_workers {
        config.max_workers = Some(workers);
    }

    Ok(config)
}

/// Ctrl+C trips the token; a running scan stops dispatching files
fn install_interrupt_handler() -> Result<CancellationToken> {
    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .into_diagnostic()
        .wrap_err("Failed to install Ctrl+C handler")?;
    Ok(token)
}

fn build_scanner(root: &Path, config: Config, cancel: CancellationToken, show_progress: bool) -> Scanner {
    let mut scanner = Scanner::new(root, config).with_cancellation(cancel);

    if show_progress {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_draw_target(ProgressDrawTarget::stderr());
        scanner = scanner.with_progress(Arc::new(move |done: usize, total: usize| {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
            if done == total {
                pb.finish_and_clear();
            }
        }));
    }

    scanner
}

fn run_scan(root: &Path, config: Config, args: &ScanArgs, quiet: bool) -> Result<ExitCode> {
    let start_time = Instant::now();
    let cancel = install_interrupt_handler()?;
    let format = args.format();
    let show_progress = !quiet && matches!(format, OutputFormat::Terminal);

    let scanner = build_scanner(root, config, cancel, show_progress);

    if args.clear_cache {
        scanner
            .cache_store()
            .invalidate_all()
            .into_diagnostic()
            .wrap_err("Failed to clear cache")?;
        info!("Cache cleared");
    }

    let report = scanner.scan()?;

    let reporter = Reporter::new(format.into(), args.output.clone(), root);
    reporter.report(&report)?;

    // Print timing
    if !quiet && matches!(format, OutputFormat::Terminal) {
        let elapsed = start_time.elapsed();
        println!(
            "{}",
            format!(
                "⏱  Scanned {} files in {:.2}s",
                report.stats.files_scanned,
                elapsed.as_secs_f64()
            )
            .dimmed()
        );
    }

    Ok(exit_code(&report, args.fail_on))
}

fn exit_code(report: &ScanReport, fail_on: FailOn) -> ExitCode {
    if report.incomplete {
        return ExitCode::from(130);
    }
    match fail_on.threshold() {
        Some(threshold) if report.has_issues_at(threshold) => ExitCode::from(1),
        _ => ExitCode::SUCCESS,
    }
}

fn run_watch_mode(root: PathBuf, config: Config, args: ScanArgs, quiet: bool) -> Result<()> {
    let cancel = install_interrupt_handler()?;
    let watcher = FileWatcher::new(&root, &config);
    let format = args.format();

    let scanner = build_scanner(&root, config, cancel.clone(), false);
    let reporter = Reporter::new(format.into(), args.output.clone(), &root);

    watcher
        .watch(&cancel, move || match scanner.scan() {
            Ok(report) => {
                if let Err(e) = reporter.report(&report) {
                    eprintln!("{}: {:?}", "Report error".red(), e);
                }
                if !quiet {
                    println!();
                    println!("{}", "✓ Scan complete. Waiting for changes...".green());
                }
            }
            Err(e) => {
                eprintln!("{}: {:?}", "Scan error".red(), e);
            }
        })
        .map_err(|e| miette::miette!("Watch error: {}", e))?;

    Ok(())
}
