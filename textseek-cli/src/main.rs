use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::{num::NonZeroUsize, path::PathBuf, thread, time::Duration};
use textseek::{
    CliOverrides, Counters, EncodingMode, MatchRecord, SearchConfig, SearchError, SearchSession,
    SessionHandle, SessionStatus, SessionSummary,
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, SearchError>;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file, layered over the global and local ones
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
struct CliSearchConfig {
    /// Text to search for (literal substring)
    #[arg(short = 'p', long)]
    pattern: Option<String>,

    /// Folder to search in
    #[arg(short = 'd', long)]
    root: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// File extensions to include (e.g. txt,log)
    #[arg(short = 'e', long)]
    extensions: Option<String>,

    /// Paths to ignore, relative to the root (glob format)
    #[arg(short, long)]
    ignore: Vec<String>,

    /// Skip files with a binary extension
    #[arg(long)]
    skip_binary: bool,

    /// How to handle invalid UTF-8 sequences (failfast|lossy)
    #[arg(long)]
    encoding: Option<String>,

    /// Index of the first result to print
    #[arg(long, default_value = "0")]
    offset: usize,

    /// Number of results to print (default: configured page size)
    #[arg(short = 'n', long)]
    limit: Option<usize>,

    /// Show only the counters, not matches
    #[arg(short, long)]
    stats: bool,

    /// Print one JSON object per result
    #[arg(long)]
    json: bool,

    /// Hide the live progress line
    #[arg(long)]
    no_progress: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the first line containing a pattern in every file under a folder
    Search(Box<CliSearchConfig>),

    /// Print the effective configuration
    ShowConfig,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(if e.is_precondition() { 2 } else { 1 });
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let file_config = SearchConfig::load_from(cli.config.as_deref())
        .map_err(|e| SearchError::config_error(e.to_string()))?;

    match cli.command {
        Commands::Search(args) => {
            let config = file_config.merge_with_cli(cli_overrides(&args)?);
            init_tracing(&config.log_level);
            debug!("Effective configuration: {:?}", config);
            search(&config, &args)
        }
        Commands::ShowConfig => {
            print!("{}", file_config.to_yaml()?);
            Ok(())
        }
    }
}

fn cli_overrides(args: &CliSearchConfig) -> Result<CliOverrides> {
    let encoding_mode = args
        .encoding
        .as_deref()
        .map(|mode| mode.parse::<EncodingMode>())
        .transpose()?;
    let file_extensions = args.extensions.as_ref().map(|e| {
        e.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
    });

    Ok(CliOverrides {
        pattern: args.pattern.clone(),
        root_path: args.root.clone(),
        worker_count: args.threads,
        file_extensions,
        ignore_patterns: (!args.ignore.is_empty()).then(|| args.ignore.clone()),
        skip_binary: args.skip_binary,
        encoding_mode,
        page_size: None,
        stats_only: args.stats,
        log_level: args.log_level.clone(),
    })
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn search(config: &SearchConfig, args: &CliSearchConfig) -> Result<()> {
    let request = config.request()?;
    if !request.root_path().is_dir() {
        eprintln!(
            "{} {} is not a readable folder",
            "warning:".yellow().bold(),
            request.root_path().display()
        );
    }

    let session = SearchSession::new(config.clone());
    let handle = session.start(request)?;

    let interrupted = interrupt_flag();
    let progress = (!args.no_progress && !args.json).then(spinner);
    let (summary, _) = wait_for_session(&session, handle, &interrupted, progress.as_ref())?;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let limit = args.limit.unwrap_or(config.page_size);
    let page = session.results_page(args.offset, limit);

    if args.json {
        for record in &page {
            let line = serde_json::to_string(record).map_err(std::io::Error::from)?;
            println!("{}", line);
        }
        return Ok(());
    }

    if !config.stats_only {
        print_results(&page);
    }
    print_summary(&summary, args.offset, page.len());
    Ok(())
}

/// Set once the user presses Ctrl-C
fn interrupt_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    if let Err(e) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst)) {
        warn!("Ctrl-C will not cancel the search: {}", e);
    }
    flag
}

/// Polls the session until it finishes, refreshing the progress line.
/// An interrupt cancels the session once; the returned flag says whether
/// that cancel reached a still-running session.
fn wait_for_session(
    session: &SearchSession,
    handle: SessionHandle,
    interrupted: &AtomicBool,
    progress: Option<&ProgressBar>,
) -> Result<(SessionSummary, bool)> {
    let mut cancel_sent = false;
    let mut cancelled = false;
    loop {
        if !cancel_sent && interrupted.load(Ordering::SeqCst) {
            cancel_sent = true;
            cancelled = handle.cancel();
            debug!("Interrupt received, session {} cancelled: {}", handle.id(), cancelled);
        }
        if handle.is_finished() {
            break;
        }
        if let Some(pb) = progress {
            pb.set_message(counters_line(&session.counters()));
        }
        thread::sleep(POLL_INTERVAL);
    }
    Ok((handle.wait()?, cancelled))
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(POLL_INTERVAL);
    pb
}

fn counters_line(counters: &Counters) -> String {
    format!(
        "Files scanned: {}  Matches found: {}",
        counters.files_scanned, counters.matches_found
    )
}

fn print_results(page: &[MatchRecord]) {
    for record in page {
        println!(
            "{}:{}",
            record.path.display().to_string().blue(),
            record.line_number.to_string().green()
        );
    }
}

fn print_summary(summary: &SessionSummary, offset: usize, shown: usize) {
    let elapsed = Duration::from_millis(summary.elapsed.as_millis() as u64);
    let total = summary.counters.matches_found as usize;

    if shown > 0 && shown < total {
        println!("\nShowing results {}-{} of {}", offset + 1, offset + shown, total);
    }
    println!(
        "\n{} in {}",
        counters_line(&summary.counters),
        humantime::format_duration(elapsed)
    );
    if summary.pool.unreadable_directories > 0 {
        println!(
            "{} folders could not be read",
            summary.pool.unreadable_directories
        );
    }
    if summary.status == SessionStatus::Cancelled {
        println!("{}", "Search was cancelled".yellow());
    }
}
