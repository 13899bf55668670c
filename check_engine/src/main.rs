//! `check_flow` — CLI entry point of the checkflow engine.
//!
//! The default invocation runs the dispatcher over a checklist root. The
//! hidden `run-item` subcommand is the child-process mode the dispatcher
//! spawns per item; it executes exactly one checker and exits with the
//! checker contract codes (0 pass, 1 fail, 2 config error, 3 unexpected).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use checkflow_engine::cache::ResultCache;
use checkflow_engine::checker;
use checkflow_engine::dispatcher::{self, FlowOptions};
use checkflow_engine::teelog::TeeLogger;

#[derive(Parser)]
#[command(
    name = "check_flow",
    about = "Execute checklist modules and items with flexible parallel strategies.",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Mode>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Mode {
    /// Execute a single check item (spawned by the dispatcher).
    #[command(hide = true)]
    RunItem(RunItemArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Root of the checklist.
    #[arg(long, default_value = "..")]
    root: PathBuf,

    /// Stage tag.
    #[arg(long, default_value = "Initial")]
    stage: String,

    /// Specific check module to run (default: all from config).
    #[arg(long)]
    check_module: Option<String>,

    /// Specific check items (only with --check-module).
    #[arg(long, num_args = 0..)]
    check_items: Vec<String>,

    /// Force serial execution.
    #[arg(long)]
    serial: bool,

    /// Force item-level parallel execution.
    #[arg(long)]
    item_parallel: bool,

    /// Use module-level execution.
    #[arg(long)]
    use_module_runners: bool,

    /// Skip DATA_INTERFACE distribution (checker development mode).
    #[arg(long)]
    skip_distribution: bool,

    /// Enable the file-based cache for cross-process sharing.
    #[arg(long)]
    enable_file_cache: bool,

    /// Directory for the file cache (default: <root>/Work/.cache).
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Maximum number of items in the memory cache.
    #[arg(long)]
    max_cache_size: Option<usize>,

    /// Show detailed cache statistics at the end.
    #[arg(long)]
    show_cache_stats: bool,
}

#[derive(Args)]
struct RunItemArgs {
    /// Root of the checklist.
    #[arg(long)]
    root: PathBuf,

    /// Module the item belongs to.
    #[arg(long)]
    check_module: String,

    /// Item to execute.
    #[arg(long)]
    check_item: String,

    /// Maximum number of items in the memory cache.
    #[arg(long, default_value_t = checkflow_engine::cache::DEFAULT_MAX_ENTRIES)]
    max_cache_size: usize,

    /// Enable the file-based cache tier.
    #[arg(long)]
    enable_file_cache: bool,

    /// Directory for the file cache.
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

fn run_item_main(args: &RunItemArgs) -> i32 {
    let mut cache = match (&args.cache_dir, args.enable_file_cache) {
        (Some(dir), true) => ResultCache::with_file_cache(args.max_cache_size, dir),
        _ => ResultCache::new(args.max_cache_size),
    };
    checker::run_item(&args.root, &args.check_module, &args.check_item, &mut cache)
}

fn dispatch_main(args: &RunArgs) -> i32 {
    let root = match args.root.canonicalize() {
        Ok(root) => root,
        Err(_) => {
            eprintln!("[ERROR] Root not found: {}", args.root.display());
            return dispatcher::EXIT_ROOT_NOT_FOUND;
        }
    };

    let checkflow_log = root.join("Work").join("Checkflow.log");
    if let Err(e) = TeeLogger::init(&checkflow_log) {
        eprintln!("[WARN] Cannot open {}: {e}", checkflow_log.display());
    }

    let opts = FlowOptions {
        root,
        stage: args.stage.clone(),
        check_module: args.check_module.clone(),
        check_items: args.check_items.clone(),
        serial: args.serial,
        item_parallel: args.item_parallel,
        use_module_runners: args.use_module_runners,
        skip_distribution: args.skip_distribution,
        enable_file_cache: args.enable_file_cache,
        cache_dir: args.cache_dir.clone(),
        max_cache_size: args.max_cache_size,
        show_cache_stats: args.show_cache_stats,
    };

    let rc = dispatcher::run_flow(&opts);
    log::info!("Execution log saved to: {}", checkflow_log.display());
    rc
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let rc = match &cli.command {
        Some(Mode::RunItem(args)) => run_item_main(args),
        None => dispatch_main(&cli.run),
    };

    ExitCode::from(u8::try_from(rc.clamp(0, 255)).unwrap_or(1))
}
