//! Dispatcher / flow runner — plans and executes a checklist run.
//!
//! Responsibilities, in order: clean previous artifacts, distribute the
//! data interface, decide the execution mode, fan the configured items out
//! across child processes with per-item timeouts, surface progress, and
//! run the aggregation sequence.
//!
//! Each task is an independent child process (a re-exec of `check_flow`
//! with the hidden `run-item` subcommand, cwd `Work/`). Child stdout and
//! stderr are discarded — children own their per-item artifacts. The
//! dispatcher never cancels running children; a child is killed only when
//! it exceeds its wall-clock timeout, which counts as a failed item.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::aggregate;
use crate::cache::ResultCache;
use crate::config::{self, item_config_path, FlowConfig};
use crate::distribute::{self, DATA_INTERFACE_REL};

/// Dispatcher exit code: success.
pub const EXIT_OK: i32 = 0;
/// Dispatcher exit code: checklist root not found.
pub const EXIT_ROOT_NOT_FOUND: i32 = 2;
/// Dispatcher exit code: module configuration failed to load.
pub const EXIT_CONFIG_LOAD: i32 = 3;
/// Dispatcher exit code: requested module is unknown.
pub const EXIT_UNKNOWN_MODULE: i32 = 4;
/// Dispatcher exit code: no modules configured.
pub const EXIT_NO_MODULES: i32 = 5;

/// Parsed dispatcher options (CLI surface).
#[derive(Debug, Clone, Default)]
pub struct FlowOptions {
    /// Checklist root.
    pub root: PathBuf,
    /// Stage tag (selects the stage manifest).
    pub stage: String,
    /// Restrict the run to one module.
    pub check_module: Option<String>,
    /// Restrict the run to specific items (with `check_module`).
    pub check_items: Vec<String>,
    /// Force serial execution.
    pub serial: bool,
    /// Force item-level parallel execution.
    pub item_parallel: bool,
    /// Force module-level execution.
    pub use_module_runners: bool,
    /// Skip the data-interface distribution step.
    pub skip_distribution: bool,
    /// Enable the cross-process file cache.
    pub enable_file_cache: bool,
    /// File-cache directory override.
    pub cache_dir: Option<PathBuf>,
    /// Memory-cache capacity override.
    pub max_cache_size: Option<usize>,
    /// Print the full cache statistics at the end.
    pub show_cache_stats: bool,
}

/// The three execution modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Every item is an independent task (maximum speed).
    ItemParallel,
    /// One task per module, modules in parallel.
    ModuleParallel,
    /// One module at a time.
    ModuleSerial,
}

/// One schedulable unit: a single item of a module.
#[derive(Debug, Clone)]
struct ItemTask {
    module: String,
    item_id: String,
}

/// Decide the execution mode from explicit flags and the module count.
#[must_use]
pub fn decide_execution_mode(opts: &FlowOptions, module_count: usize) -> ExecutionMode {
    if opts.item_parallel {
        ExecutionMode::ItemParallel
    } else if opts.use_module_runners {
        if !opts.serial && module_count > 1 {
            ExecutionMode::ModuleParallel
        } else {
            ExecutionMode::ModuleSerial
        }
    } else if opts.serial {
        ExecutionMode::ModuleSerial
    } else if module_count > 1 {
        ExecutionMode::ItemParallel
    } else {
        ExecutionMode::ModuleSerial
    }
}

fn cpu_count() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

/// Worker count for module-level execution.
///
/// Small counts get minimal parallelism, moderate counts 75% of the CPUs,
/// large counts every CPU, always capped at the module count.
#[must_use]
pub fn optimal_module_workers(num_modules: usize) -> usize {
    optimal_module_workers_for(num_modules, cpu_count())
}

fn optimal_module_workers_for(num_modules: usize, cpus: usize) -> usize {
    match num_modules {
        0 | 1 => 1,
        2 => 2,
        3..=8 => (cpus * 3 / 4).max(2).min(num_modules),
        _ => cpus.min(num_modules),
    }
}

/// Worker count for item-level execution.
#[must_use]
pub fn item_workers(total_items: usize) -> usize {
    cpu_count().min(total_items.max(1))
}

/// Format the timeout for the failure message (`5min` for 300 s).
fn timeout_label(secs: u64) -> String {
    if secs >= 60 && secs % 60 == 0 {
        format!("{}min", secs / 60)
    } else {
        format!("{secs}s")
    }
}

/// Spawn one checker child and wait for it, enforcing the wall-clock
/// timeout. Returns the child's exit code; a timeout or spawn failure
/// counts as 1.
fn run_checker_child(opts: &FlowOptions, flow: &FlowConfig, task: &ItemTask) -> i32 {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(e) => {
            log::error!("Cannot locate own executable: {e}");
            return 1;
        }
    };

    let work_dir = opts.root.join("Work");
    let mut cmd = Command::new(exe);
    cmd.arg("run-item")
        .arg("--root")
        .arg(&opts.root)
        .arg("--check-module")
        .arg(&task.module)
        .arg("--check-item")
        .arg(&task.item_id)
        .arg("--max-cache-size")
        .arg(flow.max_cache_size.to_string())
        .current_dir(&work_dir)
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    if flow.enable_file_cache {
        cmd.arg("--enable-file-cache")
            .arg("--cache-dir")
            .arg(flow.effective_cache_dir(&opts.root));
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            log::error!("Checker failed to start: {} - {e}", task.item_id);
            return 1;
        }
    };

    let timeout = Duration::from_secs(flow.checker_timeout_secs);
    let started = Instant::now();

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return status.code().unwrap_or(1),
            Ok(None) => {
                if started.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    log::error!(
                        "Checker timed out ({}): {}",
                        timeout_label(flow.checker_timeout_secs),
                        task.item_id
                    );
                    return 1;
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                log::error!("Checker wait failed: {} - {e}", task.item_id);
                return 1;
            }
        }
    }
}

/// Remove previously generated artifacts so the run starts fresh.
///
/// Cleans the aggregated tables under `Work/Results/`, per-module result
/// directory contents (the directories stay), and the aggregated
/// `CheckList.log` / `CheckList.rpt`.
fn clean_generated(root: &Path, modules: &[String]) {
    let work_dir = root.join("Work");
    let results_dir = work_dir.join("Results");
    let _ = std::fs::create_dir_all(&results_dir);

    for name in ["Summary.csv", "Origin.xlsx", "Summary.xlsx"] {
        let path = results_dir.join(name);
        if path.exists() {
            match std::fs::remove_file(&path) {
                Ok(()) => log::info!("Removed previous file: {}", path.display()),
                Err(e) => log::warn!("Cannot remove {}: {e}", path.display()),
            }
        }
    }

    for module in modules {
        let module_dir = results_dir.join(module);
        if module_dir.is_dir() {
            if let Ok(entries) = std::fs::read_dir(&module_dir) {
                for entry in entries.filter_map(Result::ok) {
                    let path = entry.path();
                    let removed = if path.is_dir() {
                        std::fs::remove_dir_all(&path)
                    } else {
                        std::fs::remove_file(&path)
                    };
                    if let Err(e) = removed {
                        log::warn!("Could not clean {}: {e}", path.display());
                    }
                }
            }
        } else {
            let _ = std::fs::create_dir_all(&module_dir);
        }
    }

    for name in ["CheckList.log", "CheckList.rpt"] {
        let path = work_dir.join(name);
        if path.exists() {
            match std::fs::remove_file(&path) {
                Ok(()) => log::info!("Removed previous file: {}", path.display()),
                Err(e) => log::warn!("Cannot remove {}: {e}", path.display()),
            }
        }
    }
}

/// Run the distribution step unless skipped or absent.
fn run_distribution(opts: &FlowOptions) {
    if opts.skip_distribution {
        log::info!("{}", "=".repeat(70));
        log::info!("DEVELOPMENT MODE: DATA_INTERFACE Distribution SKIPPED");
        log::info!("Using existing input files - manual edits will be preserved");
        log::info!("This mode is for checker development/testing only");
        log::info!("{}", "=".repeat(70));
        return;
    }

    let interface_path = opts.root.join(DATA_INTERFACE_REL);
    if !interface_path.is_file() {
        log::warn!("DATA_INTERFACE not found: {}", interface_path.display());
        return;
    }

    log::info!("Distributing DATA_INTERFACE data to check modules...");
    match distribute::parse_and_distribute(
        &opts.root,
        opts.check_module.as_deref(),
        &opts.check_items,
    ) {
        Ok(stats) => log::info!(
            "DATA_INTERFACE distribution completed ({} written, {} unchanged)",
            stats.written,
            stats.skipped
        ),
        Err(e) => log::warn!("DATA_INTERFACE distribution failed: {e}"),
    }
}

/// Items to run for a module, honoring the CLI item filter.
fn items_for_module(
    opts: &FlowOptions,
    modules_map: &BTreeMap<String, Vec<String>>,
    module: &str,
) -> Vec<String> {
    if opts.check_module.is_some() && !opts.check_items.is_empty() {
        opts.check_items.clone()
    } else {
        modules_map.get(module).cloned().unwrap_or_default()
    }
}

/// Collect the runnable item tasks, skipping items with no config document.
fn collect_tasks(
    opts: &FlowOptions,
    modules: &[String],
    modules_map: &BTreeMap<String, Vec<String>>,
) -> Vec<ItemTask> {
    let mut tasks = Vec::new();
    for module in modules {
        for item_id in items_for_module(opts, modules_map, module) {
            let config_path = item_config_path(&opts.root, module, &item_id);
            if !config_path.is_file() {
                log::warn!("Checker config not found: {}", config_path.display());
                continue;
            }
            tasks.push(ItemTask {
                module: module.clone(),
                item_id,
            });
        }
    }
    tasks
}

/// Execute tasks on a dedicated pool, reporting per-completion progress.
///
/// Returns per-task return codes in task order.
fn execute_tasks(
    opts: &FlowOptions,
    flow: &FlowConfig,
    tasks: &[ItemTask],
    workers: usize,
) -> Vec<i32> {
    let total = tasks.len();
    let completed = AtomicUsize::new(0);

    let run_one = |task: &ItemTask| -> i32 {
        let rc = run_checker_child(opts, flow, task);
        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
        let mark = if rc == 0 { "PASS" } else { "FAIL" };
        log::info!("[{done}/{total}] {mark} {}/{}", task.module, task.item_id);
        rc
    };

    if workers <= 1 {
        return tasks.iter().map(run_one).collect();
    }

    match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool.install(|| tasks.par_iter().map(run_one).collect()),
        Err(e) => {
            log::warn!("Thread pool setup failed, running serially: {e}");
            tasks.iter().map(run_one).collect()
        }
    }
}

/// Item-level parallel execution across every selected module.
fn run_items_parallel(
    opts: &FlowOptions,
    flow: &FlowConfig,
    modules: &[String],
    modules_map: &BTreeMap<String, Vec<String>>,
    workers: usize,
) -> i32 {
    let tasks = collect_tasks(opts, modules, modules_map);
    if tasks.is_empty() {
        log::warn!("No checker items found to execute");
        return 1;
    }

    log::info!(
        "Item-level parallel execution: {} checker(s) with {} worker(s)",
        tasks.len(),
        workers
    );

    let started = Instant::now();
    let codes = execute_tasks(opts, flow, &tasks, workers);
    report_run_summary(&tasks, &codes, started.elapsed());

    first_nonzero(&codes)
}

/// Module-level execution: one sequential task per module, optionally with
/// modules themselves in parallel.
fn run_modules(
    opts: &FlowOptions,
    flow: &FlowConfig,
    modules: &[String],
    modules_map: &BTreeMap<String, Vec<String>>,
    workers: usize,
) -> i32 {
    log::info!(
        "Running {} module(s) with {} worker(s)",
        modules.len(),
        workers
    );

    let run_module = |module: &String| -> i32 {
        log::info!("Running module: {module}");
        let tasks = collect_tasks(opts, std::slice::from_ref(module), modules_map);
        let codes: Vec<i32> = tasks
            .iter()
            .map(|task| run_checker_child(opts, flow, task))
            .collect();
        first_nonzero(&codes)
    };

    let codes: Vec<i32> = if workers <= 1 {
        modules.iter().map(run_module).collect()
    } else {
        match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => pool.install(|| modules.par_iter().map(run_module).collect()),
            Err(e) => {
                log::warn!("Thread pool setup failed, running serially: {e}");
                modules.iter().map(run_module).collect()
            }
        }
    };

    for (module, rc) in modules.iter().zip(&codes) {
        if *rc == 0 {
            log::info!("Module {module} completed");
        } else {
            log::warn!("Module {module} failed (rc={rc})");
        }
    }

    first_nonzero(&codes)
}

/// End-of-run summary: totals, duration, and up to ten failed items.
fn report_run_summary(tasks: &[ItemTask], codes: &[i32], elapsed: Duration) {
    let failed: Vec<String> = tasks
        .iter()
        .zip(codes)
        .filter(|(_, rc)| **rc != 0)
        .map(|(task, _)| format!("{}/{}", task.module, task.item_id))
        .collect();
    let passed = codes.len() - failed.len();

    log::info!("Execution summary:");
    log::info!("  Total items: {}", codes.len());
    log::info!("  Passed: {passed}");
    log::info!("  Failed: {}", failed.len());
    if !codes.is_empty() {
        log::info!(
            "  Duration: {:.1}s (avg: {:.2}s per item)",
            elapsed.as_secs_f64(),
            elapsed.as_secs_f64() / codes.len() as f64
        );
    }

    if !failed.is_empty() && failed.len() <= 10 {
        log::warn!("Failed items:");
        for item in &failed {
            log::warn!("  - {item}");
        }
    }
}

fn first_nonzero(codes: &[i32]) -> i32 {
    codes.iter().copied().find(|rc| *rc != 0).unwrap_or(0)
}

/// The deterministic post-run aggregation sequence (steps 3-5 best-effort).
fn run_aggregation(root: &Path, modules_map: &BTreeMap<String, Vec<String>>) {
    match aggregate::aggregate_logs(root, modules_map) {
        Ok(path) => log::info!("Aggregated log written: {}", path.display()),
        Err(e) => log::warn!("Failed to generate aggregated log: {e}"),
    }

    match aggregate::aggregate_reports(root, modules_map) {
        Ok(path) => log::info!("Aggregated report written: {}", path.display()),
        Err(e) => log::warn!("Failed to generate aggregated report: {e}"),
    }

    let mut summaries = BTreeMap::new();
    for (module, items) in modules_map {
        if items.is_empty() {
            continue;
        }
        match aggregate::write_summary_yaml(root, module, items) {
            Ok((path, summary)) => {
                log::info!("Summary YAML written: {}", path.display());
                summaries.insert(module.clone(), summary);
            }
            Err(e) => log::warn!("Failed to generate summary YAML for {module}: {e}"),
        }
    }

    for (module, summary) in &summaries {
        match aggregate::write_module_csv(root, module, summary) {
            Ok(path) => log::info!("Tabular summary written: {}", path.display()),
            Err(e) => log::warn!("Failed to generate tabular summary for {module}: {e}"),
        }
    }

    if summaries.is_empty() {
        log::info!("No summaries from this run; skip aggregated table");
    } else {
        match aggregate::write_aggregate_csv(root, &summaries) {
            Ok(path) => log::info!("Aggregated summary written: {}", path.display()),
            Err(e) => log::warn!("Failed to build aggregated summary: {e}"),
        }
    }
}

/// Run the complete flow and return the process exit code.
///
/// `0` iff every item returned `0`; `2`-`5` for the planning failures;
/// otherwise the first non-zero child code observed.
#[must_use]
pub fn run_flow(opts: &FlowOptions) -> i32 {
    if !opts.root.is_dir() {
        log::error!("Root not found: {}", opts.root.display());
        return EXIT_ROOT_NOT_FOUND;
    }

    // Flow config: file layer, then CLI overrides. Cache configuration
    // problems degrade to defaults, they never kill the run.
    let mut flow = match FlowConfig::load_from_project(&opts.root) {
        Ok(flow) => flow,
        Err(e) => {
            log::warn!("Cache configuration failed, using defaults: {e}");
            FlowConfig::default()
        }
    };
    if opts.enable_file_cache {
        flow.enable_file_cache = true;
    }
    if let Some(dir) = &opts.cache_dir {
        flow.cache_dir = Some(dir.clone());
    }
    if let Some(size) = opts.max_cache_size {
        flow.max_cache_size = size;
    }

    if flow.enable_file_cache {
        let cache_dir = flow.effective_cache_dir(&opts.root);
        if let Err(e) = std::fs::create_dir_all(&cache_dir) {
            log::warn!("Cannot create cache dir {}: {e}", cache_dir.display());
        }
        log::info!("File cache enabled: {}", cache_dir.display());
        log::info!("Max memory cache size: {}", flow.max_cache_size);
    } else {
        log::info!(
            "Memory-only cache enabled (max size: {})",
            flow.max_cache_size
        );
    }

    // Load the module map.
    let modules_map = match config::load_modules_map(&opts.root, &opts.stage) {
        Ok(map) => map,
        Err(e) => {
            log::error!("Failed to obtain modules: {e}");
            return EXIT_CONFIG_LOAD;
        }
    };

    // Decide modules to run.
    let modules: Vec<String> = if let Some(module) = &opts.check_module {
        if !modules_map.contains_key(module) {
            log::error!("Module {module} not in config.");
            return EXIT_UNKNOWN_MODULE;
        }
        vec![module.clone()]
    } else {
        let all: Vec<String> = modules_map.keys().cloned().collect();
        if all.is_empty() {
            log::error!("No modules found in configuration.");
            return EXIT_NO_MODULES;
        }
        all
    };

    clean_generated(&opts.root, &modules);
    run_distribution(opts);

    let mode = decide_execution_mode(opts, modules.len());
    let total_items: usize = modules
        .iter()
        .map(|m| items_for_module(opts, &modules_map, m).len())
        .sum();
    let workers = match mode {
        ExecutionMode::ItemParallel => item_workers(total_items),
        ExecutionMode::ModuleParallel => optimal_module_workers(modules.len()),
        ExecutionMode::ModuleSerial => 1,
    };

    match mode {
        ExecutionMode::ItemParallel => {
            log::info!("Execution mode: Item-level parallel");
        }
        ExecutionMode::ModuleParallel => {
            log::info!("Execution mode: Module-level parallel");
        }
        ExecutionMode::ModuleSerial => {
            log::info!("Execution mode: Module-level serial");
        }
    }

    let overall_rc = match mode {
        ExecutionMode::ItemParallel => {
            run_items_parallel(opts, &flow, &modules, &modules_map, workers)
        }
        ExecutionMode::ModuleParallel | ExecutionMode::ModuleSerial => {
            run_modules(opts, &flow, &modules, &modules_map, workers)
        }
    };

    // Aggregation only covers the modules selected for this run.
    let selected_map: BTreeMap<String, Vec<String>> = modules
        .iter()
        .map(|m| (m.clone(), items_for_module(opts, &modules_map, m)))
        .collect();
    run_aggregation(&opts.root, &selected_map);

    report_cache_stats(opts, &flow, &selected_map);

    overall_rc
}

/// Cache statistics epilogue. The dispatcher replays every selected item
/// through a cache handle so the hit/miss counters reflect what the file
/// tier actually captured; under eviction pressure it suggests raising
/// `--max-cache-size`.
fn report_cache_stats(
    opts: &FlowOptions,
    flow: &FlowConfig,
    modules_map: &BTreeMap<String, Vec<String>>,
) {
    if !flow.enable_file_cache {
        return;
    }

    let mut cache =
        ResultCache::with_file_cache(flow.max_cache_size, flow.effective_cache_dir(&opts.root));
    for items in modules_map.values() {
        for item in items {
            let _ = cache.get(item);
        }
    }

    let stats = cache.stats();
    if opts.show_cache_stats || stats.total_requests() > 0 {
        log::info!("[CACHE STATS] {stats}");
    }
    if stats.evictions > 0 {
        log::info!(
            "[CACHE STATS] Evictions: {} (consider increasing --max-cache-size)",
            stats.evictions
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
