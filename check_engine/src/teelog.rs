//! TeeLogger — the `log` facade backend of the dispatcher process.
//!
//! Every record is appended to `Work/Checkflow.log`; only a curated subset
//! is mirrored to stderr so the terminal stays readable while the log file
//! keeps the full trace. Mirroring is allowlist-based: a message reaches
//! the terminal only when it carries one of the milestone fragments
//! (execution mode, run summary, distribution status, `[ERROR]`/`[WARN]`
//! lines); everything else, including the per-item completion lines, is
//! log-file-only. A short suppress list is consulted first so known
//! per-item warning noise never reaches the terminal even though it
//! carries a `[WARN]` tag. The file opens with a header carrying the
//! timestamp and the reconstructed command line.
//!
//! Checker children do not install this logger — they own their per-item
//! artifacts and their stdout/stderr is discarded by the dispatcher.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Messages containing any of these fragments stay in the log file only,
/// even though they carry a `[WARN]` tag. Checked before the allowlist.
const TERMINAL_SUPPRESS: &[&str] = &[
    "Checker directory not found",
    "Checker config not found",
    "Summary directory not found",
    "Failed to generate summary YAML",
    "Summary YAML missing",
];

/// Messages containing any of these fragments are mirrored to the
/// terminal. Everything else is log-file-only by default, which keeps the
/// hundreds of per-item completion lines out of the terminal on large
/// runs.
const TERMINAL_ALLOW: &[&str] = &[
    "DEVELOPMENT MODE",
    "SKIPPED",
    "Skipping",
    "Execution mode:",
    "Item-level parallel",
    "Executing checkers:",
    "Execution summary:",
    "Distributing DATA_INTERFACE",
    "DATA_INTERFACE distribution",
    "Processing",
    "[ERROR]",
    "[WARN]",
];

/// Tee logger writing to `Checkflow.log` and, filtered, to stderr.
pub struct TeeLogger {
    file: Mutex<File>,
}

impl TeeLogger {
    /// Open the log file, write the header, and install the logger.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the log file cannot be created, or a
    /// [`SetLoggerError`] wrapped as `InvalidInput` when a logger is
    /// already installed.
    pub fn init(log_path: &Path) -> std::io::Result<()> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(log_path)?;

        let command: Vec<String> = std::env::args().collect();
        writeln!(file, "===== CheckFlow Execution Log =====")?;
        writeln!(
            file,
            "Timestamp: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(file, "Command: {}", command.join(" "))?;
        writeln!(file)?;

        let logger = Self {
            file: Mutex::new(file),
        };
        install(Box::new(logger)).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
        })
    }
}

fn install(logger: Box<TeeLogger>) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(logger)?;
    log::set_max_level(LevelFilter::Info);
    Ok(())
}

/// Whether a formatted message should be mirrored to the terminal.
///
/// Suppress list first (per-item warning noise), then the milestone
/// allowlist; anything matching neither stays in the log file.
fn mirror_to_terminal(message: &str) -> bool {
    if TERMINAL_SUPPRESS
        .iter()
        .any(|fragment| message.contains(fragment))
    {
        return false;
    }

    TERMINAL_ALLOW
        .iter()
        .any(|fragment| message.contains(fragment))
}

/// Bracketed level prefix used throughout the flow log.
fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "[ERROR]",
        Level::Warn => "[WARN]",
        Level::Info => "[INFO]",
        Level::Debug => "[DEBUG]",
        Level::Trace => "[TRACE]",
    }
}

impl Log for TeeLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let message = format!("{} {}", level_tag(record.level()), record.args());

        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{message}");
            let _ = file.flush();
        }

        if mirror_to_terminal(&message) {
            eprintln!("{message}");
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
