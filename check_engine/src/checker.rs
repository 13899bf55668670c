//! Checker base — per-item lifecycle, input validation, and the 4-way
//! behavioural type detection.
//!
//! Every check item runs through the same lifecycle: resolve paths, load
//! the item config, validate input files, run the registered checker's
//! `execute_check`, persist the log and report artifacts, publish the
//! result to the cache, and map the outcome to a process exit code
//! (0 pass, 1 fail, 2 configuration error, 3 unexpected error).
//!
//! A panic inside a checker is caught and mapped to exit code 3 so one
//! broken checker never takes down anything beyond its own child process.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use crate::cache::ResultCache;
use crate::config::{self, ConfigError, ItemConfig};
use crate::formatter;
use crate::parser::ParserError;
use crate::types::{CheckResult, CONFIG_ERROR_MARKER};
use crate::waivers::{parse_waive_items, WaiveMap};

/// Child process exit code for a passing item.
pub const EXIT_PASS: i32 = 0;
/// Child process exit code for a failing item (including execution errors).
pub const EXIT_FAIL: i32 = 1;
/// Child process exit code for a configuration error.
pub const EXIT_CONFIG_ERROR: i32 = 2;
/// Child process exit code for an unexpected exception (panic).
pub const EXIT_UNEXPECTED: i32 = 3;

/// Errors raised while executing a single check item.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// Configuration problem (missing/malformed YAML, absent fields).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Input parsing failed.
    #[error(transparent)]
    Parser(#[from] ParserError),

    /// Any other failure inside `execute_check`.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Artifact write failure.
    #[error("Failed to write '{0}': {1}")]
    Write(String, #[source] std::io::Error),
}

/// The four behavioural checker types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckerType {
    /// Boolean existence check (no requirement value, no active waivers).
    Type1,
    /// Pattern-based value check.
    Type2,
    /// Pattern check with waivers.
    Type3,
    /// Boolean check with waivers.
    Type4,
}

impl CheckerType {
    /// The numeric type code (1-4).
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Type1 => 1,
            Self::Type2 => 2,
            Self::Type3 => 3,
            Self::Type4 => 4,
        }
    }
}

/// Detect the behavioural type from an item config.
///
/// Total over every configuration: a positive `waivers.value` selects the
/// waiver types (4 when `requirements.value` is N/A, else 3); otherwise a
/// N/A requirement selects Type 1 and any integer requirement Type 2.
#[must_use]
pub fn detect_checker_type(config: &ItemConfig) -> CheckerType {
    let req_is_na = config.requirements.value == config::ConfigValue::NotApplicable;

    if config.waivers.value.is_positive() {
        if req_is_na {
            CheckerType::Type4
        } else {
            CheckerType::Type3
        }
    } else if req_is_na {
        CheckerType::Type1
    } else {
        CheckerType::Type2
    }
}

/// Whether the item runs in waiver display mode: Types 1/2 with
/// `waivers.value = 0`, where violations render as tagged INFO and the
/// item is forced to PASS.
#[must_use]
pub fn is_display_mode(config: &ItemConfig) -> bool {
    matches!(
        detect_checker_type(config),
        CheckerType::Type1 | CheckerType::Type2
    ) && config.waivers.value.is_zero()
}

/// Everything a checker needs to run one item: resolved paths plus the
/// loaded, immutable item config. The result cache is injected separately
/// by the caller — there is no hidden global state.
#[derive(Debug)]
pub struct CheckerContext {
    /// Checklist root.
    pub root: PathBuf,
    /// Per-run work directory (`<root>/Work`).
    pub work_dir: PathBuf,
    /// Module this item belongs to.
    pub check_module: String,
    /// Canonical item identifier.
    pub item_id: String,
    /// Module inputs directory.
    pub module_inputs: PathBuf,
    /// Per-item log artifact path.
    pub log_path: PathBuf,
    /// Per-item report artifact path.
    pub report_path: PathBuf,
    /// The item configuration, loaded once and never mutated.
    pub config: ItemConfig,
}

impl CheckerContext {
    /// Resolve paths and load the item config.
    ///
    /// # Errors
    ///
    /// Returns an error when the item config cannot be loaded.
    pub fn new(root: &Path, check_module: &str, item_id: &str) -> Result<Self, ConfigError> {
        let config = config::load_item_config(root, check_module, item_id)?;
        let module_dir = root.join("Check_modules").join(check_module);

        Ok(Self {
            root: root.to_path_buf(),
            work_dir: root.join("Work"),
            check_module: check_module.to_owned(),
            item_id: item_id.to_owned(),
            module_inputs: module_dir.join("inputs"),
            log_path: item_log_path(root, check_module, item_id),
            report_path: item_report_path(root, check_module, item_id),
            config,
        })
    }

    /// The detected behavioural type of this item.
    #[must_use]
    pub fn checker_type(&self) -> CheckerType {
        detect_checker_type(&self.config)
    }

    /// Whether this item runs in waiver display mode.
    #[must_use]
    pub fn display_mode(&self) -> bool {
        is_display_mode(&self.config)
    }

    /// Parsed waiver declarations of this item.
    #[must_use]
    pub fn waive_map(&self) -> WaiveMap {
        parse_waive_items(&self.config.waivers.waive_items)
    }

    /// Resolve and partition `input_files` into `(valid, missing)`.
    ///
    /// `${CHECKLIST_ROOT}` placeholders resolve to the checklist root;
    /// relative entries anchor there too. Missing entries are reported in
    /// resolved display form.
    #[must_use]
    pub fn validate_input_files(&self) -> (Vec<PathBuf>, Vec<String>) {
        let mut valid = Vec::new();
        let mut missing = Vec::new();

        for entry in &self.config.input_files {
            let path = config::resolve_input_path(&self.root, entry);
            if path.is_file() {
                valid.push(path);
            } else {
                missing.push(path.display().to_string());
            }
        }

        (valid, missing)
    }

    /// Prebuilt configuration-error result for missing input files.
    #[must_use]
    pub fn create_missing_files_error(&self, missing: &[String]) -> CheckResult {
        let errors = missing
            .iter()
            .map(|file| format!("{CONFIG_ERROR_MARKER}: Input file not found: {file}"))
            .collect();
        CheckResult::config_error(self.config.item_desc.clone(), errors)
    }
}

/// Per-item log artifact path.
#[must_use]
pub fn item_log_path(root: &Path, module: &str, item_id: &str) -> PathBuf {
    root.join("Check_modules")
        .join(module)
        .join("outputs")
        .join("logs")
        .join(format!("{item_id}.log"))
}

/// Per-item report artifact path.
#[must_use]
pub fn item_report_path(root: &Path, module: &str, item_id: &str) -> PathBuf {
    root.join("Check_modules")
        .join(module)
        .join("outputs")
        .join("reports")
        .join(format!("{item_id}.rpt"))
}

/// Persist both artifacts and publish the result to the cache.
///
/// Returns `false` when an artifact write failed (the item counts as
/// failed); the cache publish still happens so late consumers see the
/// result.
fn persist(result: &CheckResult, ctx_paths: (&Path, &Path), item_id: &str, cache: &mut ResultCache) -> bool {
    let (log_path, report_path) = ctx_paths;
    let mut ok = true;

    if let Err(e) = formatter::write_log(result, item_id, log_path) {
        log::error!("Failed to write log {}: {}", log_path.display(), e);
        ok = false;
    }
    if let Err(e) = formatter::write_report(result, item_id, report_path) {
        log::error!("Failed to write report {}: {}", report_path.display(), e);
        ok = false;
    }

    cache.set(item_id, result.clone());
    ok
}

/// Execute one check item end to end and return its exit code.
///
/// This is the body of the `run-item` child process: load config, validate
/// inputs, run the registered checker, write artifacts, publish to the
/// cache. Never panics outward — checker panics map to [`EXIT_UNEXPECTED`].
pub fn run_item(root: &Path, check_module: &str, item_id: &str, cache: &mut ResultCache) -> i32 {
    let log_path = item_log_path(root, check_module, item_id);
    let report_path = item_report_path(root, check_module, item_id);

    let ctx = match CheckerContext::new(root, check_module, item_id) {
        Ok(ctx) => ctx,
        Err(e) => {
            let result = CheckResult::config_error(
                String::new(),
                vec![format!("{CONFIG_ERROR_MARKER}: {e}")],
            );
            persist(&result, (&log_path, &report_path), item_id, cache);
            return EXIT_CONFIG_ERROR;
        }
    };

    let checker = crate::checkers::checker_for(item_id);
    let outcome = catch_unwind(AssertUnwindSafe(|| checker.execute_check(&ctx)));

    let (result, rc) = match outcome {
        Ok(Ok(result)) => {
            let rc = if result.is_config_error() {
                EXIT_CONFIG_ERROR
            } else if result.is_pass {
                EXIT_PASS
            } else {
                EXIT_FAIL
            };
            (result, rc)
        }
        Ok(Err(e)) => (
            CheckResult::execution_error(ctx.config.item_desc.clone(), e.to_string()),
            EXIT_FAIL,
        ),
        Err(panic_info) => {
            let msg = if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else if let Some(s) = panic_info.downcast_ref::<&str>() {
                (*s).to_owned()
            } else {
                "unknown panic".to_owned()
            };
            (
                CheckResult::execution_error(
                    ctx.config.item_desc.clone(),
                    format!("Unexpected error in checker '{}': {msg}", checker.name()),
                ),
                EXIT_UNEXPECTED,
            )
        }
    };

    let wrote = persist(&result, (&ctx.log_path, &ctx.report_path), item_id, cache);
    if !wrote && rc == EXIT_PASS {
        return EXIT_FAIL;
    }
    rc
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigValue, Requirements, Waivers};
    use indoc::indoc;
    use tempfile::tempdir;

    fn config_with(req: ConfigValue, patterns: &[&str], waiver: ConfigValue) -> ItemConfig {
        ItemConfig {
            item_desc: "test".to_owned(),
            requirements: Requirements {
                value: req,
                pattern_items: patterns.iter().map(|s| (*s).to_owned()).collect(),
            },
            waivers: Waivers {
                value: waiver,
                waive_items: Vec::new(),
            },
            input_files: Vec::new(),
        }
    }

    #[test]
    fn test_detect_checker_type_table() {
        use ConfigValue::{Count, NotApplicable as NA};

        assert_eq!(
            detect_checker_type(&config_with(NA, &[], NA)),
            CheckerType::Type1
        );
        assert_eq!(
            detect_checker_type(&config_with(NA, &[], Count(0))),
            CheckerType::Type1
        );
        assert_eq!(
            detect_checker_type(&config_with(Count(2), &["a"], NA)),
            CheckerType::Type2
        );
        assert_eq!(
            detect_checker_type(&config_with(Count(2), &["a"], Count(0))),
            CheckerType::Type2
        );
        assert_eq!(
            detect_checker_type(&config_with(Count(2), &["a"], Count(1))),
            CheckerType::Type3
        );
        assert_eq!(
            detect_checker_type(&config_with(NA, &[], Count(1))),
            CheckerType::Type4
        );
        // requirements.value = 0 classifies with the integer rows.
        assert_eq!(
            detect_checker_type(&config_with(Count(0), &[], NA)),
            CheckerType::Type2
        );
    }

    #[test]
    fn test_display_mode_only_for_waiver_zero() {
        use ConfigValue::{Count, NotApplicable as NA};

        assert!(is_display_mode(&config_with(NA, &[], Count(0))));
        assert!(is_display_mode(&config_with(Count(1), &["a"], Count(0))));
        assert!(!is_display_mode(&config_with(NA, &[], NA)));
        assert!(!is_display_mode(&config_with(NA, &[], Count(1))));
        assert!(!is_display_mode(&config_with(Count(1), &["a"], Count(2))));
    }

    #[test]
    fn test_checker_type_codes() {
        assert_eq!(CheckerType::Type1.code(), 1);
        assert_eq!(CheckerType::Type4.code(), 4);
    }

    fn write_item_config(root: &Path, module: &str, item: &str, body: &str) {
        let path = config::item_config_path(root, module, item);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn test_context_paths_and_validation() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("reports")).unwrap();
        std::fs::write(dir.path().join("reports").join("clean.rpt"), "ok\n").unwrap();
        write_item_config(
            dir.path(),
            "5.0_SYNTHESIS_CHECK",
            "IMP-5-0-0-00",
            indoc! {"
                item_desc: desc
                input_files:
                  - ${CHECKLIST_ROOT}/reports/clean.rpt
                  - reports/absent.rpt
            "},
        );

        let ctx = CheckerContext::new(dir.path(), "5.0_SYNTHESIS_CHECK", "IMP-5-0-0-00").unwrap();
        assert!(ctx.log_path.ends_with(
            Path::new("Check_modules/5.0_SYNTHESIS_CHECK/outputs/logs/IMP-5-0-0-00.log")
        ));
        assert!(ctx.report_path.ends_with(
            Path::new("Check_modules/5.0_SYNTHESIS_CHECK/outputs/reports/IMP-5-0-0-00.rpt")
        ));

        let (valid, missing) = ctx.validate_input_files();
        assert_eq!(valid.len(), 1);
        assert_eq!(missing.len(), 1);
        assert!(missing[0].ends_with("absent.rpt"));
    }

    #[test]
    fn test_missing_files_error_shape() {
        let dir = tempdir().unwrap();
        write_item_config(dir.path(), "M", "I", "item_desc: d\n");
        let ctx = CheckerContext::new(dir.path(), "M", "I").unwrap();
        let result = ctx.create_missing_files_error(&["does_not_exist.rpt".to_owned()]);
        assert!(result.is_config_error());
        assert_eq!(
            result.basic_errors.as_ref().unwrap()[0],
            "[CONFIG_ERROR]: Input file not found: does_not_exist.rpt"
        );
    }

    #[test]
    fn test_run_item_missing_config_exits_2() {
        let dir = tempdir().unwrap();
        let mut cache = ResultCache::new(10);
        let rc = run_item(dir.path(), "M", "ABSENT", &mut cache);
        assert_eq!(rc, EXIT_CONFIG_ERROR);
        // The config-error artifact was still written.
        let log = std::fs::read_to_string(item_log_path(dir.path(), "M", "ABSENT")).unwrap();
        assert!(log.starts_with("[CONFIG_ERROR]:ABSENT:"));
    }

    #[test]
    fn test_run_item_missing_input_file_exits_2() {
        let dir = tempdir().unwrap();
        write_item_config(
            dir.path(),
            "M",
            "I",
            "item_desc: d\ninput_files:\n  - does_not_exist.rpt\n",
        );
        let mut cache = ResultCache::new(10);
        let rc = run_item(dir.path(), "M", "I", &mut cache);
        assert_eq!(rc, EXIT_CONFIG_ERROR);

        let log = std::fs::read_to_string(item_log_path(dir.path(), "M", "I")).unwrap();
        assert!(log.starts_with("[CONFIG_ERROR]:I:d"));
        assert!(log.contains("[CONFIG_ERROR]: Input file not found:"));
        assert!(cache.get("I").is_some());
    }

    #[test]
    fn test_run_item_clean_type1_passes() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("reports")).unwrap();
        std::fs::write(dir.path().join("reports").join("clean.rpt"), "all good\n").unwrap();
        write_item_config(
            dir.path(),
            "M",
            "IMP-X",
            indoc! {"
                item_desc: desc
                input_files:
                  - reports/clean.rpt
            "},
        );

        let mut cache = ResultCache::new(10);
        let rc = run_item(dir.path(), "M", "IMP-X", &mut cache);
        assert_eq!(rc, EXIT_PASS);

        let log = std::fs::read_to_string(item_log_path(dir.path(), "M", "IMP-X")).unwrap();
        assert!(log.starts_with("PASS:IMP-X:desc"));
        let rpt = std::fs::read_to_string(item_report_path(dir.path(), "M", "IMP-X")).unwrap();
        assert!(rpt.starts_with("PASS:IMP-X:desc"));
    }
}
