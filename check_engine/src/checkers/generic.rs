//! Data-driven checker covering the four behavioural types from the item
//! config alone.
//!
//! The generic checker interprets input reports with a fixed contract:
//!
//! - a **violation** is any line opening with `ERROR`/`FATAL`
//! - a **required pattern** (Type 2/3) is satisfied when some input file
//!   matches it
//!
//! Type 1 scans every input file and fails on violations; Type 2 requires
//! every `pattern_items` entry to match and reports stray violations as
//! extras; Types 3/4 additionally classify failures against the declared
//! waivers. Types 1/2 with `waivers.value = 0` run in display mode, where
//! all failing evidence collapses to tagged INFO and the item passes.

use std::path::PathBuf;

use crate::builder::{build_complete_output, ItemMeta, ItemSet, OutputSpec, ReasonSpec};
use crate::checker::{CheckError, CheckerContext, CheckerType};
use crate::checkers::Checker;
use crate::parser;
use crate::types::{CheckResult, CheckValue, DetailItem, Group, Severity, TAG_WAIVED_INFO};
use crate::waivers::classify_violations;

/// Lines opening with these markers count as violations.
const VIOLATION_PATTERN: &str = r"^\s*\**\s*(ERROR|FATAL)\b";

const FOUND_DESC_TYPE1_4: &str = "Input reports are clean";
const FOUND_REASON_TYPE1_4: &str = "No violations found in report";
const MISSING_DESC_TYPE1_4: &str = "Violations found in input reports";
const MISSING_REASON_TYPE1_4: &str = "Violation reported";

const FOUND_DESC_TYPE2_3: &str = "Required patterns found and verified";
const FOUND_REASON_TYPE2_3: &str = "Required pattern matched";
const MISSING_DESC_TYPE2_3: &str = "Missing required patterns";
const MISSING_REASON_TYPE2_3: &str = "Required pattern NOT found";

const WAIVED_DESC: &str = "Violations waived";
const UNUSED_DESC: &str = "Unused waivers";
const EXTRA_DESC: &str = "Unexpected violations need review";
const EXTRA_REASON: &str = "Unexpected violation found";

const WAIVED_INFO_DESC: &str = "[WAIVED_INFO]: Waived information";
const WAIVED_INFO_BASE_REASON: &str = "Waiver item";

/// The default, config-interpreting checker.
pub struct GenericChecker;

impl Checker for GenericChecker {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn execute_check(&self, ctx: &CheckerContext) -> Result<CheckResult, CheckError> {
        let (valid, missing) = ctx.validate_input_files();
        if !missing.is_empty() {
            return Ok(ctx.create_missing_files_error(&missing));
        }

        match ctx.checker_type() {
            CheckerType::Type1 => execute_type1(ctx, &valid),
            CheckerType::Type2 => execute_type2(ctx, &valid),
            CheckerType::Type3 => execute_type3(ctx, &valid),
            CheckerType::Type4 => execute_type4(ctx, &valid),
        }
    }
}

/// Scan input files for violation lines; returns `(violations, clean_files)`.
fn scan_violations(files: &[PathBuf]) -> Result<(ItemSet, ItemSet), CheckError> {
    let mut violations = ItemSet::default();
    let mut clean = ItemSet::default();

    for file in files {
        let hits = parser::count_pattern(file, VIOLATION_PATTERN, false, true)?;
        if hits.count == 0 {
            clean.insert(
                file.display().to_string(),
                ItemMeta {
                    line_number: 0,
                    file_path: Some(file.display().to_string()),
                    line_content: String::new(),
                },
            );
            continue;
        }
        for hit in hits.matches {
            violations.insert(
                hit.line_content.clone(),
                ItemMeta {
                    line_number: hit.line_number,
                    file_path: Some(hit.file_path),
                    line_content: hit.line_content,
                },
            );
        }
    }

    Ok((violations, clean))
}

/// Search every input file for each required pattern (first file wins);
/// returns `(found, missing)` keyed by pattern text.
fn scan_required_patterns(
    files: &[PathBuf],
    patterns: &[String],
    default_file: &str,
) -> Result<(ItemSet, ItemSet), CheckError> {
    let mut found = ItemSet::default();
    let mut still_missing: Vec<&String> = patterns.iter().collect();

    for file in files {
        if still_missing.is_empty() {
            break;
        }
        let pairs: Vec<(&str, &str)> = still_missing
            .iter()
            .map(|p| (p.as_str(), p.as_str()))
            .collect();
        let scan = parser::parse_log_with_patterns(file, &pairs, None, true, false)?;
        for (name, hit) in scan.found {
            found.insert(
                name.clone(),
                ItemMeta {
                    line_number: hit.line_number,
                    file_path: Some(hit.file_path),
                    line_content: hit.line_content,
                },
            );
            still_missing.retain(|p| **p != name);
        }
    }

    let mut missing = ItemSet::default();
    for pattern in still_missing {
        missing.insert(
            pattern.clone(),
            ItemMeta {
                line_number: 0,
                file_path: Some(default_file.to_owned()),
                line_content: String::new(),
            },
        );
    }

    Ok((found, missing))
}

/// Display-mode waive entries as an item set plus their declared reasons.
fn display_mode_waives(ctx: &CheckerContext) -> (Option<ItemSet>, crate::waivers::WaiveMap) {
    let waive_dict = ctx.waive_map();
    if waive_dict.is_empty() {
        (None, waive_dict)
    } else {
        let set = ItemSet::from_names(waive_dict.keys().map(str::to_owned).collect::<Vec<_>>());
        (Some(set), waive_dict)
    }
}

/// Type 1 — boolean existence check over the input reports.
fn execute_type1(ctx: &CheckerContext, files: &[PathBuf]) -> Result<CheckResult, CheckError> {
    let (violations, clean) = scan_violations(files)?;
    let display = ctx.display_mode();
    let (waived, waive_dict) = if display {
        display_mode_waives(ctx)
    } else {
        (None, crate::waivers::WaiveMap::default())
    };

    Ok(build_complete_output(OutputSpec {
        found_items: Some(clean),
        missing_items: Some(violations),
        waived_items: waived,
        waive_dict,
        value: Some(CheckValue::NotApplicable),
        convert_to_info: display,
        waived_tag: TAG_WAIVED_INFO.to_owned(),
        waived_base_reason: WAIVED_INFO_BASE_REASON.to_owned(),
        waived_desc: WAIVED_INFO_DESC.to_owned(),
        found_reason: ReasonSpec::text(FOUND_REASON_TYPE1_4),
        missing_reason: violation_reason(),
        found_desc: FOUND_DESC_TYPE1_4.to_owned(),
        missing_desc: MISSING_DESC_TYPE1_4.to_owned(),
        item_desc: ctx.config.item_desc.clone(),
        ..OutputSpec::default()
    }))
}

/// Type 2 — pattern-based value check.
fn execute_type2(ctx: &CheckerContext, files: &[PathBuf]) -> Result<CheckResult, CheckError> {
    let patterns = &ctx.config.requirements.pattern_items;
    if patterns.is_empty() {
        return Ok(golden_value_missing(ctx));
    }

    let default_file = first_file_display(files);
    let (found, missing) = scan_required_patterns(files, patterns, &default_file)?;
    let (violations, _) = scan_violations(files)?;
    let extras = violations_outside_patterns(&violations, patterns);

    let display = ctx.display_mode();
    let (waived, waive_dict) = if display {
        display_mode_waives(ctx)
    } else {
        (None, crate::waivers::WaiveMap::default())
    };

    Ok(build_complete_output(OutputSpec {
        found_items: Some(found),
        missing_items: Some(missing),
        extra_items: Some(extras),
        extra_severity: Some(Severity::Fail),
        extra_reason: ReasonSpec::text(EXTRA_REASON),
        extra_desc: EXTRA_DESC.to_owned(),
        waived_items: waived,
        waive_dict,
        has_pattern_items: true,
        convert_to_info: display,
        waived_tag: TAG_WAIVED_INFO.to_owned(),
        waived_base_reason: WAIVED_INFO_BASE_REASON.to_owned(),
        waived_desc: WAIVED_INFO_DESC.to_owned(),
        default_file,
        found_reason: ReasonSpec::text(FOUND_REASON_TYPE2_3),
        missing_reason: ReasonSpec::text(MISSING_REASON_TYPE2_3),
        found_desc: FOUND_DESC_TYPE2_3.to_owned(),
        missing_desc: MISSING_DESC_TYPE2_3.to_owned(),
        item_desc: ctx.config.item_desc.clone(),
        ..OutputSpec::default()
    }))
}

/// Type 3 — pattern check with waivers: missing patterns and stray
/// violations both classify against the waiver declarations.
fn execute_type3(ctx: &CheckerContext, files: &[PathBuf]) -> Result<CheckResult, CheckError> {
    let patterns = &ctx.config.requirements.pattern_items;
    let default_file = first_file_display(files);
    let (found, missing) = scan_required_patterns(files, patterns, &default_file)?;
    let (violations, _) = scan_violations(files)?;
    let extras = violations_outside_patterns(&violations, patterns);

    let mut all_violations = missing.names();
    all_violations.extend(extras.names());

    let waive_dict = ctx.waive_map();
    let split = classify_violations(&all_violations, &waive_dict);

    let meta_of = |name: &str| -> ItemMeta {
        lookup_meta(name, &[&missing, &extras], &default_file)
    };

    Ok(build_complete_output(OutputSpec {
        found_items: Some(found),
        missing_items: Some(set_from(&split.unwaived, &meta_of)),
        waived_items: Some(set_from(&split.waived, &meta_of)),
        unused_waivers: Some(ItemSet::from_names(split.unused.clone())),
        waive_dict,
        has_pattern_items: true,
        has_waiver_value: true,
        default_file,
        found_reason: ReasonSpec::text(FOUND_REASON_TYPE2_3),
        missing_reason: ReasonSpec::text(MISSING_REASON_TYPE2_3),
        waived_base_reason: MISSING_REASON_TYPE2_3.to_owned(),
        found_desc: FOUND_DESC_TYPE2_3.to_owned(),
        missing_desc: MISSING_DESC_TYPE2_3.to_owned(),
        waived_desc: WAIVED_DESC.to_owned(),
        unused_desc: UNUSED_DESC.to_owned(),
        item_desc: ctx.config.item_desc.clone(),
        ..OutputSpec::default()
    }))
}

/// Type 4 — boolean check with waivers.
fn execute_type4(ctx: &CheckerContext, files: &[PathBuf]) -> Result<CheckResult, CheckError> {
    let (violations, clean) = scan_violations(files)?;
    let default_file = first_file_display(files);

    let waive_dict = ctx.waive_map();
    let split = classify_violations(&violations.names(), &waive_dict);

    let meta_of = |name: &str| -> ItemMeta { lookup_meta(name, &[&violations], &default_file) };

    Ok(build_complete_output(OutputSpec {
        found_items: Some(clean),
        missing_items: Some(set_from(&split.unwaived, &meta_of)),
        waived_items: Some(set_from(&split.waived, &meta_of)),
        unused_waivers: Some(ItemSet::from_names(split.unused.clone())),
        waive_dict,
        value: Some(CheckValue::NotApplicable),
        has_waiver_value: true,
        default_file,
        found_reason: ReasonSpec::text(FOUND_REASON_TYPE1_4),
        missing_reason: violation_reason(),
        waived_base_reason: MISSING_REASON_TYPE1_4.to_owned(),
        found_desc: FOUND_DESC_TYPE1_4.to_owned(),
        missing_desc: MISSING_DESC_TYPE1_4.to_owned(),
        waived_desc: WAIVED_DESC.to_owned(),
        unused_desc: UNUSED_DESC.to_owned(),
        item_desc: ctx.config.item_desc.clone(),
        ..OutputSpec::default()
    }))
}

/// "Golden value expected but not provided": requirement value is an
/// integer but no pattern items were configured. Reported as a warning,
/// the item still passes.
fn golden_value_missing(ctx: &CheckerContext) -> CheckResult {
    let mut result = CheckResult::new(
        CheckValue::Count(0),
        true,
        false,
        false,
        ctx.config.item_desc.clone(),
    );
    result.details.push(DetailItem::unlocated(
        Severity::Warn,
        "",
        "Golden value expected but not provided",
    ));
    result.warn_groups.insert(
        "WARN01".to_owned(),
        Group::new("Configuration Warning", Vec::new()),
    );
    result
}

/// Violation lines not covered by any required pattern.
fn violations_outside_patterns(violations: &ItemSet, patterns: &[String]) -> ItemSet {
    let regexes: Vec<regex::Regex> = patterns
        .iter()
        .filter_map(|p| {
            regex::RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .ok()
        })
        .collect();

    let mut extras = ItemSet::default();
    for name in violations.names() {
        if regexes.iter().any(|re| re.is_match(&name)) {
            continue;
        }
        extras.insert(name.clone(), lookup_meta(&name, &[violations], "N/A"));
    }
    extras
}

/// Per-violation reason carrying the matched line.
fn violation_reason() -> ReasonSpec {
    ReasonSpec::Fn(Box::new(|name, meta| {
        if meta.line_content.is_empty() {
            format!("{MISSING_REASON_TYPE1_4}: {name}")
        } else {
            format!("{MISSING_REASON_TYPE1_4}: {}", meta.line_content)
        }
    }))
}

/// Display form of the first input file, used as the default evidence path.
fn first_file_display(files: &[PathBuf]) -> String {
    files
        .first()
        .map_or_else(|| "N/A".to_owned(), |f| f.display().to_string())
}

/// Metadata for `name` from the first set that knows it.
fn lookup_meta(name: &str, sets: &[&ItemSet], default_file: &str) -> ItemMeta {
    for set in sets {
        if let Some(meta) = set.meta(name) {
            return meta.clone();
        }
    }
    ItemMeta {
        line_number: 0,
        file_path: Some(default_file.to_owned()),
        line_content: String::new(),
    }
}

fn set_from(names: &[String], meta_of: &dyn Fn(&str) -> ItemMeta) -> ItemSet {
    let mut set = ItemSet::default();
    for name in names {
        set.insert(name.clone(), meta_of(name));
    }
    set
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::CheckerContext;
    use crate::config;
    use indoc::indoc;
    use std::path::Path;
    use tempfile::tempdir;

    fn setup(dir: &Path, config_body: &str, reports: &[(&str, &str)]) -> CheckerContext {
        for (name, content) in reports {
            let path = dir.join("reports").join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        let cfg_path = config::item_config_path(dir, "MOD", "IMP-T");
        std::fs::create_dir_all(cfg_path.parent().unwrap()).unwrap();
        std::fs::write(cfg_path, config_body).unwrap();
        CheckerContext::new(dir, "MOD", "IMP-T").unwrap()
    }

    #[test]
    fn test_type1_pass_clean_report() {
        let dir = tempdir().unwrap();
        let ctx = setup(
            dir.path(),
            indoc! {"
                item_desc: desc
                input_files:
                  - reports/clean.rpt
            "},
            &[("clean.rpt", "all checks ok\nnothing to see\n")],
        );

        let result = GenericChecker.execute_check(&ctx).unwrap();
        assert!(result.is_pass);
        assert_eq!(result.value, CheckValue::NotApplicable);
        assert_eq!(result.occurrence(Severity::Fail), 0);
        assert_eq!(
            result.info_groups["INFO01"].description,
            FOUND_DESC_TYPE1_4
        );
    }

    #[test]
    fn test_type1_fails_on_violations() {
        let dir = tempdir().unwrap();
        let ctx = setup(
            dir.path(),
            indoc! {"
                item_desc: desc
                input_files:
                  - reports/dirty.rpt
            "},
            &[("dirty.rpt", "ok line\nERROR: short on pin X\n")],
        );

        let result = GenericChecker.execute_check(&ctx).unwrap();
        assert!(!result.is_pass);
        assert_eq!(result.occurrence(Severity::Fail), 1);
        let fail = &result.details.iter().find(|d| d.severity == Severity::Fail).unwrap();
        assert_eq!(fail.name, "ERROR: short on pin X");
        assert_eq!(fail.line_number, 2);
        assert_eq!(
            result.error_groups["ERROR01"].description,
            MISSING_DESC_TYPE1_4
        );
    }

    #[test]
    fn test_type1_display_mode_converts_to_info() {
        let dir = tempdir().unwrap();
        let ctx = setup(
            dir.path(),
            indoc! {"
                item_desc: desc
                waivers:
                  value: 0
                  waive_items:
                    - known tool noise
                input_files:
                  - reports/dirty.rpt
            "},
            &[("dirty.rpt", "ERROR: noise\n")],
        );

        let result = GenericChecker.execute_check(&ctx).unwrap();
        assert!(result.is_pass);
        assert!(result.error_groups.is_empty());
        assert!(result.warn_groups.is_empty());
        assert!(result
            .details
            .iter()
            .all(|d| d.severity == Severity::Info));
        assert!(result
            .details
            .iter()
            .any(|d| d.reason.contains("[WAIVED_AS_INFO]")));
        assert!(result
            .details
            .iter()
            .any(|d| d.reason.contains("[WAIVED_INFO]")));
    }

    #[test]
    fn test_type2_missing_pattern_fails() {
        let dir = tempdir().unwrap();
        let ctx = setup(
            dir.path(),
            indoc! {"
                item_desc: desc
                requirements:
                  value: 2
                  pattern_items:
                    - timing_in2out
                    - timing_in2reg
                input_files:
                  - reports/sta.log
            "},
            &[("sta.log", "report > timing_in2out.rpt\n")],
        );

        let result = GenericChecker.execute_check(&ctx).unwrap();
        assert!(!result.is_pass);
        assert_eq!(
            result.error_groups["ERROR01"].items,
            vec!["timing_in2reg"]
        );
        assert_eq!(result.value, CheckValue::Count(1));
    }

    #[test]
    fn test_type2_extra_violation_fails() {
        let dir = tempdir().unwrap();
        let ctx = setup(
            dir.path(),
            indoc! {"
                item_desc: desc
                requirements:
                  value: 2
                  pattern_items:
                    - pattern_a
                    - pattern_b
                input_files:
                  - reports/run.log
            "},
            &[(
                "run.log",
                "pattern_a seen\npattern_b seen\nERROR: stray violation C\n",
            )],
        );

        let result = GenericChecker.execute_check(&ctx).unwrap();
        // All patterns found, but the stray violation fails the item.
        assert!(!result.is_pass);
        assert_eq!(
            result.error_groups["ERROR01"].items,
            vec!["ERROR: stray violation C"]
        );
        assert_eq!(result.value, CheckValue::Count(2));
    }

    #[test]
    fn test_type2_golden_value_missing_passes_with_warning() {
        let dir = tempdir().unwrap();
        let ctx = setup(
            dir.path(),
            indoc! {"
                item_desc: desc
                requirements:
                  value: 3
                input_files:
                  - reports/run.log
            "},
            &[("run.log", "content\n")],
        );

        let result = GenericChecker.execute_check(&ctx).unwrap();
        assert!(result.is_pass);
        assert_eq!(
            result.warn_groups["WARN01"].description,
            "Configuration Warning"
        );
        assert!(result
            .details
            .iter()
            .any(|d| d.reason == "Golden value expected but not provided"));
    }

    #[test]
    fn test_type3_all_waived_passes() {
        let dir = tempdir().unwrap();
        let ctx = setup(
            dir.path(),
            indoc! {"
                item_desc: desc
                requirements:
                  value: 2
                  pattern_items:
                    - V1
                    - V2
                waivers:
                  value: 2
                  waive_items:
                    - name: V1
                      reason: reason1
                    - name: V2
                      reason: reason2
                input_files:
                  - reports/run.log
            "},
            &[("run.log", "neither pattern appears here\n")],
        );

        let result = GenericChecker.execute_check(&ctx).unwrap();
        assert!(result.is_pass);
        assert!(result.error_groups.is_empty());
        assert!(result.warn_groups.is_empty());
        assert_eq!(result.info_groups["INFO01"].description, WAIVED_DESC);
        assert_eq!(result.info_groups["INFO01"].items, vec!["V1", "V2"]);
        let waived = result.details.iter().find(|d| d.name == "V1").unwrap();
        assert!(waived.reason.contains("reason1"));
        assert!(waived.reason.ends_with("[WAIVER]"));
    }

    #[test]
    fn test_type3_unwaived_violation_fails() {
        let dir = tempdir().unwrap();
        let ctx = setup(
            dir.path(),
            indoc! {"
                item_desc: desc
                requirements:
                  value: 2
                  pattern_items:
                    - V1
                    - V2
                waivers:
                  value: 1
                  waive_items:
                    - V1
                input_files:
                  - reports/run.log
            "},
            &[("run.log", "nothing\n")],
        );

        let result = GenericChecker.execute_check(&ctx).unwrap();
        assert!(!result.is_pass);
        assert_eq!(result.error_groups["ERROR01"].items, vec!["V2"]);
        assert_eq!(result.info_groups["INFO01"].items, vec!["V1"]);
    }

    #[test]
    fn test_type4_unused_waivers_warn() {
        let dir = tempdir().unwrap();
        let ctx = setup(
            dir.path(),
            indoc! {"
                item_desc: desc
                waivers:
                  value: 2
                  waive_items:
                    - V1
                    - V2
                input_files:
                  - reports/run.log
            "},
            &[("run.log", "ERROR: V1 violation\n")],
        );

        let result = GenericChecker.execute_check(&ctx).unwrap();
        assert!(result.is_pass);
        assert_eq!(result.info_groups["INFO01"].items, vec!["ERROR: V1 violation"]);
        let waived = result
            .details
            .iter()
            .find(|d| d.name == "ERROR: V1 violation")
            .unwrap();
        assert!(waived.reason.ends_with("[WAIVER]"));
        assert_eq!(result.warn_groups["WARN01"].description, UNUSED_DESC);
        assert_eq!(result.warn_groups["WARN01"].items, vec!["V2"]);
        let unused = result.details.iter().find(|d| d.name == "V2").unwrap();
        assert_eq!(unused.severity, Severity::Warn);
        assert!(unused.reason.ends_with("[WAIVER]"));
    }

    #[test]
    fn test_missing_input_file_yields_config_error() {
        let dir = tempdir().unwrap();
        let ctx = setup(
            dir.path(),
            indoc! {"
                item_desc: desc
                input_files:
                  - does_not_exist.rpt
            "},
            &[],
        );

        let result = GenericChecker.execute_check(&ctx).unwrap();
        assert!(result.is_config_error());
        assert!(result.basic_errors.as_ref().unwrap()[0].contains("does_not_exist.rpt"));
    }
}
