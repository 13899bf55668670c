//! Output formatter — renders a [`CheckResult`] into the two per-item
//! textual artifacts.
//!
//! Two artifacts are produced for every item:
//!
//! 1. **Log** (`outputs/logs/<item>.log`) — status line plus group blocks in
//!    strict ERROR → WARN → INFO order, consumed by the aggregation tooling.
//! 2. **Report** (`outputs/reports/<item>.rpt`) — status line plus numbered
//!    detail lines per severity bucket, consumed by humans and the summary
//!    bridge.
//!
//! Output is data-driven: everything is derived from the result's fields,
//! never from its legacy [`ResultType`](crate::types::ResultType). Both
//! artifacts are written atomically (temp file + rename), UTF-8.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use crate::types::{
    CheckResult, DetailItem, Group, Severity, TAG_WAIVED_AS_INFO, TAG_WAIVED_INFO,
    TAG_WAIVED_REASON,
};

/// Render the status line shared by both artifacts.
fn status_line(result: &CheckResult, item_id: &str) -> String {
    let status = if result.is_config_error() {
        "[CONFIG_ERROR]"
    } else if result.is_pass {
        "PASS"
    } else {
        "FAIL"
    };
    format!("{status}:{item_id}:{}", result.item_desc)
}

/// Render the shared preamble: status, basic errors, info message, and the
/// top-level `[WAIVED_INFO]:` lines.
///
/// Returns `true` when the result is a bare execution/config error, in which
/// case the caller emits nothing further.
fn render_preamble(out: &mut String, result: &CheckResult, item_id: &str) -> bool {
    let _ = writeln!(out, "{}", status_line(result, item_id));

    if result.is_basic_error_only() {
        if let Some(errors) = &result.basic_errors {
            for line in errors {
                let _ = writeln!(out, "{line}");
            }
        }
        return true;
    }

    if let Some(msg) = &result.info_message {
        let _ = writeln!(out, "[INFO]:{msg}");
    }

    for detail in result.details.iter().filter(|d| d.is_waived_info()) {
        let text = if detail.name.is_empty() {
            detail.reason.replace(TAG_WAIVED_INFO, "").trim().to_owned()
        } else {
            detail.name.clone()
        };
        let _ = writeln!(out, "[WAIVED_INFO]:{text}");
    }

    false
}

/// Display names for a group block: declared items deduplicated in order,
/// or an auto-fill from details of the matching severity when the group
/// declares none. `INFO01` keeps `[WAIVED_INFO]` entries; every other group
/// filters them out.
fn group_item_names(
    key: &str,
    declared: &[String],
    details: &[DetailItem],
    severity: Severity,
) -> Vec<String> {
    let keep_waived_info = key == "INFO01";
    let mut names = Vec::new();
    let mut seen = std::collections::HashSet::new();

    if declared.is_empty() {
        for detail in details.iter().filter(|d| d.severity == severity) {
            if detail.is_waived_info() && !keep_waived_info {
                continue;
            }
            let name = if detail.name.is_empty() {
                detail.reason.clone()
            } else {
                detail.name.clone()
            };
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
    } else {
        for name in declared {
            if !keep_waived_info {
                let tagged = details
                    .iter()
                    .any(|d| d.name == *name && d.is_waived_info());
                if tagged {
                    continue;
                }
            }
            if seen.insert(name.clone()) {
                names.push(name.clone());
            }
        }
    }

    names
}

/// Emit one class of group blocks (`ERROR`, `WARN`, or `INFO`) in ordinal order.
fn render_group_blocks(
    out: &mut String,
    item_id: &str,
    groups: &crate::types::GroupMap,
    severity: Severity,
    details: &[DetailItem],
) {
    for (key, group) in groups {
        let names = group_item_names(key, &group.items, details, severity);
        let _ = writeln!(out, "{item_id}-{key}: {}:", group.description);
        let _ = writeln!(out, "  Severity: {severity} Occurrence: {}", names.len());
        for name in &names {
            let _ = writeln!(out, "  - {name}");
        }
    }
}

/// Auto-create `ERROR01`/`WARN01`/`INFO01` for results that carry details
/// but declare no groups, described by `default_group_desc`.
fn auto_groups(result: &CheckResult, severity: Severity) -> crate::types::GroupMap {
    let mut groups = crate::types::GroupMap::new();
    let has_details = result
        .details
        .iter()
        .any(|d| d.severity == severity && (severity == Severity::Info || !d.is_waived_info()));
    if has_details {
        let key = match severity {
            Severity::Fail => "ERROR01",
            Severity::Warn => "WARN01",
            Severity::Info => "INFO01",
        };
        let description = result
            .default_group_desc
            .clone()
            .unwrap_or_else(|| "Check result".to_owned());
        groups.insert(key.to_owned(), Group::new(description, Vec::new()));
    }
    groups
}

/// Render the log artifact for aggregation tooling.
#[must_use]
pub fn render_log(result: &CheckResult, item_id: &str) -> String {
    let mut out = String::new();

    if render_preamble(&mut out, result, item_id) {
        return out;
    }

    let no_groups = result.error_groups.is_empty()
        && result.warn_groups.is_empty()
        && result.info_groups.is_empty();

    if no_groups {
        for severity in [Severity::Fail, Severity::Warn, Severity::Info] {
            let groups = auto_groups(result, severity);
            render_group_blocks(&mut out, item_id, &groups, severity, &result.details);
        }
        return out;
    }

    render_group_blocks(&mut out, item_id, &result.error_groups, Severity::Fail, &result.details);
    render_group_blocks(&mut out, item_id, &result.warn_groups, Severity::Warn, &result.details);
    render_group_blocks(&mut out, item_id, &result.info_groups, Severity::Info, &result.details);

    out
}

/// Render one numbered report line.
fn render_report_entry(index: usize, detail: &DetailItem) -> String {
    let severity = detail.severity;
    let location = if detail.has_location() {
        format!(". In line {}, {}", detail.line_number, detail.file_path)
    } else {
        String::new()
    };

    if detail.name.is_empty() {
        // No name: the reason stands in for it, and the tag degrades to the
        // cosmetic [WAIVED_REASON] form when there is no location either.
        let mut reason = detail.reason.clone();
        if !detail.has_location() {
            reason = reason.replace(TAG_WAIVED_AS_INFO, TAG_WAIVED_REASON);
        }
        format!("{index}: {severity}: {reason}{location}")
    } else {
        format!(
            "{index}: {severity}: {}{location}: {}",
            detail.name, detail.reason
        )
    }
}

/// Render the report artifact for humans and the summary bridge.
#[must_use]
pub fn render_report(result: &CheckResult, item_id: &str) -> String {
    let mut out = String::new();

    if render_preamble(&mut out, result, item_id) {
        return out;
    }

    for severity in [Severity::Fail, Severity::Warn, Severity::Info] {
        let bucket: Vec<&DetailItem> = result
            .details
            .iter()
            .filter(|d| d.severity == severity && !d.is_waived_info())
            .collect();
        if bucket.is_empty() {
            continue;
        }

        let _ = writeln!(out, "{severity} Occurrence: {}", bucket.len());
        for (i, detail) in bucket.iter().enumerate() {
            let _ = writeln!(out, "{}", render_report_entry(i + 1, detail));
        }
    }

    out
}

/// Atomically write `contents` to `path` (temp file + rename).
///
/// The temp file carries a `.tmp.{pid}` suffix so concurrent writers of
/// different items never collide; parent directories are created as needed.
///
/// # Errors
///
/// Returns an error if the temp file cannot be written or renamed.
pub fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let pid = std::process::id();
    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(format!(".tmp.{pid}"));
    let tmp_path = path.with_file_name(tmp_name);

    let mut file = std::fs::File::create(&tmp_path)?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    drop(file);

    match std::fs::rename(&tmp_path, path) {
        Ok(()) => Ok(()),
        Err(e) => {
            let _ = std::fs::remove_file(&tmp_path);
            Err(e)
        }
    }
}

/// Render and persist the log artifact.
///
/// # Errors
///
/// Returns an I/O error on write failure; the dispatcher treats the item
/// as failed.
pub fn write_log(result: &CheckResult, item_id: &str, path: &Path) -> std::io::Result<()> {
    write_atomic(path, &render_log(result, item_id))
}

/// Render and persist the report artifact.
///
/// # Errors
///
/// Returns an I/O error on write failure; the dispatcher treats the item
/// as failed.
pub fn write_report(result: &CheckResult, item_id: &str, path: &Path) -> std::io::Result<()> {
    write_atomic(path, &render_report(result, item_id))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CheckValue, Group};

    fn sample_result() -> CheckResult {
        let mut result = CheckResult::new(CheckValue::Count(2), false, true, false, "Sample check");
        result.details = vec![
            DetailItem {
                severity: Severity::Info,
                name: "lib_a".to_owned(),
                line_number: 10,
                file_path: "reports/a.rpt".to_owned(),
                reason: "Library found".to_owned(),
            },
            DetailItem {
                severity: Severity::Fail,
                name: "lib_b".to_owned(),
                line_number: 0,
                file_path: "N/A".to_owned(),
                reason: "Library not found".to_owned(),
            },
        ];
        result.error_groups.insert(
            "ERROR01".to_owned(),
            Group::new("Missing libraries", vec!["lib_b".to_owned()]),
        );
        result.info_groups.insert(
            "INFO01".to_owned(),
            Group::new("Found libraries", vec!["lib_a".to_owned()]),
        );
        result
    }

    #[test]
    fn test_log_status_line() {
        let log = render_log(&sample_result(), "IMP-1-0-0-00");
        assert!(log.starts_with("FAIL:IMP-1-0-0-00:Sample check\n"));
    }

    #[test]
    fn test_log_group_order_error_before_info() {
        let log = render_log(&sample_result(), "IMP-1-0-0-00");
        let err = log.find("IMP-1-0-0-00-ERROR01: Missing libraries:").unwrap();
        let info = log.find("IMP-1-0-0-00-INFO01: Found libraries:").unwrap();
        assert!(err < info);
        assert!(log.contains("  Severity: Fail Occurrence: 1"));
        assert!(log.contains("  - lib_b"));
    }

    #[test]
    fn test_log_autofill_from_details() {
        let mut result = sample_result();
        result.error_groups.get_mut("ERROR01").unwrap().items.clear();
        let log = render_log(&result, "X");
        assert!(log.contains("  - lib_b"));
    }

    #[test]
    fn test_log_dedup_by_name() {
        let mut result = sample_result();
        result
            .error_groups
            .get_mut("ERROR01")
            .unwrap()
            .items
            .push("lib_b".to_owned());
        let log = render_log(&result, "X");
        assert_eq!(log.matches("  - lib_b").count(), 1);
        assert!(log.contains("Occurrence: 1"));
    }

    #[test]
    fn test_report_numbering_and_location() {
        let report = render_report(&sample_result(), "IMP-1-0-0-00");
        assert!(report.contains("Fail Occurrence: 1"));
        assert!(report.contains("1: Fail: lib_b: Library not found"));
        assert!(report.contains("Info Occurrence: 1"));
        assert!(report.contains("1: Info: lib_a. In line 10, reports/a.rpt: Library found"));
    }

    #[test]
    fn test_report_omits_location_when_line_zero() {
        let mut result = sample_result();
        result.details[0].line_number = 0;
        let report = render_report(&result, "X");
        assert!(report.contains("1: Info: lib_a: Library found"));
        assert!(!report.contains("In line 0"));
    }

    #[test]
    fn test_report_substitutes_reason_for_empty_name() {
        let mut result = CheckResult::new(CheckValue::NotApplicable, true, false, false, "d");
        result.details.push(DetailItem::unlocated(
            Severity::Info,
            "",
            "No metrics extracted",
        ));
        let report = render_report(&result, "X");
        assert!(report.contains("1: Info: No metrics extracted"));
    }

    #[test]
    fn test_report_waived_reason_substitution() {
        let mut result = CheckResult::new(CheckValue::Count(0), true, false, false, "d");
        result.details.push(DetailItem {
            severity: Severity::Info,
            name: String::new(),
            line_number: 0,
            file_path: String::new(),
            reason: "Violation downgraded[WAIVED_AS_INFO]".to_owned(),
        });
        let report = render_report(&result, "X");
        assert!(report.contains("[WAIVED_REASON]"));
        assert!(!report.contains("[WAIVED_AS_INFO]"));
    }

    #[test]
    fn test_waived_info_rendered_only_as_top_lines() {
        let mut result = CheckResult::new(CheckValue::Count(0), true, false, false, "d");
        result.details.push(DetailItem::unlocated(
            Severity::Info,
            "skip_scan_check",
            "Waiver item[WAIVED_INFO]",
        ));
        result.info_groups.insert(
            "INFO02".to_owned(),
            Group::new("Other info", vec!["skip_scan_check".to_owned()]),
        );

        let log = render_log(&result, "X");
        assert!(log.contains("[WAIVED_INFO]:skip_scan_check"));
        // INFO02 filters the tagged item out.
        assert!(log.contains("  Severity: Info Occurrence: 0"));

        let report = render_report(&result, "X");
        assert!(report.contains("[WAIVED_INFO]:skip_scan_check"));
        assert!(!report.contains("1: Info: skip_scan_check"));
    }

    #[test]
    fn test_info01_keeps_waived_info_items() {
        let mut result = CheckResult::new(CheckValue::Count(0), true, false, false, "d");
        result.details.push(DetailItem::unlocated(
            Severity::Info,
            "waived_entry",
            "note[WAIVED_INFO]",
        ));
        result.info_groups.insert(
            "INFO01".to_owned(),
            Group::new("Waived information", vec!["waived_entry".to_owned()]),
        );
        let log = render_log(&result, "X");
        assert!(log.contains("  - waived_entry"));
    }

    #[test]
    fn test_config_error_rendering() {
        let result = CheckResult::config_error(
            "desc",
            vec![
                "[CONFIG_ERROR]: Input file not found: a.rpt".to_owned(),
                "[CONFIG_ERROR]: Input file not found: b.rpt".to_owned(),
            ],
        );
        let log = render_log(&result, "IMP-9");
        assert!(log.starts_with("[CONFIG_ERROR]:IMP-9:desc\n"));
        assert!(log.contains("[CONFIG_ERROR]: Input file not found: a.rpt"));
        // Basic-error-only results render no group blocks.
        assert!(!log.contains("ERROR01"));
    }

    #[test]
    fn test_auto_group_when_none_declared() {
        let mut result = CheckResult::new(CheckValue::NotApplicable, true, false, false, "d");
        result.default_group_desc = Some("QOR metrics".to_owned());
        result
            .details
            .push(DetailItem::unlocated(Severity::Info, "WNS: -0.1", "WNS: -0.1"));
        let log = render_log(&result, "IMP-5-0-0-12");
        assert!(log.contains("IMP-5-0-0-12-INFO01: QOR metrics:"));
        assert!(log.contains("  - WNS: -0.1"));

        // Without a default description the generic fallback applies.
        result.default_group_desc = None;
        let log = render_log(&result, "IMP-5-0-0-12");
        assert!(log.contains("IMP-5-0-0-12-INFO01: Check result:"));
    }

    #[test]
    fn test_info_message_line() {
        let mut result = CheckResult::new(CheckValue::NotApplicable, true, false, false, "d");
        result.info_message = Some("Informational check only".to_owned());
        let log = render_log(&result, "X");
        assert!(log.contains("[INFO]:Informational check only"));
    }

    #[test]
    fn test_write_atomic_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("item.log");
        write_atomic(&path, "PASS:X:d\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "PASS:X:d\n");
        // No stray temp files left behind.
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_deterministic_rendering() {
        let result = sample_result();
        assert_eq!(render_log(&result, "X"), render_log(&result, "X"));
        assert_eq!(render_report(&result, "X"), render_report(&result, "X"));
    }
}
