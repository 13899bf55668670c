//! Post-run aggregators — concatenated artifacts, per-item artifact
//! parsers, and the per-module structured summary.
//!
//! After the fan-out completes the dispatcher runs, in order:
//!
//! 1. concatenate per-item logs into `Work/CheckList.log`
//! 2. concatenate per-item reports into `Work/CheckList.rpt`
//! 3. write the per-module summary YAML (by re-parsing the artifacts)
//! 4. write per-module CSV tables from the summaries
//! 5. write the aggregated `Work/Results/Summary.csv`
//!
//! The parsers in this module are the round-trip counterparts of the
//! formatter: parsing a rendered log recovers the status line, the
//! `(group, description, item)` triples, and the detail tuples.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::checker::{item_log_path, item_report_path};
use crate::formatter::write_atomic;
use crate::types::Severity;

/// A parsed group block from a per-item log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedGroup {
    /// Full group key, e.g. `ERROR01`.
    pub key: String,
    /// Severity class implied by the key.
    pub severity: Severity,
    /// Group description.
    pub description: String,
    /// Occurrence count from the severity line.
    pub occurrence: usize,
    /// Bullet items.
    pub items: Vec<String>,
}

/// A parsed per-item log artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLog {
    /// `PASS`, `FAIL`, or `[CONFIG_ERROR]`.
    pub status: String,
    /// Item id from the status line.
    pub item_id: String,
    /// Item description from the status line.
    pub item_desc: String,
    /// `[INFO]:` line content, when present.
    pub info_message: Option<String>,
    /// `[WAIVED_INFO]:` line contents.
    pub waived_info: Vec<String>,
    /// Raw `[CONFIG_ERROR]` bullet lines.
    pub basic_errors: Vec<String>,
    /// Group blocks in file order.
    pub groups: Vec<ParsedGroup>,
}

/// One numbered entry from a per-item report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    /// 1-based index within the severity bucket.
    pub index: usize,
    /// Detail name (`"N/A"` when the entry had none).
    pub detail: String,
    /// Source line (`"N/A"` when not applicable).
    pub source_line: String,
    /// Source file (`"N/A"` when not applicable).
    pub source_file: String,
    /// Reason text, tags included.
    pub reason: String,
}

/// A parsed per-item report artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReport {
    /// `PASS`, `FAIL`, or `[CONFIG_ERROR]`.
    pub status: String,
    /// Item id from the status line.
    pub item_id: String,
    /// Item description from the status line.
    pub item_desc: String,
    /// `[INFO]:` line content, when present.
    pub info_message: Option<String>,
    /// `[WAIVED_INFO]:` line contents.
    pub waived_info: Vec<String>,
    /// Numbered entries per severity.
    pub entries: Vec<(Severity, SummaryEntry)>,
}

/// Per-item record of the module summary YAML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSummary {
    /// Item description.
    pub description: String,
    /// `PASS`, `FAIL`, `[CONFIG_ERROR]`, or `MISSING`.
    pub status: String,
    /// Top-level info message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info_message: Option<String>,
    /// Fail detail count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrence: Option<usize>,
    /// Warn detail count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_occurrence: Option<usize>,
    /// Info detail count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info_occurrence: Option<usize>,
    /// Failing entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SummaryEntry>,
    /// Warning entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<SummaryEntry>,
    /// Informational entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub infos: Vec<SummaryEntry>,
}

/// Module summary: item id → record.
pub type ModuleSummary = BTreeMap<String, ItemSummary>;

fn status_regex() -> Regex {
    Regex::new(r"^(PASS|FAIL|\[CONFIG_ERROR\]):([^:]+):(.*)$").expect("static regex")
}

fn group_header_regex() -> Regex {
    Regex::new(r"^([A-Z0-9\-]+)-((?:ERROR|WARN|INFO)\d{2}): (.*):$").expect("static regex")
}

fn severity_line_regex() -> Regex {
    Regex::new(r"^\s+Severity: (Fail|Warn|Info) Occurrence: (\d+)$").expect("static regex")
}

fn occurrence_regex() -> Regex {
    Regex::new(r"^(Fail|Warn|Info) Occurrence: (\d+)$").expect("static regex")
}

fn numbered_regex() -> Regex {
    Regex::new(r"^(\d+): (Fail|Warn|Info): (.*)$").expect("static regex")
}

fn severity_from_str(s: &str) -> Severity {
    match s {
        "Fail" => Severity::Fail,
        "Warn" => Severity::Warn,
        _ => Severity::Info,
    }
}

/// Severity class implied by a group key prefix.
fn severity_from_key(key: &str) -> Severity {
    if key.starts_with("ERROR") {
        Severity::Fail
    } else if key.starts_with("WARN") {
        Severity::Warn
    } else {
        Severity::Info
    }
}

/// Parse a rendered per-item log.
///
/// Returns `None` when the text does not open with a status line.
#[must_use]
pub fn parse_item_log(text: &str) -> Option<ParsedLog> {
    let mut lines = text.lines();
    let status_cap = status_regex().captures(lines.next()?)?;

    let mut parsed = ParsedLog {
        status: status_cap[1].to_owned(),
        item_id: status_cap[2].to_owned(),
        item_desc: status_cap[3].to_owned(),
        ..ParsedLog::default()
    };

    let header_re = group_header_regex();
    let severity_re = severity_line_regex();

    for line in lines {
        if let Some(rest) = line.strip_prefix("[INFO]:") {
            parsed.info_message = Some(rest.to_owned());
        } else if let Some(rest) = line.strip_prefix("[WAIVED_INFO]:") {
            parsed.waived_info.push(rest.to_owned());
        } else if line.starts_with("[CONFIG_ERROR]") {
            parsed.basic_errors.push(line.to_owned());
        } else if let Some(cap) = header_re.captures(line) {
            parsed.groups.push(ParsedGroup {
                key: cap[2].to_owned(),
                severity: severity_from_key(&cap[2]),
                description: cap[3].to_owned(),
                occurrence: 0,
                items: Vec::new(),
            });
        } else if let Some(cap) = severity_re.captures(line) {
            if let Some(group) = parsed.groups.last_mut() {
                group.occurrence = cap[2].parse().unwrap_or(0);
            }
        } else if let Some(item) = line.strip_prefix("  - ") {
            if let Some(group) = parsed.groups.last_mut() {
                group.items.push(item.to_owned());
            }
        }
    }

    Some(parsed)
}

/// Split a numbered report line's tail into `(detail, line, file, reason)`.
fn split_entry_tail(tail: &str) -> (String, String, String, String) {
    let location_re =
        Regex::new(r"^(.*?)\. In line (\d+), (.*)$").expect("static regex");

    if let Some(cap) = location_re.captures(tail) {
        let head = cap[1].to_owned();
        let line = cap[2].to_owned();
        let rest = cap[3].to_owned();
        // "<file>: <reason>" when the entry had a name; bare "<file>" when
        // the reason stood in for it.
        return match rest.split_once(": ") {
            Some((file, reason)) => (head, line, file.to_owned(), reason.to_owned()),
            None => ("N/A".to_owned(), line, rest, head),
        };
    }

    match tail.split_once(": ") {
        Some((detail, reason)) => (
            detail.to_owned(),
            "N/A".to_owned(),
            "N/A".to_owned(),
            reason.to_owned(),
        ),
        None => (
            "N/A".to_owned(),
            "N/A".to_owned(),
            "N/A".to_owned(),
            tail.to_owned(),
        ),
    }
}

/// Parse a rendered per-item report.
///
/// Returns `None` when the text does not open with a status line.
#[must_use]
pub fn parse_item_report(text: &str) -> Option<ParsedReport> {
    let mut lines = text.lines();
    let status_cap = status_regex().captures(lines.next()?)?;

    let mut parsed = ParsedReport {
        status: status_cap[1].to_owned(),
        item_id: status_cap[2].to_owned(),
        item_desc: status_cap[3].to_owned(),
        ..ParsedReport::default()
    };

    let occurrence_re = occurrence_regex();
    let numbered_re = numbered_regex();

    for line in lines {
        if let Some(rest) = line.strip_prefix("[INFO]:") {
            parsed.info_message = Some(rest.to_owned());
        } else if let Some(rest) = line.strip_prefix("[WAIVED_INFO]:") {
            parsed.waived_info.push(rest.to_owned());
        } else if occurrence_re.is_match(line) {
            continue;
        } else if let Some(cap) = numbered_re.captures(line) {
            let severity = severity_from_str(&cap[2]);
            let (detail, source_line, source_file, reason) = split_entry_tail(&cap[3]);
            parsed.entries.push((
                severity,
                SummaryEntry {
                    index: cap[1].parse().unwrap_or(0),
                    detail,
                    source_line,
                    source_file,
                    reason,
                },
            ));
        }
    }

    Some(parsed)
}

/// Concatenate per-item artifacts into one aggregated file.
///
/// Missing per-item artifacts are skipped (a timed-out item leaves no
/// entry). Modules and items are visited in the given map order.
///
/// # Errors
///
/// Returns an error when the aggregated file cannot be written.
fn aggregate_artifacts(
    modules_map: &BTreeMap<String, Vec<String>>,
    path_of: impl Fn(&str, &str) -> PathBuf,
    output_file: &Path,
) -> std::io::Result<PathBuf> {
    let mut out = String::new();

    for (module, items) in modules_map {
        for item in items {
            let path = path_of(module, item);
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            out.push_str(&content);
            if !content.ends_with('\n') {
                out.push('\n');
            }
            out.push('\n');
        }
    }

    write_atomic(output_file, &out)?;
    Ok(output_file.to_path_buf())
}

/// Step 1: concatenate per-item logs into `Work/CheckList.log`.
///
/// # Errors
///
/// Returns an error when the aggregated file cannot be written.
pub fn aggregate_logs(
    root: &Path,
    modules_map: &BTreeMap<String, Vec<String>>,
) -> std::io::Result<PathBuf> {
    aggregate_artifacts(
        modules_map,
        |module, item| item_log_path(root, module, item),
        &root.join("Work").join("CheckList.log"),
    )
}

/// Step 2: concatenate per-item reports into `Work/CheckList.rpt`.
///
/// # Errors
///
/// Returns an error when the aggregated file cannot be written.
pub fn aggregate_reports(
    root: &Path,
    modules_map: &BTreeMap<String, Vec<String>>,
) -> std::io::Result<PathBuf> {
    aggregate_artifacts(
        modules_map,
        |module, item| item_report_path(root, module, item),
        &root.join("Work").join("CheckList.rpt"),
    )
}

/// Build one item's summary record from its artifacts.
fn summarize_item(root: &Path, module: &str, item: &str) -> ItemSummary {
    let log_text = std::fs::read_to_string(item_log_path(root, module, item)).ok();
    let report_text = std::fs::read_to_string(item_report_path(root, module, item)).ok();

    let Some(report) = report_text.as_deref().and_then(parse_item_report) else {
        // No artifacts at all (timed out or never ran).
        return ItemSummary {
            description: String::new(),
            status: "MISSING".to_owned(),
            ..ItemSummary::default()
        };
    };

    let mut summary = ItemSummary {
        description: report.item_desc.clone(),
        status: report.status.clone(),
        info_message: report.info_message.clone(),
        ..ItemSummary::default()
    };

    // The log parse only refines the status for basic-error results.
    if let Some(log) = log_text.as_deref().and_then(parse_item_log) {
        if !log.basic_errors.is_empty() {
            summary.status = log.status;
        }
    }

    for (severity, entry) in report.entries {
        match severity {
            Severity::Fail => summary.failures.push(entry),
            Severity::Warn => summary.warnings.push(entry),
            Severity::Info => summary.infos.push(entry),
        }
    }

    if !summary.failures.is_empty() {
        summary.occurrence = Some(summary.failures.len());
    }
    if !summary.warnings.is_empty() {
        summary.warning_occurrence = Some(summary.warnings.len());
    }
    if !summary.infos.is_empty() {
        summary.info_occurrence = Some(summary.infos.len());
    }

    summary
}

/// Step 3: write the per-module summary YAML
/// (`Check_modules/<module>/outputs/<module>.yaml`).
///
/// # Errors
///
/// Returns an error when the summary cannot be serialized or written.
pub fn write_summary_yaml(
    root: &Path,
    module: &str,
    items: &[String],
) -> Result<(PathBuf, ModuleSummary), std::io::Error> {
    let mut summary = ModuleSummary::new();
    for item in items {
        summary.insert(item.clone(), summarize_item(root, module, item));
    }

    let yaml = serde_yaml::to_string(&summary)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
    let path = root
        .join("Check_modules")
        .join(module)
        .join("outputs")
        .join(format!("{module}.yaml"));
    write_atomic(&path, &yaml)?;

    Ok((path, summary))
}

/// Quote a CSV field when it needs quoting.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}

fn summary_csv_rows(out: &mut String, module: &str, summary: &ModuleSummary, with_module: bool) {
    for (item, record) in summary {
        let mut fields = Vec::new();
        if with_module {
            fields.push(csv_field(module));
        }
        fields.extend([
            csv_field(item),
            csv_field(&record.status),
            csv_field(&record.description),
            record.occurrence.unwrap_or(0).to_string(),
            record.warning_occurrence.unwrap_or(0).to_string(),
            record.info_occurrence.unwrap_or(0).to_string(),
        ]);
        let _ = writeln!(out, "{}", fields.join(","));
    }
}

/// Step 4: write one module's tabular summary
/// (`Work/Results/<module>/<module>.csv`).
///
/// # Errors
///
/// Returns an error when the table cannot be written.
pub fn write_module_csv(
    root: &Path,
    module: &str,
    summary: &ModuleSummary,
) -> std::io::Result<PathBuf> {
    let mut out = String::from(
        "Item,Status,Description,Fail Occurrence,Warn Occurrence,Info Occurrence\n",
    );
    summary_csv_rows(&mut out, module, summary, false);

    let path = root
        .join("Work")
        .join("Results")
        .join(module)
        .join(format!("{module}.csv"));
    write_atomic(&path, &out)?;
    Ok(path)
}

/// Step 5: write the aggregated summary table
/// (`Work/Results/Summary.csv`) across all modules.
///
/// # Errors
///
/// Returns an error when the table cannot be written.
pub fn write_aggregate_csv(
    root: &Path,
    summaries: &BTreeMap<String, ModuleSummary>,
) -> std::io::Result<PathBuf> {
    let mut out = String::from(
        "Module,Item,Status,Description,Fail Occurrence,Warn Occurrence,Info Occurrence\n",
    );
    for (module, summary) in summaries {
        summary_csv_rows(&mut out, module, summary, true);
    }

    let path = root.join("Work").join("Results").join("Summary.csv");
    write_atomic(&path, &out)?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::{render_log, render_report, write_log, write_report};
    use crate::types::{CheckResult, CheckValue, DetailItem, Group};
    use tempfile::tempdir;

    fn sample_result() -> CheckResult {
        let mut result =
            CheckResult::new(CheckValue::Count(1), false, true, false, "Timing check");
        result.details = vec![
            DetailItem {
                severity: Severity::Info,
                name: "in2out".to_owned(),
                line_number: 12,
                file_path: "sta/run.log".to_owned(),
                reason: "Required pattern matched".to_owned(),
            },
            DetailItem {
                severity: Severity::Fail,
                name: "in2reg".to_owned(),
                line_number: 0,
                file_path: "N/A".to_owned(),
                reason: "Required pattern NOT found".to_owned(),
            },
        ];
        result.info_groups.insert(
            "INFO01".to_owned(),
            Group::new("Patterns found", vec!["in2out".to_owned()]),
        );
        result.error_groups.insert(
            "ERROR01".to_owned(),
            Group::new("Missing patterns", vec!["in2reg".to_owned()]),
        );
        result
    }

    #[test]
    fn test_log_round_trip() {
        let result = sample_result();
        let text = render_log(&result, "IMP-10-0-0-08");
        let parsed = parse_item_log(&text).unwrap();

        assert_eq!(parsed.status, "FAIL");
        assert_eq!(parsed.item_id, "IMP-10-0-0-08");
        assert_eq!(parsed.item_desc, "Timing check");

        let triples: Vec<(String, String, Vec<String>)> = parsed
            .groups
            .iter()
            .map(|g| (g.key.clone(), g.description.clone(), g.items.clone()))
            .collect();
        assert_eq!(
            triples,
            vec![
                (
                    "ERROR01".to_owned(),
                    "Missing patterns".to_owned(),
                    vec!["in2reg".to_owned()]
                ),
                (
                    "INFO01".to_owned(),
                    "Patterns found".to_owned(),
                    vec!["in2out".to_owned()]
                ),
            ]
        );
        assert_eq!(parsed.groups[0].occurrence, 1);
        assert_eq!(parsed.groups[0].severity, Severity::Fail);
    }

    #[test]
    fn test_report_round_trip_detail_tuples() {
        let result = sample_result();
        let text = render_report(&result, "IMP-10-0-0-08");
        let parsed = parse_item_report(&text).unwrap();

        assert_eq!(parsed.status, "FAIL");
        assert_eq!(parsed.entries.len(), 2);

        let (sev0, fail) = &parsed.entries[0];
        assert_eq!(*sev0, Severity::Fail);
        assert_eq!(fail.detail, "in2reg");
        assert_eq!(fail.source_line, "N/A");
        assert_eq!(fail.reason, "Required pattern NOT found");

        let (sev1, info) = &parsed.entries[1];
        assert_eq!(*sev1, Severity::Info);
        assert_eq!(info.detail, "in2out");
        assert_eq!(info.source_line, "12");
        assert_eq!(info.source_file, "sta/run.log");
        assert_eq!(info.reason, "Required pattern matched");
    }

    #[test]
    fn test_parse_config_error_log() {
        let result = CheckResult::config_error(
            "desc",
            vec!["[CONFIG_ERROR]: Input file not found: a.rpt".to_owned()],
        );
        let text = render_log(&result, "IMP-9");
        let parsed = parse_item_log(&text).unwrap();
        assert_eq!(parsed.status, "[CONFIG_ERROR]");
        assert_eq!(parsed.basic_errors.len(), 1);
        assert!(parsed.groups.is_empty());
    }

    #[test]
    fn test_parse_waived_info_lines() {
        let mut result = CheckResult::new(CheckValue::Count(0), true, false, false, "d");
        result.info_message = Some("note".to_owned());
        result.details.push(DetailItem::unlocated(
            Severity::Info,
            "skip_scan",
            "Waiver item[WAIVED_INFO]",
        ));
        let parsed = parse_item_log(&render_log(&result, "X")).unwrap();
        assert_eq!(parsed.info_message.as_deref(), Some("note"));
        assert_eq!(parsed.waived_info, vec!["skip_scan"]);
    }

    fn write_artifacts(root: &Path, module: &str, item: &str, result: &CheckResult) {
        write_log(result, item, &item_log_path(root, module, item)).unwrap();
        write_report(result, item, &item_report_path(root, module, item)).unwrap();
    }

    fn modules_map(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(m, items)| {
                (
                    (*m).to_owned(),
                    items.iter().map(|i| (*i).to_owned()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_aggregate_logs_skips_missing_items() {
        let dir = tempdir().unwrap();
        let result = sample_result();
        write_artifacts(dir.path(), "MOD_A", "IMP-1", &result);
        // IMP-2 never produced artifacts (timed out).
        let map = modules_map(&[("MOD_A", &["IMP-1", "IMP-2"])]);

        let path = aggregate_logs(dir.path(), &map).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("FAIL:IMP-1:Timing check"));
        assert!(!text.contains("IMP-2"));
    }

    #[test]
    fn test_aggregate_reports_order() {
        let dir = tempdir().unwrap();
        let result = sample_result();
        write_artifacts(dir.path(), "A_MOD", "IMP-1", &result);
        write_artifacts(dir.path(), "B_MOD", "IMP-2", &result);
        let map = modules_map(&[("A_MOD", &["IMP-1"]), ("B_MOD", &["IMP-2"])]);

        let path = aggregate_reports(dir.path(), &map).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        let first = text.find("FAIL:IMP-1").unwrap();
        let second = text.find("FAIL:IMP-2").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_summary_yaml_contents() {
        let dir = tempdir().unwrap();
        let result = sample_result();
        write_artifacts(dir.path(), "MOD", "IMP-1", &result);

        let (path, summary) =
            write_summary_yaml(dir.path(), "MOD", &["IMP-1".to_owned(), "IMP-GONE".to_owned()])
                .unwrap();
        assert!(path.ends_with(Path::new("Check_modules/MOD/outputs/MOD.yaml")));

        let record = &summary["IMP-1"];
        assert_eq!(record.status, "FAIL");
        assert_eq!(record.description, "Timing check");
        assert_eq!(record.occurrence, Some(1));
        assert_eq!(record.info_occurrence, Some(1));
        assert_eq!(record.failures[0].detail, "in2reg");
        assert_eq!(summary["IMP-GONE"].status, "MISSING");

        // The YAML parses back to the same structure.
        let text = std::fs::read_to_string(&path).unwrap();
        let reparsed: ModuleSummary = serde_yaml::from_str(&text).unwrap();
        assert_eq!(reparsed, summary);
    }

    #[test]
    fn test_csv_outputs() {
        let dir = tempdir().unwrap();
        let result = sample_result();
        write_artifacts(dir.path(), "MOD", "IMP-1", &result);
        let (_, summary) = write_summary_yaml(dir.path(), "MOD", &["IMP-1".to_owned()]).unwrap();

        let module_csv = write_module_csv(dir.path(), "MOD", &summary).unwrap();
        let text = std::fs::read_to_string(&module_csv).unwrap();
        assert!(text.starts_with("Item,Status,Description,"));
        assert!(text.contains("IMP-1,FAIL,Timing check,1,0,1"));

        let mut summaries = BTreeMap::new();
        summaries.insert("MOD".to_owned(), summary);
        let agg_csv = write_aggregate_csv(dir.path(), &summaries).unwrap();
        let text = std::fs::read_to_string(&agg_csv).unwrap();
        assert!(text.contains("MOD,IMP-1,FAIL,"));
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_split_entry_tail_variants() {
        assert_eq!(
            split_entry_tail("lib_a. In line 10, reports/a.rpt: Library found"),
            (
                "lib_a".to_owned(),
                "10".to_owned(),
                "reports/a.rpt".to_owned(),
                "Library found".to_owned()
            )
        );
        assert_eq!(
            split_entry_tail("lib_b: Library not found"),
            (
                "lib_b".to_owned(),
                "N/A".to_owned(),
                "N/A".to_owned(),
                "Library not found".to_owned()
            )
        );
        assert_eq!(
            split_entry_tail("bare reason only"),
            (
                "N/A".to_owned(),
                "N/A".to_owned(),
                "N/A".to_owned(),
                "bare reason only".to_owned()
            )
        );
    }
}
