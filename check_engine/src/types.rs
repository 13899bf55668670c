//! Core type definitions for the checkflow engine.
//!
//! These types form the contract between checkers, the output formatter,
//! the result cache, and the aggregators:
//!
//! - [`Severity`] is the per-detail severity level
//! - [`CheckValue`] models the legacy `integer | "N/A" | "ERROR"` value field
//! - [`DetailItem`] is the atomic piece of evidence feeding groups and reports
//! - [`Group`] is a numbered bucket of item names under one description
//! - [`CheckResult`] is the complete result of one check item
//! - [`ResultType`] is the ten-kind legacy classification retained for
//!   downstream parsers (the formatter never branches on it)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Tag appended to reasons of violations accepted by a Type 3/4 waiver.
pub const TAG_WAIVER: &str = "[WAIVER]";
/// Tag for declarative waive entries rendered in waiver display mode.
pub const TAG_WAIVED_INFO: &str = "[WAIVED_INFO]";
/// Tag for violations downgraded to informational by `waivers.value = 0`.
pub const TAG_WAIVED_AS_INFO: &str = "[WAIVED_AS_INFO]";
/// Cosmetic substitute for [`TAG_WAIVED_AS_INFO`] when a violation has no name.
pub const TAG_WAIVED_REASON: &str = "[WAIVED_REASON]";
/// Marker prefix identifying configuration-error lines in `basic_errors`.
pub const CONFIG_ERROR_MARKER: &str = "[CONFIG_ERROR]";

/// Severity of a single [`DetailItem`].
///
/// The variant order is load-bearing: groups are written out in
/// `Fail < Warn < Info` order, and `derive(Ord)` on this declaration
/// gives exactly that total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// A violation that fails the check unless waived.
    Fail,
    /// A condition worth flagging that does not fail the check.
    Warn,
    /// Informational evidence, no action required.
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fail => write!(f, "Fail"),
            Self::Warn => write!(f, "Warn"),
            Self::Info => write!(f, "Info"),
        }
    }
}

/// The legacy `value` field of a check result: a count, `"N/A"`, or `"ERROR"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckValue {
    /// A concrete count (violations found, items matched, …).
    Count(i64),
    /// The check carries no numeric value.
    NotApplicable,
    /// The check failed to execute (parse failure, environment error).
    Error,
}

impl CheckValue {
    /// Whether this value is the `"N/A"` sentinel.
    #[must_use]
    pub fn is_na(self) -> bool {
        self == Self::NotApplicable
    }

    /// Whether this value is the `"ERROR"` sentinel.
    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }
}

impl std::fmt::Display for CheckValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::NotApplicable => write!(f, "N/A"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

impl Serialize for CheckValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Count(n) => serializer.serialize_i64(*n),
            Self::NotApplicable => serializer.serialize_str("N/A"),
            Self::Error => serializer.serialize_str("ERROR"),
        }
    }
}

impl<'de> Deserialize<'de> for CheckValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(n) => Ok(Self::Count(n)),
            Raw::Text(s) if s.eq_ignore_ascii_case("N/A") => Ok(Self::NotApplicable),
            Raw::Text(s) if s.eq_ignore_ascii_case("ERROR") => Ok(Self::Error),
            Raw::Text(s) => s
                .parse::<i64>()
                .map(Self::Count)
                .map_err(|_| serde::de::Error::custom(format!("invalid check value '{s}'"))),
        }
    }
}

/// A single piece of evidence in a check result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailItem {
    /// Severity level for this detail.
    pub severity: Severity,

    /// Short identifier (library name, violating token, …). May be empty,
    /// in which case renderers substitute the reason.
    pub name: String,

    /// 1-based line number in the source file (0 = not applicable).
    pub line_number: u32,

    /// Source file path (`"N/A"` or empty = not applicable).
    pub file_path: String,

    /// Free-text reason, optionally carrying a trailing waiver tag.
    pub reason: String,
}

impl DetailItem {
    /// Create a detail with no source location.
    #[must_use]
    pub fn unlocated(
        severity: Severity,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            name: name.into(),
            line_number: 0,
            file_path: "N/A".to_owned(),
            reason: reason.into(),
        }
    }

    /// Whether the location clause (`. In line L, file`) should be rendered.
    #[must_use]
    pub fn has_location(&self) -> bool {
        self.line_number != 0 && !matches!(self.file_path.as_str(), "" | "N/A")
    }

    /// Whether this detail is a display-mode waive entry (`[WAIVED_INFO]`).
    #[must_use]
    pub fn is_waived_info(&self) -> bool {
        self.reason.contains(TAG_WAIVED_INFO)
    }
}

/// A named bucket of item names under one human description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Human description of the bucket.
    pub description: String,
    /// Ordered, unique item names (renderers deduplicate defensively).
    pub items: Vec<String>,
}

impl Group {
    /// Build a group from a description and item names.
    #[must_use]
    pub fn new(description: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            description: description.into(),
            items,
        }
    }
}

/// Group maps are keyed `ERROR01`, `WARN01`, `INFO01`, … — a `BTreeMap`
/// iterates them in ordinal order for free.
pub type GroupMap = BTreeMap<String, Group>;

/// Legacy ten-kind result classification.
///
/// Kept for backward compatibility with downstream parsers; output logic
/// does not depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultType {
    /// value > 0, pass, no waivers.
    PassWithValues,
    /// value > 0, fail, no waivers.
    FailWithValues,
    /// value = 0, no pattern items, no waivers.
    PassWithoutValues,
    /// value = N/A, no pattern items.
    InfoOnly,
    /// value > 0, pass, with waivers.
    PassWithWaivers,
    /// value > 0, fail, with waivers.
    FailWithWaivers,
    /// value = 0 with pattern items configured.
    FailWithoutCheckValues,
    /// value = 0, pattern items, full waiver coverage.
    PassWithFullWaivers,
    /// File not found, parse failure, environment error.
    ExecutionError,
    /// Config contradiction or validation failure.
    ConfigError,
}

impl ResultType {
    /// The numeric code used by legacy consumers.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::PassWithValues => 1,
            Self::FailWithValues => 2,
            Self::PassWithoutValues => 3,
            Self::InfoOnly => 4,
            Self::PassWithWaivers => 5,
            Self::FailWithWaivers => 6,
            Self::FailWithoutCheckValues => 7,
            Self::PassWithFullWaivers => 8,
            Self::ExecutionError => 9,
            Self::ConfigError => 10,
        }
    }

    /// Determine the result type from the four classification inputs.
    ///
    /// Total and deterministic; ties break on the first matching row.
    #[must_use]
    pub fn determine(
        value: CheckValue,
        is_pass: bool,
        has_pattern_items: bool,
        has_waiver_value: bool,
    ) -> Self {
        let is_na = value.is_na();
        let is_zero = value == CheckValue::Count(0);
        let is_positive = matches!(value, CheckValue::Count(n) if n > 0);

        if value.is_error() {
            return Self::ExecutionError;
        }

        if is_na && !has_pattern_items && !has_waiver_value {
            return if is_pass {
                Self::InfoOnly
            } else {
                Self::FailWithValues
            };
        }

        if is_na && !has_pattern_items && has_waiver_value {
            return if is_pass {
                Self::PassWithWaivers
            } else {
                Self::FailWithWaivers
            };
        }

        if is_zero && !has_pattern_items && !has_waiver_value {
            return Self::PassWithoutValues;
        }

        if is_zero && has_pattern_items && !has_waiver_value {
            return Self::FailWithoutCheckValues;
        }

        if is_zero && has_pattern_items && has_waiver_value {
            return if is_pass {
                Self::PassWithFullWaivers
            } else {
                Self::FailWithoutCheckValues
            };
        }

        if is_positive && has_waiver_value {
            return if is_pass {
                Self::PassWithWaivers
            } else {
                Self::FailWithWaivers
            };
        }

        if is_pass {
            Self::PassWithValues
        } else {
            Self::FailWithValues
        }
    }
}

/// The complete result of one check item.
///
/// Created exclusively by a checker's `execute_check` (or the error
/// constructors), never mutated after return. Consumed by the formatter,
/// the result cache, and the aggregators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Legacy classification, retained for downstream parsers.
    pub result_type: ResultType,

    /// Whether the check passed.
    pub is_pass: bool,

    /// Check value: a count, `"N/A"`, or `"ERROR"`.
    pub value: CheckValue,

    /// Whether `requirements.pattern_items` participated in the check.
    pub has_pattern_items: bool,

    /// Whether a waiver value participated in the check.
    pub has_waiver_value: bool,

    /// Evidence items, in render order.
    pub details: Vec<DetailItem>,

    /// `ERROR01`, `ERROR02`, … buckets.
    pub error_groups: GroupMap,

    /// `WARN01`, … buckets.
    pub warn_groups: GroupMap,

    /// `INFO01`, … buckets.
    pub info_groups: GroupMap,

    /// Optional single `[INFO]` line rendered at the top of both artifacts.
    pub info_message: Option<String>,

    /// Execution/config error lines; when set with all groups empty the
    /// result renders as an error, not as PASS/FAIL.
    pub basic_errors: Option<Vec<String>>,

    /// Item description from the item config.
    pub item_desc: String,

    /// Fallback description for auto-created `ERROR01`/`WARN01`/`INFO01`.
    pub default_group_desc: Option<String>,
}

impl CheckResult {
    /// Assemble a result, deriving [`ResultType`] from the classification inputs.
    #[must_use]
    pub fn new(
        value: CheckValue,
        is_pass: bool,
        has_pattern_items: bool,
        has_waiver_value: bool,
        item_desc: impl Into<String>,
    ) -> Self {
        Self {
            result_type: ResultType::determine(value, is_pass, has_pattern_items, has_waiver_value),
            is_pass,
            value,
            has_pattern_items,
            has_waiver_value,
            details: Vec::new(),
            error_groups: GroupMap::new(),
            warn_groups: GroupMap::new(),
            info_groups: GroupMap::new(),
            info_message: None,
            basic_errors: None,
            item_desc: item_desc.into(),
            default_group_desc: None,
        }
    }

    /// Build an execution-error result (`value = "ERROR"`, single ERROR01 group).
    #[must_use]
    pub fn execution_error(item_desc: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut result = Self::new(CheckValue::Error, false, false, false, item_desc);
        result
            .details
            .push(DetailItem::unlocated(Severity::Fail, "", reason));
        result.error_groups.insert(
            "ERROR01".to_owned(),
            Group::new("Execution error", Vec::new()),
        );
        result
    }

    /// Build a configuration-error result from `[CONFIG_ERROR]` lines.
    #[must_use]
    pub fn config_error(item_desc: impl Into<String>, errors: Vec<String>) -> Self {
        let mut result = Self::new(CheckValue::NotApplicable, false, false, false, item_desc);
        result.result_type = ResultType::ConfigError;
        result.basic_errors = Some(errors);
        result
    }

    /// Whether this result renders with the `[CONFIG_ERROR]` status line.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        self.basic_errors
            .as_ref()
            .is_some_and(|errs| errs.iter().any(|e| e.contains(CONFIG_ERROR_MARKER)))
    }

    /// Whether the result is a bare execution/config error: `basic_errors`
    /// is set and every group map is empty. Aggregators apply no PASS/FAIL
    /// semantics to such results.
    #[must_use]
    pub fn is_basic_error_only(&self) -> bool {
        self.basic_errors.is_some()
            && self.error_groups.is_empty()
            && self.warn_groups.is_empty()
            && self.info_groups.is_empty()
    }

    /// Count details of the given severity, excluding display-mode waive lines.
    #[must_use]
    pub fn occurrence(&self, severity: Severity) -> usize {
        self.details
            .iter()
            .filter(|d| d.severity == severity && !d.is_waived_info())
            .count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_group_order() {
        assert!(Severity::Fail < Severity::Warn);
        assert!(Severity::Warn < Severity::Info);
    }

    #[test]
    fn test_check_value_display() {
        assert_eq!(CheckValue::Count(7).to_string(), "7");
        assert_eq!(CheckValue::NotApplicable.to_string(), "N/A");
        assert_eq!(CheckValue::Error.to_string(), "ERROR");
    }

    #[test]
    fn test_check_value_serde_round_trip() {
        for value in [
            CheckValue::Count(3),
            CheckValue::NotApplicable,
            CheckValue::Error,
        ] {
            let json = serde_json::to_string(&value).unwrap();
            let back: CheckValue = serde_json::from_str(&json).unwrap();
            assert_eq!(back, value);
        }
    }

    #[test]
    fn test_determine_execution_error_wins() {
        assert_eq!(
            ResultType::determine(CheckValue::Error, true, true, true),
            ResultType::ExecutionError
        );
    }

    #[test]
    fn test_determine_info_only() {
        assert_eq!(
            ResultType::determine(CheckValue::NotApplicable, true, false, false),
            ResultType::InfoOnly
        );
        assert_eq!(
            ResultType::determine(CheckValue::NotApplicable, false, false, false),
            ResultType::FailWithValues
        );
    }

    #[test]
    fn test_determine_na_with_waivers() {
        assert_eq!(
            ResultType::determine(CheckValue::NotApplicable, true, false, true),
            ResultType::PassWithWaivers
        );
        assert_eq!(
            ResultType::determine(CheckValue::NotApplicable, false, false, true),
            ResultType::FailWithWaivers
        );
    }

    #[test]
    fn test_determine_zero_rows() {
        assert_eq!(
            ResultType::determine(CheckValue::Count(0), true, false, false),
            ResultType::PassWithoutValues
        );
        assert_eq!(
            ResultType::determine(CheckValue::Count(0), false, true, false),
            ResultType::FailWithoutCheckValues
        );
        assert_eq!(
            ResultType::determine(CheckValue::Count(0), true, true, true),
            ResultType::PassWithFullWaivers
        );
        assert_eq!(
            ResultType::determine(CheckValue::Count(0), false, true, true),
            ResultType::FailWithoutCheckValues
        );
    }

    #[test]
    fn test_determine_positive_rows() {
        assert_eq!(
            ResultType::determine(CheckValue::Count(2), true, false, true),
            ResultType::PassWithWaivers
        );
        assert_eq!(
            ResultType::determine(CheckValue::Count(2), false, false, true),
            ResultType::FailWithWaivers
        );
        assert_eq!(
            ResultType::determine(CheckValue::Count(2), true, false, false),
            ResultType::PassWithValues
        );
        assert_eq!(
            ResultType::determine(CheckValue::Count(2), false, false, false),
            ResultType::FailWithValues
        );
    }

    #[test]
    fn test_determine_is_total() {
        // Every combination must classify without panicking.
        let values = [
            CheckValue::Count(-1),
            CheckValue::Count(0),
            CheckValue::Count(5),
            CheckValue::NotApplicable,
            CheckValue::Error,
        ];
        for value in values {
            for is_pass in [true, false] {
                for pattern in [true, false] {
                    for waiver in [true, false] {
                        let _ = ResultType::determine(value, is_pass, pattern, waiver);
                    }
                }
            }
        }
    }

    #[test]
    fn test_result_type_codes() {
        assert_eq!(ResultType::PassWithValues.code(), 1);
        assert_eq!(ResultType::ConfigError.code(), 10);
    }

    #[test]
    fn test_detail_location_rules() {
        let mut d = DetailItem::unlocated(Severity::Info, "x", "r");
        assert!(!d.has_location());
        d.line_number = 12;
        assert!(!d.has_location());
        d.file_path = "log.txt".to_owned();
        assert!(d.has_location());
        d.line_number = 0;
        assert!(!d.has_location());
    }

    #[test]
    fn test_config_error_detection() {
        let result = CheckResult::config_error(
            "desc",
            vec!["[CONFIG_ERROR]: Input file not found: a.rpt".to_owned()],
        );
        assert!(result.is_config_error());
        assert!(result.is_basic_error_only());
        assert_eq!(result.result_type, ResultType::ConfigError);
    }

    #[test]
    fn test_occurrence_skips_waived_info() {
        let mut result = CheckResult::new(CheckValue::Count(1), true, false, false, "d");
        result
            .details
            .push(DetailItem::unlocated(Severity::Info, "a", "found"));
        result.details.push(DetailItem::unlocated(
            Severity::Info,
            "w",
            "Waiver item[WAIVED_INFO]",
        ));
        assert_eq!(result.occurrence(Severity::Info), 1);
    }
}
