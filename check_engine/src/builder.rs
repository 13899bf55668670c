//! Output builder — one-call assembly of a complete [`CheckResult`] from
//! categorized item sets.
//!
//! Nearly every checker funnels its findings through
//! [`build_complete_output`]: found/missing/waived/unused/extra item sets go
//! in, a fully grouped result comes out. The builder owns the canonical
//! detail ordering (waived, found, missing, unused, with extras spliced
//! before the first failing detail), the INFO01/INFO02/ERROR01/WARN01 group
//! layout, the pass computation, and the waiver-display-mode downgrade of
//! FAIL/WARN evidence to tagged INFO.

use std::collections::BTreeMap;

use crate::types::{
    CheckResult, CheckValue, DetailItem, Group, Severity, TAG_WAIVED_AS_INFO, TAG_WAIVER,
};
use crate::waivers::{format_waiver_reason, WaiveMap};

/// Metadata attached to one categorized item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemMeta {
    /// 1-based line number of the evidence (0 = none).
    pub line_number: u32,
    /// Source file of the evidence (`None` = builder default).
    pub file_path: Option<String>,
    /// Matched line content, when available.
    pub line_content: String,
}

/// An ordered set of categorized items, name → metadata.
///
/// Accepts either full metadata or bare names (promoted to empty metadata),
/// the one-time normalization at the API boundary.
#[derive(Debug, Clone, Default)]
pub struct ItemSet {
    entries: BTreeMap<String, ItemMeta>,
}

impl ItemSet {
    /// Build from bare names.
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: names
                .into_iter()
                .map(|name| (name.into(), ItemMeta::default()))
                .collect(),
        }
    }

    /// Build from names with metadata.
    #[must_use]
    pub fn from_meta<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = (S, ItemMeta)>,
        S: Into<String>,
    {
        Self {
            entries: items
                .into_iter()
                .map(|(name, meta)| (name.into(), meta))
                .collect(),
        }
    }

    /// Insert one item.
    pub fn insert(&mut self, name: impl Into<String>, meta: ItemMeta) {
        self.entries.insert(name.into(), meta);
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Sorted unique names.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Metadata for a name, when present.
    #[must_use]
    pub fn meta(&self, name: &str) -> Option<&ItemMeta> {
        self.entries.get(name)
    }

    fn iter(&self) -> impl Iterator<Item = (&String, &ItemMeta)> {
        self.entries.iter()
    }
}

/// A per-category reason: a fixed string, or a function of the item metadata
/// (how per-item dynamic sentences are produced).
pub enum ReasonSpec {
    /// Same reason for every item in the category.
    Text(String),
    /// Reason computed from the item's metadata.
    Fn(Box<dyn Fn(&str, &ItemMeta) -> String>),
}

impl ReasonSpec {
    /// Fixed-text reason.
    #[must_use]
    pub fn text(reason: impl Into<String>) -> Self {
        Self::Text(reason.into())
    }

    fn render(&self, name: &str, meta: &ItemMeta) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Fn(f) => f(name, meta),
        }
    }
}

impl std::fmt::Debug for ReasonSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Fn(_) => f.debug_tuple("Fn").finish(),
        }
    }
}

/// Inputs to [`build_complete_output`].
#[derive(Debug)]
pub struct OutputSpec {
    /// Items that satisfied the check.
    pub found_items: Option<ItemSet>,
    /// Unwaived violations.
    pub missing_items: Option<ItemSet>,
    /// Violations accepted by a waiver (or display-mode waive entries).
    pub waived_items: Option<ItemSet>,
    /// Declared waivers that matched nothing.
    pub unused_waivers: Option<ItemSet>,
    /// Findings outside the expected set (Type 2 extras).
    pub extra_items: Option<ItemSet>,
    /// Waiver key → reason, for waived/unused reason formatting.
    pub waive_dict: WaiveMap,
    /// Explicit value; defaults to the found-item count.
    pub value: Option<CheckValue>,
    /// Classification flag: pattern items participated.
    pub has_pattern_items: bool,
    /// Classification flag: a waiver value participated.
    pub has_waiver_value: bool,
    /// Waiver display mode: collapse FAIL/WARN to tagged INFO and force PASS.
    pub convert_to_info: bool,
    /// Default file path for items without metadata.
    pub default_file: String,
    /// Reason for found items.
    pub found_reason: ReasonSpec,
    /// Reason for missing items.
    pub missing_reason: ReasonSpec,
    /// Explicit severity for missing items (`None` = Fail).
    pub missing_severity: Option<Severity>,
    /// Base reason for waived items (tag and waiver reason appended).
    pub waived_base_reason: String,
    /// Reason for unused waivers.
    pub unused_waiver_reason: String,
    /// Reason for extra items.
    pub extra_reason: ReasonSpec,
    /// Explicit severity for extra items (`None` = Warn).
    pub extra_severity: Option<Severity>,
    /// Tag appended to waived reasons (`[WAIVER]` or `[WAIVED_INFO]`).
    pub waived_tag: String,
    /// Group descriptions.
    pub found_desc: String,
    /// Description for the missing-items group.
    pub missing_desc: String,
    /// Description for the waived-items group.
    pub waived_desc: String,
    /// Description for the unused-waivers group.
    pub unused_desc: String,
    /// Description for the extra-items group.
    pub extra_desc: String,
    /// Item description carried onto the result.
    pub item_desc: String,
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            found_items: None,
            missing_items: None,
            waived_items: None,
            unused_waivers: None,
            extra_items: None,
            waive_dict: WaiveMap::default(),
            value: None,
            has_pattern_items: false,
            has_waiver_value: false,
            convert_to_info: false,
            default_file: "N/A".to_owned(),
            found_reason: ReasonSpec::text("Item found"),
            missing_reason: ReasonSpec::text("Item not found"),
            missing_severity: None,
            waived_base_reason: "Item not found".to_owned(),
            unused_waiver_reason: "Waiver defined but no violation matched".to_owned(),
            extra_reason: ReasonSpec::text("Unexpected item found"),
            extra_severity: None,
            waived_tag: TAG_WAIVER.to_owned(),
            found_desc: "Items found".to_owned(),
            missing_desc: "Items not found".to_owned(),
            waived_desc: "Items waived".to_owned(),
            unused_desc: "Unused waivers".to_owned(),
            extra_desc: "Unexpected items need review".to_owned(),
            item_desc: String::new(),
        }
    }
}

fn set_ref(set: &Option<ItemSet>) -> Option<&ItemSet> {
    set.as_ref().filter(|s| !s.is_empty())
}

/// Next free `INFO0k` key for a group map.
fn next_info_key(info_groups: &crate::types::GroupMap) -> String {
    format!("INFO{:02}", info_groups.len() + 1)
}

/// Assemble the complete [`CheckResult`] in one step: details, groups, pass
/// status, value, and legacy classification.
#[must_use]
pub fn build_complete_output(spec: OutputSpec) -> CheckResult {
    let convert = spec.convert_to_info;

    let found = set_ref(&spec.found_items);
    let missing = set_ref(&spec.missing_items);
    let waived = set_ref(&spec.waived_items);
    let unused = set_ref(&spec.unused_waivers);
    let extra = set_ref(&spec.extra_items);

    // Value defaults to the found count when a found set was supplied at all.
    let value = spec.value.unwrap_or_else(|| {
        spec.found_items
            .as_ref()
            .map_or(CheckValue::NotApplicable, |s| {
                CheckValue::Count(s.len() as i64)
            })
    });

    // Pass computation: display mode forces PASS; otherwise missing items
    // fail, and so do extra items carrying FAIL severity.
    let is_pass = if convert {
        true
    } else {
        let missing_empty = missing.is_none();
        let extra_fails = extra.is_some() && spec.extra_severity == Some(Severity::Fail);
        missing_empty && !extra_fails
    };

    // -----------------------------------------------------------------
    // Details: waived, found, missing, unused.
    // -----------------------------------------------------------------
    let mut details: Vec<DetailItem> = Vec::new();
    let file_for = |meta: &ItemMeta| {
        meta.file_path
            .clone()
            .unwrap_or_else(|| spec.default_file.clone())
    };

    if let Some(waived) = waived {
        for (name, meta) in waived.iter() {
            let waiver_reason = spec.waive_dict.reason(name).unwrap_or_default();
            let reason =
                format_waiver_reason(&spec.waived_base_reason, waiver_reason, &spec.waived_tag);
            details.push(DetailItem {
                severity: Severity::Info,
                name: name.clone(),
                line_number: meta.line_number,
                file_path: file_for(meta),
                reason,
            });
        }
    }

    if let Some(found) = found {
        for (name, meta) in found.iter() {
            details.push(DetailItem {
                severity: Severity::Info,
                name: name.clone(),
                line_number: meta.line_number,
                file_path: file_for(meta),
                reason: spec.found_reason.render(name, meta),
            });
        }
    }

    if let Some(missing) = missing {
        let severity = if convert {
            Severity::Info
        } else {
            spec.missing_severity.unwrap_or(Severity::Fail)
        };
        for (name, meta) in missing.iter() {
            let mut reason = spec.missing_reason.render(name, meta);
            if convert {
                reason.push_str(TAG_WAIVED_AS_INFO);
            }
            details.push(DetailItem {
                severity,
                name: name.clone(),
                line_number: meta.line_number,
                file_path: file_for(meta),
                reason,
            });
        }
    }

    if let Some(unused) = unused {
        let severity = if convert { Severity::Info } else { Severity::Warn };
        let tag = if convert { TAG_WAIVED_AS_INFO } else { TAG_WAIVER };
        for (name, meta) in unused.iter() {
            let waiver_reason = spec.waive_dict.reason(name).unwrap_or_default();
            let reason = format_waiver_reason(&spec.unused_waiver_reason, waiver_reason, tag);
            details.push(DetailItem {
                severity,
                name: name.clone(),
                line_number: meta.line_number,
                file_path: file_for(meta),
                reason,
            });
        }
    }

    // Extras splice in immediately before the first failing detail.
    if let Some(extra) = extra {
        let severity = if convert {
            Severity::Info
        } else {
            spec.extra_severity.unwrap_or(Severity::Warn)
        };
        let mut extra_details = Vec::new();
        for (name, meta) in extra.iter() {
            let mut reason = spec.extra_reason.render(name, meta);
            if convert {
                reason.push_str(TAG_WAIVED_AS_INFO);
            }
            extra_details.push(DetailItem {
                severity,
                name: name.clone(),
                line_number: meta.line_number,
                file_path: file_for(meta),
                reason,
            });
        }
        let insert_pos = details
            .iter()
            .position(|d| d.severity == Severity::Fail)
            .unwrap_or(details.len());
        details.splice(insert_pos..insert_pos, extra_details);
    }

    // -----------------------------------------------------------------
    // Groups.
    // -----------------------------------------------------------------
    let mut info_groups = crate::types::GroupMap::new();
    let mut error_groups = crate::types::GroupMap::new();
    let mut warn_groups = crate::types::GroupMap::new();

    if let Some(waived) = waived {
        info_groups.insert(
            "INFO01".to_owned(),
            Group::new(spec.waived_desc.clone(), waived.names()),
        );
    }

    if let Some(found) = found {
        let key = if waived.is_some() { "INFO02" } else { "INFO01" };
        info_groups.insert(
            key.to_owned(),
            Group::new(spec.found_desc.clone(), found.names()),
        );
    }

    if convert {
        if let Some(missing) = missing {
            info_groups.insert(
                next_info_key(&info_groups),
                Group::new(
                    format!("{TAG_WAIVED_AS_INFO}: {}", spec.missing_desc),
                    missing.names(),
                ),
            );
        }
        if let Some(unused) = unused {
            info_groups.insert(
                next_info_key(&info_groups),
                Group::new(
                    format!("{TAG_WAIVED_AS_INFO}: {}", spec.unused_desc),
                    unused.names(),
                ),
            );
        }
    } else {
        if let Some(missing) = missing {
            error_groups.insert(
                "ERROR01".to_owned(),
                Group::new(spec.missing_desc.clone(), missing.names()),
            );
        }
        if let Some(unused) = unused {
            warn_groups.insert(
                "WARN01".to_owned(),
                Group::new(spec.unused_desc.clone(), unused.names()),
            );
        }
    }

    if let Some(extra) = extra {
        if convert {
            info_groups.insert(
                next_info_key(&info_groups),
                Group::new(
                    format!("{TAG_WAIVED_AS_INFO}: {}", spec.extra_desc),
                    extra.names(),
                ),
            );
        } else if spec.extra_severity == Some(Severity::Fail) {
            error_groups.insert(
                "ERROR01".to_owned(),
                Group::new(spec.extra_desc.clone(), extra.names()),
            );
        } else {
            warn_groups.insert(
                "WARN01".to_owned(),
                Group::new(spec.extra_desc.clone(), extra.names()),
            );
        }
    }

    let mut result = CheckResult::new(
        value,
        is_pass,
        spec.has_pattern_items,
        spec.has_waiver_value,
        spec.item_desc,
    );
    result.details = details;
    result.info_groups = info_groups;
    result.error_groups = error_groups;
    result.warn_groups = warn_groups;
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
