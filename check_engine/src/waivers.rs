//! Waiver handling — parsing waiver declarations, matching violations
//! against them, and formatting waived reasons.
//!
//! A waiver declaration is either a bare string (the matched token) or a
//! `{name, reason}` pair. Matching tries, in order: exact case-insensitive
//! equality, an anchored case-insensitive wildcard when the key contains
//! `*`, and a case-insensitive substring fallback for keys without wildcard
//! characters. Each key retires on its first matching violation; keys that
//! match nothing are reported as unused.

use globset::GlobBuilder;
use serde::Deserialize;

use crate::types::TAG_WAIVER;

/// One waiver declaration from `waivers.waive_items`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WaiveEntry {
    /// Bare string form: the matched token, with no recorded reason.
    Name(String),
    /// Structured form with an explicit reason.
    Detailed {
        /// The matched token.
        name: String,
        /// Business justification for the waiver.
        #[serde(default)]
        reason: String,
    },
}

impl WaiveEntry {
    /// The matched token of this entry.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Detailed { name, .. } => name,
        }
    }

    /// The recorded reason (empty for the bare form).
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::Name(_) => "",
            Self::Detailed { reason, .. } => reason,
        }
    }
}

/// An ordered `name → reason` map of parsed waiver declarations.
///
/// Declaration order is preserved: matching walks entries in the order the
/// project declared them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaiveMap {
    entries: Vec<(String, String)>,
}

impl WaiveMap {
    /// Whether no waivers are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of declared waivers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The reason recorded for a key, if the key is declared.
    #[must_use]
    pub fn reason(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, reason)| reason.as_str())
    }

    /// Keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// `(key, reason)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, reason)| (name.as_str(), reason.as_str()))
    }
}

/// Normalize raw waive entries into an ordered [`WaiveMap`].
///
/// Later duplicates of a key are dropped; the first declaration wins.
#[must_use]
pub fn parse_waive_items(raw: &[WaiveEntry]) -> WaiveMap {
    let mut map = WaiveMap::default();
    for entry in raw {
        let name = entry.name().trim();
        if name.is_empty() || map.reason(name).is_some() {
            continue;
        }
        map.entries
            .push((name.to_owned(), entry.reason().trim().to_owned()));
    }
    map
}

/// Whether a wildcard key matches an item: `*` expands to any sequence,
/// anchored at both ends, case-insensitive.
fn wildcard_matches(key: &str, item: &str) -> bool {
    GlobBuilder::new(key)
        .case_insensitive(true)
        .literal_separator(false)
        .build()
        .map(|glob| glob.compile_matcher().is_match(item))
        .unwrap_or(false)
}

/// Find the first waiver key matching `item`.
///
/// Match order per key: exact case-insensitive equality; anchored wildcard
/// when the key contains `*`; case-insensitive substring when it does not.
/// Returns the matched key, or `None`. Callers track used keys themselves —
/// a key may retire at most one item per result.
#[must_use]
pub fn match_waiver_entry<'a>(item: &str, waivers: &'a WaiveMap) -> Option<&'a str> {
    let item_lower = item.to_lowercase();

    for (key, _) in &waivers.entries {
        let key_lower = key.to_lowercase();

        if key_lower == item_lower {
            return Some(key);
        }

        if key.contains('*') {
            if wildcard_matches(key, item) {
                return Some(key);
            }
        } else if item_lower.contains(&key_lower) {
            return Some(key);
        }
    }

    None
}

/// Format a waived reason: `"<base>: <waiver_reason><tag>"` when the waiver
/// carries a reason, else `"<base><tag>"`.
#[must_use]
pub fn format_waiver_reason(base_reason: &str, waiver_reason: &str, tag: &str) -> String {
    if waiver_reason.is_empty() {
        format!("{base_reason}{tag}")
    } else {
        format!("{base_reason}: {waiver_reason}{tag}")
    }
}

/// Violations split by waiver coverage.
#[derive(Debug, Clone, Default)]
pub struct WaiverSplit {
    /// Violations matched by some waiver key.
    pub waived: Vec<String>,
    /// Violations no key matched.
    pub unwaived: Vec<String>,
    /// `violation → matched key`, in violation order.
    pub matched_keys: Vec<(String, String)>,
    /// Declared keys that matched nothing, in declaration order.
    pub unused: Vec<String>,
}

/// Classify violations against a waiver map.
///
/// The first matching violation retires a key immediately; subsequent
/// violations cannot reuse it.
#[must_use]
pub fn classify_violations(violations: &[String], waivers: &WaiveMap) -> WaiverSplit {
    let mut split = WaiverSplit::default();
    let mut used: Vec<&str> = Vec::new();

    for violation in violations {
        let remaining = WaiveMap {
            entries: waivers
                .entries
                .iter()
                .filter(|(name, _)| !used.iter().any(|u| u == name))
                .cloned()
                .collect(),
        };

        match match_waiver_entry(violation, &remaining) {
            Some(key) => {
                let key = key.to_owned();
                used.push(
                    waivers
                        .keys()
                        .find(|k| *k == key)
                        .expect("matched key is declared"),
                );
                split.waived.push(violation.clone());
                split.matched_keys.push((violation.clone(), key));
            }
            None => split.unwaived.push(violation.clone()),
        }
    }

    split.unused = waivers
        .keys()
        .filter(|key| !used.contains(key))
        .map(str::to_owned)
        .collect();

    split
}

/// Reason attached to waived details when no explicit base reason is given.
#[must_use]
pub fn default_waived_reason(waiver_reason: &str) -> String {
    format_waiver_reason("Violation waived", waiver_reason, TAG_WAIVER)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
