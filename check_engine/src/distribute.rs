//! Data-interface distribution — fans the top-level `DATA_INTERFACE.yaml`
//! out into per-item config documents.
//!
//! The interface document maps `module → item_id → item-config document`.
//! Distribution writes each document to
//! `Check_modules/<module>/inputs/items/<item_id>.yaml` atomically, skipping
//! targets whose serialized content is already identical, and honoring the
//! dispatcher's module/item filters.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::{item_config_path, ConfigError};
use crate::formatter::write_atomic;

/// Relative location of the data interface document.
pub const DATA_INTERFACE_REL: &str = "Data_interface/outputs/DATA_INTERFACE.yaml";

/// Per-module item documents, keyed by item id.
type ModuleItems = BTreeMap<String, serde_yaml::Value>;

/// Outcome counters of one distribution run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistributionStats {
    /// Item documents written.
    pub written: usize,
    /// Item documents skipped because the target was already identical.
    pub skipped: usize,
}

/// Distribute the data interface to per-item config files.
///
/// `check_module`/`check_items` restrict the fan-out the same way they
/// restrict execution; an empty `check_items` slice means "all items".
///
/// # Errors
///
/// Returns an error when the interface document cannot be read or parsed,
/// or when a target file cannot be written.
pub fn parse_and_distribute(
    root: &Path,
    check_module: Option<&str>,
    check_items: &[String],
) -> Result<DistributionStats, ConfigError> {
    let interface_path = root.join(DATA_INTERFACE_REL);
    let content = std::fs::read_to_string(&interface_path)
        .map_err(|e| ConfigError::Read(interface_path.display().to_string(), e.to_string()))?;
    let interface: BTreeMap<String, ModuleItems> = serde_yaml::from_str(&content)
        .map_err(|e| ConfigError::Parse(interface_path.display().to_string(), e.to_string()))?;

    let mut stats = DistributionStats::default();

    for (module, items) in &interface {
        if check_module.is_some_and(|m| m != module) {
            continue;
        }
        log::info!("Processing module {module}: {} item(s)", items.len());

        for (item_id, document) in items {
            if !check_items.is_empty() && !check_items.iter().any(|i| i == item_id) {
                continue;
            }

            let serialized = serde_yaml::to_string(document)
                .map_err(|e| ConfigError::Parse(item_id.clone(), e.to_string()))?;
            let target = item_config_path(root, module, item_id);

            // Identical content already in place: preserve mtimes, skip.
            if let Ok(existing) = std::fs::read_to_string(&target) {
                if existing == serialized {
                    stats.skipped += 1;
                    continue;
                }
            }

            write_atomic(&target, &serialized)
                .map_err(|e| ConfigError::Write(target.display().to_string(), e.to_string()))?;
            stats.written += 1;
        }
    }

    Ok(stats)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
