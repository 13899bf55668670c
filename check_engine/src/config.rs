//! Configuration loading for the checkflow engine.
//!
//! Three configuration surfaces:
//!
//! 1. **Flow config** — optional `checkflow.toml` at the checklist root,
//!    overriding built-in defaults for cache sizing and the per-checker
//!    timeout. CLI flags override both.
//! 2. **Item config** — one YAML document per check item under
//!    `Check_modules/<module>/inputs/items/<item_id>.yaml`, loaded once per
//!    item and never mutated.
//! 3. **Module map** — `stage → module → items`, from a stage manifest at
//!    `Project_config/stages/<stage>.yaml` when present, otherwise
//!    discovered by walking the `Check_modules/` layout.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use crate::types::CheckValue;
use crate::waivers::WaiveEntry;

/// Placeholder in `input_files` entries resolved to the checklist root.
pub const CHECKLIST_ROOT_VAR: &str = "${CHECKLIST_ROOT}";

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("Failed to read config file '{0}': {1}")]
    Read(String, String),

    /// Failed to parse a configuration file.
    #[error("Failed to parse config file '{0}': {1}")]
    Parse(String, String),

    /// Failed to write a distributed configuration file.
    #[error("Failed to write config file '{0}': {1}")]
    Write(String, String),

    /// A requested module is not in the configuration.
    #[error("Module {0} not in config")]
    UnknownModule(String),

    /// No modules are configured at all.
    #[error("No modules found in configuration")]
    NoModules,
}

// ---------------------------------------------------------------------------
// Flow config
// ---------------------------------------------------------------------------

/// Runtime settings of the dispatcher and cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowConfig {
    /// Maximum entries held by the in-memory result cache.
    pub max_cache_size: usize,
    /// Whether the cross-process file cache is enabled.
    pub enable_file_cache: bool,
    /// File-cache directory (`None` = `<root>/Work/.cache`).
    pub cache_dir: Option<PathBuf>,
    /// Wall-clock timeout per checker child, in seconds.
    pub checker_timeout_secs: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            max_cache_size: 200,
            enable_file_cache: false,
            cache_dir: None,
            checker_timeout_secs: 300,
        }
    }
}

/// Raw TOML structure for `checkflow.toml`.
#[derive(Debug, Deserialize)]
struct TomlFlowFile {
    flow: Option<TomlFlowSection>,
}

/// The `[flow]` section inside the TOML file.
#[derive(Debug, Deserialize)]
struct TomlFlowSection {
    max_cache_size: Option<usize>,
    enable_file_cache: Option<bool>,
    cache_dir: Option<String>,
    checker_timeout_secs: Option<u64>,
}

impl FlowConfig {
    /// Load the flow config from `<root>/checkflow.toml`, falling back to
    /// built-in defaults when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if a present file cannot be read or parsed.
    pub fn load_from_project(root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = root.join("checkflow.toml");
        if !path.is_file() {
            return Ok(config);
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Read(path.display().to_string(), e.to_string()))?;
        let parsed: TomlFlowFile = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(path.display().to_string(), e.to_string()))?;

        if let Some(section) = parsed.flow {
            if let Some(v) = section.max_cache_size {
                config.max_cache_size = v;
            }
            if let Some(v) = section.enable_file_cache {
                config.enable_file_cache = v;
            }
            if let Some(v) = section.cache_dir {
                config.cache_dir = Some(PathBuf::from(v));
            }
            if let Some(v) = section.checker_timeout_secs {
                config.checker_timeout_secs = v;
            }
        }

        Ok(config)
    }

    /// The effective file-cache directory for a checklist root.
    #[must_use]
    pub fn effective_cache_dir(&self, root: &Path) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| root.join("Work").join(".cache"))
    }
}

// ---------------------------------------------------------------------------
// Item config
// ---------------------------------------------------------------------------

/// A `value` field in requirements/waivers: an integer or `"N/A"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigValue {
    /// A concrete integer.
    Count(i64),
    /// The `"N/A"` sentinel (also the default when absent).
    NotApplicable,
}

impl ConfigValue {
    /// Whether the value is a positive integer.
    #[must_use]
    pub fn is_positive(self) -> bool {
        matches!(self, Self::Count(n) if n > 0)
    }

    /// Whether the value is integer zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self == Self::Count(0)
    }

    /// Convert to the result-model value representation.
    #[must_use]
    pub fn to_check_value(self) -> CheckValue {
        match self {
            Self::Count(n) => CheckValue::Count(n),
            Self::NotApplicable => CheckValue::NotApplicable,
        }
    }
}

impl Default for ConfigValue {
    fn default() -> Self {
        Self::NotApplicable
    }
}

impl<'de> Deserialize<'de> for ConfigValue {
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
            Raw::Text(s) => s.parse::<i64>().map(Self::Count).map_err(|_| {
                serde::de::Error::custom(format!("expected integer or \"N/A\", got '{s}'"))
            }),
        }
    }
}

/// Declared expectations of a check item.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Requirements {
    /// Requirement value: an integer or `"N/A"`.
    #[serde(default)]
    pub value: ConfigValue,
    /// Patterns the check must find.
    #[serde(default)]
    pub pattern_items: Vec<String>,
}

/// Declared waivers of a check item.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Waivers {
    /// Waiver value: an integer or `"N/A"`. Zero selects display mode.
    #[serde(default)]
    pub value: ConfigValue,
    /// Waiver declarations (bare strings or `{name, reason}` pairs).
    #[serde(default)]
    pub waive_items: Vec<WaiveEntry>,
}

/// The per-item configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemConfig {
    /// Human description of the check.
    #[serde(default)]
    pub item_desc: String,
    /// Declared expectations.
    #[serde(default)]
    pub requirements: Requirements,
    /// Declared waivers.
    #[serde(default)]
    pub waivers: Waivers,
    /// Input files, possibly containing `${CHECKLIST_ROOT}`.
    #[serde(default)]
    pub input_files: Vec<String>,
}

/// Path of an item's config document.
#[must_use]
pub fn item_config_path(root: &Path, module: &str, item_id: &str) -> PathBuf {
    root.join("Check_modules")
        .join(module)
        .join("inputs")
        .join("items")
        .join(format!("{item_id}.yaml"))
}

/// Load one item config document.
///
/// # Errors
///
/// Returns an error when the document is missing, unreadable, or malformed.
pub fn load_item_config(
    root: &Path,
    module: &str,
    item_id: &str,
) -> Result<ItemConfig, ConfigError> {
    let path = item_config_path(root, module, item_id);
    let content = std::fs::read_to_string(&path)
        .map_err(|e| ConfigError::Read(path.display().to_string(), e.to_string()))?;
    serde_yaml::from_str(&content)
        .map_err(|e| ConfigError::Parse(path.display().to_string(), e.to_string()))
}

// ---------------------------------------------------------------------------
// Module map
// ---------------------------------------------------------------------------

/// Stage manifest document: `modules: {name: [item ids]}`.
#[derive(Debug, Deserialize)]
struct StageManifest {
    #[serde(default)]
    modules: BTreeMap<String, Vec<String>>,
}

/// Load the `module → items` map for a stage.
///
/// Consults `Project_config/stages/<stage>.yaml` first; when absent, walks
/// `Check_modules/*/inputs/items/*.yaml` (sorted, deterministic).
///
/// # Errors
///
/// Returns an error when a present manifest cannot be read or parsed.
pub fn load_modules_map(
    root: &Path,
    stage: &str,
) -> Result<BTreeMap<String, Vec<String>>, ConfigError> {
    let manifest = root
        .join("Project_config")
        .join("stages")
        .join(format!("{stage}.yaml"));

    if manifest.is_file() {
        let content = std::fs::read_to_string(&manifest)
            .map_err(|e| ConfigError::Read(manifest.display().to_string(), e.to_string()))?;
        let parsed: StageManifest = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(manifest.display().to_string(), e.to_string()))?;
        return Ok(parsed.modules);
    }

    Ok(discover_modules(root))
}

/// Discover modules and items by walking the `Check_modules/` layout.
///
/// A module is any directory directly under `Check_modules/` holding an
/// `inputs/items/` directory; its items are the `*.yaml` stems inside,
/// sorted.
#[must_use]
pub fn discover_modules(root: &Path) -> BTreeMap<String, Vec<String>> {
    let mut modules = BTreeMap::new();
    let base = root.join("Check_modules");

    for entry in WalkDir::new(&base)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_dir() {
            continue;
        }
        let module = entry.file_name().to_string_lossy().to_string();
        let items_dir = entry.path().join("inputs").join("items");
        if !items_dir.is_dir() {
            continue;
        }

        let mut items: Vec<String> = WalkDir::new(&items_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                name.strip_suffix(".yaml").map(str::to_owned)
            })
            .collect();
        items.sort();

        modules.insert(module, items);
    }

    modules
}

/// Resolve an `input_files` entry: substitute `${CHECKLIST_ROOT}` and anchor
/// relative paths at the checklist root.
#[must_use]
pub fn resolve_input_path(root: &Path, entry: &str) -> PathBuf {
    let substituted = entry.replace(CHECKLIST_ROOT_VAR, &root.display().to_string());
    let path = PathBuf::from(&substituted);
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
