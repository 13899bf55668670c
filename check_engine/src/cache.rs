//! Result cache for the checkflow engine.
//!
//! A bounded LRU map from item id to the latest [`CheckResult`], with an
//! optional file-backed tier for cross-process sharing. The memory copy is
//! per-process; when the file cache is enabled the on-disk copy is
//! authoritative across processes.
//!
//! File-cache concurrency is handled via atomic writes (temp file + rename).
//! Last writer wins; no locking. Readers tolerate a concurrent writer by
//! retrying the read-then-parse once before counting a miss. Cache errors
//! are logged, never propagated — the cache is a performance layer, not a
//! correctness requirement.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::formatter::write_atomic;
use crate::types::CheckResult;

/// Default maximum number of in-memory entries.
pub const DEFAULT_MAX_ENTRIES: usize = 200;

/// Counters exposed for end-of-run logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from memory or file.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Entries dropped under capacity pressure.
    pub evictions: u64,
}

impl CacheStats {
    /// Total lookups.
    #[must_use]
    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }

    /// Hit rate in percent (0.0 when no lookups happened).
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 * 100.0 / total as f64
        }
    }
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Requests: {}, Hits: {}, Misses: {}, Hit Rate: {:.1}%",
            self.total_requests(),
            self.hits,
            self.misses,
            self.hit_rate()
        )
    }
}

/// On-disk entry format for the file cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedEntry {
    /// When this result was published.
    cached_at: DateTime<Utc>,
    /// The cached result.
    result: CheckResult,
}

/// Bounded LRU result cache with an optional file tier.
///
/// One instance is owned by each process (dispatcher and every checker
/// child) and injected explicitly; there is no global cache state.
#[derive(Debug)]
pub struct ResultCache {
    entries: HashMap<String, CheckResult>,
    recency: VecDeque<String>,
    max_entries: usize,
    file_dir: Option<PathBuf>,
    stats: CacheStats,
}

impl ResultCache {
    /// Create a memory-only cache with the given capacity.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            recency: VecDeque::new(),
            max_entries: max_entries.max(1),
            file_dir: None,
            stats: CacheStats::default(),
        }
    }

    /// Create a cache backed by a file directory for cross-process sharing.
    #[must_use]
    pub fn with_file_cache(max_entries: usize, dir: impl Into<PathBuf>) -> Self {
        let mut cache = Self::new(max_entries);
        cache.file_dir = Some(dir.into());
        cache
    }

    /// Whether the file tier is enabled.
    #[must_use]
    pub fn file_cache_enabled(&self) -> bool {
        self.file_dir.is_some()
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Number of in-memory entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the memory tier is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn touch(&mut self, item_id: &str) {
        if let Some(pos) = self.recency.iter().position(|id| id == item_id) {
            self.recency.remove(pos);
        }
        self.recency.push_back(item_id.to_owned());
    }

    fn entry_path(&self, item_id: &str) -> Option<PathBuf> {
        self.file_dir
            .as_ref()
            .map(|dir| dir.join(format!("{item_id}.json")))
    }

    /// Publish a result, evicting the least-recently-used entries past
    /// capacity and mirroring to the file tier when enabled.
    pub fn set(&mut self, item_id: &str, result: CheckResult) {
        if let Some(path) = self.entry_path(item_id) {
            let entry = CachedEntry {
                cached_at: Utc::now(),
                result: result.clone(),
            };
            match serde_json::to_string(&entry) {
                Ok(json) => {
                    if let Err(e) = write_atomic(&path, &json) {
                        log::warn!("Failed to write cache entry {}: {}", path.display(), e);
                    }
                }
                Err(e) => log::warn!("Failed to serialize cache entry for {item_id}: {e}"),
            }
        }

        self.entries.insert(item_id.to_owned(), result);
        self.touch(item_id);

        while self.entries.len() > self.max_entries {
            let Some(oldest) = self.recency.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            self.stats.evictions += 1;
        }
    }

    /// Look up the latest result for an item: memory first, then the file
    /// tier (a file hit is promoted into memory).
    pub fn get(&mut self, item_id: &str) -> Option<CheckResult> {
        if let Some(result) = self.entries.get(item_id).cloned() {
            self.touch(item_id);
            self.stats.hits += 1;
            return Some(result);
        }

        if let Some(path) = self.entry_path(item_id) {
            if let Some(entry) = read_entry_with_retry(&path) {
                self.entries.insert(item_id.to_owned(), entry.result.clone());
                self.touch(item_id);
                self.stats.hits += 1;
                return Some(entry.result);
            }
        }

        self.stats.misses += 1;
        None
    }

    /// Drop every in-memory entry (the file tier is untouched).
    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }
}

/// Read and parse one file-cache entry, retrying once on failure.
///
/// A concurrent writer can leave a read racing against a rename; one retry
/// covers that window.
fn read_entry_with_retry(path: &Path) -> Option<CachedEntry> {
    for attempt in 0..2 {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<CachedEntry>(&content) {
                Ok(entry) => return Some(entry),
                Err(e) => {
                    if attempt == 1 {
                        log::warn!("Corrupt cache entry {}: {}", path.display(), e);
                    }
                }
            },
            Err(_) => return None,
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
