//! Strategy store
//!
//! Persisted mapping from locator id to the ordered list of strategies that
//! have resolved it before. Writes are write-through: every mutation made by a
//! resolution is flushed to disk immediately. Failed writes are logged and
//! retried by the next flush; the in-memory view stays authoritative for the
//! current process.

pub mod strategy;

pub use strategy::{LocatorRecord, SelectorType, Strategy};

use log::{error, info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::HealError;
use crate::utils::clock::{now_secs, SECONDS_PER_DAY};

pub struct StrategyStore {
    path: Option<PathBuf>,
    records: BTreeMap<String, LocatorRecord>,
}

impl StrategyStore {
    /// A store that never touches the filesystem
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: BTreeMap::new(),
        }
    }

    /// Open a file-backed store. A missing or corrupt file yields an empty
    /// store; the problem is logged and the file is replaced on first flush.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match read_records(&path) {
            Ok(records) => {
                info!("Loaded {} locator records from {}", records.len(), path.display());
                records
            }
            Err(e) => {
                if path.exists() {
                    error!("{}; continuing with an empty store", e);
                } else {
                    warn!("{}; starting with an empty store", e);
                }
                BTreeMap::new()
            }
        };

        Self {
            path: Some(path),
            records,
        }
    }

    /// Open a file-backed store, failing if the file is missing or unreadable.
    /// Used by offline maintenance, which must not treat a typo'd path as an
    /// empty store and then overwrite nothing with nothing.
    pub fn load_strict(path: impl Into<PathBuf>) -> Result<Self, HealError> {
        let path = path.into();
        let records = read_records(&path)?;
        Ok(Self {
            path: Some(path),
            records,
        })
    }

    /// Strict when the file exists, empty when it does not. Used by the CLI so
    /// an unreadable store is reported instead of being replaced.
    pub fn open_existing(path: impl Into<PathBuf>) -> Result<Self, HealError> {
        let path = path.into();
        if path.exists() {
            Self::load_strict(path)
        } else {
            Ok(Self {
                path: Some(path),
                records: BTreeMap::new(),
            })
        }
    }

    /// Re-read the backing file, picking up edits made by other tools
    pub fn reload(&mut self) {
        if let Some(path) = self.path.clone() {
            *self = Self::open(path);
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Overwrite the backing file with the full mapping (last writer wins)
    pub fn save(&self) -> Result<(), HealError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let persistence = |reason: String| HealError::Persistence {
            path: path.clone(),
            reason,
        };

        let json = serde_json::to_string_pretty(&self.records).map_err(|e| persistence(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| persistence(e.to_string()))?;
        }
        std::fs::write(path, json).map_err(|e| persistence(e.to_string()))
    }

    fn flush(&self) {
        if let Err(e) = self.save() {
            error!("{}", e);
        }
    }

    pub fn records(&self) -> &BTreeMap<String, LocatorRecord> {
        &self.records
    }

    pub fn strategies(&self, locator_id: &str) -> &[Strategy] {
        self.records
            .get(locator_id)
            .map(|r| r.strategies.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert-or-touch a strategy that just resolved `locator_id` and move it
    /// to the front of the list. Persists immediately.
    pub fn record_success(&mut self, locator_id: &str, selector_type: SelectorType, selector: &str) {
        let now = now_secs();
        let record = self.records.entry(locator_id.to_string()).or_default();

        let strategy = match record.position(&selector_type, selector) {
            Some(idx) => {
                let mut existing = record.strategies.remove(idx);
                existing.last_used = now;
                existing
            }
            None => Strategy::used_at(selector_type, selector, now),
        };
        record.strategies.insert(0, strategy);

        self.flush();
    }

    /// Move a stored strategy that just succeeded to index 0, touching its
    /// `last_used`. Returns `false` if the strategy is not stored.
    pub fn promote(&mut self, locator_id: &str, strategy: &Strategy) -> bool {
        let Some(record) = self.records.get_mut(locator_id) else {
            return false;
        };
        let Some(idx) = record.position(&strategy.selector_type, &strategy.selector) else {
            return false;
        };

        let mut promoted = record.strategies.remove(idx);
        promoted.last_used = now_secs();
        record.strategies.insert(0, promoted);

        self.flush();
        true
    }

    /// Pre-seed a strategy without a live resolution. New strategies go to the
    /// end of the list so they never outrank proven ones. Returns `false` if
    /// the pair was already present.
    pub fn register(&mut self, locator_id: &str, strategy: Strategy) -> bool {
        let added = self.seed(locator_id, strategy);
        if added {
            self.flush();
        }
        added
    }

    /// Same as [`register`](Self::register) without persisting
    pub fn seed(&mut self, locator_id: &str, strategy: Strategy) -> bool {
        let record = self.records.entry(locator_id.to_string()).or_default();
        if record
            .position(&strategy.selector_type, &strategy.selector)
            .is_some()
        {
            return false;
        }
        record.strategies.push(strategy);
        true
    }

    /// Drop strategies unused for more than `days` days. Does not persist;
    /// callers decide when to save.
    pub fn prune(&mut self, days: u64) -> usize {
        self.prune_at(days, now_secs())
    }

    pub fn prune_at(&mut self, days: u64, now: f64) -> usize {
        let max_age = days as f64 * SECONDS_PER_DAY;
        let mut removed = 0;

        for record in self.records.values_mut() {
            let before = record.strategies.len();
            record.strategies.retain(|s| now - s.last_used <= max_age);
            removed += before - record.strategies.len();
        }
        self.records.retain(|_, r| !r.strategies.is_empty());

        removed
    }

    /// Keep only the most recently used strategy per type for every locator.
    /// Survivors keep their relative order; ties on `last_used` keep the
    /// higher-priority entry. Does not persist.
    pub fn optimize(&mut self) -> usize {
        let mut removed = 0;

        for record in self.records.values_mut() {
            let mut best: BTreeMap<String, usize> = BTreeMap::new();
            for (idx, strategy) in record.strategies.iter().enumerate() {
                let key = strategy.selector_type.to_string();
                match best.get(&key) {
                    Some(&kept) if record.strategies[kept].last_used >= strategy.last_used => {}
                    _ => {
                        best.insert(key, idx);
                    }
                }
            }

            let keep: Vec<usize> = best.into_values().collect();
            let before = record.strategies.len();
            let mut idx = 0;
            record.strategies.retain(|_| {
                let kept = keep.contains(&idx);
                idx += 1;
                kept
            });
            removed += before - record.strategies.len();
        }
        self.records.retain(|_, r| !r.strategies.is_empty());

        removed
    }
}

fn read_records(path: &Path) -> Result<BTreeMap<String, LocatorRecord>, HealError> {
    let load_error = |reason: String| HealError::StoreLoad {
        path: path.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
    let raw: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(&content).map_err(|e| load_error(e.to_string()))?;

    Ok(raw
        .into_iter()
        .map(|(locator_id, value)| {
            let record = parse_record(&locator_id, value);
            (locator_id, record)
        })
        .collect())
}

/// One locator's entry. Malformed strategies are skipped so a single bad
/// edit does not cost the rest of the file.
fn parse_record(locator_id: &str, value: serde_json::Value) -> LocatorRecord {
    let entries = match value {
        serde_json::Value::Object(mut fields) => match fields.remove("strategies") {
            Some(serde_json::Value::Array(entries)) => entries,
            None | Some(serde_json::Value::Null) => Vec::new(),
            Some(other) => {
                warn!("Ignoring non-list strategies for '{}': {}", locator_id, other);
                Vec::new()
            }
        },
        other => {
            warn!("Ignoring malformed record for '{}': {}", locator_id, other);
            Vec::new()
        }
    };

    let strategies = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<Strategy>(entry) {
            Ok(strategy) => Some(strategy),
            Err(e) => {
                warn!("Skipping malformed strategy for '{}': {}", locator_id, e);
                None
            }
        })
        .collect();

    LocatorRecord { strategies }
}
