//! Offline maintenance of the strategy store file
//!
//! Verify, prune, optimize and back up a store between test runs. All
//! operations are idempotent: running one twice in a row changes nothing the
//! second time.

use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::HealError;
use crate::store::StrategyStore;
use crate::utils::clock::{now_epoch, now_secs, SECONDS_PER_DAY};

/// How many strategies were last used within each window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeBuckets {
    pub last_day: usize,
    pub last_week: usize,
    pub last_month: usize,
    pub last_quarter: usize,
    pub older: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    pub total_locators: usize,
    pub total_strategies: usize,
    pub empty_locators: Vec<String>,
    pub by_type: BTreeMap<String, usize>,
    pub by_age: AgeBuckets,
}

pub fn verify(store: &StrategyStore) -> VerifyReport {
    verify_at(store, now_secs())
}

pub fn verify_at(store: &StrategyStore, now: f64) -> VerifyReport {
    let mut report = VerifyReport {
        total_locators: store.len(),
        ..Default::default()
    };

    for (locator_id, record) in store.records() {
        if record.strategies.is_empty() {
            report.empty_locators.push(locator_id.clone());
        }
        for strategy in &record.strategies {
            report.total_strategies += 1;
            *report
                .by_type
                .entry(strategy.selector_type.to_string())
                .or_default() += 1;

            let age_days = (now - strategy.last_used) / SECONDS_PER_DAY;
            let bucket = match age_days {
                d if d < 1.0 => &mut report.by_age.last_day,
                d if d < 7.0 => &mut report.by_age.last_week,
                d if d < 30.0 => &mut report.by_age.last_month,
                d if d < 90.0 => &mut report.by_age.last_quarter,
                _ => &mut report.by_age.older,
            };
            *bucket += 1;
        }
    }

    report
}

/// Drop strategies unused for more than `days` days. Does not save.
pub fn remove_stale(store: &mut StrategyStore, days: u64) -> usize {
    let removed = store.prune(days);
    info!(
        "Removed {} stale strategies (> {} days); {} locators remain",
        removed,
        days,
        store.len()
    );
    removed
}

/// Keep the newest strategy per type for every locator. Does not save.
pub fn optimize(store: &mut StrategyStore) -> usize {
    let removed = store.optimize();
    info!("Optimization removed {} redundant strategies", removed);
    removed
}

/// `<stem>.backup.<epoch>.json` next to the store file
pub fn backup_path(store_path: &Path, epoch: i64) -> PathBuf {
    let stem = store_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "locator_db".to_string());
    store_path.with_file_name(format!("{}.backup.{}.json", stem, epoch))
}

/// Copy the store file verbatim and return the copy's path
pub fn backup(store_path: &Path) -> Result<PathBuf, HealError> {
    let target = backup_path(store_path, now_epoch());
    std::fs::copy(store_path, &target).map_err(|e| HealError::Persistence {
        path: target.clone(),
        reason: e.to_string(),
    })?;
    info!("Backed up {} to {}", store_path.display(), target.display());
    Ok(target)
}

/// What a maintenance run should do, in order: backup, then either verify
/// alone or prune and/or optimize followed by a save
#[derive(Debug, Clone, Default)]
pub struct MaintenanceOptions {
    pub backup: bool,
    pub verify: bool,
    pub remove_stale_days: Option<u64>,
    pub optimize: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MaintenanceOutcome {
    pub backup: Option<PathBuf>,
    pub report: Option<VerifyReport>,
    pub removed_stale: usize,
    pub optimized: usize,
    pub saved: bool,
}

pub fn run(store_path: &Path, options: &MaintenanceOptions) -> Result<MaintenanceOutcome, HealError> {
    let mut store = StrategyStore::load_strict(store_path)?;
    info!("Loaded {} locator records from {}", store.len(), store_path.display());

    let mut outcome = MaintenanceOutcome::default();
    if options.backup {
        outcome.backup = Some(backup(store_path)?);
    }

    if options.verify {
        outcome.report = Some(verify(&store));
        return Ok(outcome);
    }

    if let Some(days) = options.remove_stale_days {
        outcome.removed_stale = remove_stale(&mut store, days);
    }
    if options.optimize {
        outcome.optimized = optimize(&mut store);
    }
    if options.remove_stale_days.is_some() || options.optimize {
        store.save()?;
        outcome.saved = true;
        info!("Saved {}", store_path.display());
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{SelectorType, Strategy};

    const DAY: f64 = SECONDS_PER_DAY;

    fn write_store(dir: &Path, entries: &[(&str, &str, &str, f64)]) -> PathBuf {
        let path = dir.join("locator_db.json");
        let mut store = StrategyStore::open(&path);
        for (id, ty, sel, used) in entries {
            store.register(id, Strategy::used_at(SelectorType::parse(ty), *sel, *used));
        }
        store.save().unwrap();
        path
    }

    #[test]
    fn test_verify_report() {
        let now = 1000.0 * DAY;
        let mut store = StrategyStore::in_memory();
        for (id, ty, sel, age) in [
            ("a", "css", "#a", 0.5),
            ("a", "predicted_xpath", "//a", 3.0),
            ("b", "css", "#b", 10.0),
            ("b", "text", "B", 45.0),
            ("c", "css", "#c", 400.0),
        ] {
            store.register(id, Strategy::used_at(SelectorType::parse(ty), sel, now - age * DAY));
        }

        let report = verify_at(&store, now);
        assert_eq!(report.total_locators, 3);
        assert_eq!(report.total_strategies, 5);
        assert!(report.empty_locators.is_empty());
        assert_eq!(report.by_type["css"], 3);
        assert_eq!(report.by_type["predicted_xpath"], 1);
        assert_eq!(
            report.by_age,
            AgeBuckets {
                last_day: 1,
                last_week: 1,
                last_month: 1,
                last_quarter: 1,
                older: 1,
            }
        );
    }

    #[test]
    fn test_verify_lists_empty_locators_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, r#"{"orphan": {"strategies": []}, "other": {}}"#).unwrap();

        let store = StrategyStore::load_strict(&path).unwrap();
        let report = verify(&store);
        assert_eq!(report.empty_locators, vec!["orphan", "other"]);
        assert_eq!(report.total_strategies, 0);
    }

    #[test]
    fn test_backup_path_naming() {
        assert_eq!(
            backup_path(Path::new("/data/locator_db.json"), 1700000000),
            PathBuf::from("/data/locator_db.backup.1700000000.json")
        );
    }

    #[test]
    fn test_run_prune_and_optimize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let now = now_secs();
        let path = write_store(
            dir.path(),
            &[
                ("login", "css", "#login", now - 1.0 * DAY),
                ("login", "css", "#login-old", now - 2.0 * DAY),
                ("login", "text", "Log in", now - 100.0 * DAY),
                ("gone", "css", "#gone", now - 200.0 * DAY),
            ],
        );
        let options = MaintenanceOptions {
            remove_stale_days: Some(30),
            optimize: true,
            ..Default::default()
        };

        let first = run(&path, &options).unwrap();
        assert_eq!(first.removed_stale, 2);
        assert_eq!(first.optimized, 1);
        assert!(first.saved);
        let after_first = std::fs::read_to_string(&path).unwrap();

        let second = run(&path, &options).unwrap();
        assert_eq!(second.removed_stale, 0);
        assert_eq!(second.optimized, 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), after_first);

        let store = StrategyStore::load_strict(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.strategies("login")[0].selector, "#login");
    }

    #[test]
    fn test_run_verify_with_backup_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_store(dir.path(), &[("a", "css", "#a", 0.0)]);
        let before = std::fs::read_to_string(&path).unwrap();

        let outcome = run(
            &path,
            &MaintenanceOptions {
                backup: true,
                verify: true,
                remove_stale_days: Some(1),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(!outcome.saved);
        assert_eq!(outcome.report.unwrap().total_strategies, 1);
        let backup = outcome.backup.unwrap();
        assert_eq!(std::fs::read_to_string(backup).unwrap(), before);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_run_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = run(&dir.path().join("nope.json"), &MaintenanceOptions::default());
        assert!(matches!(result, Err(HealError::StoreLoad { .. })));
    }
}
