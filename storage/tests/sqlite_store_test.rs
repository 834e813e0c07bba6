//! Integration tests for [`storage::SqliteKvStore`], [`storage::RuleStore`] and
//! [`storage::StatsRepository`] on an on-disk SQLite database.
//!
//! Covers persistence across reopen, prefix scans, corrupt records, and stats aggregation/cascade.

use chrono::NaiveDate;
use shift_core::{OptionSet, TargetType};
use std::sync::Arc;
use storage::{KvStore, Rule, RuleSlot, RuleStore, SqliteKvStore, StatsRepository};
use tempfile::TempDir;

fn db_url(dir: &TempDir) -> String {
    dir.path().join("data").join("shift.db").display().to_string()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

/// **Test: Rules survive closing and reopening the database.**
///
/// **Setup:** Temp dir; open store, put two rules (one with filters), drop it.
/// **Action:** Reopen the same path and list.
/// **Expected:** Both rules come back equal, in key order.
#[tokio::test]
async fn test_rules_survive_restart() {
    let dir = TempDir::new().unwrap();
    let url = db_url(&dir);

    let mut with_filters = Rule::new(-1002, 7, TargetType::User, OptionSet::parse(["photo"]).unwrap());
    with_filters.add_filters(&["ad".to_string()]);
    let plain = Rule::new(-1001, -1003, TargetType::Chat, OptionSet::new());

    {
        let kv = Arc::new(SqliteKvStore::new(&url).await.unwrap());
        let store = RuleStore::new(kv);
        store.put(&with_filters).await.unwrap();
        store.put(&plain).await.unwrap();
    }

    let kv = Arc::new(SqliteKvStore::new(&url).await.unwrap());
    let store = RuleStore::new(kv);
    let slots = store.list().await.unwrap();

    assert_eq!(
        slots,
        vec![RuleSlot::Valid(plain), RuleSlot::Valid(with_filters)]
    );
}

/// **Test: Prefix scan and delete only touch matching keys.**
///
/// **Setup:** Keys under `shift.stats.1.`, `shift.stats.10.` and `shift.1`.
/// **Action:** scan and delete with prefix `shift.stats.1.`.
/// **Expected:** Only the two `shift.stats.1.` keys are returned and removed.
#[tokio::test]
async fn test_sqlite_prefix_operations() {
    let dir = TempDir::new().unwrap();
    let kv = SqliteKvStore::new(&db_url(&dir)).await.unwrap();

    kv.put("shift.stats.1.2024-05-02", "{}").await.unwrap();
    kv.put("shift.stats.1.2024-05-01", "{}").await.unwrap();
    kv.put("shift.stats.10.2024-05-01", "{}").await.unwrap();
    kv.put("shift.1", "{}").await.unwrap();

    let keys: Vec<String> = kv
        .scan_prefix("shift.stats.1.")
        .await
        .unwrap()
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    assert_eq!(keys, vec!["shift.stats.1.2024-05-01", "shift.stats.1.2024-05-02"]);

    assert_eq!(kv.delete_prefix("shift.stats.1.").await.unwrap(), 2);
    assert!(kv.get("shift.stats.10.2024-05-01").await.unwrap().is_some());
    assert!(kv.get("shift.1").await.unwrap().is_some());
}

/// **Test: Upsert replaces the value for an existing key.**
#[tokio::test]
async fn test_sqlite_put_overwrites() {
    let dir = TempDir::new().unwrap();
    let kv = SqliteKvStore::new(&db_url(&dir)).await.unwrap();

    kv.put("k", "1").await.unwrap();
    kv.put("k", "2").await.unwrap();

    assert_eq!(kv.get("k").await.unwrap().as_deref(), Some("2"));
    assert!(kv.delete("k").await.unwrap());
    assert!(kv.get("k").await.unwrap().is_none());
}

/// **Test: Stats accumulate per day and summarize per source.**
///
/// **Setup:** Record photo/text for source -1 on two days and one video for source -2.
/// **Action:** `summary()`.
/// **Expected:** Totals and per-day counts match; last target is the latest day's.
#[tokio::test]
async fn test_stats_summary() {
    let dir = TempDir::new().unwrap();
    let kv = Arc::new(SqliteKvStore::new(&db_url(&dir)).await.unwrap());
    let stats = StatsRepository::new(kv);

    stats.record_on(-1, -10, "photo", day(1)).await.unwrap();
    stats.record_on(-1, -10, "text", day(1)).await.unwrap();
    stats.record_on(-1, -11, "photo", day(2)).await.unwrap();
    stats.record_on(-2, -20, "video", day(2)).await.unwrap();

    let first = stats.get(-1, day(1)).await.unwrap().unwrap();
    assert_eq!(first.total, 2);
    assert_eq!(first.count("photo"), 1);
    assert_eq!(first.count("text"), 1);

    let summary = stats.summary().await.unwrap();
    assert_eq!(summary.len(), 2);
    let s1 = summary.iter().find(|s| s.source_id == -1).unwrap();
    assert_eq!(s1.total, 3);
    assert_eq!(s1.target, Some(-11));
    assert_eq!(s1.days.get(&day(1)), Some(&2));
    assert_eq!(s1.days.get(&day(2)), Some(&1));
}

/// **Test: Deleting a source's stats leaves other sources alone.**
#[tokio::test]
async fn test_stats_delete_for_source() {
    let dir = TempDir::new().unwrap();
    let kv = Arc::new(SqliteKvStore::new(&db_url(&dir)).await.unwrap());
    let stats = StatsRepository::new(kv.clone());

    stats.record_on(1, 5, "text", day(1)).await.unwrap();
    stats.record_on(1, 5, "text", day(2)).await.unwrap();
    stats.record_on(10, 5, "text", day(1)).await.unwrap();
    kv.put("shift.stats.1.broken", "{}").await.unwrap();

    assert_eq!(stats.delete_for_source(1).await.unwrap(), 3);
    let remaining = stats.list().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].source_id, 10);
}

/// **Test: An unparseable stats body is skipped in listings.**
#[tokio::test]
async fn test_stats_corrupt_body_skipped() {
    let dir = TempDir::new().unwrap();
    let kv = Arc::new(SqliteKvStore::new(&db_url(&dir)).await.unwrap());
    let stats = StatsRepository::new(kv.clone());

    stats.record_on(-1, -2, "text", day(3)).await.unwrap();
    kv.put("shift.stats.-1.2024-05-04", "{oops").await.unwrap();

    let days = stats.list().await.unwrap();
    assert_eq!(days.len(), 1);
    assert!(stats.get(-1, day(4)).await.is_err());
}

/// **Test: Opening a `sqlite:` URL creates the missing parent directories and the file.**
#[tokio::test]
async fn test_pool_creates_missing_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a").join("b").join("shift.db");
    let url = format!("sqlite:{}", path.display());

    let manager = storage::SqlitePoolManager::new(&url).await.unwrap();
    sqlx::query("SELECT 1").execute(manager.pool()).await.unwrap();

    assert!(path.parent().unwrap().is_dir());
    assert!(path.exists());
}
