//! Stats repository: per-source, per-day counters under `shift.stats.<source_id>.<YYYY-MM-DD>`.

use crate::error::StorageError;
use crate::kv::KvStore;
use crate::models::StatsRecord;
use chrono::{Local, NaiveDate};
use shift_core::ChatId;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const STATS_PREFIX: &str = "shift.stats.";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn stats_key(source_id: ChatId, date: NaiveDate) -> String {
    format!("{}{}.{}", STATS_PREFIX, source_id, date.format(DATE_FORMAT))
}

fn source_prefix(source_id: ChatId) -> String {
    format!("{}{}.", STATS_PREFIX, source_id)
}

/// One day of stats for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyStats {
    pub source_id: ChatId,
    pub date: NaiveDate,
    pub record: StatsRecord,
}

/// All days of one source, aggregated for the `stats` report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStats {
    pub source_id: ChatId,
    pub total: u64,
    /// Target from the most recent day that recorded one.
    pub target: Option<ChatId>,
    pub days: BTreeMap<NaiveDate, u64>,
}

#[derive(Clone)]
pub struct StatsRepository {
    kv: Arc<dyn KvStore>,
    // Read-modify-write of a day record must not interleave within this process.
    write_lock: Arc<Mutex<()>>,
}

impl StatsRepository {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Counts one forwarded message for today (local time).
    pub async fn record(
        &self,
        source_id: ChatId,
        target_id: ChatId,
        media_tag: &str,
    ) -> Result<StatsRecord, StorageError> {
        self.record_on(source_id, target_id, media_tag, Local::now().date_naive())
            .await
    }

    pub async fn record_on(
        &self,
        source_id: ChatId,
        target_id: ChatId,
        media_tag: &str,
        date: NaiveDate,
    ) -> Result<StatsRecord, StorageError> {
        let _guard = self.write_lock.lock().await;
        let key = stats_key(source_id, date);

        let mut record = match self.kv.get(&key).await? {
            None => StatsRecord::default(),
            Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!(key = %key, error = %e, "Resetting unparseable stats record");
                StatsRecord::default()
            }),
        };
        record.record(target_id, media_tag);

        let json =
            serde_json::to_string(&record).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.kv.put(&key, &json).await?;

        debug!(
            source_id = source_id,
            target_id = target_id,
            media_tag = %media_tag,
            total = record.total,
            "Stats recorded"
        );
        Ok(record)
    }

    pub async fn get(
        &self,
        source_id: ChatId,
        date: NaiveDate,
    ) -> Result<Option<StatsRecord>, StorageError> {
        let key = stats_key(source_id, date);
        match self.kv.get(&key).await? {
            None => Ok(None),
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| StorageError::Corrupt {
                    key,
                    reason: e.to_string(),
                }),
        }
    }

    /// Every readable day record, ordered by key. Unparseable keys or bodies are skipped and logged.
    pub async fn list(&self) -> Result<Vec<DailyStats>, StorageError> {
        let entries = self.kv.scan_prefix(STATS_PREFIX).await?;
        let mut days = Vec::with_capacity(entries.len());

        for (key, value) in entries {
            let Some((source_id, date)) = parse_stats_key(&key) else {
                warn!(key = %key, "Skipping stats record with malformed key");
                continue;
            };
            match serde_json::from_str::<StatsRecord>(&value) {
                Ok(record) => days.push(DailyStats {
                    source_id,
                    date,
                    record,
                }),
                Err(e) => warn!(key = %key, error = %e, "Skipping unparseable stats record"),
            }
        }

        Ok(days)
    }

    /// Aggregates [`StatsRepository::list`] per source, in order of first appearance by key.
    pub async fn summary(&self) -> Result<Vec<SourceStats>, StorageError> {
        let mut by_source: Vec<SourceStats> = Vec::new();
        for day in self.list().await? {
            let idx = match by_source.iter().position(|s| s.source_id == day.source_id) {
                Some(idx) => idx,
                None => {
                    by_source.push(SourceStats {
                        source_id: day.source_id,
                        total: 0,
                        target: None,
                        days: BTreeMap::new(),
                    });
                    by_source.len() - 1
                }
            };
            let entry = &mut by_source[idx];
            entry.total += day.record.total;
            *entry.days.entry(day.date).or_insert(0) += day.record.total;
            // Days arrive in ascending date order per source, so the last target wins.
            if day.record.target.is_some() {
                entry.target = day.record.target;
            }
        }
        Ok(by_source)
    }

    /// Drops every day record of `source_id`; returns how many.
    pub async fn delete_for_source(&self, source_id: ChatId) -> Result<u64, StorageError> {
        let _guard = self.write_lock.lock().await;
        self.kv.delete_prefix(&source_prefix(source_id)).await
    }
}

fn parse_stats_key(key: &str) -> Option<(ChatId, NaiveDate)> {
    let rest = key.strip_prefix(STATS_PREFIX)?;
    let (source, date) = rest.split_once('.')?;
    let source_id = source.parse().ok()?;
    let date = NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?;
    Some((source_id, date))
}
