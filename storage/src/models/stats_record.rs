//! Daily forwarding counters for one source.
//!
//! Persisted flat: `{"total": 3, "target": -100, "photo": 2, "text": 1}`.

use serde::{Deserialize, Serialize};
use shift_core::ChatId;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsRecord {
    #[serde(default)]
    pub total: u64,
    /// Last target a message from this source was forwarded to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ChatId>,
    /// Count per media tag.
    #[serde(flatten)]
    pub by_type: BTreeMap<String, u64>,
}

impl StatsRecord {
    pub fn record(&mut self, target: ChatId, media_tag: &str) {
        self.total += 1;
        self.target = Some(target);
        *self.by_type.entry(media_tag.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self, media_tag: &str) -> u64 {
        self.by_type.get(media_tag).copied().unwrap_or(0)
    }
}
