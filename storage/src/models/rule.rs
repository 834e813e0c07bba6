//! Forwarding rule model and its persisted JSON form.
//!
//! The source id is the record's key (`shift.<source_id>`), so it is not part of the JSON body.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shift_core::{ChatId, OptionSet, TargetType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub source_id: ChatId,
    pub target_id: ChatId,
    pub target_type: TargetType,
    pub options: OptionSet,
    pub paused: bool,
    /// Block keywords, in the order they were added.
    pub filters: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Persisted body of a rule.
#[derive(Serialize, Deserialize)]
struct RuleRecord {
    target_id: ChatId,
    #[serde(default)]
    options: OptionSet,
    #[serde(default)]
    target_type: TargetType,
    #[serde(default)]
    paused: bool,
    #[serde(default)]
    filters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
}

impl Rule {
    /// Creates an active rule with no filters, stamped with the current time.
    pub fn new(
        source_id: ChatId,
        target_id: ChatId,
        target_type: TargetType,
        options: OptionSet,
    ) -> Self {
        Self {
            source_id,
            target_id,
            target_type,
            options,
            paused: false,
            filters: Vec::new(),
            created_at: Some(Utc::now()),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&RuleRecord {
            target_id: self.target_id,
            options: self.options.clone(),
            target_type: self.target_type,
            paused: self.paused,
            filters: self.filters.clone(),
            created_at: self.created_at,
        })
    }

    pub fn from_json(source_id: ChatId, json: &str) -> Result<Self, serde_json::Error> {
        let record: RuleRecord = serde_json::from_str(json)?;
        Ok(Self {
            source_id,
            target_id: record.target_id,
            target_type: record.target_type,
            options: record.options,
            paused: record.paused,
            filters: record.filters,
            created_at: record.created_at,
        })
    }

    pub fn is_active(&self) -> bool {
        !self.paused
    }

    /// `silent` only suppresses notifications for chat targets.
    pub fn disable_notification(&self) -> bool {
        self.options.is_silent() && self.target_type == TargetType::Chat
    }

    /// Appends keywords not already present; returns how many were added.
    pub fn add_filters(&mut self, keywords: &[String]) -> usize {
        let mut added = 0;
        for keyword in keywords {
            if !self.filters.contains(keyword) {
                self.filters.push(keyword.clone());
                added += 1;
            }
        }
        added
    }

    /// Removes every listed keyword; returns how many were removed.
    pub fn remove_filters(&mut self, keywords: &[String]) -> usize {
        let before = self.filters.len();
        self.filters.retain(|f| !keywords.contains(f));
        before - self.filters.len()
    }
}
