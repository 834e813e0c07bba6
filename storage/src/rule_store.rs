//! Rule store: one JSON record per source under `shift.<source_id>`.
//!
//! Listing is in lexicographic key order and keeps corrupt records as flagged slots, so the
//! 1-based positions users see in `list` are the ones `del`/`pause`/`resume`/`filter` resolve.

use crate::error::StorageError;
use crate::kv::KvStore;
use crate::models::Rule;
use shift_core::ChatId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

pub const RULE_PREFIX: &str = "shift.";

pub fn rule_key(source_id: ChatId) -> String {
    format!("{}{}", RULE_PREFIX, source_id)
}

/// One entry of the rule listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSlot {
    Valid(Rule),
    /// Record under the rule namespace that could not be parsed. `source_id` is `None` when the
    /// key itself is not a number.
    Corrupt {
        key: String,
        source_id: Option<ChatId>,
        reason: String,
    },
}

impl RuleSlot {
    pub fn key(&self) -> String {
        match self {
            RuleSlot::Valid(rule) => rule_key(rule.source_id),
            RuleSlot::Corrupt { key, .. } => key.clone(),
        }
    }

    pub fn source_id(&self) -> Option<ChatId> {
        match self {
            RuleSlot::Valid(rule) => Some(rule.source_id),
            RuleSlot::Corrupt { source_id, .. } => *source_id,
        }
    }

    pub fn rule(&self) -> Option<&Rule> {
        match self {
            RuleSlot::Valid(rule) => Some(rule),
            RuleSlot::Corrupt { .. } => None,
        }
    }
}

/// Immutable snapshot of the rule graph: source → target for every readable rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleGraph {
    edges: HashMap<ChatId, ChatId>,
}

impl RuleGraph {
    pub fn from_edges<I: IntoIterator<Item = (ChatId, ChatId)>>(edges: I) -> Self {
        Self {
            edges: edges.into_iter().collect(),
        }
    }

    /// Target of the rule whose source is `source`, if any.
    pub fn next_hop(&self, source: ChatId) -> Option<ChatId> {
        self.edges.get(&source).copied()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[derive(Clone)]
pub struct RuleStore {
    kv: Arc<dyn KvStore>,
}

impl RuleStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Returns `Err(StorageError::Corrupt)` when a record exists but cannot be parsed.
    pub async fn get(&self, source_id: ChatId) -> Result<Option<Rule>, StorageError> {
        let key = rule_key(source_id);
        match self.kv.get(&key).await? {
            None => Ok(None),
            Some(json) => Rule::from_json(source_id, &json)
                .map(Some)
                .map_err(|e| StorageError::Corrupt {
                    key,
                    reason: e.to_string(),
                }),
        }
    }

    /// Inserts or replaces the rule for `rule.source_id`.
    pub async fn put(&self, rule: &Rule) -> Result<(), StorageError> {
        let json = rule
            .to_json()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.kv.put(&rule_key(rule.source_id), &json).await
    }

    pub async fn delete(&self, source_id: ChatId) -> Result<bool, StorageError> {
        self.kv.delete(&rule_key(source_id)).await
    }

    /// Removes a record by its raw key (used for corrupt slots whose key is not numeric).
    pub async fn delete_key(&self, key: &str) -> Result<bool, StorageError> {
        self.kv.delete(key).await
    }

    /// All records in the rule namespace, ordered by key. Corrupt records are kept as
    /// [`RuleSlot::Corrupt`] and logged.
    pub async fn list(&self) -> Result<Vec<RuleSlot>, StorageError> {
        let entries = self.kv.scan_prefix(RULE_PREFIX).await?;
        let mut slots = Vec::with_capacity(entries.len());

        for (key, value) in entries {
            let suffix = &key[RULE_PREFIX.len()..];
            // Nested namespaces such as `shift.stats.*` are not rules.
            if suffix.contains('.') {
                continue;
            }
            let slot = match suffix.parse::<ChatId>() {
                Err(_) => RuleSlot::Corrupt {
                    key: key.clone(),
                    source_id: None,
                    reason: "key is not a conversation id".to_string(),
                },
                Ok(source_id) => match Rule::from_json(source_id, &value) {
                    Ok(rule) => RuleSlot::Valid(rule),
                    Err(e) => RuleSlot::Corrupt {
                        key: key.clone(),
                        source_id: Some(source_id),
                        reason: e.to_string(),
                    },
                },
            };
            if let RuleSlot::Corrupt { key, reason, .. } = &slot {
                warn!(key = %key, reason = %reason, "Skipping unparseable rule record");
            }
            slots.push(slot);
        }

        Ok(slots)
    }

    /// Readable rules only.
    pub async fn rules(&self) -> Result<Vec<Rule>, StorageError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter_map(|slot| match slot {
                RuleSlot::Valid(rule) => Some(rule),
                RuleSlot::Corrupt { .. } => None,
            })
            .collect())
    }

    /// Snapshot of every readable edge, paused rules included.
    pub async fn graph(&self) -> Result<RuleGraph, StorageError> {
        Ok(RuleGraph::from_edges(
            self.rules()
                .await?
                .into_iter()
                .map(|rule| (rule.source_id, rule.target_id)),
        ))
    }
}
