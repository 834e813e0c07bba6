//! Live relay of incoming messages on rule sources.

use crate::batch::BatchScheduler;
use crate::chain::{Handler, HandlerResponse};
use crate::filter::is_filtered;
use crate::forward::{ForwardingEngine, Hop, RelayReport};
use async_trait::async_trait;
use shift_core::{RelayMessage, Result};
use std::sync::Arc;
use storage::StorageError;
use tracing::{debug, error, info, warn};

/// What the listener did with one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenOutcome {
    NoRule,
    CorruptRule,
    Paused,
    /// The source turned on content protection; its rule and stats were removed.
    ProtectedRuleRemoved,
    Filtered,
    Batched,
    Relayed(RelayReport),
}

pub struct RelayListener {
    engine: Arc<ForwardingEngine>,
    batches: Arc<BatchScheduler>,
}

impl RelayListener {
    pub fn new(engine: Arc<ForwardingEngine>, batches: Arc<BatchScheduler>) -> Self {
        Self { engine, batches }
    }

    pub async fn on_message(&self, message: &RelayMessage) -> ListenOutcome {
        let source_id = message.chat.id;
        let rule = match self.engine.rules().get(source_id).await {
            Ok(Some(rule)) => rule,
            Ok(None) => return ListenOutcome::NoRule,
            Err(e) => {
                error!(source_id = source_id, error = %e, "Cannot parse rule for source");
                return ListenOutcome::CorruptRule;
            }
        };

        debug!(
            source_id = source_id,
            message_id = message.id,
            target_id = rule.target_id,
            paused = rule.paused,
            "Message on rule source"
        );

        if rule.paused {
            return ListenOutcome::Paused;
        }

        if message.is_protected() {
            if let Err(e) = self.remove_rule(source_id).await {
                error!(source_id = source_id, error = %e, "Failed to remove rule of protected source");
            }
            warn!(source_id = source_id, "Source has content protection, rule removed");
            return ListenOutcome::ProtectedRuleRemoved;
        }

        if is_filtered(message.text.as_deref(), &rule.filters) {
            debug!(source_id = source_id, message_id = message.id, "Message filtered by keyword");
            return ListenOutcome::Filtered;
        }

        let hop = Hop::from_rule(&rule);

        if let Some(group_id) = &message.media_group_id {
            self.batches
                .schedule_group_forward(
                    hop.target_id,
                    source_id,
                    message.id,
                    group_id,
                    hop.options,
                    hop.disable_notification,
                )
                .await;
            return ListenOutcome::Batched;
        }

        let target_id = hop.target_id;
        let ignore_forwarded = self.engine.config().relay_forwarded;
        let report = self
            .engine
            .relay(None, message, hop, ignore_forwarded, 0)
            .await;
        if report.first_hop_forwarded() {
            self.engine
                .record_stats(source_id, target_id, message.media_tag())
                .await;
        }
        info!(
            source_id = source_id,
            message_id = message.id,
            hops = report.forwarded_count(),
            stop = ?report.stop,
            "Relay finished"
        );
        ListenOutcome::Relayed(report)
    }

    async fn remove_rule(&self, source_id: i64) -> std::result::Result<(), StorageError> {
        self.engine.rules().delete(source_id).await?;
        self.engine.stats().delete_for_source(source_id).await?;
        Ok(())
    }
}

#[async_trait]
impl Handler for RelayListener {
    async fn handle(&self, message: &RelayMessage) -> Result<HandlerResponse> {
        if message.chat.kind.can_be_source() {
            self.on_message(message).await;
        }
        Ok(HandlerResponse::Continue)
    }
}
