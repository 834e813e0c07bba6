//! Multi-hop forwarding.
//!
//! [`ForwardingEngine::relay`] forwards one message to a target and keeps going while the target
//! is itself the source of an active rule. The chain is an explicit loop bounded by
//! `max_chain_depth`; before every further hop the rule graph is re-read and the next edge is
//! re-checked for loops. Every attempt yields a [`ForwardOutcome`] collected into a
//! [`RelayReport`].

use crate::config::{jitter, RelayConfig};
use crate::cycle::{would_create_cycle, CycleCheck};
use shift_core::{
    ChatId, MessageId, OptionSet, Platform, PlatformError, RelayMessage, StatusMessage,
};
use std::sync::Arc;
use storage::{Rule, RuleStore, StatsRepository};
use tracing::{debug, info, instrument, warn};

/// Where and how one hop forwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub target_id: ChatId,
    pub options: OptionSet,
    pub disable_notification: bool,
}

impl Hop {
    pub fn from_rule(rule: &Rule) -> Self {
        Self {
            target_id: rule.target_id,
            options: rule.options.clone(),
            disable_notification: rule.disable_notification(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The message is itself a forward and forwards are not relayed here.
    AlreadyForwarded,
    /// The rule's options do not cover this media tag.
    MediaType(&'static str),
}

/// Result of one forward attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOutcome {
    Forwarded,
    Skipped(SkipReason),
    /// Permanent failure for this message; the chain does not continue.
    Failed(PlatformError),
}

impl ForwardOutcome {
    pub fn is_forwarded(&self) -> bool {
        matches!(self, ForwardOutcome::Forwarded)
    }
}

/// Why a chain stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainStop {
    /// Last hop was not forwarded, or its target has no active rule.
    End,
    DepthExceeded,
    LoopDetected(CycleCheck),
    NextRuleUnreadable { source_id: ChatId, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopRecord {
    pub depth: u32,
    pub target_id: ChatId,
    pub outcome: ForwardOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReport {
    pub hops: Vec<HopRecord>,
    pub stop: ChainStop,
}

impl RelayReport {
    /// Outcome of the first attempted hop, if any hop was attempted.
    pub fn first_outcome(&self) -> Option<&ForwardOutcome> {
        self.hops.first().map(|h| &h.outcome)
    }

    pub fn first_hop_forwarded(&self) -> bool {
        self.first_outcome().is_some_and(ForwardOutcome::is_forwarded)
    }

    pub fn forwarded_count(&self) -> usize {
        self.hops.iter().filter(|h| h.outcome.is_forwarded()).count()
    }
}

pub struct ForwardingEngine {
    platform: Arc<dyn Platform>,
    rules: RuleStore,
    stats: StatsRepository,
    config: Arc<RelayConfig>,
}

impl ForwardingEngine {
    pub fn new(
        platform: Arc<dyn Platform>,
        rules: RuleStore,
        stats: StatsRepository,
        config: Arc<RelayConfig>,
    ) -> Self {
        Self {
            platform,
            rules,
            stats,
            config,
        }
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    pub fn rules(&self) -> &RuleStore {
        &self.rules
    }

    pub fn stats(&self) -> &StatsRepository {
        &self.stats
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Forwards `message` along `hop` and onward through any chained rules, starting at
    /// `chain_depth`. Later hops always relay the original message and ignore its forward flag.
    #[instrument(skip(self, notifier, message, hop), fields(source_id = message.chat.id, message_id = message.id))]
    pub async fn relay(
        &self,
        notifier: Option<StatusMessage>,
        message: &RelayMessage,
        hop: Hop,
        ignore_forwarded: bool,
        chain_depth: u32,
    ) -> RelayReport {
        let mut hops = Vec::new();
        let mut hop = hop;
        let mut depth = chain_depth;
        let mut ignore_forwarded = ignore_forwarded;

        let stop = loop {
            if depth > self.config.max_chain_depth {
                warn!(
                    source_id = message.chat.id,
                    target_id = hop.target_id,
                    chain_depth = depth,
                    "Relay chain depth exceeded, stopping"
                );
                break ChainStop::DepthExceeded;
            }

            let outcome = self
                .forward_once(notifier, message, &hop, ignore_forwarded)
                .await;
            let forwarded = outcome.is_forwarded();
            hops.push(HopRecord {
                depth,
                target_id: hop.target_id,
                outcome,
            });
            if !forwarded {
                break ChainStop::End;
            }

            let next = match self.rules.get(hop.target_id).await {
                Ok(Some(rule)) if rule.is_active() => rule,
                Ok(_) => break ChainStop::End,
                Err(e) => {
                    warn!(source_id = hop.target_id, error = %e, "Next hop rule unreadable, stopping chain");
                    break ChainStop::NextRuleUnreadable {
                        source_id: hop.target_id,
                        reason: e.to_string(),
                    };
                }
            };

            let check = match self.rules.graph().await {
                Ok(graph) => would_create_cycle(
                    &graph,
                    message.chat.id,
                    next.target_id,
                    self.config.max_cycle_hops,
                ),
                Err(e) => {
                    warn!(error = %e, "Rule graph unreadable, stopping chain");
                    break ChainStop::NextRuleUnreadable {
                        source_id: hop.target_id,
                        reason: e.to_string(),
                    };
                }
            };
            if check.is_cycle() {
                warn!(
                    source_id = message.chat.id,
                    target_id = next.target_id,
                    cycle = %check,
                    "Loop detected at relay time, stopping chain"
                );
                break ChainStop::LoopDetected(check);
            }

            debug!(
                via = hop.target_id,
                target_id = next.target_id,
                chain_depth = depth + 1,
                "Continuing relay chain"
            );
            hop = Hop::from_rule(&next);
            depth += 1;
            ignore_forwarded = true;
        };

        RelayReport { hops, stop }
    }

    /// One hop: forward-flag check, media-type check, forward with backoff.
    pub async fn forward_once(
        &self,
        notifier: Option<StatusMessage>,
        message: &RelayMessage,
        hop: &Hop,
        ignore_forwarded: bool,
    ) -> ForwardOutcome {
        if !ignore_forwarded && message.is_forwarded {
            debug!(message_id = message.id, "Skipping forwarded message");
            return ForwardOutcome::Skipped(SkipReason::AlreadyForwarded);
        }

        let tag = message.media_tag();
        if !hop.options.allows(tag) {
            debug!(media_tag = %tag, options = %hop.options, "Skipping message type");
            return ForwardOutcome::Skipped(SkipReason::MediaType(tag));
        }

        match self
            .forward_with_backoff(
                notifier,
                hop.target_id,
                message.chat.id,
                &[message.id],
                hop.disable_notification,
            )
            .await
        {
            Ok(()) => ForwardOutcome::Forwarded,
            Err(e) => {
                warn!(
                    source_id = message.chat.id,
                    target_id = hop.target_id,
                    message_id = message.id,
                    error = %e,
                    "Forward failed"
                );
                ForwardOutcome::Failed(e)
            }
        }
    }

    /// Forwards `ids` in one call. A rate-limit answer of `w` waits `w` plus jitter, reports the
    /// pause on `notifier`, and retries, up to `max_rate_limit_retries` times.
    pub async fn forward_with_backoff(
        &self,
        notifier: Option<StatusMessage>,
        target: ChatId,
        source: ChatId,
        ids: &[MessageId],
        disable_notification: bool,
    ) -> Result<(), PlatformError> {
        let mut retries = 0;
        loop {
            let err = match self
                .platform
                .forward_messages(target, source, ids, disable_notification)
                .await
            {
                Ok(()) => {
                    debug!(source_id = source, target_id = target, count = ids.len(), "Forwarded");
                    return Ok(());
                }
                Err(e) => e,
            };

            let wait = match err.retry_after() {
                Some(wait) if retries < self.config.max_rate_limit_retries => wait,
                _ => return Err(err),
            };
            retries += 1;
            let delay = wait + jitter(&self.config.rate_limit_jitter);
            warn!(
                source_id = source,
                target_id = target,
                delay_secs = delay.as_secs_f64(),
                attempt = retries,
                "Rate limited, pausing before retry"
            );
            if let Some(status) = notifier {
                let text = format!("⚠️ Rate limited, pausing {:.1}s...", delay.as_secs_f64());
                if let Err(e) = self
                    .platform
                    .edit_message(status.chat_id, status.message_id, &text)
                    .await
                {
                    debug!(error = %e, "Could not update status message");
                }
            }
            tokio::time::sleep(delay).await;
        }
    }

    /// Counts one forwarded message in today's stats. Failures are logged, not propagated.
    pub async fn record_stats(&self, source_id: ChatId, target_id: ChatId, media_tag: &str) {
        match self.stats.record(source_id, target_id, media_tag).await {
            Ok(record) => info!(
                source_id = source_id,
                target_id = target_id,
                media_tag = %media_tag,
                total = record.total,
                "Relayed"
            ),
            Err(e) => warn!(source_id = source_id, error = %e, "Failed to record stats"),
        }
    }
}
