//! Album batching.
//!
//! Every member of a media group arrives as its own message. Instead of forwarding each, the
//! listener schedules one deferred job per group id; a later member replaces the pending job and
//! restarts the quiet period. When the period elapses the whole group is fetched, filtered by
//! the rule's options, and forwarded in a single call so the album stays together.

use crate::forward::ForwardingEngine;
use shift_core::{ChatId, MessageId, OptionSet, RelayMessage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A scheduled album forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMediaGroup {
    pub target_id: ChatId,
    pub source_id: ChatId,
    /// Any member of the group; used to fetch the rest.
    pub message_id: MessageId,
    pub options: OptionSet,
    pub disable_notification: bool,
    pub fire_at: Instant,
}

struct Entry {
    generation: u64,
    job: PendingMediaGroup,
    handle: JoinHandle<()>,
}

type PendingMap = Arc<Mutex<HashMap<String, Entry>>>;

pub struct BatchScheduler {
    engine: Arc<ForwardingEngine>,
    pending: PendingMap,
    generation: AtomicU64,
}

impl BatchScheduler {
    pub fn new(engine: Arc<ForwardingEngine>) -> Self {
        Self {
            engine,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// (Re)schedules the forward of `group_id`. Returns true when a pending job was replaced.
    pub async fn schedule_group_forward(
        &self,
        target_id: ChatId,
        source_id: ChatId,
        message_id: MessageId,
        group_id: &str,
        options: OptionSet,
        disable_notification: bool,
    ) -> bool {
        let delay = self.engine.config().group_delay;
        let job = PendingMediaGroup {
            target_id,
            source_id,
            message_id,
            options,
            disable_notification,
            fire_at: Instant::now() + delay,
        };
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);

        let mut pending = self.pending.lock().await;
        let replaced = match pending.remove(group_id) {
            Some(old) => {
                old.handle.abort();
                true
            }
            None => false,
        };

        let handle = tokio::spawn(run_when_due(
            self.engine.clone(),
            self.pending.clone(),
            group_id.to_string(),
            generation,
            job.fire_at,
        ));
        pending.insert(
            group_id.to_string(),
            Entry {
                generation,
                job,
                handle,
            },
        );

        debug!(
            group_id = %group_id,
            source_id = source_id,
            target_id = target_id,
            replaced = replaced,
            "Media group scheduled"
        );
        replaced
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn pending(&self, group_id: &str) -> Option<PendingMediaGroup> {
        self.pending
            .lock()
            .await
            .get(group_id)
            .map(|entry| entry.job.clone())
    }
}

async fn run_when_due(
    engine: Arc<ForwardingEngine>,
    pending: PendingMap,
    group_id: String,
    generation: u64,
    fire_at: Instant,
) {
    tokio::time::sleep_until(fire_at).await;

    let job = {
        let mut map = pending.lock().await;
        match map.get(&group_id) {
            Some(entry) if entry.generation == generation => map.remove(&group_id).map(|e| e.job),
            // Replaced between waking and taking the lock.
            _ => None,
        }
    };
    if let Some(job) = job {
        forward_group(&engine, &group_id, job).await;
    }
}

async fn forward_group(engine: &ForwardingEngine, group_id: &str, job: PendingMediaGroup) {
    let members = match engine
        .platform()
        .get_media_group(job.source_id, job.message_id)
        .await
    {
        Ok(members) => members,
        Err(e) => {
            warn!(
                group_id = %group_id,
                source_id = job.source_id,
                message_id = job.message_id,
                error = %e,
                "Could not fetch media group, dropping"
            );
            return;
        }
    };

    let selected: Vec<&RelayMessage> = members
        .iter()
        .filter(|m| {
            let allowed = job.options.allows(m.media_tag());
            if !allowed {
                debug!(message_id = m.id, media_tag = %m.media_tag(), "Skipping album member type");
            }
            allowed
        })
        .collect();
    if selected.is_empty() {
        debug!(group_id = %group_id, "No album member matches the rule options");
        return;
    }

    let ids: Vec<MessageId> = selected.iter().map(|m| m.id).collect();
    match engine
        .forward_with_backoff(
            None,
            job.target_id,
            job.source_id,
            &ids,
            job.disable_notification,
        )
        .await
    {
        Ok(()) => {
            info!(
                group_id = %group_id,
                source_id = job.source_id,
                target_id = job.target_id,
                count = ids.len(),
                "Media group relayed"
            );
            for member in selected {
                engine
                    .record_stats(job.source_id, job.target_id, member.media_tag())
                    .await;
            }
        }
        Err(e) => warn!(
            group_id = %group_id,
            source_id = job.source_id,
            target_id = job.target_id,
            error = %e,
            "Media group forward failed"
        ),
    }
}
