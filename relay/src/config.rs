//! Relay tuning knobs and access control.

use shift_core::ChatId;
use std::collections::HashSet;
use std::ops::Range;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Quiet period after the last album member before the album is forwarded.
    pub group_delay: Duration,
    /// Hops beyond this depth are dropped.
    pub max_chain_depth: u32,
    /// Longest rule chain the cycle walk follows before giving up.
    pub max_cycle_hops: usize,
    /// Extra wait added on top of a platform rate-limit, in seconds.
    pub rate_limit_jitter: Range<f64>,
    pub max_rate_limit_retries: u32,
    /// Delay between messages during a backup, in seconds.
    pub backup_pacing: Range<f64>,
    /// Backup progress is reported every this many processed messages.
    pub progress_every: usize,
    /// Relay messages that are themselves forwards when they arrive live.
    pub relay_forwarded: bool,
    /// Conversations that may never be a source or a target.
    pub whitelist: HashSet<ChatId>,
    /// Users allowed to run commands. Empty means nobody.
    pub allowed_users: HashSet<i64>,
    pub command_prefix: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            group_delay: Duration::from_secs(4),
            max_chain_depth: 10,
            max_cycle_hops: 50,
            rate_limit_jitter: 0.5..1.0,
            max_rate_limit_retries: 5,
            backup_pacing: 0.5..1.0,
            progress_every: 50,
            relay_forwarded: true,
            whitelist: HashSet::new(),
            allowed_users: HashSet::new(),
            command_prefix: "shift".to_string(),
        }
    }
}

/// Random duration within `range` seconds.
pub(crate) fn jitter(range: &Range<f64>) -> Duration {
    use rand::Rng;
    if range.is_empty() {
        return Duration::from_secs_f64(range.start.max(0.0));
    }
    Duration::from_secs_f64(rand::rng().random_range(range.clone()))
}
