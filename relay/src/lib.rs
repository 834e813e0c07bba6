//! # relay
//!
//! Rule-driven relay of messages between conversations.
//!
//! Incoming messages pass the [`CommandHandler`] (operator commands) and the [`RelayListener`]
//! (live relay). The listener drops filtered messages, defers albums to the [`BatchScheduler`]
//! and hands everything else to the [`ForwardingEngine`], which walks rule chains hop by hop.

pub mod batch;
pub mod chain;
pub mod commands;
pub mod config;
pub mod cycle;
pub mod filter;
pub mod forward;
pub mod listener;

pub use batch::{BatchScheduler, PendingMediaGroup};
pub use chain::{Handler, HandlerChain, HandlerResponse};
pub use commands::{CommandExecutor, CommandHandler, ShiftCommand};
pub use config::RelayConfig;
pub use cycle::{would_create_cycle, CycleCheck};
pub use filter::is_filtered;
pub use forward::{
    ChainStop, ForwardOutcome, ForwardingEngine, Hop, HopRecord, RelayReport, SkipReason,
};
pub use listener::{ListenOutcome, RelayListener};

use shift_core::Platform;
use std::sync::Arc;
use storage::{RuleStore, StatsRepository};

/// Wires the engine, scheduler, command handler and listener into one chain:
/// commands first, then the live relay.
pub fn build_handler_chain(
    platform: Arc<dyn Platform>,
    rules: RuleStore,
    stats: StatsRepository,
    config: Arc<RelayConfig>,
) -> HandlerChain {
    let engine = Arc::new(ForwardingEngine::new(platform, rules, stats, config.clone()));
    let batches = Arc::new(BatchScheduler::new(engine.clone()));

    HandlerChain::new()
        .add_handler(Arc::new(CommandHandler::new(
            CommandExecutor::new(engine.clone()),
            config,
        )))
        .add_handler(Arc::new(RelayListener::new(engine, batches)))
}
