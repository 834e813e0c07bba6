//! Wiring: storage, relay handler chain and Telegram runner.

use crate::config::ShiftConfig;
use anyhow::Result;
use relay::build_handler_chain;
use shift_core::init_tracing;
use shift_telegram::{run_dispatcher, TelegramConfig, TelegramPlatform};
use std::sync::Arc;
use storage::{KvStore, RuleSlot, RuleStore, SqliteKvStore, StatsRepository};
use tracing::{error, info, instrument};

async fn open_store(database_url: &str) -> Result<Arc<dyn KvStore>> {
    let store = SqliteKvStore::new(database_url).await.map_err(|e| {
        error!(error = %e, database_url = %database_url, "Failed to open rule storage");
        anyhow::anyhow!("Failed to open rule storage: {}", e)
    })?;
    Ok(Arc::new(store))
}

/// Main entry: validate config, init logging, open storage, build the chain, run the dispatcher.
pub async fn run_bot(config: ShiftConfig, telegram: TelegramConfig) -> Result<()> {
    config.validate()?;
    telegram.validate()?;
    init_tracing(&config.log_file)?;
    serve(config, telegram).await
}

#[instrument(skip_all, fields(database_url = %config.database_url))]
async fn serve(config: ShiftConfig, telegram: TelegramConfig) -> Result<()> {
    info!(
        whitelist = config.whitelist.len(),
        allowed_users = config.allowed_users.len(),
        command_prefix = %config.command_prefix,
        "Initializing relay"
    );

    let kv = open_store(&config.database_url).await?;
    let rules = RuleStore::new(kv.clone());
    let stats = StatsRepository::new(kv);

    let platform = Arc::new(TelegramPlatform::new(telegram.build_bot()?));
    let chain = build_handler_chain(
        platform.clone(),
        rules,
        stats,
        Arc::new(config.relay_config()),
    );

    info!("Relay started");
    run_dispatcher(platform, chain).await
}

/// Rule listing read straight from the database.
pub async fn list_rules(database_url: &str) -> Result<String> {
    let kv = open_store(database_url).await?;
    let slots = RuleStore::new(kv).list().await?;
    Ok(format_rules(&slots))
}

pub fn format_rules(slots: &[RuleSlot]) -> String {
    if slots.is_empty() {
        return "No relay rules configured.".to_string();
    }

    let mut out = format!(
        "{:<4} {:<8} {:<16} {:<16} {:<6} {:<20} {}\n",
        "#", "status", "source", "target", "type", "options", "filters"
    );
    out.push_str(&"-".repeat(90));
    out.push('\n');

    for (i, slot) in slots.iter().enumerate() {
        match slot {
            RuleSlot::Valid(rule) => {
                let filters = if rule.filters.is_empty() {
                    "-".to_string()
                } else {
                    rule.filters.join(", ")
                };
                out.push_str(&format!(
                    "{:<4} {:<8} {:<16} {:<16} {:<6} {:<20} {}\n",
                    i + 1,
                    if rule.paused { "paused" } else { "active" },
                    rule.source_id,
                    rule.target_id,
                    rule.target_type.as_str(),
                    rule.options.to_string(),
                    filters
                ));
            }
            RuleSlot::Corrupt { key, reason, .. } => {
                out.push_str(&format!("{:<4} corrupt record {}: {}\n", i + 1, key, reason));
            }
        }
    }
    out
}
