//! Relay process config: database, logging, access control and relay behavior.
//! Loaded from env (call `dotenvy::dotenv()` first). Telegram settings live in
//! [`shift_telegram::TelegramConfig`] so `shift rules` runs without a token.

use anyhow::{Context, Result};
use relay::RelayConfig;
use std::collections::HashSet;
use std::env;


pub const DEFAULT_DATABASE_URL: &str = "./data/shift.db";
pub const DEFAULT_LOG_FILE: &str = "logs/shift.log";

#[derive(Debug, Clone)]
pub struct ShiftConfig {
    /// DATABASE_URL: SQLite file path or `sqlite:` URL
    pub database_url: String,
    /// LOG_FILE
    pub log_file: String,
    /// SHIFT_WHITELIST: conversations that may never be relayed
    pub whitelist: HashSet<i64>,
    /// SHIFT_ALLOWED_USERS: users allowed to run commands
    pub allowed_users: HashSet<i64>,
    /// SHIFT_COMMAND_PREFIX
    pub command_prefix: String,
    /// SHIFT_RELAY_FORWARDED
    pub relay_forwarded: bool,
    /// SHIFT_MAX_RATE_LIMIT_RETRIES
    pub max_rate_limit_retries: u32,
}

impl ShiftConfig {
    pub fn load() -> Result<Self> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let log_file = env::var("LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
        let whitelist = parse_id_list("SHIFT_WHITELIST", env::var("SHIFT_WHITELIST").ok())?;
        let allowed_users =
            parse_id_list("SHIFT_ALLOWED_USERS", env::var("SHIFT_ALLOWED_USERS").ok())?;
        let command_prefix =
            env::var("SHIFT_COMMAND_PREFIX").unwrap_or_else(|_| "shift".to_string());
        let relay_forwarded = match env::var("SHIFT_RELAY_FORWARDED") {
            Ok(value) => parse_bool(&value)
                .with_context(|| format!("SHIFT_RELAY_FORWARDED is not a boolean: {}", value))?,
            Err(_) => true,
        };
        let max_rate_limit_retries = match env::var("SHIFT_MAX_RATE_LIMIT_RETRIES") {
            Ok(value) => value.trim().parse().with_context(|| {
                format!("SHIFT_MAX_RATE_LIMIT_RETRIES is not a number: {}", value)
            })?,
            Err(_) => 5,
        };

        Ok(Self {
            database_url,
            log_file,
            whitelist,
            allowed_users,
            command_prefix,
            relay_forwarded,
            max_rate_limit_retries,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.allowed_users.is_empty() {
            anyhow::bail!("SHIFT_ALLOWED_USERS must list at least one user id allowed to run commands");
        }
        let prefix = self.command_prefix.trim();
        if prefix.is_empty() || prefix.contains(char::is_whitespace) {
            anyhow::bail!(
                "SHIFT_COMMAND_PREFIX must be a single word, got {:?}",
                self.command_prefix
            );
        }
        Ok(())
    }

    /// Relay settings: env-driven fields over the built-in timing defaults.
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            whitelist: self.whitelist.clone(),
            allowed_users: self.allowed_users.clone(),
            command_prefix: self.command_prefix.trim().to_string(),
            relay_forwarded: self.relay_forwarded,
            max_rate_limit_retries: self.max_rate_limit_retries,
            ..RelayConfig::default()
        }
    }
}

/// Comma- or whitespace-separated list of numeric ids. Unset or empty means none.
fn parse_id_list(name: &str, value: Option<String>) -> Result<HashSet<i64>> {
    let Some(value) = value else {
        return Ok(HashSet::new());
    };
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .with_context(|| format!("{} contains a non-numeric id: {}", name, part))
        })
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
