use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShiftError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupt record {key}: {reason}")]
    DataCorruption { key: String, reason: String },

    #[error("Config error: {0}")]
    Config(String),
}

/// Problems with a command's input. Shown to the invoker; nothing is persisted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing arguments. Usage: {0}")]
    Usage(&'static str),

    #[error("Unknown options: {unknown}. Available: {available}")]
    UnknownOptions { unknown: String, available: String },

    #[error("Cannot use {reference} as source: {reason}")]
    InvalidSource { reference: String, reason: String },

    #[error("Cannot use {reference} as target: {reason}")]
    InvalidTarget { reference: String, reason: String },

    #[error("Conversation {0} is whitelisted and cannot be relayed")]
    Whitelisted(i64),

    #[error("Forwarding loop: {0}")]
    WouldCreateCycle(String),

    #[error("No valid index given. Invalid input: {0}")]
    NoValidIndex(String),

    #[error("Unknown subcommand: {0}")]
    UnknownSubcommand(String),
}

/// Failures reported by the chat platform.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The platform asked us to wait before retrying.
    #[error("Rate limited, retry after {0:?}")]
    RateLimited(Duration),

    #[error("Blocked by the recipient")]
    Blocked,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not supported by this platform: {0}")]
    Unsupported(&'static str),

    #[error("{0}")]
    Other(String),
}

impl PlatformError {
    /// Wait requested by a rate-limit signal, if this is one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            PlatformError::RateLimited(wait) => Some(*wait),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShiftError>;
