//! # shift-cli
//!
//! The `shift` binary: argument parsing, environment config, and wiring of storage, relay and
//! the Telegram runner.

pub mod app;
pub mod cli;
pub mod config;

pub use app::{format_rules, list_rules, run_bot};
pub use cli::{Cli, Commands};
pub use config::ShiftConfig;
