//! `shift` command surface: parsing, authorization and execution.

mod executor;
mod parse;
mod render;

pub use executor::CommandExecutor;
pub use parse::{parse_command, parse_indices, FilterAction, IndexSelection, ShiftCommand};
pub use render::HELP_TEXT;

use crate::chain::{Handler, HandlerResponse};
use crate::config::RelayConfig;
use async_trait::async_trait;
use shift_core::{RelayMessage, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Runs commands from authorized senders and replies with the result.
pub struct CommandHandler {
    executor: CommandExecutor,
    config: Arc<RelayConfig>,
}

impl CommandHandler {
    pub fn new(executor: CommandExecutor, config: Arc<RelayConfig>) -> Self {
        Self { executor, config }
    }

    /// Only allow-listed senders may issue commands; an empty allow-list authorizes nobody.
    pub fn is_authorized(&self, message: &RelayMessage) -> bool {
        message
            .sender
            .as_ref()
            .is_some_and(|user| self.config.allowed_users.contains(&user.id))
    }
}

#[async_trait]
impl Handler for CommandHandler {
    async fn handle(&self, message: &RelayMessage) -> Result<HandlerResponse> {
        let Some(text) = message.text.as_deref() else {
            return Ok(HandlerResponse::Continue);
        };
        let Some(parsed) = parse_command(text, &self.config.command_prefix) else {
            return Ok(HandlerResponse::Continue);
        };
        if !self.is_authorized(message) {
            warn!(
                chat_id = message.chat.id,
                sender_id = ?message.sender.as_ref().map(|u| u.id),
                "Ignoring command from unauthorized sender"
            );
            return Ok(HandlerResponse::Continue);
        }

        let reply = match parsed {
            Ok(command) => {
                info!(chat_id = message.chat.id, command = ?command, "Running shift command");
                match self.executor.execute(message.chat.id, command).await {
                    Ok(reply) => reply,
                    Err(e) => {
                        warn!(chat_id = message.chat.id, error = %e, "Shift command failed");
                        format!("❌ {}", e)
                    }
                }
            }
            Err(e) => format!("❌ {}", e),
        };
        Ok(HandlerResponse::Reply(reply))
    }
}
