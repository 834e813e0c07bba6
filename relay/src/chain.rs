//! # Handler chain
//!
//! Each incoming message runs through every handler's `before`, then `handle` in order until one
//! returns Stop or Reply, then every `after` in reverse order. The command handler and the relay
//! listener are the two handlers the bot registers.

use async_trait::async_trait;
use shift_core::{RelayMessage, Result};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Handler result for the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerResponse {
    /// Pass to next handler.
    Continue,
    /// Stop the chain; nothing to send back.
    Stop,
    /// Stop the chain and send this text back to the chat the message came from.
    Reply(String),
}

#[async_trait]
pub trait Handler: Send + Sync {
    /// Return false to stop the chain before any handler runs.
    async fn before(&self, _message: &RelayMessage) -> Result<bool> {
        Ok(true)
    }

    async fn handle(&self, _message: &RelayMessage) -> Result<HandlerResponse> {
        Ok(HandlerResponse::Continue)
    }

    async fn after(&self, _message: &RelayMessage, _response: &HandlerResponse) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct HandlerChain {
    handlers: Vec<Arc<dyn Handler>>,
}

impl HandlerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Returns the first Stop or Reply, or Continue when every handler passed.
    #[instrument(skip(self, message), fields(chat_id = message.chat.id, message_id = message.id))]
    pub async fn handle(&self, message: &RelayMessage) -> Result<HandlerResponse> {
        for handler in &self.handlers {
            if !handler.before(message).await? {
                debug!(
                    handler = %std::any::type_name_of_val(handler.as_ref()),
                    "Handler before returned false, chain stopped"
                );
                return Ok(HandlerResponse::Stop);
            }
        }

        let mut final_response = HandlerResponse::Continue;
        for handler in &self.handlers {
            let response = handler.handle(message).await?;
            debug!(
                handler = %std::any::type_name_of_val(handler.as_ref()),
                response = ?response,
                "Handler processed"
            );
            if response != HandlerResponse::Continue {
                final_response = response;
                break;
            }
        }

        for handler in self.handlers.iter().rev() {
            handler.after(message, &final_response).await?;
        }

        if let HandlerResponse::Reply(text) = &final_response {
            info!(reply_len = text.len(), "Handler chain replied");
        }
        Ok(final_response)
    }
}
