//! Chat platform abstraction used by the relay.
//!
//! [`Platform`] is transport-agnostic; `shift-telegram` implements it via teloxide and tests
//! substitute a recording mock.

use crate::error::PlatformError;
use crate::types::{ChatId, MessageId, Peer, RelayMessage, TargetType};
use async_trait::async_trait;

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Operations the relay consumes from the chat platform.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Forwards `message_ids` from `source` to `target` in one call (albums stay grouped).
    async fn forward_messages(
        &self,
        target: ChatId,
        source: ChatId,
        message_ids: &[MessageId],
        disable_notification: bool,
    ) -> PlatformResult<()>;

    /// Returns every message of the media group that `message_id` belongs to.
    async fn get_media_group(
        &self,
        source: ChatId,
        message_id: MessageId,
    ) -> PlatformResult<Vec<RelayMessage>>;

    /// Resolves a user-supplied reference (numeric id, `@username`, or `me`/`here`/`this`
    /// meaning `current_chat`) to a chat or user.
    async fn resolve_peer(&self, reference: &str, current_chat: ChatId) -> PlatformResult<Peer>;

    /// Looks up a known id for display purposes.
    async fn get_peer(&self, id: i64, target_type: TargetType) -> PlatformResult<Peer>;

    /// Full message history of `source`, newest first, for backups.
    async fn chat_history(&self, source: ChatId) -> PlatformResult<Vec<RelayMessage>>;

    /// Sends a text message and returns its id (for later [`Platform::edit_message`]).
    async fn send_message(&self, chat: ChatId, text: &str) -> PlatformResult<MessageId>;

    /// Edits an already-sent message, e.g. a progress notice.
    async fn edit_message(&self, chat: ChatId, message_id: MessageId, text: &str)
        -> PlatformResult<()>;
}
