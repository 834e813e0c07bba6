//! Wraps teloxide::Bot and implements [`shift_core::Platform`]. Production code talks to the
//! Bot API; relay tests substitute a recording mock.

use crate::adapters::peer_from_json;
use crate::album_cache::{AlbumCache, RecentPosts};
use async_trait::async_trait;
use shift_core::{
    ChatId, MessageId, Peer, Platform, PlatformError, PlatformResult, RelayMessage, TargetType,
};
use teloxide::prelude::*;
use teloxide::types::{ChatId as TgChatId, MessageId as TgMessageId, Recipient};
use teloxide::{ApiError, RequestError};
use tracing::{debug, instrument};

/// Maps a Bot API failure onto the relay's platform error taxonomy.
pub fn map_request_error(error: RequestError) -> PlatformError {
    match error {
        RequestError::RetryAfter(wait) => PlatformError::RateLimited(wait.duration()),
        RequestError::Api(ApiError::BotBlocked | ApiError::UserDeactivated) => {
            PlatformError::Blocked
        }
        RequestError::Api(
            ref api @ (ApiError::ChatNotFound
            | ApiError::UserNotFound
            | ApiError::MessageToForwardNotFound),
        ) => PlatformError::NotFound(api.to_string()),
        RequestError::Api(
            ref api @ (ApiError::BotKicked
            | ApiError::BotKickedFromSupergroup
            | ApiError::CantInitiateConversation
            | ApiError::NotEnoughRightsToPostMessages),
        ) => PlatformError::Forbidden(api.to_string()),
        other => PlatformError::Other(other.to_string()),
    }
}

/// Bot API recipient for a user-supplied reference: `me`/`here`/`this`, a numeric id,
/// `@username`, a bare username or a `t.me/` link.
pub(crate) fn recipient_for(reference: &str, current_chat: ChatId) -> Recipient {
    let reference = reference.trim();
    if matches!(reference.to_lowercase().as_str(), "me" | "here" | "this") {
        return Recipient::Id(TgChatId(current_chat));
    }
    if let Ok(id) = reference.parse::<i64>() {
        return Recipient::Id(TgChatId(id));
    }
    let name = ["https://t.me/", "http://t.me/", "t.me/"]
        .iter()
        .find_map(|prefix| reference.strip_prefix(prefix))
        .unwrap_or(reference)
        .trim_start_matches('@')
        .trim_end_matches('/');
    Recipient::ChannelUsername(format!("@{}", name))
}

/// teloxide-backed [`Platform`] with the album cache the Bot API lacks.
pub struct TelegramPlatform {
    bot: teloxide::Bot,
    albums: AlbumCache,
    own_posts: RecentPosts,
}

impl TelegramPlatform {
    pub fn new(bot: teloxide::Bot) -> Self {
        Self {
            bot,
            albums: AlbumCache::default(),
            own_posts: RecentPosts::default(),
        }
    }

    pub fn inner(&self) -> &teloxide::Bot {
        &self.bot
    }

    pub fn albums(&self) -> &AlbumCache {
        &self.albums
    }

    /// Copies the bot produced by forwarding; the runner drops their echo updates.
    pub fn own_posts(&self) -> &RecentPosts {
        &self.own_posts
    }

    async fn fetch_peer(&self, recipient: Recipient) -> PlatformResult<Peer> {
        let label = format!("{:?}", recipient);
        let chat = self
            .bot
            .get_chat(recipient)
            .await
            .map_err(map_request_error)?;
        let raw = serde_json::to_value(&chat).map_err(|e| PlatformError::Other(e.to_string()))?;
        peer_from_json(&raw)
            .ok_or_else(|| PlatformError::Other(format!("unsupported chat type for {}", label)))
    }
}

#[async_trait]
impl Platform for TelegramPlatform {
    #[instrument(skip(self, message_ids), fields(count = message_ids.len()))]
    async fn forward_messages(
        &self,
        target: ChatId,
        source: ChatId,
        message_ids: &[MessageId],
        disable_notification: bool,
    ) -> PlatformResult<()> {
        let ids: Vec<TgMessageId> = message_ids.iter().map(|id| TgMessageId(*id)).collect();
        let copies = self
            .bot
            .forward_messages(TgChatId(target), TgChatId(source), ids)
            .disable_notification(disable_notification)
            .await
            .map_err(map_request_error)?;
        self.own_posts
            .remember(target, copies.iter().map(|copy| copy.0));
        Ok(())
    }

    async fn get_media_group(
        &self,
        source: ChatId,
        message_id: MessageId,
    ) -> PlatformResult<Vec<RelayMessage>> {
        self.albums.members(source, message_id).ok_or_else(|| {
            PlatformError::NotFound(format!(
                "media group of message {} in {}",
                message_id, source
            ))
        })
    }

    async fn resolve_peer(&self, reference: &str, current_chat: ChatId) -> PlatformResult<Peer> {
        let recipient = recipient_for(reference, current_chat);
        debug!(reference = %reference, recipient = ?recipient, "Resolving peer");
        self.fetch_peer(recipient).await
    }

    async fn get_peer(&self, id: i64, _target_type: TargetType) -> PlatformResult<Peer> {
        self.fetch_peer(Recipient::Id(TgChatId(id))).await
    }

    async fn chat_history(&self, _source: ChatId) -> PlatformResult<Vec<RelayMessage>> {
        Err(PlatformError::Unsupported("chat history"))
    }

    async fn send_message(&self, chat: ChatId, text: &str) -> PlatformResult<MessageId> {
        let sent = self
            .bot
            .send_message(TgChatId(chat), text.to_string())
            .await
            .map_err(map_request_error)?;
        Ok(sent.id.0)
    }

    async fn edit_message(
        &self,
        chat: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> PlatformResult<()> {
        match self
            .bot
            .edit_message_text(TgChatId(chat), TgMessageId(message_id), text)
            .await
        {
            Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(e) => Err(map_request_error(e)),
        }
    }
}
