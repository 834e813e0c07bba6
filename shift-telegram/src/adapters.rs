//! Adapters from teloxide types to shift_core types.
//!
//! Fields whose accessor shape varies between Bot API revisions (media group, protection,
//! forward origin, media payload) are read from the message's Bot API JSON form.

use serde_json::Value;
use shift_core::{Chat, ChatKind, MediaKind, Peer, RelayMessage, User};
use tracing::warn;

/// Wraps a teloxide User for conversion to a core [`User`].
pub struct TelegramUserWrapper<'a>(pub &'a teloxide::types::User);

impl<'a> TelegramUserWrapper<'a> {
    pub fn to_core(&self) -> User {
        User {
            id: self.0.id.0 as i64,
            username: self.0.username.clone(),
            first_name: Some(self.0.first_name.clone()),
            last_name: self.0.last_name.clone(),
            is_bot: self.0.is_bot,
        }
    }
}

/// Wraps a teloxide Message (message or channel post) for conversion to a [`RelayMessage`].
pub struct TelegramMessageWrapper<'a>(pub &'a teloxide::types::Message);

impl<'a> TelegramMessageWrapper<'a> {
    pub fn to_core(&self) -> RelayMessage {
        let msg = self.0;
        let raw = match serde_json::to_value(msg) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    chat_id = msg.chat.id.0,
                    message_id = msg.id.0,
                    error = %e,
                    "Cannot read message fields, treating as plain private message"
                );
                Value::Null
            }
        };
        let chat = chat_or_private(&raw, msg.chat.id.0);

        RelayMessage {
            id: msg.id.0,
            chat,
            sender: msg.from.as_ref().map(|u| TelegramUserWrapper(u).to_core()),
            text: msg.text().or_else(|| msg.caption()).map(str::to_string),
            media: media_kind(&raw),
            media_group_id: raw
                .get("media_group_id")
                .and_then(Value::as_str)
                .map(str::to_string),
            is_forwarded: ["forward_origin", "forward_from", "forward_from_chat"]
                .iter()
                .any(|key| raw.get(*key).is_some_and(|v| !v.is_null())),
            has_protected_content: bool_field(&raw, "has_protected_content"),
            date: msg.date,
        }
    }
}

/// Chat of a serialized message; unreadable chats fall back to a private chat, which the
/// listener ignores.
fn chat_or_private(raw: &Value, chat_id: i64) -> Chat {
    match raw.get("chat").and_then(chat_from_json) {
        Some(chat) => chat,
        None => {
            warn!(chat_id = chat_id, "Unrecognized chat, message will not be relayed");
            Chat::new(chat_id, ChatKind::Private)
        }
    }
}

/// Media keys in precedence order: animations also carry `document`, venues carry `location`.
const MEDIA_KEYS: &[(&str, MediaKind)] = &[
    ("photo", MediaKind::Photo),
    ("video", MediaKind::Video),
    ("animation", MediaKind::Animation),
    ("document", MediaKind::Document),
    ("sticker", MediaKind::Sticker),
    ("voice", MediaKind::Voice),
    ("audio", MediaKind::Audio),
    ("video_note", MediaKind::VideoNote),
    ("contact", MediaKind::Contact),
    ("venue", MediaKind::Venue),
    ("location", MediaKind::Location),
    ("poll", MediaKind::Poll),
    ("dice", MediaKind::Dice),
    ("game", MediaKind::Game),
];

/// None for text messages; `Unknown` for anything that is neither text nor known media.
fn media_kind(raw: &Value) -> Option<MediaKind> {
    let found = MEDIA_KEYS
        .iter()
        .find(|(key, _)| raw.get(*key).is_some_and(|v| !v.is_null()))
        .map(|(_, kind)| *kind);
    match found {
        Some(kind) => Some(kind),
        None if raw.get("text").is_some() => None,
        None => Some(MediaKind::Unknown),
    }
}

fn bool_field(raw: &Value, key: &str) -> bool {
    raw.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn str_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Parses a Bot API chat object (from an update or `getChat`).
pub fn chat_from_json(raw: &Value) -> Option<Chat> {
    let id = raw.get("id")?.as_i64()?;
    let kind = match raw.get("type")?.as_str()? {
        "channel" => ChatKind::Channel,
        "group" => ChatKind::Group,
        "supergroup" => ChatKind::Supergroup,
        "private" => ChatKind::Private,
        _ => return None,
    };
    Some(Chat {
        id,
        kind,
        title: str_field(raw, "title"),
        username: str_field(raw, "username"),
        first_name: str_field(raw, "first_name"),
        last_name: str_field(raw, "last_name"),
        has_protected_content: bool_field(raw, "has_protected_content"),
    })
}

/// Private chats resolve to the user on the other side; everything else stays a chat.
pub fn peer_from_json(raw: &Value) -> Option<Peer> {
    let chat = chat_from_json(raw)?;
    Some(match chat.kind {
        ChatKind::Private => Peer::User(User {
            id: chat.id,
            username: chat.username,
            first_name: chat.first_name,
            last_name: chat.last_name,
            is_bot: false,
        }),
        _ => Peer::Chat(chat),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(raw: Value) -> teloxide::types::Message {
        serde_json::from_value(raw).unwrap()
    }

    fn channel_json() -> Value {
        json!({"id": -1001, "type": "channel", "title": "News", "username": "news"})
    }

    /// **Test: TelegramUserWrapper converts teloxide User to core User.**
    #[test]
    fn test_telegram_user_wrapper_to_core() {
        let user = teloxide::types::User {
            id: teloxide::types::UserId(123),
            is_bot: false,
            first_name: "Test".to_string(),
            last_name: Some("User".to_string()),
            username: Some("testuser".to_string()),
            language_code: Some("en".to_string()),
            is_premium: false,
            added_to_attachment_menu: false,
        };

        let core_user = TelegramUserWrapper(&user).to_core();

        assert_eq!(core_user.id, 123);
        assert_eq!(core_user.username, Some("testuser".to_string()));
        assert_eq!(core_user.first_name, Some("Test".to_string()));
        assert_eq!(core_user.last_name, Some("User".to_string()));
        assert!(!core_user.is_bot);
    }

    /// **Test: A text channel post becomes a text RelayMessage on a channel chat.**
    #[test]
    fn test_channel_text_post() {
        let msg = message(json!({
            "message_id": 10,
            "date": 1_700_000_000,
            "chat": channel_json(),
            "text": "hello"
        }));

        let core = TelegramMessageWrapper(&msg).to_core();

        assert_eq!(core.id, 10);
        assert_eq!(core.chat.id, -1001);
        assert_eq!(core.chat.kind, ChatKind::Channel);
        assert_eq!(core.chat.username.as_deref(), Some("news"));
        assert_eq!(core.text.as_deref(), Some("hello"));
        assert_eq!(core.media, None);
        assert_eq!(core.media_tag(), "text");
        assert!(!core.is_forwarded);
        assert!(core.sender.is_none());
    }

    /// **Test: An album photo keeps its caption as text and its media group id.**
    #[test]
    fn test_album_photo() {
        let msg = message(json!({
            "message_id": 11,
            "date": 1_700_000_000,
            "chat": channel_json(),
            "media_group_id": "g1",
            "caption": "cap",
            "has_protected_content": true,
            "photo": [{
                "file_id": "f", "file_unique_id": "u", "width": 1, "height": 1, "file_size": 10
            }]
        }));

        let core = TelegramMessageWrapper(&msg).to_core();

        assert_eq!(core.media, Some(MediaKind::Photo));
        assert_eq!(core.media_group_id.as_deref(), Some("g1"));
        assert_eq!(core.text.as_deref(), Some("cap"));
        assert!(core.has_protected_content);
    }

    /// **Test: An unreadable chat falls back to a private chat with the same id.**
    #[test]
    fn test_unreadable_chat_falls_back_to_private() {
        let chat = chat_or_private(&Value::Null, -1001);
        assert_eq!(chat, Chat::new(-1001, ChatKind::Private));

        let chat = chat_or_private(&json!({"chat": {"id": -1001, "type": "sender"}}), -1001);
        assert_eq!(chat.kind, ChatKind::Private);

        let chat = chat_or_private(&json!({"chat": channel_json()}), -1001);
        assert_eq!(chat.kind, ChatKind::Channel);
    }

    #[test]
    fn test_media_kind_precedence() {
        assert_eq!(
            media_kind(&json!({"animation": {}, "document": {}})),
            Some(MediaKind::Animation)
        );
        assert_eq!(
            media_kind(&json!({"venue": {}, "location": {}})),
            Some(MediaKind::Venue)
        );
        assert_eq!(media_kind(&json!({"text": "x"})), None);
        assert_eq!(
            media_kind(&json!({"new_chat_title": "x"})),
            Some(MediaKind::Unknown)
        );
    }

    #[test]
    fn test_peer_from_json() {
        let peer = peer_from_json(&json!({
            "id": 42, "type": "private", "first_name": "Alice", "username": "alice"
        }))
        .unwrap();
        assert_eq!(peer.target_type(), shift_core::TargetType::User);
        assert_eq!(peer.short_name(), "@alice");

        let peer = peer_from_json(&json!({
            "id": -100, "type": "supergroup", "title": "Team", "has_protected_content": true
        }))
        .unwrap();
        match peer {
            Peer::Chat(chat) => {
                assert_eq!(chat.kind, ChatKind::Supergroup);
                assert!(chat.has_protected_content);
            }
            Peer::User(_) => panic!("expected a chat"),
        }

        assert!(peer_from_json(&json!({"id": 1, "type": "sender"})).is_none());
    }
}
