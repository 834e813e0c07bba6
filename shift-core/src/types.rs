//! Core types: chats, users, resolved peers, and the relayed message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Conversation identifier (Telegram-style: channels and supergroups are negative).
pub type ChatId = i64;

/// Message identifier within a conversation.
pub type MessageId = i32;

/// Kind of conversation a message lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    Channel,
    Group,
    Supergroup,
    Private,
    Bot,
}

impl ChatKind {
    /// Channels and groups are the only conversations a rule may watch.
    pub fn can_be_source(self) -> bool {
        matches!(self, ChatKind::Channel | ChatKind::Group | ChatKind::Supergroup)
    }
}

/// Chat (channel, group or private) identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub kind: ChatKind,
    pub title: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Forwarding out of a protected chat is refused by the platform.
    pub has_protected_content: bool,
}

impl Chat {
    /// Minimal chat with only id and kind; names unknown.
    pub fn new(id: ChatId, kind: ChatKind) -> Self {
        Self {
            id,
            kind,
            title: None,
            username: None,
            first_name: None,
            last_name: None,
            has_protected_content: false,
        }
    }
}

/// User identity (id, username, names).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_bot: bool,
}

/// Whether a rule's destination is a chat or a single user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    #[default]
    Chat,
    User,
}

impl TargetType {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetType::Chat => "chat",
            TargetType::User => "user",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved source or destination: either a chat or a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Peer {
    Chat(Chat),
    User(User),
}

impl Peer {
    pub fn id(&self) -> i64 {
        match self {
            Peer::Chat(chat) => chat.id,
            Peer::User(user) => user.id,
        }
    }

    pub fn target_type(&self) -> TargetType {
        match self {
            Peer::Chat(_) => TargetType::Chat,
            Peer::User(_) => TargetType::User,
        }
    }

    /// Human readable name, e.g. `News (@news)` or `Alice Smith (42)`.
    pub fn display_name(&self) -> String {
        let (base, username, id) = match self {
            Peer::User(user) => {
                let name = join_names(user.first_name.as_deref(), user.last_name.as_deref());
                let base = if name.is_empty() {
                    format!("User {}", user.id)
                } else {
                    name
                };
                (base, user.username.as_deref(), user.id)
            }
            Peer::Chat(chat) => {
                let base = match (&chat.title, &chat.first_name) {
                    (Some(title), _) => title.clone(),
                    (None, Some(first)) => join_names(Some(first), chat.last_name.as_deref()),
                    (None, None) => format!("{:?} {}", chat.kind, chat.id),
                };
                (base, chat.username.as_deref(), chat.id)
            }
        };
        match username {
            Some(username) => format!("{} (@{})", base, username),
            None => format!("{} ({})", base, id),
        }
    }

    /// Short label used in listings: `@username`, title, names, or the raw id.
    pub fn short_name(&self) -> String {
        match self {
            Peer::User(user) => user
                .username
                .as_ref()
                .map(|u| format!("@{}", u))
                .or_else(|| {
                    let name = join_names(user.first_name.as_deref(), user.last_name.as_deref());
                    (!name.is_empty()).then_some(name)
                })
                .unwrap_or_else(|| user.id.to_string()),
            Peer::Chat(chat) => chat
                .username
                .as_ref()
                .map(|u| format!("@{}", u))
                .or_else(|| chat.title.clone())
                .or_else(|| {
                    let name = join_names(chat.first_name.as_deref(), chat.last_name.as_deref());
                    (!name.is_empty()).then_some(name)
                })
                .unwrap_or_else(|| chat.id.to_string()),
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Peer::User(_) => "👤",
            Peer::Chat(chat) => match chat.kind {
                ChatKind::Bot => "🤖",
                ChatKind::Channel => "📢",
                ChatKind::Group | ChatKind::Supergroup => "👥",
                ChatKind::Private => "💬",
            },
        }
    }
}

fn join_names(first: Option<&str>, last: Option<&str>) -> String {
    [first, last]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Media carried by a message. Text-only messages have no media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    Document,
    Sticker,
    Animation,
    Voice,
    Audio,
    VideoNote,
    Contact,
    Location,
    Venue,
    Poll,
    Dice,
    Game,
    Unknown,
}

impl MediaKind {
    /// Tag used by relay options and stats records.
    pub fn tag(self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Document => "document",
            MediaKind::Sticker => "sticker",
            MediaKind::Animation => "animation",
            MediaKind::Voice => "voice",
            MediaKind::Audio => "audio",
            MediaKind::VideoNote => "video_note",
            MediaKind::Contact => "contact",
            MediaKind::Location => "location",
            MediaKind::Venue => "venue",
            MediaKind::Poll => "poll",
            MediaKind::Dice => "dice",
            MediaKind::Game => "game",
            MediaKind::Unknown => "unknown",
        }
    }
}

/// Tag of a message without media.
pub const TEXT_TAG: &str = "text";

/// An incoming message as seen by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayMessage {
    pub id: MessageId,
    pub chat: Chat,
    /// Author, when the platform exposes one (channel posts usually have none).
    pub sender: Option<User>,
    /// Text body, or the caption of a media message.
    pub text: Option<String>,
    pub media: Option<MediaKind>,
    pub media_group_id: Option<String>,
    /// Set when the message is itself a forward of another message.
    pub is_forwarded: bool,
    pub has_protected_content: bool,
    pub date: DateTime<Utc>,
}

impl RelayMessage {
    /// `text` for plain messages, otherwise the media kind's tag.
    pub fn media_tag(&self) -> &'static str {
        self.media.map(MediaKind::tag).unwrap_or(TEXT_TAG)
    }

    /// True when either the message or its chat forbids forwarding.
    pub fn is_protected(&self) -> bool {
        self.has_protected_content || self.chat.has_protected_content
    }
}

/// A status message the relay may edit to report progress (e.g. rate-limit waits during backup).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}
