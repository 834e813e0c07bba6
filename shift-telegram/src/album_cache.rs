//! Short-lived memory of recent updates.
//!
//! The Bot API cannot list the members of a media group, so [`AlbumCache`] keeps every album
//! member seen in the last minutes and answers `get_media_group` from it. [`RecentPosts`]
//! remembers the messages the bot itself produced by forwarding, so their echo updates are not
//! relayed a second time.

use shift_core::{ChatId, MessageId, RelayMessage};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_ALBUM_TTL: Duration = Duration::from_secs(120);

struct Album {
    members: Vec<RelayMessage>,
    last_seen: Instant,
}

pub struct AlbumCache {
    ttl: Duration,
    albums: Mutex<HashMap<(ChatId, String), Album>>,
}

impl Default for AlbumCache {
    fn default() -> Self {
        Self::new(DEFAULT_ALBUM_TTL)
    }
}

impl AlbumCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            albums: Mutex::new(HashMap::new()),
        }
    }

    /// Remembers `message` if it belongs to a media group. Expired albums are dropped.
    pub fn record(&self, message: &RelayMessage) {
        let Some(group_id) = &message.media_group_id else {
            return;
        };
        let now = Instant::now();
        let Ok(mut albums) = self.albums.lock() else {
            return;
        };
        albums.retain(|_, album| now.duration_since(album.last_seen) < self.ttl);

        let album = albums
            .entry((message.chat.id, group_id.clone()))
            .or_insert_with(|| Album {
                members: Vec::new(),
                last_seen: now,
            });
        album.last_seen = now;
        match album.members.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => *existing = message.clone(),
            None => album.members.push(message.clone()),
        }
        album.members.sort_by_key(|m| m.id);
    }

    /// Members of the album in `source` that contains `message_id`, ordered by id.
    pub fn members(&self, source: ChatId, message_id: MessageId) -> Option<Vec<RelayMessage>> {
        let albums = self.albums.lock().ok()?;
        albums
            .iter()
            .filter(|((chat, _), _)| *chat == source)
            .map(|(_, album)| &album.members)
            .find(|members| members.iter().any(|m| m.id == message_id))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.albums.lock().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Messages recently produced by the bot, keyed by (chat, message id).
pub struct RecentPosts {
    ttl: Duration,
    posts: Mutex<HashMap<(ChatId, MessageId), Instant>>,
}

impl Default for RecentPosts {
    fn default() -> Self {
        Self::new(DEFAULT_ALBUM_TTL)
    }
}

impl RecentPosts {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            posts: Mutex::new(HashMap::new()),
        }
    }

    pub fn remember(&self, chat: ChatId, ids: impl IntoIterator<Item = MessageId>) {
        let now = Instant::now();
        if let Ok(mut posts) = self.posts.lock() {
            posts.retain(|_, at| now.duration_since(*at) < self.ttl);
            for id in ids {
                posts.insert((chat, id), now);
            }
        }
    }

    /// True once for a remembered post; the entry is consumed.
    pub fn take(&self, chat: ChatId, id: MessageId) -> bool {
        self.posts
            .lock()
            .map(|mut posts| posts.remove(&(chat, id)).is_some())
            .unwrap_or(false)
    }
}
