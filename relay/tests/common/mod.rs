//! Shared fixtures for relay integration tests: a recording [`MockPlatform`], message builders,
//! and a harness wiring the engine over an in-memory store.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use relay::{BatchScheduler, ForwardingEngine, RelayConfig};
use shift_core::{
    Chat, ChatId, ChatKind, MediaKind, MessageId, Peer, Platform, PlatformError, PlatformResult,
    RelayMessage, TargetType, User,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use storage::{InMemoryKvStore, RuleStore, StatsRepository};
use tokio::time::Instant;

/// One recorded `forward_messages` call.
#[derive(Debug, Clone)]
pub struct ForwardCall {
    pub target: ChatId,
    pub source: ChatId,
    pub ids: Vec<MessageId>,
    pub disable_notification: bool,
    pub at: Instant,
}

/// Platform double: knows a fixed set of peers, media groups and histories, records every
/// forward/send/edit, and can be scripted to fail forwards.
#[derive(Default)]
pub struct MockPlatform {
    peers: Mutex<HashMap<i64, Peer>>,
    media_groups: Mutex<HashMap<ChatId, Vec<Vec<RelayMessage>>>>,
    history: Mutex<HashMap<ChatId, Vec<RelayMessage>>>,
    scripted_errors: Mutex<VecDeque<PlatformError>>,
    failing_targets: Mutex<HashSet<ChatId>>,
    pub forwards: Mutex<Vec<ForwardCall>>,
    pub media_group_requests: Mutex<Vec<(ChatId, MessageId)>>,
    pub sent: Mutex<Vec<(ChatId, String)>>,
    pub edits: Mutex<Vec<(ChatId, MessageId, String)>>,
}

impl MockPlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_chat(&self, chat: Chat) {
        self.peers.lock().unwrap().insert(chat.id, Peer::Chat(chat));
    }

    pub fn add_user(&self, user: User) {
        self.peers.lock().unwrap().insert(user.id, Peer::User(user));
    }

    pub fn add_media_group(&self, source: ChatId, members: Vec<RelayMessage>) {
        self.media_groups
            .lock()
            .unwrap()
            .entry(source)
            .or_default()
            .push(members);
    }

    pub fn set_history(&self, source: ChatId, messages: Vec<RelayMessage>) {
        self.history.lock().unwrap().insert(source, messages);
    }

    /// The next forward calls fail with these errors, in order.
    pub fn push_forward_error(&self, err: PlatformError) {
        self.scripted_errors.lock().unwrap().push_back(err);
    }

    pub fn fail_forwards_to(&self, target: ChatId) {
        self.failing_targets.lock().unwrap().insert(target);
    }

    pub fn forwards(&self) -> Vec<ForwardCall> {
        self.forwards.lock().unwrap().clone()
    }

    pub fn forward_targets(&self) -> Vec<ChatId> {
        self.forwards().iter().map(|f| f.target).collect()
    }

    pub fn edits(&self) -> Vec<(ChatId, MessageId, String)> {
        self.edits.lock().unwrap().clone()
    }

    fn peer_by_reference(&self, reference: &str, current_chat: ChatId) -> Option<Peer> {
        let peers = self.peers.lock().unwrap();
        if matches!(reference.to_lowercase().as_str(), "me" | "here" | "this") {
            return peers.get(&current_chat).cloned();
        }
        if let Ok(id) = reference.parse::<i64>() {
            return peers.get(&id).cloned();
        }
        let name = reference.trim_start_matches('@');
        peers
            .values()
            .find(|peer| match peer {
                Peer::Chat(chat) => chat.username.as_deref() == Some(name),
                Peer::User(user) => user.username.as_deref() == Some(name),
            })
            .cloned()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn forward_messages(
        &self,
        target: ChatId,
        source: ChatId,
        message_ids: &[MessageId],
        disable_notification: bool,
    ) -> PlatformResult<()> {
        self.forwards.lock().unwrap().push(ForwardCall {
            target,
            source,
            ids: message_ids.to_vec(),
            disable_notification,
            at: Instant::now(),
        });
        if let Some(err) = self.scripted_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        if self.failing_targets.lock().unwrap().contains(&target) {
            return Err(PlatformError::Forbidden(format!("cannot write to {}", target)));
        }
        Ok(())
    }

    async fn get_media_group(
        &self,
        source: ChatId,
        message_id: MessageId,
    ) -> PlatformResult<Vec<RelayMessage>> {
        self.media_group_requests
            .lock()
            .unwrap()
            .push((source, message_id));
        self.media_groups
            .lock()
            .unwrap()
            .get(&source)
            .and_then(|groups| {
                groups
                    .iter()
                    .find(|members| members.iter().any(|m| m.id == message_id))
                    .cloned()
            })
            .ok_or_else(|| PlatformError::NotFound(format!("media group of {}", message_id)))
    }

    async fn resolve_peer(&self, reference: &str, current_chat: ChatId) -> PlatformResult<Peer> {
        self.peer_by_reference(reference, current_chat)
            .ok_or_else(|| PlatformError::NotFound(reference.to_string()))
    }

    async fn get_peer(&self, id: i64, _target_type: TargetType) -> PlatformResult<Peer> {
        self.peers
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(id.to_string()))
    }

    async fn chat_history(&self, source: ChatId) -> PlatformResult<Vec<RelayMessage>> {
        self.history
            .lock()
            .unwrap()
            .get(&source)
            .cloned()
            .ok_or(PlatformError::Unsupported("chat history"))
    }

    async fn send_message(&self, chat: ChatId, text: &str) -> PlatformResult<MessageId> {
        let mut sent = self.sent.lock().unwrap();
        sent.push((chat, text.to_string()));
        Ok(1000 + sent.len() as MessageId)
    }

    async fn edit_message(
        &self,
        chat: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> PlatformResult<()> {
        self.edits
            .lock()
            .unwrap()
            .push((chat, message_id, text.to_string()));
        Ok(())
    }
}

pub fn channel(id: ChatId, username: &str) -> Chat {
    let mut chat = Chat::new(id, ChatKind::Channel);
    chat.title = Some(username.to_uppercase());
    chat.username = Some(username.to_string());
    chat
}

pub fn private_chat(id: ChatId) -> Chat {
    let mut chat = Chat::new(id, ChatKind::Private);
    chat.first_name = Some("Operator".to_string());
    chat
}

pub fn user(id: i64, username: &str) -> User {
    User {
        id,
        username: Some(username.to_string()),
        first_name: Some(username.to_string()),
        last_name: None,
        is_bot: false,
    }
}

pub fn text_message(chat: &Chat, id: MessageId, text: &str) -> RelayMessage {
    RelayMessage {
        id,
        chat: chat.clone(),
        sender: None,
        text: Some(text.to_string()),
        media: None,
        media_group_id: None,
        is_forwarded: false,
        has_protected_content: false,
        date: Utc::now(),
    }
}

pub fn media_message(chat: &Chat, id: MessageId, kind: MediaKind) -> RelayMessage {
    RelayMessage {
        text: None,
        media: Some(kind),
        ..text_message(chat, id, "")
    }
}

pub fn album_member(chat: &Chat, id: MessageId, kind: MediaKind, group: &str) -> RelayMessage {
    RelayMessage {
        media_group_id: Some(group.to_string()),
        ..media_message(chat, id, kind)
    }
}

/// A command typed by `sender` in a private chat with the bot.
pub fn command(chat: &Chat, sender: &User, text: &str) -> RelayMessage {
    RelayMessage {
        sender: Some(sender.clone()),
        ..text_message(chat, 1, text)
    }
}

pub struct Harness {
    pub platform: Arc<MockPlatform>,
    pub kv: Arc<InMemoryKvStore>,
    pub rules: RuleStore,
    pub stats: StatsRepository,
    pub config: Arc<RelayConfig>,
    pub engine: Arc<ForwardingEngine>,
    pub batches: Arc<BatchScheduler>,
}

impl Harness {
    pub fn new(platform: Arc<MockPlatform>) -> Self {
        Self::with_config(platform, RelayConfig::default())
    }

    pub fn with_config(platform: Arc<MockPlatform>, config: RelayConfig) -> Self {
        let kv = Arc::new(InMemoryKvStore::new());
        let rules = RuleStore::new(kv.clone());
        let stats = StatsRepository::new(kv.clone());
        let config = Arc::new(config);
        let engine = Arc::new(ForwardingEngine::new(
            platform.clone(),
            rules.clone(),
            stats.clone(),
            config.clone(),
        ));
        let batches = Arc::new(BatchScheduler::new(engine.clone()));
        Self {
            platform,
            kv,
            rules,
            stats,
            config,
            engine,
            batches,
        }
    }
}
