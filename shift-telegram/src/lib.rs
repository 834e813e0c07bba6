//! # shift-telegram
//!
//! Telegram layer for the relay: [`TelegramPlatform`] implements [`shift_core::Platform`] on top
//! of teloxide, adapters turn teloxide updates into [`shift_core::RelayMessage`], and the runner
//! drives the relay's handler chain from a dispatcher listening to messages and channel posts.

mod adapters;
mod album_cache;
mod bot_adapter;
mod config;
mod runner;

pub use adapters::{chat_from_json, peer_from_json, TelegramMessageWrapper, TelegramUserWrapper};
pub use album_cache::{AlbumCache, RecentPosts};
pub use bot_adapter::{map_request_error, TelegramPlatform};
pub use config::TelegramConfig;
pub use runner::run_dispatcher;
