//! # shift-core
//!
//! Core types for the shift relay: [`RelayMessage`], [`Peer`], [`OptionSet`], the [`Platform`]
//! seam, the error taxonomy, and tracing initialization. Transport-agnostic; used by storage,
//! relay and shift-telegram.

pub mod error;
pub mod logger;
pub mod options;
pub mod platform;
pub mod types;

pub use error::{PlatformError, Result, ShiftError, ValidationError};
pub use logger::init_tracing;
pub use options::{OptionSet, RelayOption};
pub use platform::{Platform, PlatformResult};
pub use types::{
    Chat, ChatId, ChatKind, MediaKind, MessageId, Peer, RelayMessage, StatusMessage, TargetType,
    User, TEXT_TAG,
};
