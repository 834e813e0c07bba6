//! Storage crate: persistence for the shift relay.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`kv`] – KvStore trait and the in-memory backend
//! - [`sqlite_kv`] – SqliteKvStore (sqlx)
//! - [`models`] – Rule, StatsRecord
//! - [`rule_store`] – RuleStore, RuleSlot, RuleGraph
//! - [`stats_repo`] – StatsRepository
//! - [`sqlite_pool`] – SqlitePoolManager

mod error;
mod kv;
mod models;
mod rule_store;
mod sqlite_kv;
mod sqlite_pool;
mod stats_repo;


pub use error::StorageError;
pub use kv::{InMemoryKvStore, KvStore};
pub use models::{Rule, StatsRecord};
pub use rule_store::{rule_key, RuleGraph, RuleSlot, RuleStore, RULE_PREFIX};
pub use sqlite_kv::SqliteKvStore;
pub use sqlite_pool::SqlitePoolManager;
pub use stats_repo::{stats_key, DailyStats, SourceStats, StatsRepository, STATS_PREFIX};
