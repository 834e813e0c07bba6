//! Persisted record schemas.

mod rule;
mod stats_record;

pub use rule::Rule;
pub use stats_record::StatsRecord;
