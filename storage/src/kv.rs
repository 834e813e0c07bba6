//! Key-value store abstraction.
//!
//! Records are JSON strings under dotted keys (`shift.<source>`, `shift.stats.<source>.<date>`).
//! [`KvStore::scan_prefix`] returns entries in lexicographic key order; rule indices shown to
//! users depend on that order being stable.

use crate::error::StorageError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    /// Inserts or replaces the value under `key`.
    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Returns whether a value was removed.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;
    /// All entries whose key starts with `prefix`, ordered by key.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StorageError>;
    /// Removes all entries whose key starts with `prefix`; returns how many.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, StorageError>;
}

/// Process-local store backed by a `BTreeMap`. Used in tests and for dry runs.
#[derive(Default)]
pub struct InMemoryKvStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StorageError> {
        let entries = self.entries.read().await;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, StorageError> {
        let mut entries = self.entries.write().await;
        let keys: Vec<String> = entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &keys {
            entries.remove(key);
        }
        Ok(keys.len() as u64)
    }
}

/// Smallest string greater than every string starting with `prefix`, for range scans.
/// `None` when no such bound exists (empty prefix or only `char::MAX`).
pub(crate) fn prefix_upper_bound(prefix: &str) -> Option<String> {
    let mut chars: Vec<char> = prefix.chars().collect();
    while let Some(last) = chars.pop() {
        if let Some(next) = char::from_u32(last as u32 + 1) {
            chars.push(next);
            return Some(chars.into_iter().collect());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_upper_bound() {
        assert_eq!(prefix_upper_bound("shift.").as_deref(), Some("shift/"));
        assert_eq!(prefix_upper_bound("a").as_deref(), Some("b"));
        assert_eq!(prefix_upper_bound(""), None);
    }

    #[tokio::test]
    async fn test_in_memory_scan_is_ordered_and_bounded() {
        let kv = InMemoryKvStore::new();
        kv.put("shift.2", "b").await.unwrap();
        kv.put("shift.-1", "a").await.unwrap();
        kv.put("shiftx", "x").await.unwrap();
        kv.put("other.1", "o").await.unwrap();

        let entries = kv.scan_prefix("shift.").await.unwrap();
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["shift.-1", "shift.2"]);
    }

    #[tokio::test]
    async fn test_in_memory_delete_prefix() {
        let kv = InMemoryKvStore::new();
        kv.put("shift.stats.1.2024-01-01", "{}").await.unwrap();
        kv.put("shift.stats.1.2024-01-02", "{}").await.unwrap();
        kv.put("shift.stats.10.2024-01-01", "{}").await.unwrap();

        assert_eq!(kv.delete_prefix("shift.stats.1.").await.unwrap(), 2);
        assert!(kv.get("shift.stats.10.2024-01-01").await.unwrap().is_some());
        assert!(!kv.delete("shift.stats.1.2024-01-01").await.unwrap());
    }
}
