//! In-memory persisted-sets store for testing.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{SetsStore, StoreError};
use crate::parser::{deserialize_persisted_sets, serialize_persisted_sets};
use crate::types::FlattenedSets;

/// In-memory store for testing.
///
/// Keeps the serialized JSON text so loads go through the same
/// deserialization as the file store.
#[derive(Debug, Default)]
pub struct InMemorySetsStore {
    contents: Mutex<Option<String>>,
    saves: Mutex<usize>,
}

impl InMemorySetsStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with raw persisted text.
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
            saves: Mutex::new(0),
        }
    }

    /// Current raw persisted text, if any.
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

#[async_trait]
impl SetsStore for InMemorySetsStore {
    async fn load(&self) -> Result<Option<FlattenedSets>, StoreError> {
        let contents = self.contents.lock().clone();
        match contents {
            Some(text) => Ok(Some(deserialize_persisted_sets(&text)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, sets: &FlattenedSets) -> Result<(), StoreError> {
        let text = serialize_persisted_sets(sets)?;
        *self.contents.lock() = Some(text);
        *self.saves.lock() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SingleSet, Site};

    #[tokio::test]
    async fn test_empty_store_loads_none() {
        let store = InMemorySetsStore::new();
        assert!(store.load().await.unwrap().is_none());
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = InMemorySetsStore::with_contents("{}");
        assert_eq!(store.load().await.unwrap(), Some(FlattenedSets::new()));

        let sets = FlattenedSets::from_sets(&[SingleSet::new(
            Site::parse("https://example.test").unwrap(),
            vec![Site::parse("https://member1.test").unwrap()],
        )]);
        store.save(&sets).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(sets));
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_contents() {
        let store = InMemorySetsStore::with_contents("[1, 2]");
        assert!(matches!(store.load().await, Err(StoreError::Corrupt(_))));
    }
}
