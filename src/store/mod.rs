//! Persisted-sets storage backends.
//!
//! The previous generation's mapping is read once at startup (to diff
//! against) and overwritten once the new mapping is ready.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::parser::SetsParseError;
use crate::types::FlattenedSets;

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No storage directory was configured.
    #[error("No storage directory configured")]
    NoDirectory,
    /// Reading or writing the persisted file failed.
    #[error("I/O error on {path:?}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The persisted contents could not be parsed.
    #[error("Corrupt persisted sets: {0}")]
    Corrupt(#[from] SetsParseError),
    /// The mapping could not be serialized.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Trait for persisted-sets backends.
#[async_trait]
pub trait SetsStore: Send + Sync {
    /// Load the previously persisted mapping.
    ///
    /// `Ok(None)` means nothing has been persisted yet.
    async fn load(&self) -> Result<Option<FlattenedSets>, StoreError>;

    /// Overwrite the persisted mapping.
    async fn save(&self, sets: &FlattenedSets) -> Result<(), StoreError>;
}

pub use file::FileSetsStore;
pub use memory::InMemorySetsStore;
