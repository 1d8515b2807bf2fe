//! File-backed persisted-sets store.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::{SetsStore, StoreError};
use crate::parser::{deserialize_persisted_sets, serialize_persisted_sets};
use crate::types::FlattenedSets;
use crate::PERSISTED_SETS_FILE_NAME;

/// Stores the mapping as JSON in `<dir>/persisted_first_party_sets.json`.
#[derive(Debug, Clone)]
pub struct FileSetsStore {
    dir: PathBuf,
}

impl FileSetsStore {
    /// Create a store rooted at `dir`. The directory is not created.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Full path of the persisted file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(PERSISTED_SETS_FILE_NAME)
    }

    fn check_dir(&self) -> Result<(), StoreError> {
        if self.dir.as_os_str().is_empty() {
            return Err(StoreError::NoDirectory);
        }
        Ok(())
    }
}

#[async_trait]
impl SetsStore for FileSetsStore {
    async fn load(&self) -> Result<Option<FlattenedSets>, StoreError> {
        self.check_dir()?;
        let path = self.path();

        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        Ok(Some(deserialize_persisted_sets(&contents)?))
    }

    async fn save(&self, sets: &FlattenedSets) -> Result<(), StoreError> {
        self.check_dir()?;
        let path = self.path();
        let contents = serialize_persisted_sets(sets)?;

        // Write-then-rename so readers never see a torn file.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents.as_bytes())
            .await
            .map_err(|source| StoreError::Io { path: tmp.clone(), source })?;
        if let Err(source) = tokio::fs::rename(&tmp, &path).await {
            if let Err(e) = tokio::fs::remove_file(&tmp).await {
                tracing::debug!(
                    target: "first_party_sets::store",
                    path = %tmp.display(),
                    error = %e,
                    "failed to remove temporary file"
                );
            }
            return Err(StoreError::Io { path, source });
        }

        Ok(())
    }
}
