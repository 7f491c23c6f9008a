//! Operator state persistence
//!
//! The tracked operator ID is a single JSON document `{"operator": "..."}`
//! on disk. A missing file means no operator has been configured yet, which
//! is a normal state rather than an error. Writes go through a temp file and
//! an atomic rename so a concurrent reader never sees a partial document.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("state file is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// On-disk state document
#[derive(Debug, Serialize, Deserialize)]
struct StateDoc {
    operator: String,
}

/// Persists the currently tracked operator ID across restarts
#[derive(Debug, Clone)]
pub struct OperatorStore {
    path: PathBuf,
}

impl OperatorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted operator ID. `Ok(None)` means no operator has been
    /// saved yet; a present but undecodable file is an error.
    pub async fn load(&self) -> Result<Option<String>, StoreError> {
        match fs::read(&self.path).await {
            Ok(bytes) => {
                let doc: StateDoc = serde_json::from_slice(&bytes)?;
                Ok(Some(doc.operator))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrite the persisted operator ID. Temp file then atomic rename.
    pub async fn save(&self, operator: &str) -> Result<(), StoreError> {
        let body = serde_json::to_vec(&StateDoc {
            operator: operator.to_string(),
        })?;

        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, &body).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (OperatorStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = OperatorStore::new(temp_dir.path().join("operator.json"));
        (store, temp_dir)
    }

    #[tokio::test]
    async fn load_without_prior_state_is_unset() {
        let (store, _temp) = test_store();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, None);
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let (store, _temp) = test_store();
        store.save("0xABC").await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.as_deref(), Some("0xABC"));
    }

    #[tokio::test]
    async fn save_twice_is_idempotent() {
        let (store, _temp) = test_store();
        store.save("op-1").await.unwrap();
        store.save("op-1").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("op-1"));
    }

    #[tokio::test]
    async fn save_overwrites_previous_value() {
        let (store, _temp) = test_store();
        store.save("old").await.unwrap();
        store.save("new").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn garbled_file_is_an_error() {
        let (store, _temp) = test_store();
        tokio::fs::write(store.path(), b"{not json").await.unwrap();
        assert!(matches!(store.load().await, Err(StoreError::Malformed(_))));
    }

    #[tokio::test]
    async fn no_temp_file_left_behind() {
        let (store, temp) = test_store();
        store.save("op-2").await.unwrap();
        let entries: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("operator.json")]);
    }
}
