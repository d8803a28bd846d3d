//! Record Store
//!
//! Rows that point at stored images, and a JSON file implementation used by
//! the command line tools.

use std::path::PathBuf;
use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::sync::RwLock;

use crate::models::ImageRecord;

/// Record store error
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid record data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Record update failed: {0}")]
    UpdateFailed(String),
}

/// Owner of image pointers (books, authors, hero slides, posts)
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All records that reference a stored image
    async fn list(&self) -> Result<Vec<ImageRecord>, RecordError>;

    /// Point a record at a new object
    async fn update_image(&self, id: &str, path: &str, url: &str) -> Result<(), RecordError>;
}

/// Records kept in a JSON array on disk
pub struct JsonRecordStore {
    path: PathBuf,
    records: RwLock<Vec<ImageRecord>>,
}

impl JsonRecordStore {
    /// Load records from `path`; a missing file is an empty store
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, RecordError> {
        let path = path.into();

        let records = match fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    /// Replace the contents and write them out
    pub async fn replace_all(&self, records: Vec<ImageRecord>) -> Result<(), RecordError> {
        let mut current = self.records.write().await;
        *current = records;
        self.persist(&current).await
    }

    pub async fn get(&self, id: &str) -> Option<ImageRecord> {
        self.records.read().await.iter().find(|r| r.id == id).cloned()
    }

    async fn persist(&self, records: &[ImageRecord]) -> Result<(), RecordError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_string_pretty(records)?;
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, content).await?;
        fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonRecordStore {
    async fn list(&self) -> Result<Vec<ImageRecord>, RecordError> {
        Ok(self.records.read().await.clone())
    }

    async fn update_image(&self, id: &str, path: &str, url: &str) -> Result<(), RecordError> {
        let mut records = self.records.write().await;

        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RecordError::NotFound(id.to_string()))?;

        record.path = path.to_string();
        record.url = url.to_string();
        record.updated_at = Some(Utc::now());

        self.persist(&records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PresetName;
    use tempfile::tempdir;

    fn record(id: &str) -> ImageRecord {
        ImageRecord {
            id: id.to_string(),
            preset: PresetName::BookCover,
            path: format!("book-covers/{}.jpg", id),
            url: format!("/media/book-covers/{}.jpg", id),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = JsonRecordStore::open(dir.path().join("records.json")).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");

        let store = JsonRecordStore::open(&path).await.unwrap();
        store.replace_all(vec![record("b1"), record("b2")]).await.unwrap();
        store
            .update_image("b2", "book-covers/new.webp", "/media/book-covers/new.webp")
            .await
            .unwrap();

        let reopened = JsonRecordStore::open(&path).await.unwrap();
        let updated = reopened.get("b2").await.unwrap();
        assert_eq!(updated.path, "book-covers/new.webp");
        assert_eq!(updated.url, "/media/book-covers/new.webp");
        assert!(updated.updated_at.is_some());
        assert_eq!(reopened.get("b1").await.unwrap(), record("b1"));
    }

    #[tokio::test]
    async fn test_update_unknown_record() {
        let dir = tempdir().unwrap();
        let store = JsonRecordStore::open(dir.path().join("records.json")).await.unwrap();
        assert!(matches!(
            store.update_image("missing", "a", "b").await,
            Err(RecordError::NotFound(_))
        ));
    }
}
