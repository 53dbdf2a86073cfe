//! Blob store for uploaded files.
//!
//! Files land under a domain-specific subdirectory with a generated unique
//! filename that keeps the original extension; the returned relative path is
//! the only handle the database ever holds.

use crate::db::{
    errors::{DbError, Result},
    models::file_storage::{FileStorageRequest, FileStorageResponse},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Trait for file storage backends
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store file content under `folder` and return the storage key
    async fn store(&self, folder: &str, prefix: &str, request: FileStorageRequest) -> Result<FileStorageResponse>;

    /// Retrieve file content using the storage key
    async fn retrieve(&self, storage_key: &str) -> Result<Vec<u8>>;

    /// Delete file content using the storage key
    async fn delete(&self, storage_key: &str) -> Result<()>;

    /// Check if a file exists using the storage key
    async fn exists(&self, storage_key: &str) -> Result<bool>;
}

/// Local filesystem storage backend - stores files in a directory tree
pub struct LocalFileStorage {
    base_path: PathBuf,
}

impl LocalFileStorage {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn resolve(&self, storage_key: &str) -> Result<PathBuf> {
        // Storage keys are server-generated, but never follow one that
        // escapes the base directory.
        let relative = Path::new(storage_key);
        if relative.components().any(|c| matches!(c, std::path::Component::ParentDir)) || relative.is_absolute() {
            return Err(DbError::Other(anyhow::anyhow!("Invalid storage key: {storage_key}")));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn store(&self, folder: &str, prefix: &str, request: FileStorageRequest) -> Result<FileStorageResponse> {
        let extension = Path::new(&request.filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");

        let relative_path = format!("{folder}/{prefix}{}.{extension}", Uuid::new_v4());
        let full_path = self.base_path.join(&relative_path);

        // Ensure parent directory exists
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(anyhow::Error::from)?;
        }

        // Write file
        let mut file = fs::File::create(&full_path).await.map_err(anyhow::Error::from)?;
        file.write_all(&request.content).await.map_err(anyhow::Error::from)?;
        file.sync_all().await.map_err(anyhow::Error::from)?;

        Ok(FileStorageResponse {
            storage_key: relative_path,
        })
    }

    async fn retrieve(&self, storage_key: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve(storage_key)?;

        if !full_path.exists() {
            return Err(DbError::NotFound);
        }

        let content = fs::read(&full_path).await.map_err(anyhow::Error::from)?;
        Ok(content)
    }

    async fn delete(&self, storage_key: &str) -> Result<()> {
        let full_path = self.resolve(storage_key)?;

        if full_path.exists() {
            fs::remove_file(&full_path).await.map_err(anyhow::Error::from)?;
        }

        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> Result<bool> {
        let full_path = self.resolve(storage_key)?;
        Ok(full_path.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(filename: &str, content: &[u8]) -> FileStorageRequest {
        FileStorageRequest {
            filename: filename.to_string(),
            content: content.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_local_storage_lifecycle() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(temp_dir.path().to_path_buf());

        let response = storage.store("cars", "car_", request("front.jpg", b"jpeg bytes")).await.unwrap();
        assert!(response.storage_key.starts_with("cars/car_"));
        assert!(response.storage_key.ends_with(".jpg"));

        assert!(storage.exists(&response.storage_key).await.unwrap());
        assert_eq!(storage.retrieve(&response.storage_key).await.unwrap(), b"jpeg bytes");

        storage.delete(&response.storage_key).await.unwrap();
        assert!(!storage.exists(&response.storage_key).await.unwrap());
    }

    #[tokio::test]
    async fn test_unique_names_per_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(temp_dir.path().to_path_buf());

        let a = storage.store("cigars", "cigar_", request("band.png", b"a")).await.unwrap();
        let b = storage.store("cigars", "cigar_", request("band.png", b"b")).await.unwrap();
        assert_ne!(a.storage_key, b.storage_key);
    }

    #[tokio::test]
    async fn test_missing_extension_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(temp_dir.path().to_path_buf());

        let response = storage.store("receipts", "nf_", request("receipt", b"pdfish")).await.unwrap();
        assert!(response.storage_key.ends_with(".bin"));
    }

    #[tokio::test]
    async fn test_retrieve_nonexistent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(temp_dir.path().to_path_buf());

        let result = storage.retrieve("cars/missing.jpg").await;
        assert!(matches!(result, Err(DbError::NotFound)));
    }

    #[tokio::test]
    async fn test_traversal_keys_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(temp_dir.path().to_path_buf());

        assert!(storage.retrieve("../outside.txt").await.is_err());
    }
}
