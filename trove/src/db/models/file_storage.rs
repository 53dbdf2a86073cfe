//! Models for the blob store.

/// Request to store one uploaded file.
#[derive(Debug, Clone)]
pub struct FileStorageRequest {
    /// Original filename as submitted by the client; its extension is kept
    /// on the stored file.
    pub filename: String,
    pub content: Vec<u8>,
}

/// Response from storing a file.
#[derive(Debug, Clone)]
pub struct FileStorageResponse {
    /// Relative path of the stored file; the only handle that gets persisted.
    pub storage_key: String,
}
