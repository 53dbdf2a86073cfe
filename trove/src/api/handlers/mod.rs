//! HTTP request handlers for all endpoints.
//!
//! Handlers validate input, resolve the current user, call into the
//! repositories, and answer with a redirect (mutations) or JSON (reads).
//! Ownership failures surface as 404 - never as a distinct "forbidden".
//!
//! - [`auth`]: registration, login/logout, profile updates
//! - [`garage`]: vehicles, service logs, odometer, mileage alerts
//! - [`armory`]: guns, accessories, range sessions
//! - [`humidor`]: cigars, smoking sessions, images, community catalog
//! - [`analytics`]: cross-domain per-user aggregates
//! - [`billing`]: payment provider proxy and inbound webhooks

pub mod analytics;
pub mod armory;
pub mod auth;
pub mod billing;
pub mod forms;
pub mod garage;
pub mod humidor;

use crate::db::models::file_storage::FileStorageRequest;
use crate::errors::Result;
use crate::AppState;
use forms::UploadedFile;

/// Store one uploaded file in the blob store and hand back the persisted
/// relative path.
pub(crate) async fn store_upload(state: &AppState, folder: &str, prefix: &str, file: UploadedFile) -> Result<String> {
    let response = state
        .file_storage
        .store(
            folder,
            prefix,
            FileStorageRequest {
                filename: file.filename,
                content: file.content,
            },
        )
        .await?;
    Ok(response.storage_key)
}
