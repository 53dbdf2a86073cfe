//! Database request/response models for the repositories.
//!
//! These structures map table rows and insertion payloads. They are distinct
//! from the API-facing models in [`crate::api::models`], which adapt form
//! submissions into these types.

pub mod armory;
pub mod file_storage;
pub mod garage;
pub mod humidor;
pub mod users;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lifecycle status shared by the root asset entities.
///
/// `Active` is the live state. `Empty` is reached only by cigars whose
/// quantity hits zero. The remaining values are the terminal disposal
/// states; disposal never deletes the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Active,
    Sold,
    Donated,
    Discarded,
    Empty,
}

impl AssetStatus {
    /// Whether this status is a valid target for a user-requested disposal.
    pub fn is_disposal(self) -> bool {
        matches!(self, AssetStatus::Sold | AssetStatus::Donated | AssetStatus::Discarded)
    }
}

/// Disposal request applied to any root entity.
#[derive(Debug, Clone)]
pub struct DisposalRequest {
    pub status: AssetStatus,
    pub disposed_on: NaiveDate,
    pub sale_value: Option<f64>,
}
