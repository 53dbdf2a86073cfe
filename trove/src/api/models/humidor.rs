//! API request/response models for the humidor domain.

use crate::api::models::analytics::HumidorStats;
use crate::db::models::humidor::{CatalogEntry, CatalogOptions, CigarDBResponse, CigarImageDBResponse, SmokingSessionDBResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Copying a community catalog entry into the caller's humidor. Stock starts
/// at zero; the user sets quantity and price when they actually buy.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CatalogAddForm {
    pub brand: String,
    pub line: String,
    pub vitola: Option<String>,
    pub format: Option<String>,
    pub wrapper: Option<String>,
    pub wrapper_color: Option<String>,
    pub origin: Option<String>,
    pub length_in: Option<f64>,
    pub ring_gauge: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HumidorIndexResponse {
    pub cigars: Vec<CigarDBResponse>,
    pub stats: HumidorStats,
    pub options: CatalogOptions,
}

#[derive(Debug, Serialize)]
pub struct CigarDetailResponse {
    pub cigar: CigarDBResponse,
    pub sessions: Vec<SmokingSessionDBResponse>,
    pub images: Vec<CigarImageDBResponse>,
}

#[derive(Debug, Serialize)]
pub struct CommunityResponse {
    pub cigars: Vec<CatalogEntry>,
}
