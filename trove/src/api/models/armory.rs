//! API request/response models for the armory domain.

use crate::api::models::analytics::ArmoryStats;
use crate::db::models::armory::{AccessoryDBResponse, GunDBResponse, RangeSessionDBResponse};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AccessoryForm {
    pub kind: String,
    pub brand: String,
    pub model: String,
    #[serde(default)]
    pub cost: f64,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RangeSessionForm {
    pub fired_on: NaiveDate,
    pub location: String,
    pub rounds_fired: i64,
    pub ammo_brand: String,
    pub ammo_grain: i64,
    #[serde(default)]
    pub failure_count: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ArmoryIndexResponse {
    pub guns: Vec<GunDBResponse>,
    pub stats: ArmoryStats,
}

#[derive(Debug, Serialize)]
pub struct GunDetailResponse {
    pub gun: GunDBResponse,
    pub accessories: Vec<AccessoryDBResponse>,
    pub sessions: Vec<RangeSessionDBResponse>,
}
