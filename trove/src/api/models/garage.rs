//! API request/response models for the garage domain.

use crate::db::models::garage::{AlertDBResponse, MaintenanceLogDBResponse, VehicleDBResponse};
use crate::api::models::analytics::GarageStats;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OdometerForm {
    pub new_km: i64,
}

/// Garage landing view: the active fleet plus its headline numbers.
#[derive(Debug, Serialize)]
pub struct GarageIndexResponse {
    pub vehicles: Vec<VehicleDBResponse>,
    pub stats: GarageStats,
}

/// Vehicle detail view: the root entity with its service history and alerts.
#[derive(Debug, Serialize)]
pub struct VehicleDetailResponse {
    pub vehicle: VehicleDBResponse,
    pub maintenance: Vec<MaintenanceLogDBResponse>,
    pub alerts: Vec<AlertDBResponse>,
}
