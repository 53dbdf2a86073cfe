//! Database models for the garage domain: vehicles, maintenance logs, alerts.

use crate::db::models::AssetStatus;
use crate::types::{AlertId, MaintenanceLogId, UserId, VehicleId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct VehicleCreateDBRequest {
    pub name: String,
    pub make: String,
    pub model: String,
    pub year: i64,
    pub plate: String,
    pub odometer_km: i64,
    pub monthly_km_estimate: i64,
    pub estimated_value: f64,
    pub photo_path: Option<String>,
}

/// Full-field overwrite of the mutable vehicle attributes.
///
/// `photo_path` is `None` when no new photo was uploaded, which keeps the
/// stored one.
#[derive(Debug, Clone)]
pub struct VehicleUpdateDBRequest {
    pub name: String,
    pub make: String,
    pub model: String,
    pub year: i64,
    pub plate: String,
    pub odometer_km: i64,
    pub estimated_value: f64,
    pub photo_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VehicleDBResponse {
    pub id: VehicleId,
    pub user_id: UserId,
    pub name: String,
    pub make: String,
    pub model: String,
    pub year: i64,
    pub plate: String,
    pub odometer_km: i64,
    pub monthly_km_estimate: i64,
    pub estimated_value: f64,
    pub photo_path: Option<String>,
    pub status: AssetStatus,
    pub disposed_on: Option<NaiveDate>,
    pub sale_value: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// A logged service event. Side effects (odometer advance, alert
/// supersession) are applied by the repository in the same transaction.
#[derive(Debug, Clone)]
pub struct ServiceLogCreateDBRequest {
    pub performed_on: NaiveDate,
    pub odometer_km: i64,
    pub description: String,
    pub cost: f64,
    pub notes: Option<String>,
    pub receipt_path: Option<String>,
    /// When set (> 0), supersedes active alerts of the same kind and plants
    /// a new one at `odometer_km + interval_km`.
    pub interval_km: Option<i64>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MaintenanceLogDBResponse {
    pub id: MaintenanceLogId,
    pub vehicle_id: VehicleId,
    pub performed_on: NaiveDate,
    pub odometer_km: i64,
    pub description: String,
    pub cost: f64,
    pub notes: Option<String>,
    pub receipt_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AlertDBResponse {
    pub id: AlertId,
    pub vehicle_id: VehicleId,
    pub kind: String,
    pub threshold_km: i64,
    pub active: bool,
}
