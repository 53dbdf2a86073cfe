//! Database models for the armory domain: guns, accessories, range sessions.

use crate::db::models::AssetStatus;
use crate::types::{AccessoryId, GunId, RangeSessionId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct GunCreateDBRequest {
    pub nickname: String,
    pub make: String,
    pub model: String,
    pub caliber: String,
    pub base_price: f64,
    pub total_rounds: i64,
    pub photo_path: Option<String>,
    pub invoice_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GunUpdateDBRequest {
    pub nickname: String,
    pub make: String,
    pub model: String,
    pub caliber: String,
    pub base_price: f64,
    pub photo_path: Option<String>,
    pub invoice_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GunDBResponse {
    pub id: GunId,
    pub user_id: UserId,
    pub nickname: String,
    pub make: String,
    pub model: String,
    pub caliber: String,
    pub total_rounds: i64,
    pub base_price: f64,
    pub photo_path: Option<String>,
    pub invoice_path: Option<String>,
    pub status: AssetStatus,
    pub disposed_on: Option<NaiveDate>,
    pub sale_value: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AccessoryCreateDBRequest {
    pub kind: String,
    pub brand: String,
    pub model: String,
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AccessoryDBResponse {
    pub id: AccessoryId,
    pub gun_id: GunId,
    pub kind: String,
    pub brand: String,
    pub model: String,
    pub cost: f64,
}

/// A logged range trip. The parent gun's cumulative round count is advanced
/// by `rounds_fired` in the same transaction.
#[derive(Debug, Clone)]
pub struct RangeSessionCreateDBRequest {
    pub fired_on: NaiveDate,
    pub location: String,
    pub rounds_fired: i64,
    pub ammo_brand: String,
    pub ammo_grain: i64,
    pub failure_count: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RangeSessionDBResponse {
    pub id: RangeSessionId,
    pub gun_id: GunId,
    pub fired_on: NaiveDate,
    pub location: String,
    pub rounds_fired: i64,
    pub ammo_brand: String,
    pub ammo_grain: i64,
    pub failure_count: i64,
    pub notes: Option<String>,
}
