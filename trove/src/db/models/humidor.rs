//! Database models for the humidor domain: cigars, smoking sessions, images.

use crate::db::models::AssetStatus;
use crate::types::{CigarId, SmokingSessionId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Default)]
pub struct CigarCreateDBRequest {
    pub brand: String,
    pub line: String,
    pub vitola: Option<String>,
    pub format: Option<String>,
    pub wrapper: Option<String>,
    pub wrapper_color: Option<String>,
    pub origin: Option<String>,
    pub length_in: Option<f64>,
    pub ring_gauge: Option<i64>,
    pub quantity: i64,
    pub price_paid: f64,
    pub purchase_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CigarUpdateDBRequest {
    pub brand: String,
    pub line: String,
    pub vitola: Option<String>,
    pub format: Option<String>,
    pub wrapper: Option<String>,
    pub wrapper_color: Option<String>,
    pub origin: Option<String>,
    pub length_in: Option<f64>,
    pub ring_gauge: Option<i64>,
    pub quantity: i64,
    pub price_paid: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CigarDBResponse {
    pub id: CigarId,
    pub user_id: UserId,
    pub brand: String,
    pub line: String,
    pub vitola: Option<String>,
    pub format: Option<String>,
    pub wrapper: Option<String>,
    pub wrapper_color: Option<String>,
    pub origin: Option<String>,
    pub length_in: Option<f64>,
    pub ring_gauge: Option<i64>,
    pub quantity: i64,
    pub price_paid: f64,
    pub purchase_date: Option<NaiveDate>,
    pub aging_since: Option<NaiveDate>,
    pub notes: Option<String>,
    pub status: AssetStatus,
    pub disposed_on: Option<NaiveDate>,
    pub sale_value: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// A logged smoking session. Decrements the parent cigar's quantity by one
/// (floored at zero) in the same transaction; the status flips to `empty`
/// exactly when the quantity reaches zero.
#[derive(Debug, Clone, Default)]
pub struct SmokingSessionCreateDBRequest {
    pub smoked_on: NaiveDate,
    pub duration_minutes: Option<i64>,
    pub pairing: Option<String>,
    pub rating_construction: Option<i64>,
    pub rating_draw: Option<i64>,
    pub rating_flavor: Option<i64>,
    pub rating_overall: i64,
    pub strength_profile: Option<String>,
    pub tasting_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SmokingSessionDBResponse {
    pub id: SmokingSessionId,
    pub cigar_id: CigarId,
    pub smoked_on: NaiveDate,
    pub duration_minutes: Option<i64>,
    pub pairing: Option<String>,
    pub rating_construction: Option<i64>,
    pub rating_draw: Option<i64>,
    pub rating_flavor: Option<i64>,
    pub rating_overall: i64,
    pub strength_profile: Option<String>,
    pub tasting_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CigarImageDBResponse {
    pub id: i64,
    pub cigar_id: CigarId,
    pub path: String,
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SessionImageDBResponse {
    pub id: i64,
    pub session_id: SmokingSessionId,
    pub path: String,
}

/// One community-catalog entry: a distinct (brand, line, vitola) triple seen
/// across all users, with averaged dimensions and how many humidors carry it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CatalogEntry {
    pub brand: String,
    pub line: String,
    pub vitola: Option<String>,
    pub format: Option<String>,
    pub wrapper: Option<String>,
    pub wrapper_color: Option<String>,
    pub origin: Option<String>,
    pub length_in: Option<f64>,
    pub ring_gauge: Option<f64>,
    pub popularity: i64,
}

/// Distinct attribute values for form autocomplete.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogOptions {
    pub brands: Vec<String>,
    pub lines: Vec<String>,
    pub vitolas: Vec<String>,
    pub origins: Vec<String>,
    pub wrappers: Vec<String>,
}
