//! API request and response data models.
//!
//! Form submissions deserialize into the request types here and are adapted
//! into the database models in [`crate::db::models`]; responses either wrap
//! database rows or are assembled composites (detail views, stats).

pub mod analytics;
pub mod armory;
pub mod auth;
pub mod garage;
pub mod humidor;
pub mod users;

use crate::db::models::AssetStatus;
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Query parameters shared by the list endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListQuery {
    /// Include disposed (and empty) entities as well
    #[serde(default)]
    pub include_all: bool,
}

/// Disposal form shared by the three asset domains.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DisposalForm {
    pub status: AssetStatus,
    pub disposed_on: NaiveDate,
    pub sale_value: Option<f64>,
}
