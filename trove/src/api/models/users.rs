//! API request/response models for users.

use crate::db::models::users::UserDBResponse;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The authenticated caller, re-resolved from the database on every request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_path: Option<String>,
    pub subscription_status: String,
    /// Remote payment customer id, if billing has been touched.
    /// Never exposed in responses; used by the billing handlers.
    #[serde(skip_serializing)]
    pub payment_customer_id: Option<String>,
}

impl From<UserDBResponse> for CurrentUser {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            email: db.email,
            display_name: db.display_name,
            avatar_path: db.avatar_path,
            subscription_status: db.subscription_status,
            payment_customer_id: db.payment_customer_id,
        }
    }
}

/// User profile as returned by the API; the credential hash never leaves the
/// database layer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_path: Option<String>,
    pub auth_source: String,
    pub subscription_status: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            email: db.email,
            display_name: db.display_name,
            avatar_path: db.avatar_path,
            auth_source: db.auth_source,
            subscription_status: db.subscription_status,
            created_at: db.created_at,
        }
    }
}
