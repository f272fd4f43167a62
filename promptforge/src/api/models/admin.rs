//! API models for the admin surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::profiles::ProfileDBResponse;

/// One row of the admin user listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminUserResponse {
    pub id: String,
    pub email: String,
    pub credits: i32,
    pub created_at: DateTime<Utc>,
}

impl From<ProfileDBResponse> for AdminUserResponse {
    fn from(profile: ProfileDBResponse) -> Self {
        Self {
            id: profile.user_id,
            email: profile.email,
            credits: profile.credits,
            created_at: profile.created_at,
        }
    }
}

/// Request body for setting a user's credit balance
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreditUpdateRequest {
    pub credits: i32,
}
