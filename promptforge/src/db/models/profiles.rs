//! Database models for profiles.

use chrono::{DateTime, Utc};

/// Database request for creating a new profile
#[derive(Debug, Clone)]
pub struct ProfileCreateDBRequest {
    pub user_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub credits: i32,
}

/// Database request for updating a profile's identity fields
#[derive(Debug, Clone)]
pub struct ProfileUpdateDBRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Database response for a profile
#[derive(Debug, Clone)]
pub struct ProfileDBResponse {
    pub user_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub credits: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
