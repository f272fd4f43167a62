//! Database models for generation jobs.

use crate::api::models::generations::{GenerationKind, GenerationStatus};
use crate::types::GenerationId;
use chrono::{DateTime, Utc};

/// Database request for creating a new generation
#[derive(Debug, Clone)]
pub struct GenerationCreateDBRequest {
    pub id: GenerationId,
    pub user_id: String,
    pub prompt: String,
    pub kind: GenerationKind,
    pub status: GenerationStatus,
    pub external_job_id: Option<String>,
    pub result_url: Option<String>,
}

/// Database request for updating a generation after reconciliation
#[derive(Debug, Clone)]
pub struct GenerationUpdateDBRequest {
    pub status: GenerationStatus,
    pub result_url: Option<String>,
    pub error_message: Option<String>,
}

/// Database response for a generation
#[derive(Debug, Clone)]
pub struct GenerationDBResponse {
    pub id: GenerationId,
    pub user_id: String,
    pub prompt: String,
    pub kind: GenerationKind,
    pub status: GenerationStatus,
    pub external_job_id: Option<String>,
    pub result_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
