//! API models for generation jobs.

use crate::db::models::generations::GenerationDBResponse;
use crate::types::GenerationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// What kind of content a generation produces.
///
/// `image`, `video` and `text_to_prompt` are dispatched to the paid provider;
/// `free_image` is the synchronous free-endpoint path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    Image,
    Video,
    TextToPrompt,
    FreeImage,
}

impl GenerationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationKind::Image => "image",
            GenerationKind::Video => "video",
            GenerationKind::TextToPrompt => "text_to_prompt",
            GenerationKind::FreeImage => "free_image",
        }
    }
}

impl std::str::FromStr for GenerationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(GenerationKind::Image),
            "video" => Ok(GenerationKind::Video),
            "text_to_prompt" => Ok(GenerationKind::TextToPrompt),
            "free_image" => Ok(GenerationKind::FreeImage),
            other => Err(format!("unknown generation kind: {other}")),
        }
    }
}

impl std::fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a generation job.
///
/// `completed` and `failed` are terminal; once a job reaches either, the
/// status handler serves it from storage without calling upstream again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Processing => "processing",
            GenerationStatus::Completed => "completed",
            GenerationStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStatus::Completed | GenerationStatus::Failed)
    }
}

impl std::str::FromStr for GenerationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(GenerationStatus::Pending),
            "processing" => Ok(GenerationStatus::Processing),
            "completed" => Ok(GenerationStatus::Completed),
            "failed" => Ok(GenerationStatus::Failed),
            other => Err(format!("unknown generation status: {other}")),
        }
    }
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body for creating a paid generation job
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GenerationCreate {
    pub prompt: String,
    #[serde(rename = "type")]
    pub kind: GenerationKind,
}

/// Response returned after a job has been created
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerationCreateResponse {
    #[schema(value_type = Uuid)]
    pub id: GenerationId,
    pub external_job_id: String,
    pub status: GenerationStatus,
}

/// Full generation record as returned in history listings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerationResponse {
    #[schema(value_type = Uuid)]
    pub id: GenerationId,
    pub prompt: String,
    #[serde(rename = "type")]
    pub kind: GenerationKind,
    pub status: GenerationStatus,
    pub external_job_id: Option<String>,
    pub result_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GenerationDBResponse> for GenerationResponse {
    fn from(db: GenerationDBResponse) -> Self {
        Self {
            id: db.id,
            prompt: db.prompt,
            kind: db.kind,
            status: db.status,
            external_job_id: db.external_job_id,
            result_url: db.result_url,
            error_message: db.error_message,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Canonical status returned by the reconciliation endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerationStatusResponse {
    pub status: GenerationStatus,
    pub result_url: Option<String>,
    pub error_message: Option<String>,
}

/// Request body for the synchronous free-image path
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FreeImageCreate {
    pub prompt: String,
    pub model: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub seed: Option<u64>,
}

/// Response for the free-image path; always terminal
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FreeImageResponse {
    #[schema(value_type = Uuid)]
    pub id: GenerationId,
    pub external_job_id: String,
    pub status: GenerationStatus,
    pub result_url: String,
    pub model_used: String,
}

/// One entry of the free-image model catalog
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FreeImageModel {
    pub id: String,
    pub name: String,
    pub description: String,
    pub style: String,
}

/// Catalog of free-image models plus the configured default
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FreeImageModelsResponse {
    pub models: Vec<FreeImageModel>,
    pub default_model: String,
}

/// History listing response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerationListResponse {
    pub generations: Vec<GenerationResponse>,
}
