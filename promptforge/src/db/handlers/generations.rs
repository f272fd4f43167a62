//! Database repository for generation jobs.

use crate::api::models::generations::{GenerationKind, GenerationStatus};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::generations::{GenerationCreateDBRequest, GenerationDBResponse, GenerationUpdateDBRequest},
};
use crate::types::{abbrev_uuid, GenerationId};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

/// Filter for listing generations
#[derive(Debug, Clone)]
pub struct GenerationFilter {
    pub user_id: Option<String>,
    pub skip: i64,
    pub limit: i64,
}

impl GenerationFilter {
    pub fn for_user(user_id: &str, skip: i64, limit: i64) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            skip,
            limit,
        }
    }
}

// Database entity model. Kind and status are stored as text and parsed on
// the way out so the schema stays free of database-side enum types.
#[derive(Debug, Clone, FromRow)]
struct Generation {
    pub id: GenerationId,
    pub user_id: String,
    pub prompt: String,
    pub kind: String,
    pub status: String,
    pub external_job_id: Option<String>,
    pub result_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<Generation> for GenerationDBResponse {
    type Error = DbError;

    fn try_from(row: Generation) -> Result<Self> {
        let kind: GenerationKind = row
            .kind
            .parse()
            .map_err(|e: String| DbError::Other(anyhow::anyhow!(e)))?;
        let status: GenerationStatus = row
            .status
            .parse()
            .map_err(|e: String| DbError::Other(anyhow::anyhow!(e)))?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            prompt: row.prompt,
            kind,
            status,
            external_job_id: row.external_job_id,
            result_url: row.result_url,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct Generations<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Generations<'c> {
    type CreateRequest = GenerationCreateDBRequest;
    type UpdateRequest = GenerationUpdateDBRequest;
    type Response = GenerationDBResponse;
    type Id = GenerationId;
    type Filter = GenerationFilter;

    #[instrument(skip(self, request), fields(generation_id = %abbrev_uuid(&request.id), kind = %request.kind), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let row = sqlx::query_as::<_, Generation>(
            r#"
            INSERT INTO generations (id, user_id, prompt, kind, status, external_job_id, result_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(request.id)
        .bind(&request.user_id)
        .bind(&request.prompt)
        .bind(request.kind.as_str())
        .bind(request.status.as_str())
        .bind(&request.external_job_id)
        .bind(&request.result_url)
        .fetch_one(&mut *self.db)
        .await?;

        GenerationDBResponse::try_from(row)
    }

    #[instrument(skip(self), fields(generation_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let row = sqlx::query_as::<_, Generation>("SELECT * FROM generations WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        row.map(GenerationDBResponse::try_from).transpose()
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let rows = match &filter.user_id {
            Some(user_id) => {
                sqlx::query_as::<_, Generation>(
                    "SELECT * FROM generations WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
                )
                .bind(user_id)
                .bind(filter.limit)
                .bind(filter.skip)
                .fetch_all(&mut *self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, Generation>(
                    "SELECT * FROM generations ORDER BY created_at DESC LIMIT $1 OFFSET $2",
                )
                .bind(filter.limit)
                .bind(filter.skip)
                .fetch_all(&mut *self.db)
                .await?
            }
        };

        rows.into_iter().map(GenerationDBResponse::try_from).collect()
    }

    #[instrument(skip(self), fields(generation_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM generations WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(generation_id = %abbrev_uuid(&id), status = %request.status), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let row = sqlx::query_as::<_, Generation>(
            r#"
            UPDATE generations SET
                status = $2,
                result_url = COALESCE($3, result_url),
                error_message = COALESCE($4, error_message),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.status.as_str())
        .bind(&request.result_url)
        .bind(&request.error_message)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        GenerationDBResponse::try_from(row)
    }
}

impl<'c> Generations<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Fetch a generation only if it belongs to `user_id`. The ownership
    /// check lives in the query so a non-owner cannot distinguish "absent"
    /// from "not yours".
    #[instrument(skip(self, user_id), fields(generation_id = %abbrev_uuid(&id)), err)]
    pub async fn get_for_user(&mut self, id: GenerationId, user_id: &str) -> Result<Option<GenerationDBResponse>> {
        let row = sqlx::query_as::<_, Generation>("SELECT * FROM generations WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut *self.db)
            .await?;

        row.map(GenerationDBResponse::try_from).transpose()
    }
}
