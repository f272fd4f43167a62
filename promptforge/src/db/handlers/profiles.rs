//! Database repository for profiles.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::profiles::{ProfileCreateDBRequest, ProfileDBResponse, ProfileUpdateDBRequest},
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

/// Filter for listing profiles
#[derive(Debug, Clone)]
pub struct ProfileFilter {
    pub skip: i64,
    pub limit: i64,
}

impl ProfileFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Profile {
    pub user_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub credits: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Profile> for ProfileDBResponse {
    fn from(profile: Profile) -> Self {
        Self {
            user_id: profile.user_id,
            email: profile.email,
            first_name: profile.first_name,
            last_name: profile.last_name,
            credits: profile.credits,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

pub struct Profiles<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Profiles<'c> {
    type CreateRequest = ProfileCreateDBRequest;
    type UpdateRequest = ProfileUpdateDBRequest;
    type Response = ProfileDBResponse;
    type Id = String;
    type Filter = ProfileFilter;

    #[instrument(skip(self, request), fields(user_id = %request.user_id), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (user_id, email, first_name, last_name, credits)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&request.user_id)
        .bind(&request.email)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(request.credits)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(ProfileDBResponse::from(profile))
    }

    #[instrument(skip(self, id), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = $1")
            .bind(&id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(profile.map(ProfileDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let profiles = sqlx::query_as::<_, Profile>(
            "SELECT * FROM profiles ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(profiles.into_iter().map(ProfileDBResponse::from).collect())
    }

    #[instrument(skip(self, id), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM profiles WHERE user_id = $1")
            .bind(&id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, id, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles SET
                email = COALESCE($2, email),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&request.email)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(ProfileDBResponse::from(profile))
    }
}

impl<'c> Profiles<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Fetch the profile for `user_id`, creating it with the signup grant if
    /// absent. Safe against concurrent first requests: the insert is
    /// `ON CONFLICT DO NOTHING` and the row is re-read afterwards.
    #[instrument(skip(self), err)]
    pub async fn ensure(&mut self, user_id: &str, email: &str, signup_grant: i32) -> Result<ProfileDBResponse> {
        if let Some(existing) = self.get_by_id(user_id.to_string()).await? {
            return Ok(existing);
        }

        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, email, credits)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(email)
        .bind(signup_grant)
        .execute(&mut *self.db)
        .await?;

        self.get_by_id(user_id.to_string()).await?.ok_or(DbError::NotFound)
    }

    /// Insert or refresh a profile from an identity-provider event.
    ///
    /// On conflict the identity fields are updated and the credit balance is
    /// left untouched, which makes redelivered `user.created` events safe.
    #[instrument(skip(self, request), fields(user_id = %request.user_id), err)]
    pub async fn upsert(&mut self, request: &ProfileCreateDBRequest) -> Result<ProfileDBResponse> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (user_id, email, first_name, last_name, credits)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET
                email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(&request.user_id)
        .bind(&request.email)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(request.credits)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(ProfileDBResponse::from(profile))
    }

    /// Current balance, defaulting to 0 when no profile row exists.
    #[instrument(skip(self), err)]
    pub async fn credits_for(&mut self, user_id: &str) -> Result<i32> {
        let credits: Option<i32> = sqlx::query_scalar("SELECT credits FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(credits.unwrap_or(0))
    }

    /// Atomically deduct one credit. Returns false when the balance was
    /// already zero (or the profile is missing), leaving the row untouched.
    #[instrument(skip(self), err)]
    pub async fn deduct_credit(&mut self, user_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE profiles SET credits = credits - 1, updated_at = NOW() WHERE user_id = $1 AND credits > 0",
        )
        .bind(user_id)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set the balance to an arbitrary non-negative value (admin adjustment).
    #[instrument(skip(self), err)]
    pub async fn set_credits(&mut self, user_id: &str, credits: i32) -> Result<ProfileDBResponse> {
        let profile = sqlx::query_as::<_, Profile>(
            "UPDATE profiles SET credits = $2, updated_at = NOW() WHERE user_id = $1 RETURNING *",
        )
        .bind(user_id)
        .bind(credits)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(ProfileDBResponse::from(profile))
    }
}
