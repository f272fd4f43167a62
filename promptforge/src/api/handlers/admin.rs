//! HTTP handlers for the admin surface.

use crate::{
    api::models::{
        admin::{AdminUserResponse, CreditUpdateRequest},
        pagination::PaginationQuery,
        users::CurrentUser,
    },
    auth::require_admin,
    db::handlers::{profiles::ProfileFilter, Profiles, Repository},
    errors::{Error, Result},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};

/// List all user profiles with their credit balances
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "admin",
    summary = "List users and credit balances",
    description = "List all user profiles with their credit balances, newest first (admin only)",
    params(PaginationQuery),
    responses(
        (status = 200, description = "List of users", body = [AdminUserResponse]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("IdentityHeaders" = [])
    )
)]
#[tracing::instrument(skip_all, fields(admin = %current_user.id))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
    current_user: CurrentUser,
) -> Result<Json<Vec<AdminUserResponse>>> {
    require_admin(&current_user)?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Profiles::new(&mut pool_conn);

    let profiles = repo.list(&ProfileFilter::new(query.skip(), query.limit())).await?;

    Ok(Json(profiles.into_iter().map(AdminUserResponse::from).collect()))
}

/// Set a user's credit balance
#[utoipa::path(
    put,
    path = "/admin/users/{user_id}/credits",
    tag = "admin",
    summary = "Set a user's credit balance",
    description = "Set a user's credit balance to an arbitrary non-negative value (admin only)",
    params(
        ("user_id" = String, Path, description = "Identity provider subject id"),
    ),
    request_body = CreditUpdateRequest,
    responses(
        (status = 200, description = "Updated user", body = AdminUserResponse),
        (status = 400, description = "Bad request - negative credit value"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 404, description = "User not found"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("IdentityHeaders" = [])
    )
)]
#[tracing::instrument(skip_all, fields(admin = %current_user.id, target_user = %user_id))]
pub async fn update_user_credits(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    current_user: CurrentUser,
    Json(data): Json<CreditUpdateRequest>,
) -> Result<Json<AdminUserResponse>> {
    require_admin(&current_user)?;

    if data.credits < 0 {
        return Err(Error::BadRequest {
            message: "Credits must be a non-negative number".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Profiles::new(&mut pool_conn);

    let updated = repo.set_credits(&user_id, data.credits).await?;

    tracing::info!(
        admin = %current_user.id,
        user_id = %user_id,
        credits = data.credits,
        action = "admin_credit_update",
        "credit balance set by admin"
    );

    Ok(Json(AdminUserResponse::from(updated)))
}
