//! HTTP handlers for the credit ledger.

use crate::{
    api::models::{credits::BalanceResponse, users::CurrentUser},
    db::handlers::Profiles,
    errors::{Error, Result},
    AppState,
};
use axum::{extract::State, response::Json};

/// Get current user's credit balance
#[utoipa::path(
    get,
    path = "/credits/balance",
    tag = "credits",
    summary = "Get current user's credit balance",
    description = "Get the credit balance for the currently authenticated user. Returns 0 when no profile exists yet.",
    responses(
        (status = 200, description = "User's current balance", body = BalanceResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("IdentityHeaders" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_balance(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<BalanceResponse>> {
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Profiles::new(&mut pool_conn);

    let credits = repo.credits_for(&current_user.id).await?;

    Ok(Json(BalanceResponse { credits }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_app, create_test_profile, identity_headers};
    use sqlx::PgPool;

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_balance_defaults_to_zero(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        let (id_header, email_header) = identity_headers("user_fresh", "fresh@example.com");
        let response = app
            .get("/api/v1/credits/balance")
            .add_header(id_header.0, id_header.1)
            .add_header(email_header.0, email_header.1)
            .await;

        response.assert_status_ok();
        let balance: BalanceResponse = response.json();
        assert_eq!(balance.credits, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_balance_reads_profile(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        create_test_profile(&pool, "user_rich", "rich@example.com", 37).await;

        let (id_header, email_header) = identity_headers("user_rich", "rich@example.com");
        let response = app
            .get("/api/v1/credits/balance")
            .add_header(id_header.0, id_header.1)
            .add_header(email_header.0, email_header.1)
            .await;

        response.assert_status_ok();
        let balance: BalanceResponse = response.json();
        assert_eq!(balance.credits, 37);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[test_log::test]
    async fn test_balance_requires_identity(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        let response = app.get("/api/v1/credits/balance").await;
        response.assert_status_unauthorized();
    }
}
