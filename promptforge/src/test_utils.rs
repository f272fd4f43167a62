//! Shared helpers for the test suites.

use crate::{
    build_router,
    config::Config,
    db::handlers::Profiles,
    providers::paid::PaidClient,
    webhooks::signing,
    AppState,
};
use axum::{
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use url::Url;

/// Known-valid Standard Webhooks secret used across the webhook tests.
pub const TEST_WEBHOOK_SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

/// Test configuration: unroutable paid provider (so any accidental upstream
/// call fails fast), one configured admin, webhook secret set.
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.providers.paid.api_key = "test-api-key".to_string();
    config.providers.paid.base_url = Url::parse("http://127.0.0.1:9/").expect("static URL");
    config.providers.paid.timeout = std::time::Duration::from_secs(2);
    config.auth.admin_users = vec!["user_admin".to_string()];
    config.auth.webhook.secret = Some(TEST_WEBHOOK_SECRET.to_string());
    config
}

pub async fn create_test_app(pool: PgPool) -> axum_test::TestServer {
    create_test_app_with_config(pool, create_test_config()).await
}

/// Test app whose paid provider points at a locally spawned stub.
pub async fn create_test_app_with_provider(pool: PgPool, base_url: Url) -> axum_test::TestServer {
    let mut config = create_test_config();
    config.providers.paid.base_url = base_url;
    create_test_app_with_config(pool, config).await
}

pub async fn create_test_app_with_config(pool: PgPool, config: Config) -> axum_test::TestServer {
    let paid = PaidClient::new(&config.providers.paid).expect("Failed to build paid client");
    let state = AppState::builder().db(pool).config(config).paid(paid).build();
    let router = build_router(&state).expect("Failed to build router");
    axum_test::TestServer::new(router).expect("Failed to create test server")
}

/// Seed a profile row with a fixed balance.
pub async fn create_test_profile(pool: &PgPool, user_id: &str, email: &str, credits: i32) {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut repo = Profiles::new(&mut conn);
    repo.ensure(user_id, email, 0).await.expect("Failed to create profile");
    repo.set_credits(user_id, credits).await.expect("Failed to set credits");
}

/// Identity headers as injected by the trusted proxy.
pub fn identity_headers(user_id: &str, email: &str) -> ((&'static str, String), (&'static str, String)) {
    (
        ("x-identity-user", user_id.to_string()),
        ("x-identity-email", email.to_string()),
    )
}

/// Identity headers for the admin configured in [`create_test_config`].
pub fn admin_identity_headers() -> ((&'static str, String), (&'static str, String)) {
    identity_headers("user_admin", "admin@example.com")
}

/// Standard Webhooks headers for a freshly signed payload.
pub fn signed_webhook_headers(body: &str, secret: &str) -> Vec<(&'static str, String)> {
    let timestamp = chrono::Utc::now().timestamp();
    let signature = signing::sign_payload("msg_test", timestamp, body, secret).expect("Failed to sign payload");

    vec![
        ("webhook-id", "msg_test".to_string()),
        ("webhook-timestamp", timestamp.to_string()),
        ("webhook-signature", signature),
    ]
}

/// Spawn a stub paid provider serving canned image create/status responses
/// on an ephemeral local port. Returns its base URL and a counter of status
/// calls, which the reconciliation tests use to prove terminal jobs are
/// served from storage.
pub async fn spawn_stub_provider(create_response: Value, status_response: Value) -> (Url, Arc<AtomicUsize>) {
    let status_calls = Arc::new(AtomicUsize::new(0));
    let calls = status_calls.clone();

    let router = Router::new()
        .route(
            "/api/v1/gpt4o-image/generate",
            post(move || {
                let body = create_response.clone();
                async move { Json(body) }
            }),
        )
        .route(
            "/api/v1/gpt4o-image/record-info",
            get(move || {
                let body = status_response.clone();
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Json(body)
                }
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub provider");
    let addr = listener.local_addr().expect("Failed to read stub address");

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    let base_url = Url::parse(&format!("http://{addr}/")).expect("Failed to build stub URL");
    (base_url, status_calls)
}
