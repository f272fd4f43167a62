//! # promptforge: credit-metered prompt-to-media generation
//!
//! `promptforge` is the backend for a prompt-to-media application: an
//! authenticated user submits a text prompt, the service dispatches it to a
//! third-party generation provider (a paid image/video/text API or a free
//! public image endpoint), tracks the asynchronous job to completion, and
//! serves the resulting media URL. Usage is metered by a per-user credit
//! ledger with a small admin surface for adjustments.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for
//! the HTTP layer and uses PostgreSQL for persistence. Authentication is
//! delegated to an identity provider fronting the service: a trusted proxy
//! injects the authenticated subject id and email as headers, and a
//! lifecycle webhook mirrors provider-side user events into the `profiles`
//! table.
//!
//! ### Request flow
//!
//! A job creation request passes the [`auth`] extractor, lazily provisions
//! the caller's profile (with a signup credit grant), requires a positive
//! balance, dispatches to the provider for the requested kind
//! ([`providers::paid`] or [`providers::free_image`]), persists the job via
//! the [`db`] repositories, and deducts exactly one credit, deleting the
//! row again if the deduction fails.
//!
//! Status polls hit [`api::handlers::generations::get_generation`]: terminal
//! jobs are served from storage; everything else is reconciled against the
//! upstream status endpoint through the [`providers::normalize`] rule
//! cascade and written back only when something changed. Upstream errors
//! during polling are terminal for the job.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use promptforge::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = promptforge::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     promptforge::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod providers;
pub mod telemetry;
pub mod types;
pub mod webhooks;

#[cfg(test)]
pub mod test_utils;

use crate::config::CorsOrigin;
use crate::openapi::ApiDoc;
use crate::providers::paid::PaidClient;
use axum::http::HeaderValue;
use axum::{
    routing::{get, post, put},
    Router,
};
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, instrument, Level};
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

/// Application state shared across all request handlers.
///
/// Contains the database pool, the loaded configuration, and the client for
/// the paid generation provider. Request handling is stateless beyond this.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub paid: PaidClient,
}

/// Get the promptforge database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Origin(url) => url.parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(config.auth.cors.allow_credentials);

    if let Some(max_age) = config.auth.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// The JSON API lives under `/api/v1`; the identity webhook and liveness
/// probe sit at the root, and RapiDoc serves the OpenAPI documentation at
/// `/docs`.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        .route(
            "/generations",
            post(api::handlers::generations::create_generation).get(api::handlers::generations::list_generations),
        )
        .route("/generations/free", post(api::handlers::generations::create_free_image))
        .route("/generations/free/models", get(api::handlers::generations::list_free_models))
        .route("/generations/{id}", get(api::handlers::generations::get_generation))
        .route("/credits/balance", get(api::handlers::credits::get_balance))
        .route("/admin/users", get(api::handlers::admin::list_users))
        .route(
            "/admin/users/{user_id}/credits",
            put(api::handlers::admin::update_user_credits),
        )
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        // Webhook route (external service, not part of the client API)
        .route("/webhooks/identity", post(api::handlers::webhooks::identity_webhook))
        .with_state(state.clone())
        .nest("/api/v1", api_routes)
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/docs"));

    let cors_layer = create_cors_layer(&state.config)?;

    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns all resources and lifecycle.
///
/// [`Application::new`] connects to the database, runs migrations, and
/// builds the router; [`Application::serve`] binds the listener and runs
/// until the shutdown future resolves.
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        tracing::debug!("Starting promptforge with configuration: {:#?}", config);

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.url)
            .await?;
        migrator().run(&pool).await?;

        let paid = PaidClient::new(&config.providers.paid)?;

        let state = AppState::builder().db(pool.clone()).config(config.clone()).paid(paid).build();

        let router = build_router(&state)?;

        Ok(Self { router, config, pool })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "promptforge listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
