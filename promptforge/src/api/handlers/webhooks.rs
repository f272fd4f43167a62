//! Identity-provider webhook ingestion.
//!
//! The identity provider delivers user lifecycle events signed with the
//! Standard Webhooks scheme. Events mirror into the `profiles` table so the
//! service can serve balances and generations keyed by subject id without
//! calling the provider.

use crate::{
    api::models::webhooks::{IdentityEvent, WebhookAck},
    db::{
        handlers::{Profiles, Repository},
        models::profiles::{ProfileCreateDBRequest, ProfileUpdateDBRequest},
    },
    errors::{Error, Result},
    webhooks::signing,
    AppState,
};
use axum::{extract::State, http::HeaderMap, response::Json};
use tracing::{info, instrument, warn};

fn required_header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::BadRequest {
            message: format!("Missing or invalid {name} header"),
        })
}

/// Ingest an identity lifecycle event
#[utoipa::path(
    post,
    path = "/webhooks/identity",
    tag = "webhooks",
    summary = "Ingest an identity lifecycle event",
    description = "Receives user.created / user.updated / user.deleted events from the identity provider, verified with the Standard Webhooks signature scheme",
    responses(
        (status = 200, description = "Event processed"),
        (status = 400, description = "Missing headers, stale timestamp, bad signature, or malformed payload"),
        (status = 404, description = "Event references an unknown profile"),
        (status = 500, description = "Internal server error"),
    ),
)]
#[instrument(skip_all)]
pub async fn identity_webhook(State(state): State<AppState>, headers: HeaderMap, body: String) -> Result<Json<WebhookAck>> {
    let Some(secret) = state.config.auth.webhook.secret.as_deref() else {
        return Err(Error::Internal {
            operation: "verify webhook: no signing secret configured".to_string(),
        });
    };

    let msg_id = required_header(&headers, "webhook-id")?;
    let timestamp: i64 = required_header(&headers, "webhook-timestamp")?
        .parse()
        .map_err(|_| Error::BadRequest {
            message: "Invalid webhook-timestamp header".to_string(),
        })?;
    let signature = required_header(&headers, "webhook-signature")?;

    let now = chrono::Utc::now().timestamp();
    let tolerance = state.config.auth.webhook.tolerance.as_secs() as i64;
    if (now - timestamp).abs() > tolerance {
        return Err(Error::BadRequest {
            message: "Webhook timestamp outside tolerance".to_string(),
        });
    }

    if !signing::verify_signature(msg_id, timestamp, &body, signature, secret) {
        warn!(msg_id = %msg_id, "webhook signature verification failed");
        return Err(Error::BadRequest {
            message: "Webhook verification error".to_string(),
        });
    }

    let event: IdentityEvent = serde_json::from_str(&body).map_err(|e| Error::BadRequest {
        message: format!("Malformed webhook payload: {e}"),
    })?;

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Profiles::new(&mut pool_conn);

    let message = match event.event_type.as_str() {
        "user.created" => {
            let request = ProfileCreateDBRequest {
                user_id: event.data.id.clone(),
                email: event.data.email_address.unwrap_or_default(),
                first_name: event.data.first_name,
                last_name: event.data.last_name,
                credits: state.config.credits.signup_grant,
            };
            repo.upsert(&request).await?;
            info!(user_id = %event.data.id, action = "webhook_user_created", "profile created from identity event");
            "User profile created successfully"
        }
        "user.updated" => {
            let request = ProfileUpdateDBRequest {
                email: event.data.email_address,
                first_name: event.data.first_name,
                last_name: event.data.last_name,
            };
            repo.update(event.data.id.clone(), &request).await?;
            info!(user_id = %event.data.id, action = "webhook_user_updated", "profile updated from identity event");
            "User profile updated successfully"
        }
        "user.deleted" => {
            repo.delete(event.data.id.clone()).await?;
            info!(user_id = %event.data.id, action = "webhook_user_deleted", "profile deleted from identity event");
            "User profile deleted successfully"
        }
        other => {
            info!(event_type = %other, action = "webhook_ignored", "ignoring unhandled identity event type");
            "Webhook processed successfully"
        }
    };

    Ok(Json(WebhookAck {
        message: message.to_string(),
    }))
}
