//! Extraction of the authenticated caller from trusted identity headers.
//!
//! Authentication itself happens in the identity provider deployed in front
//! of this service; a trusted proxy injects the subject id and email as
//! headers on every request. Requests without the subject header are
//! unauthenticated.
//!
//! The extractor deliberately does not touch the database: profile rows are
//! provisioned lazily by the handlers that need them (first generation
//! request) or by the identity webhook.

use crate::{
    api::models::users::CurrentUser,
    errors::{Error, Result},
    AppState,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{instrument, trace};

/// Read a header value as UTF-8, rejecting malformed values rather than
/// silently dropping them.
fn header_str<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>> {
    match parts.headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(Some)
            .map_err(|e| Error::BadRequest {
                message: format!("Invalid {name} header: {e}"),
            }),
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let auth = &state.config.auth;

        let Some(user_id) = header_str(parts, &auth.identity_header)? else {
            trace!("No identity header present on request");
            return Err(Error::Unauthenticated { message: None });
        };

        if user_id.is_empty() {
            return Err(Error::Unauthenticated { message: None });
        }

        // The email header is optional per-request; the subject id is the
        // unique key and is used as a fallback display identity.
        let email = header_str(parts, &auth.email_header)?.unwrap_or(user_id).to_string();

        let is_admin = auth
            .admin_users
            .iter()
            .any(|entry| entry == user_id || *entry == email);

        Ok(CurrentUser {
            id: user_id.to_string(),
            email,
            is_admin,
        })
    }
}
