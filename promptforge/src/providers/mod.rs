//! Upstream generation provider integration.
//!
//! Two providers exist: the paid bearer-token API with asynchronous jobs
//! ([`paid`], normalized by [`normalize`]) and the stateless free image
//! endpoint ([`free_image`]). No call is ever retried; upstream failures
//! surface to the caller or are written into the job record by the status
//! handler.

use crate::api::models::generations::GenerationKind;
use crate::errors::Error;

pub mod free_image;
pub mod normalize;
pub mod paid;

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur while talking to an upstream provider
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid provider URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("provider returned an unusable response: {0}")]
    InvalidResponse(String),

    #[error("provider configuration error: {0}")]
    Config(String),

    #[error("{kind} generations are not dispatched to the paid provider")]
    UnsupportedKind { kind: GenerationKind },
}

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        Error::Upstream {
            message: err.to_string(),
        }
    }
}
