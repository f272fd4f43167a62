//! API models for identity-provider webhook events.

use serde::{Deserialize, Serialize};

/// Lifecycle event delivered by the identity provider.
///
/// Unknown event types deserialize fine and are acknowledged without action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: IdentityEventData,
}

/// User payload carried by identity lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityEventData {
    pub id: String,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Acknowledgement returned to the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub message: String,
}
