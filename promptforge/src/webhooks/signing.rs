//! HMAC-SHA256 verification for Standard Webhooks deliveries.
//!
//! The identity provider signs each delivery over
//! `{msg_id}.{timestamp}.{payload}` with a base64-encoded HMAC-SHA256 and
//! sends the result in the `webhook-id`, `webhook-timestamp` and
//! `webhook-signature` headers.
//!
//! See: <https://www.standardwebhooks.com/>

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Prefix for webhook secrets
pub const SECRET_PREFIX: &str = "whsec_";

/// Generate a new webhook secret.
///
/// Returns a `whsec_` prefixed base64-encoded 32-byte random secret.
pub fn generate_secret() -> String {
    use rand::RngCore;

    let mut secret_bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut secret_bytes);

    format!("{}{}", SECRET_PREFIX, BASE64_STANDARD.encode(secret_bytes))
}

/// Extract the raw secret bytes from a `whsec_` prefixed secret.
///
/// Returns `None` if the secret doesn't have the correct prefix or invalid base64.
pub fn decode_secret(secret: &str) -> Option<Vec<u8>> {
    let encoded = secret.strip_prefix(SECRET_PREFIX)?;
    BASE64_STANDARD.decode(encoded).ok()
}

/// Sign a webhook payload according to the Standard Webhooks spec.
///
/// Returns the signature in format `v1,{base64-hmac-sha256}`.
pub fn sign_payload(msg_id: &str, timestamp: i64, payload: &str, secret: &str) -> Option<String> {
    let secret_bytes = decode_secret(secret)?;

    let signed_content = format!("{}.{}.{}", msg_id, timestamp, payload);

    let mut mac = HmacSha256::new_from_slice(&secret_bytes).ok()?;
    mac.update(signed_content.as_bytes());
    let signature = mac.finalize().into_bytes();

    Some(format!("v1,{}", BASE64_STANDARD.encode(signature)))
}

/// Verify a webhook signature against the raw request body.
pub fn verify_signature(msg_id: &str, timestamp: i64, payload: &str, signature: &str, secret: &str) -> bool {
    let Some(sig_value) = signature.strip_prefix("v1,") else {
        return false;
    };

    let Some(expected) = sign_payload(msg_id, timestamp, payload, secret) else {
        return false;
    };

    let Some(expected_value) = expected.strip_prefix("v1,") else {
        return false;
    };

    // Constant-time comparison to prevent timing attacks
    constant_time_eq(sig_value.as_bytes(), expected_value.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
