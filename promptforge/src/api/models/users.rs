//! API models for authenticated users.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The authenticated caller, extracted from the trusted identity headers.
///
/// `id` is the identity provider's subject id; admin status is derived from
/// the configured admin list, not stored per-profile.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    pub is_admin: bool,
}
