//! API models for the credit ledger.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Current user's credit balance.
///
/// Reads default to 0 when no profile row exists yet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    pub credits: i32,
}
