//! Shared pagination query parameters.

use serde::Deserialize;
use utoipa::IntoParams;

/// `skip`/`limit` pagination for listing endpoints.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct PaginationQuery {
    /// Number of records to skip (default 0)
    pub skip: Option<i64>,
    /// Maximum number of records to return (default 100, max 1000)
    pub limit: Option<i64>,
}

impl PaginationQuery {
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(100).clamp(1, 1000)
    }
}
