//! Authentication support.
//!
//! See [`current_user`] for how callers are identified. Authorization is a
//! single admin flag derived from configuration; [`require_admin`] gates the
//! admin surface.

use crate::api::models::users::CurrentUser;
use crate::errors::{Error, Result};

pub mod current_user;

/// Reject non-admin callers with a 403.
pub fn require_admin(user: &CurrentUser) -> Result<()> {
    if user.is_admin {
        Ok(())
    } else {
        Err(Error::Forbidden {
            resource: "admin endpoints".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_admin() {
        let admin = CurrentUser {
            id: "user_admin".to_string(),
            email: "admin@example.com".to_string(),
            is_admin: true,
        };
        assert!(require_admin(&admin).is_ok());

        let user = CurrentUser {
            id: "user_plain".to_string(),
            email: "plain@example.com".to_string(),
            is_admin: false,
        };
        let err = require_admin(&user).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
    }
}
