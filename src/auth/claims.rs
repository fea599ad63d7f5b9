// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};

/// Claims carried by a bearer token.
///
/// Only `user_id` is required. Registered claims are optional; `exp` and
/// `nbf` are validated by `jsonwebtoken` when present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtClaims {
    /// The user completing the test
    pub user_id: String,

    /// Expiration timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,

    /// Issued at timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,

    /// Not before timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,

    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl JwtClaims {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            exp: None,
            iat: None,
            nbf: None,
            iss: None,
        }
    }

    pub fn with_expiry(mut self, exp: u64) -> Self {
        self.exp = Some(exp);
        self
    }
}

/// Authenticated user information extracted from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Canonical user ID (`user_id` claim)
    pub user_id: String,

    /// Token expiration (Unix timestamp), if the token carried one
    pub expires_at: Option<u64>,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: JwtClaims) -> Self {
        Self {
            user_id: claims.user_id,
            expires_at: claims.exp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_without_registered_fields_deserialize() {
        let claims: JwtClaims = serde_json::from_str(r#"{"user_id":"alice"}"#).unwrap();
        assert_eq!(claims, JwtClaims::new("alice"));
    }

    #[test]
    fn from_claims_extracts_user_id_and_expiry() {
        let user = AuthenticatedUser::from_claims(JwtClaims::new("alice").with_expiry(42));
        assert_eq!(user.user_id, "alice");
        assert_eq!(user.expires_at, Some(42));
    }
}
