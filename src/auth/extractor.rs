// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};

use super::{AuthError, AuthenticatedUser, JwtClaims};
use crate::state::AppState;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Shared-secret verification settings.
#[derive(Clone)]
pub struct AuthConfig {
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl AuthConfig {
    /// Build from the HS256 secret shared with the token issuer.
    pub fn new(api_secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_aud = false;
        validation.validate_nbf = true;
        // Only `user_id` is mandatory; registered claims are checked when present.
        validation.required_spec_claims.clear();

        Self {
            decoding_key: Arc::new(DecodingKey::from_secret(api_secret.as_bytes())),
            validation: Arc::new(validation),
        }
    }

    /// Verify a bearer token and extract the user.
    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let token_data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
                _ => AuthError::MalformedToken,
            })?;

        if token_data.claims.user_id.is_empty() {
            return Err(AuthError::MissingUserId);
        }

        Ok(AuthenticatedUser::from_claims(token_data.claims))
    }
}

/// Extractor for authenticated users.
///
/// Validates the bearer token from the Authorization header against
/// `API_SECRET`.
///
/// # Example
///
/// ```rust,ignore
/// async fn sign_answers(
///     Auth(user): Auth,
///     State(state): State<AppState>,
/// ) -> Result<Json<SignAnswersResponse>, ApiError> {
///     // user.user_id owns the new signature
/// }
/// ```
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or(AuthError::InvalidAuthHeader)?;

        let user = state.auth_config.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            e
        })?;

        Ok(Auth(user))
    }
}
