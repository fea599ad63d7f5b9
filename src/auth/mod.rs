// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer-token authentication for the signing endpoint.
//!
//! ## Auth Flow
//!
//! 1. The test platform issues an HS256 JWT signed with `API_SECRET`
//! 2. The client sends `Authorization: Bearer <JWT>`
//! 3. The server:
//!    - Verifies the HMAC signature and, when present, `exp`/`nbf`
//!    - Extracts the `user_id` claim as the signature owner
//!
//! ## Security
//!
//! - The signing endpoint requires authentication; verification does not
//! - Clock skew tolerance is 60 seconds
//! - The core trusts the extracted `user_id` completely

pub mod claims;
pub mod error;
pub mod extractor;

pub use claims::{AuthenticatedUser, JwtClaims};
pub use error::AuthError;
pub use extractor::{Auth, AuthConfig};
