// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. All types derive `Serialize`,
//! `Deserialize`, and `ToSchema` for JSON handling and OpenAPI documentation.
//!
//! ## Model Categories
//!
//! - **Signing**: submit test answers, receive a sealed signature
//! - **Verification**: present a signature, receive the stored answers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::QuestionAnswer;

// =============================================================================
// Signing Models
// =============================================================================

/// A single answered question.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct TestAnswer {
    /// The question text as shown to the user.
    pub question: String,
    /// The user's answer.
    pub answer: String,
}

impl From<TestAnswer> for QuestionAnswer {
    fn from(value: TestAnswer) -> Self {
        QuestionAnswer::new(value.question, value.answer)
    }
}

/// Request body for signing a completed test.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct SignAnswersRequest {
    /// Caller-chosen idempotency key. Resubmitting the same key is rejected.
    pub id: String,
    /// Ordered answers of the test. Must not be empty.
    pub test: Vec<TestAnswer>,
}

/// Response body carrying a freshly issued signature.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct SignAnswersResponse {
    /// Sealed signature, standard base64.
    pub signature: String,
}

// =============================================================================
// Verification Models
// =============================================================================

/// Request body for verifying a signature.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct VerifyRequest {
    /// User the signature is claimed to belong to.
    pub user_id: String,
    /// Sealed signature, standard base64.
    pub signature: String,
}

/// Response body for a verified signature.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct VerifyResponse {
    /// Stored answers in submission order.
    pub answers: Vec<String>,
    /// When the signature was issued.
    pub timestamp: DateTime<Utc>,
}
