// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persistent signature records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One question/answer pair, owned by a [`SignatureRecord`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionAnswer {
    /// Unique row identifier (UUID)
    pub id: Uuid,
    pub question: String,
    pub answer: String,
}

impl QuestionAnswer {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// A durable signature: who signed which answers, and when.
///
/// Records are written once and never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignatureRecord {
    /// Identifier sealed inside the issued token
    pub id: Uuid,
    /// Caller-supplied idempotency key (unique across all records)
    pub request_id: String,
    /// Owner of the signature
    pub user_id: String,
    /// When the signature was issued
    pub created_at: DateTime<Utc>,
    /// Answers in submission order
    pub answers: Vec<QuestionAnswer>,
}

impl SignatureRecord {
    pub fn new(
        id: Uuid,
        request_id: impl Into<String>,
        user_id: impl Into<String>,
        answers: Vec<QuestionAnswer>,
    ) -> Self {
        Self {
            id,
            request_id: request_id.into(),
            user_id: user_id.into(),
            created_at: Utc::now(),
            answers,
        }
    }
}
