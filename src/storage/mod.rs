// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Signature Storage
//!
//! Persistence port for signature records and its implementations.
//!
//! ## Contract
//!
//! - [`SignatureStore::insert`] writes a record and all of its answers as one
//!   atomic unit. A second record with the same `request_id` is refused with
//!   [`StoreError::DuplicateRequest`]. A write still uncommitted at its
//!   deadline is rolled back and reported as [`StoreError::Timeout`].
//! - [`SignatureStore::query`] evaluates a [`SignatureSpecification`] and
//!   returns matching records with their answers loaded in order.
//!
//! Backend errors never cross this boundary: they are logged where they occur
//! and surface as the opaque [`StoreError::Storage`].
//!
//! ## Implementations
//!
//! - [`SignatureDatabase`] - embedded redb file (ACID, single writer)
//! - [`MemoryStore`] - process-local maps, used by tests and `DATABASE_PATH=:memory:` runs

use std::time::Instant;

pub mod memory;
pub mod records;
pub mod signature_db;
pub mod specification;

pub use memory::MemoryStore;
pub use records::{QuestionAnswer, SignatureRecord};
pub use signature_db::SignatureDatabase;
pub use specification::{Index, Lookup, SignatureSpecification};

/// Errors reported by a [`SignatureStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A record with this `request_id` already exists.
    #[error("duplicate request: {0}")]
    DuplicateRequest(String),

    /// The write deadline passed before commit; nothing was persisted.
    #[error("deadline exceeded before commit")]
    Timeout,

    /// Any other persistence failure.
    #[error("storage failure")]
    Storage,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence port for signature records.
///
/// Implementations are blocking; async callers run them on the blocking pool.
pub trait SignatureStore: Send + Sync + 'static {
    /// Persist `record` with its answers atomically.
    ///
    /// If `deadline` has passed by the time the write would commit, the
    /// write is discarded and [`StoreError::Timeout`] is returned.
    fn insert(&self, record: SignatureRecord, deadline: Instant) -> StoreResult<SignatureRecord>;

    /// Return every record matching `spec`.
    fn query(&self, spec: &SignatureSpecification) -> StoreResult<Vec<SignatureRecord>>;
}
