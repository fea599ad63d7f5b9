// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded signature database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `signatures`: record id → serialized parent row (JSON)
//! - `signature_request_ids`: request_id → record id (uniqueness constraint)
//! - `signature_answers`: composite key (record_id|seq) → serialized answer (JSON)
//!
//! A record, its request-id entry and all of its answers are written in one
//! write transaction. redb admits a single writer at a time, so the
//! duplicate check and the insert cannot interleave with a concurrent insert.
//! The caller's deadline is checked once every row is staged; a late write is
//! aborted rather than committed.

use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::records::{QuestionAnswer, SignatureRecord};
use super::specification::{Index, Lookup, SignatureSpecification};
use super::{SignatureStore, StoreError, StoreResult};

// =============================================================================
// Table Definitions
// =============================================================================

/// Parent table: record id → serialized SignatureRow (JSON bytes).
const SIGNATURES: TableDefinition<&str, &[u8]> = TableDefinition::new("signatures");

/// Unique index: request_id → record id.
const REQUEST_IDS: TableDefinition<&str, &str> = TableDefinition::new("signature_request_ids");

/// Child table: composite key → serialized QuestionAnswer (JSON bytes).
/// Key format: `record_id|seq_be` so a prefix scan yields answers in order.
const ANSWERS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("signature_answers");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SignatureDbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record id already in use: {0}")]
    IdCollision(String),

    #[error("request index points at missing record: {0}")]
    DanglingIndex(String),
}

pub type SignatureDbResult<T> = Result<T, SignatureDbError>;

/// Parent row as stored; answers live in their own table.
#[derive(Debug, Serialize, Deserialize)]
struct SignatureRow {
    id: Uuid,
    request_id: String,
    user_id: String,
    created_at: DateTime<Utc>,
}

impl From<&SignatureRecord> for SignatureRow {
    fn from(record: &SignatureRecord) -> Self {
        Self {
            id: record.id,
            request_id: record.request_id.clone(),
            user_id: record.user_id.clone(),
            created_at: record.created_at,
        }
    }
}

impl SignatureRow {
    fn into_record(self, answers: Vec<QuestionAnswer>) -> SignatureRecord {
        SignatureRecord {
            id: self.id,
            request_id: self.request_id,
            user_id: self.user_id,
            created_at: self.created_at,
            answers,
        }
    }
}

enum Insertion {
    Inserted,
    DuplicateRequest,
    DeadlineExceeded,
}

// =============================================================================
// Answer Key Helpers
// =============================================================================

/// Build the composite key for one answer: `record_id | seq_be_bytes`.
fn make_answer_key(record_id: &str, seq: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(record_id.len() + 1 + 4);
    key.extend_from_slice(record_id.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

/// Lower bound for scanning all answers of a record.
fn make_prefix(record_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(record_id.len() + 1);
    prefix.extend_from_slice(record_id.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Exclusive upper bound, past any sequence number under the prefix.
fn make_prefix_end(record_id: &str) -> Vec<u8> {
    let mut end = make_prefix(record_id);
    end.extend_from_slice(&[0xFF; 5]);
    end
}

// =============================================================================
// SignatureDatabase
// =============================================================================

/// Embedded ACID signature store.
pub struct SignatureDatabase {
    db: Database,
}

impl SignatureDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> SignatureDbResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SIGNATURES)?;
            let _ = write_txn.open_table(REQUEST_IDS)?;
            let _ = write_txn.open_table(ANSWERS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    fn insert_record(
        &self,
        record: &SignatureRecord,
        deadline: Instant,
    ) -> SignatureDbResult<Insertion> {
        let id = record.id.to_string();
        let row = serde_json::to_vec(&SignatureRow::from(record))?;

        let write_txn = self.db.begin_write()?;
        let duplicate = {
            let mut request_ids = write_txn.open_table(REQUEST_IDS)?;
            if request_ids.get(record.request_id.as_str())?.is_some() {
                true
            } else {
                let mut signatures = write_txn.open_table(SIGNATURES)?;
                if signatures.get(id.as_str())?.is_some() {
                    return Err(SignatureDbError::IdCollision(id));
                }
                signatures.insert(id.as_str(), row.as_slice())?;
                request_ids.insert(record.request_id.as_str(), id.as_str())?;

                let mut answers = write_txn.open_table(ANSWERS)?;
                for (seq, answer) in (0u32..).zip(&record.answers) {
                    let key = make_answer_key(&id, seq);
                    let json = serde_json::to_vec(answer)?;
                    answers.insert(key.as_slice(), json.as_slice())?;
                }
                false
            }
        };

        if duplicate {
            write_txn.abort()?;
            return Ok(Insertion::DuplicateRequest);
        }
        // Last point at which the write can still be undone.
        if Instant::now() >= deadline {
            write_txn.abort()?;
            return Ok(Insertion::DeadlineExceeded);
        }

        write_txn.commit()?;
        Ok(Insertion::Inserted)
    }

    fn load(&self, lookup: &Lookup) -> SignatureDbResult<Vec<SignatureRecord>> {
        let read_txn = self.db.begin_read()?;

        let record_id = match lookup.index {
            Index::Primary => lookup.key.clone(),
            Index::RequestId => {
                let request_ids = read_txn.open_table(REQUEST_IDS)?;
                let found = request_ids
                    .get(lookup.key.as_str())?
                    .map(|v| v.value().to_string());
                match found {
                    Some(id) => id,
                    None => return Ok(Vec::new()),
                }
            }
        };

        let signatures = read_txn.open_table(SIGNATURES)?;
        let row_bytes = signatures
            .get(record_id.as_str())?
            .map(|v| v.value().to_vec());
        let row: SignatureRow = match row_bytes {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None if lookup.index == Index::RequestId => {
                return Err(SignatureDbError::DanglingIndex(lookup.key.clone()));
            }
            None => return Ok(Vec::new()),
        };

        let answers_table = read_txn.open_table(ANSWERS)?;
        let start = make_prefix(&record_id);
        let end = make_prefix_end(&record_id);

        let mut answers = Vec::new();
        for entry in answers_table.range(start.as_slice()..end.as_slice())? {
            let (_key, value) = entry?;
            answers.push(serde_json::from_slice::<QuestionAnswer>(value.value())?);
        }

        Ok(vec![row.into_record(answers)])
    }
}

impl SignatureStore for SignatureDatabase {
    fn insert(&self, record: SignatureRecord, deadline: Instant) -> StoreResult<SignatureRecord> {
        match self.insert_record(&record, deadline) {
            Ok(Insertion::Inserted) => Ok(record),
            Ok(Insertion::DuplicateRequest) => {
                tracing::info!(
                    request_id = %record.request_id,
                    "Signature already exists for request"
                );
                Err(StoreError::DuplicateRequest(record.request_id))
            }
            Ok(Insertion::DeadlineExceeded) => {
                tracing::warn!(
                    request_id = %record.request_id,
                    "Write deadline passed before commit, rolled back"
                );
                Err(StoreError::Timeout)
            }
            Err(e) => {
                tracing::error!(
                    request_id = %record.request_id,
                    error = %e,
                    "Failed to persist signature"
                );
                Err(StoreError::Storage)
            }
        }
    }

    fn query(&self, spec: &SignatureSpecification) -> StoreResult<Vec<SignatureRecord>> {
        let lookup = spec.lookup();
        self.load(&lookup).map_err(|e| {
            tracing::error!(
                index = ?lookup.index,
                error = %e,
                "Failed to query signatures"
            );
            StoreError::Storage
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
