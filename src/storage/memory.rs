// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory signature store.
//!
//! Holds records in process-local maps behind a single lock. Nothing survives
//! a restart; used by tests and by runs with `DATABASE_PATH=:memory:`.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Instant;

use uuid::Uuid;

use super::records::SignatureRecord;
use super::specification::{Index, SignatureSpecification};
use super::{SignatureStore, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    signatures: HashMap<Uuid, SignatureRecord>,
    request_ids: HashMap<String, Uuid>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.tables
            .read()
            .map(|tables| tables.signatures.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SignatureStore for MemoryStore {
    fn insert(&self, record: SignatureRecord, deadline: Instant) -> StoreResult<SignatureRecord> {
        let mut tables = self.tables.write().map_err(|_| {
            tracing::error!("Signature store lock poisoned");
            StoreError::Storage
        })?;

        if tables.request_ids.contains_key(&record.request_id) {
            return Err(StoreError::DuplicateRequest(record.request_id));
        }
        if tables.signatures.contains_key(&record.id) {
            tracing::error!(id = %record.id, "Record id already in use");
            return Err(StoreError::Storage);
        }
        if Instant::now() >= deadline {
            tracing::warn!(request_id = %record.request_id, "Write deadline passed, discarding");
            return Err(StoreError::Timeout);
        }

        tables
            .request_ids
            .insert(record.request_id.clone(), record.id);
        tables.signatures.insert(record.id, record.clone());
        Ok(record)
    }

    fn query(&self, spec: &SignatureSpecification) -> StoreResult<Vec<SignatureRecord>> {
        let tables = self.tables.read().map_err(|_| {
            tracing::error!("Signature store lock poisoned");
            StoreError::Storage
        })?;

        let lookup = spec.lookup();
        let id = match lookup.index {
            Index::Primary => Uuid::parse_str(&lookup.key).ok(),
            Index::RequestId => tables.request_ids.get(&lookup.key).copied(),
        };

        Ok(id
            .and_then(|id| tables.signatures.get(&id))
            .cloned()
            .into_iter()
            .collect())
    }
}
