// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Query specifications for the signature store.
//!
//! A [`SignatureSpecification`] names a logical filter in the service's
//! vocabulary. Stores never match on it directly; they ask it for a
//! [`Lookup`], the access path plus its bound key, and translate that into
//! their own native query. New filters extend the enum and the `Index` set
//! without touching the [`SignatureStore`](super::SignatureStore) trait.

use uuid::Uuid;

/// Logical filters understood by every signature store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureSpecification {
    /// The record whose id was sealed into a token.
    ById(Uuid),
    /// The record created for a given idempotency key.
    ///
    /// The service itself only resolves tokens by id; this filter serves
    /// tests and audits that inspect the store directly.
    ByRequestId(String),
}

/// Access path a lookup goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Index {
    /// Primary key: the record id.
    Primary,
    /// Unique secondary key: the request id, resolved to a record id first.
    RequestId,
}

/// Backend-neutral form of a specification: which index, which key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub index: Index,
    pub key: String,
}

impl SignatureSpecification {
    pub fn by_id(id: Uuid) -> Self {
        Self::ById(id)
    }

    pub fn by_request_id(request_id: impl Into<String>) -> Self {
        Self::ByRequestId(request_id.into())
    }

    /// Translate into an index lookup with its bound key.
    pub fn lookup(&self) -> Lookup {
        match self {
            Self::ById(id) => Lookup {
                index: Index::Primary,
                key: id.to_string(),
            },
            Self::ByRequestId(request_id) => Lookup {
                index: Index::RequestId,
                key: request_id.clone(),
            },
        }
    }
}
