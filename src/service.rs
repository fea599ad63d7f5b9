// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Signature Service
//!
//! Issues and verifies sealed test-completion signatures.
//!
//! ## Signing
//!
//! 1. A fresh assertion `{id, user_id}` is serialized and sealed.
//! 2. A [`SignatureRecord`] keyed by the assertion id is persisted together
//!    with the answers.
//! 3. The sealed bytes are returned only if the record committed.
//!
//! A repeated `request_id` is reported as
//! [`SignatureError::DuplicatedSignature`]; the original token is not
//! re-issued.
//!
//! ## Verification
//!
//! The token is opened, the assertion parsed, and the backing record loaded.
//! The stored owner must match both the owner sealed in the token and the
//! owner presented by the caller.
//!
//! Every call runs under a fixed time budget. Verification stops waiting when
//! the budget runs out. Creation hands the budget to the store as a commit
//! deadline, so a timed-out creation never leaves a record behind. The
//! service never retries.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sealing::{CryptoError, Sealer};
use crate::storage::{
    QuestionAnswer, SignatureRecord, SignatureSpecification, SignatureStore, StoreError,
};

/// Default time budget for a single service call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Claim sealed inside every signature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assertion {
    pub id: Uuid,
    pub user_id: String,
}

impl Assertion {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
        }
    }
}

/// What a verified signature attests to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSignature {
    /// Answer texts in submission order
    pub answers: Vec<String>,
    /// When the signature was issued
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// Token could not be opened, parsed, or matched to a record.
    #[error("invalid signature")]
    InvalidSignature,

    /// Token is genuine but belongs to someone else.
    #[error("a user does not own a signature")]
    WrongOwner,

    /// A signature for this request id already exists.
    #[error("signature already exists")]
    DuplicatedSignature,

    #[error("storage failure")]
    Storage,

    #[error("sealing failed: {0}")]
    Crypto(#[from] CryptoError),

    #[error("operation timed out")]
    Timeout,

    #[error("internal error")]
    Internal,
}

/// Orchestrates sealing and persistence.
pub struct SignatureService {
    store: Arc<dyn SignatureStore>,
    sealer: Sealer,
    timeout: Duration,
}

impl SignatureService {
    pub fn new(store: Arc<dyn SignatureStore>, sealer: Sealer) -> Self {
        Self {
            store,
            sealer,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-call time budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Seal a new assertion for `user_id` and persist its record.
    ///
    /// Returns the sealed token. Nothing is returned unless the record
    /// committed, and a [`SignatureError::Timeout`] means nothing was
    /// committed: the store rolls back any write still pending at the
    /// deadline, and this call waits for that outcome.
    pub async fn create_signature(
        &self,
        request_id: &str,
        user_id: &str,
        answers: Vec<QuestionAnswer>,
    ) -> Result<Vec<u8>, SignatureError> {
        let deadline = Instant::now() + self.timeout;
        self.create(request_id, user_id, answers, deadline).await
    }

    /// Open `token` and check it against the stored record and `user_id`.
    pub async fn verify_signature(
        &self,
        user_id: &str,
        token: &[u8],
    ) -> Result<StoredSignature, SignatureError> {
        tokio::time::timeout(self.timeout, self.verify(user_id, token))
            .await
            .map_err(|_| {
                tracing::warn!(user_id, "Signature verification timed out");
                SignatureError::Timeout
            })?
    }

    async fn create(
        &self,
        request_id: &str,
        user_id: &str,
        answers: Vec<QuestionAnswer>,
        deadline: Instant,
    ) -> Result<Vec<u8>, SignatureError> {
        let assertion = Assertion::new(user_id);
        let plaintext = serde_json::to_vec(&assertion).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialize assertion");
            SignatureError::Internal
        })?;
        let token = self.sealer.seal(&plaintext)?;

        let record = SignatureRecord::new(assertion.id, request_id, user_id, answers);
        match self.blocking(move |store| store.insert(record, deadline)).await? {
            Ok(stored) => {
                tracing::info!(
                    request_id,
                    user_id,
                    signature_id = %stored.id,
                    answers = stored.answers.len(),
                    "Signature created"
                );
                Ok(token)
            }
            Err(StoreError::DuplicateRequest(_)) => Err(SignatureError::DuplicatedSignature),
            Err(StoreError::Timeout) => {
                tracing::warn!(request_id, user_id, "Signature creation timed out");
                Err(SignatureError::Timeout)
            }
            Err(StoreError::Storage) => Err(SignatureError::Storage),
        }
    }

    async fn verify(&self, user_id: &str, token: &[u8]) -> Result<StoredSignature, SignatureError> {
        let assertion = self.open(token)?;

        let spec = SignatureSpecification::by_id(assertion.id);
        let records = self
            .blocking(move |store| store.query(&spec))
            .await?
            .map_err(|_| SignatureError::Storage)?;

        let Some(record) = records.into_iter().next() else {
            tracing::debug!(signature_id = %assertion.id, "No record backs the signature");
            return Err(SignatureError::InvalidSignature);
        };

        if record.user_id != assertion.user_id || record.user_id != user_id {
            tracing::info!(signature_id = %record.id, "Signature owner mismatch");
            return Err(SignatureError::WrongOwner);
        }

        Ok(StoredSignature {
            answers: record.answers.into_iter().map(|qa| qa.answer).collect(),
            timestamp: record.created_at,
        })
    }

    /// Open and parse a token. All failures look the same to the caller.
    fn open(&self, token: &[u8]) -> Result<Assertion, SignatureError> {
        let plaintext = self
            .sealer
            .open(token)
            .map_err(|_| SignatureError::InvalidSignature)?;
        serde_json::from_slice(&plaintext).map_err(|_| SignatureError::InvalidSignature)
    }

    /// Run a store call on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T, SignatureError>
    where
        F: FnOnce(&dyn SignatureStore) -> T + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Store task failed");
                SignatureError::Internal
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, SignatureDatabase, StoreResult};
    use std::sync::atomic::{AtomicBool, Ordering};

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn service() -> (SignatureService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let svc = SignatureService::new(store.clone(), Sealer::new(KEY).unwrap());
        (svc, store)
    }

    fn answers() -> Vec<QuestionAnswer> {
        vec![
            QuestionAnswer::new("Q1", "A1"),
            QuestionAnswer::new("Q2", "A2"),
        ]
    }

    /// Refuses every write.
    struct FailingStore;

    impl SignatureStore for FailingStore {
        fn insert(&self, _record: SignatureRecord, _deadline: Instant) -> StoreResult<SignatureRecord> {
            Err(StoreError::Storage)
        }

        fn query(&self, _spec: &SignatureSpecification) -> StoreResult<Vec<SignatureRecord>> {
            Ok(Vec::new())
        }
    }

    /// Stalls the first write and every read before delegating.
    struct SlowStore {
        inner: MemoryStore,
        stalled: AtomicBool,
    }

    impl SlowStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                stalled: AtomicBool::new(false),
            }
        }
    }

    impl SignatureStore for SlowStore {
        fn insert(&self, record: SignatureRecord, deadline: Instant) -> StoreResult<SignatureRecord> {
            if !self.stalled.swap(true, Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(100));
            }
            self.inner.insert(record, deadline)
        }

        fn query(&self, spec: &SignatureSpecification) -> StoreResult<Vec<SignatureRecord>> {
            std::thread::sleep(Duration::from_millis(500));
            self.inner.query(spec)
        }
    }

    #[tokio::test]
    async fn create_then_verify_returns_answers_in_order() {
        let (svc, _store) = service();
        let started = Utc::now();

        let token = svc.create_signature("req-1", "alice", answers()).await.unwrap();
        let verified = svc.verify_signature("alice", &token).await.unwrap();

        assert_eq!(verified.answers, vec!["A1", "A2"]);
        assert!(verified.timestamp >= started);
    }

    #[tokio::test]
    async fn repeated_request_id_is_duplicate_and_stores_one_record() {
        let (svc, store) = service();
        let token = svc.create_signature("req-1", "alice", answers()).await.unwrap();

        let err = svc
            .create_signature("req-1", "alice", vec![QuestionAnswer::new("Q9", "A9")])
            .await
            .unwrap_err();
        assert!(matches!(err, SignatureError::DuplicatedSignature));
        assert_eq!(store.len(), 1);

        // The first token stays valid.
        let verified = svc.verify_signature("alice", &token).await.unwrap();
        assert_eq!(verified.answers, vec!["A1", "A2"]);
    }

    #[tokio::test]
    async fn flipped_last_byte_is_invalid() {
        let (svc, _store) = service();
        let mut token = svc.create_signature("req-1", "alice", answers()).await.unwrap();
        let last = token.len() - 1;
        token[last] ^= 0x01;

        let err = svc.verify_signature("alice", &token).await.unwrap_err();
        assert!(matches!(err, SignatureError::InvalidSignature));
    }

    #[tokio::test]
    async fn garbage_and_empty_tokens_are_invalid() {
        let (svc, _store) = service();
        for token in [&b""[..], &b"short"[..], &[0u8; 64][..]] {
            let err = svc.verify_signature("alice", token).await.unwrap_err();
            assert!(matches!(err, SignatureError::InvalidSignature));
        }
    }

    #[tokio::test]
    async fn other_caller_is_wrong_owner() {
        let (svc, _store) = service();
        let token = svc.create_signature("req-1", "alice", answers()).await.unwrap();

        let err = svc.verify_signature("bob", &token).await.unwrap_err();
        assert!(matches!(err, SignatureError::WrongOwner));
    }

    #[tokio::test]
    async fn sealed_owner_must_match_stored_owner() {
        let (svc, store) = service();
        svc.create_signature("req-1", "alice", answers()).await.unwrap();
        let record_id = store
            .query(&SignatureSpecification::by_request_id("req-1"))
            .unwrap()[0]
            .id;

        // Token and caller agree with each other but not with the record.
        let forged = Assertion {
            id: record_id,
            user_id: "mallory".into(),
        };
        let token = svc
            .sealer
            .seal(&serde_json::to_vec(&forged).unwrap())
            .unwrap();

        let err = svc.verify_signature("mallory", &token).await.unwrap_err();
        assert!(matches!(err, SignatureError::WrongOwner));
    }

    #[tokio::test]
    async fn sealed_token_without_record_is_invalid() {
        let (svc, _store) = service();
        let orphan = Assertion::new("alice");
        let token = svc
            .sealer
            .seal(&serde_json::to_vec(&orphan).unwrap())
            .unwrap();

        let err = svc.verify_signature("alice", &token).await.unwrap_err();
        assert!(matches!(err, SignatureError::InvalidSignature));
    }

    #[tokio::test]
    async fn sealed_non_assertion_payload_is_invalid() {
        let (svc, _store) = service();
        let token = svc.sealer.seal(b"not json").unwrap();

        let err = svc.verify_signature("alice", &token).await.unwrap_err();
        assert!(matches!(err, SignatureError::InvalidSignature));
    }

    #[tokio::test]
    async fn storage_failure_discards_token() {
        let svc = SignatureService::new(Arc::new(FailingStore), Sealer::new(KEY).unwrap());

        let err = svc
            .create_signature("req-1", "alice", answers())
            .await
            .unwrap_err();
        assert!(matches!(err, SignatureError::Storage));
    }

    #[tokio::test]
    async fn timed_out_creation_leaves_no_record() {
        let store = Arc::new(SlowStore::new());
        let svc = SignatureService::new(store.clone(), Sealer::new(KEY).unwrap())
            .with_timeout(Duration::from_millis(20));

        let err = svc
            .create_signature("req-1", "alice", answers())
            .await
            .unwrap_err();
        assert!(matches!(err, SignatureError::Timeout));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(store.inner.len(), 0);

        // The request id was never consumed, so a retry goes through.
        let token = svc.create_signature("req-1", "alice", answers()).await.unwrap();
        assert_eq!(store.inner.len(), 1);
        assert!(!token.is_empty());
    }

    #[tokio::test]
    async fn slow_verification_times_out() {
        let store = Arc::new(SlowStore::new());
        let svc = SignatureService::new(store, Sealer::new(KEY).unwrap())
            .with_timeout(Duration::from_millis(20));

        let token = svc
            .sealer
            .seal(&serde_json::to_vec(&Assertion::new("alice")).unwrap())
            .unwrap();
        let err = svc.verify_signature("alice", &token).await.unwrap_err();
        assert!(matches!(err, SignatureError::Timeout));
    }

    #[tokio::test]
    async fn walkthrough_sign_verify_resubmit() {
        let (svc, _store) = service();

        let token = svc.create_signature("req-1", "alice", answers()).await.unwrap();
        let verified = svc.verify_signature("alice", &token).await.unwrap();
        assert_eq!(verified.answers, vec!["A1".to_string(), "A2".to_string()]);

        let again = svc.create_signature("req-1", "alice", answers()).await;
        assert!(matches!(again, Err(SignatureError::DuplicatedSignature)));
    }

    #[tokio::test]
    async fn concurrent_duplicates_create_one_record() {
        let (svc, store) = service();
        let svc = Arc::new(svc);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let svc = Arc::clone(&svc);
            handles.push(tokio::spawn(async move {
                svc.create_signature("req-race", "alice", answers()).await
            }));
        }

        let mut created = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(SignatureError::DuplicatedSignature) => duplicates += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(duplicates, 15);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicates_on_redb_create_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(SignatureDatabase::open(&dir.path().join("race.redb")).unwrap());
        let svc = Arc::new(SignatureService::new(db.clone(), Sealer::new(KEY).unwrap()));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let svc = Arc::clone(&svc);
            handles.push(tokio::spawn(async move {
                svc.create_signature("req-race", "alice", answers()).await
            }));
        }

        let mut tokens = Vec::new();
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(token) => tokens.push(token),
                Err(SignatureError::DuplicatedSignature) => duplicates += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(tokens.len(), 1);
        assert_eq!(duplicates, 15);

        let rows = db
            .query(&SignatureSpecification::by_request_id("req-race"))
            .unwrap();
        assert_eq!(rows.len(), 1);
        let verified = svc.verify_signature("alice", &tokens[0]).await.unwrap();
        assert_eq!(verified.answers, vec!["A1", "A2"]);
    }
}
