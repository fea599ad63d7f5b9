// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::AuthConfig;
use crate::config::{Config, StoreBackend};
use crate::sealing::{CryptoError, Sealer};
use crate::service::SignatureService;
use crate::storage::signature_db::SignatureDbError;
use crate::storage::{MemoryStore, SignatureDatabase, SignatureStore};

/// Failures while assembling the application at startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid signing key: {0}")]
    Crypto(#[from] CryptoError),

    #[error("cannot open signature database: {0}")]
    Database(#[from] SignatureDbError),
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SignatureService>,
    pub auth_config: AuthConfig,
}

impl AppState {
    pub fn new(service: SignatureService, auth_config: AuthConfig) -> Self {
        Self {
            service: Arc::new(service),
            auth_config,
        }
    }

    /// Build the state described by `config`, opening the configured store.
    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        let sealer = Sealer::new(&config.signing_key)?;
        let store: Arc<dyn SignatureStore> = match &config.store {
            StoreBackend::Redb(path) => Arc::new(SignatureDatabase::open(path)?),
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        };

        let service = SignatureService::new(store, sealer).with_timeout(config.request_timeout);
        Ok(Self::new(service, AuthConfig::new(&config.api_secret)))
    }

    /// State backed by a fresh [`MemoryStore`] with the default time budget.
    #[cfg(test)]
    pub(crate) fn in_memory(api_secret: &str, signing_key: &[u8]) -> Result<Self, CryptoError> {
        let sealer = Sealer::new(signing_key)?;
        let service = SignatureService::new(Arc::new(MemoryStore::new()), sealer);
        Ok(Self::new(service, AuthConfig::new(api_secret)))
    }
}
