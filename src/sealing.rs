// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Sealing Engine
//!
//! Authenticated encryption of opaque assertion payloads.
//!
//! - **Cipher**: AES-256-GCM (`ring::aead`)
//! - **Nonce**: 96 bits, drawn from `SystemRandom` for every seal
//! - **Key**: 256 bits, reduced from the configured key material with SHA-256
//!
//! ## Token Layout
//!
//! ```text
//! [ nonce (12 bytes) ][ ciphertext ][ GCM tag (16 bytes) ]
//! ```
//!
//! Every failure while opening a token collapses into
//! [`CryptoError::InvalidToken`], so callers cannot tell a short token from a
//! tampered one or from one sealed under another key.

use std::fmt;

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

/// Length of the AES-256-GCM key in bytes.
pub const KEY_LEN: usize = 32;

/// Length of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Minimum length of a sealed token (nonce and tag around an empty payload).
pub const MIN_TOKEN_LEN: usize = NONCE_LEN + TAG_LEN;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// Key material shorter than [`KEY_LEN`].
    #[error("key material too short: {actual} bytes, at least {required} required")]
    WeakKey { required: usize, actual: usize },

    /// The system random source failed.
    #[error("random source failure")]
    Rng,

    /// The AEAD refused to seal the payload (it exceeds the GCM size limit).
    #[error("payload could not be sealed")]
    Seal,

    /// The token could not be opened.
    #[error("invalid token")]
    InvalidToken,
}

/// AES-256-GCM sealer bound to a single key.
///
/// Constructed once at startup and shared read-only.
pub struct Sealer {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl fmt::Debug for Sealer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sealer")
            .field("algorithm", &"AES-256-GCM")
            .field("key", &"<redacted>")
            .finish()
    }
}

impl Sealer {
    /// Build a sealer from raw key material.
    ///
    /// The material must be at least [`KEY_LEN`] bytes. It is reduced to the
    /// exact key length with SHA-256, so the same material always yields the
    /// same key.
    pub fn new(key_material: &[u8]) -> Result<Self, CryptoError> {
        if key_material.len() < KEY_LEN {
            return Err(CryptoError::WeakKey {
                required: KEY_LEN,
                actual: key_material.len(),
            });
        }

        let derived = Sha256::digest(key_material);
        let unbound = UnboundKey::new(&AES_256_GCM, derived.as_slice())
            .map_err(|_| CryptoError::WeakKey {
                required: KEY_LEN,
                actual: derived.len(),
            })?;

        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Seal `plaintext`, returning `nonce ‖ ciphertext ‖ tag`.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| CryptoError::Rng)?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| CryptoError::Seal)?;

        let mut token = Vec::with_capacity(NONCE_LEN + in_out.len());
        token.extend_from_slice(&nonce_bytes);
        token.extend_from_slice(&in_out);
        Ok(token)
    }

    /// Open a token produced by [`Sealer::seal`].
    pub fn open(&self, token: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if token.len() < MIN_TOKEN_LEN {
            return Err(CryptoError::InvalidToken);
        }

        let (nonce_bytes, sealed) = token.split_at(NONCE_LEN);
        let nonce =
            Nonce::try_assume_unique_for_key(nonce_bytes).map_err(|_| CryptoError::InvalidToken)?;

        let mut payload = sealed.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut payload)
            .map_err(|_| CryptoError::InvalidToken)?;

        Ok(plaintext.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn seal_then_open_recovers_plaintext() {
        let sealer = Sealer::new(KEY).unwrap();
        let token = sealer.seal(b"assertion").unwrap();

        assert_eq!(token.len(), NONCE_LEN + b"assertion".len() + TAG_LEN);
        assert_eq!(sealer.open(&token).unwrap(), b"assertion");
    }

    #[test]
    fn short_key_is_rejected() {
        let err = Sealer::new(b"too-short").unwrap_err();
        assert_eq!(
            err,
            CryptoError::WeakKey {
                required: KEY_LEN,
                actual: 9
            }
        );
    }

    #[test]
    fn longer_key_material_is_accepted_deterministically() {
        let material = [7u8; 64];
        let a = Sealer::new(&material).unwrap();
        let b = Sealer::new(&material).unwrap();

        let token = a.seal(b"payload").unwrap();
        assert_eq!(b.open(&token).unwrap(), b"payload");
    }

    #[test]
    fn nonces_differ_between_seals() {
        let sealer = Sealer::new(KEY).unwrap();
        let first = sealer.seal(b"same").unwrap();
        let second = sealer.seal(b"same").unwrap();

        assert_ne!(first[..NONCE_LEN], second[..NONCE_LEN]);
        assert_ne!(first, second);
    }

    #[test]
    fn any_single_bit_flip_is_rejected() {
        let sealer = Sealer::new(KEY).unwrap();
        let token = sealer.seal(b"tamper me").unwrap();

        for i in 0..token.len() {
            let mut tampered = token.clone();
            tampered[i] ^= 0x01;
            assert_eq!(sealer.open(&tampered), Err(CryptoError::InvalidToken));
        }
    }

    #[test]
    fn wrong_key_is_rejected() {
        let sealer = Sealer::new(KEY).unwrap();
        let other = Sealer::new(b"fedcba9876543210fedcba9876543210").unwrap();
        let token = sealer.seal(b"secret").unwrap();

        assert_eq!(other.open(&token), Err(CryptoError::InvalidToken));
    }

    #[test]
    fn truncated_tokens_are_rejected() {
        let sealer = Sealer::new(KEY).unwrap();
        let token = sealer.seal(b"x").unwrap();

        assert_eq!(sealer.open(&[]), Err(CryptoError::InvalidToken));
        assert_eq!(sealer.open(&token[..NONCE_LEN]), Err(CryptoError::InvalidToken));
        assert_eq!(
            sealer.open(&token[..MIN_TOKEN_LEN - 1]),
            Err(CryptoError::InvalidToken)
        );
    }

    #[test]
    fn debug_does_not_print_key() {
        let sealer = Sealer::new(KEY).unwrap();
        let rendered = format!("{sealer:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("0123456789abcdef"));
    }

    #[test]
    fn seal_and_rng_failures_are_distinct() {
        assert_ne!(CryptoError::Seal, CryptoError::Rng);
        assert_ne!(CryptoError::Seal.to_string(), CryptoError::Rng.to_string());
    }
}
