// SPDX-FileCopyrightText: 2026 Medvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payload encryption key lifecycle.
//!
//! The key is owned by an explicitly constructed [`KeyProvider`] built once at
//! the application's composition root and injected where needed -- there is no
//! hidden process-global key cache. Its lifetime equals the process lifetime.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use medvault_core::MedvaultError;
use medvault_config::CryptoConfig;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::cipher;

/// Holds the 32-byte payload encryption key for the life of the process.
///
/// Debug output intentionally omits the key material.
pub struct KeyProvider {
    key: Zeroizing<[u8; 32]>,
    ephemeral: bool,
}

impl std::fmt::Debug for KeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyProvider")
            .field("key", &"[REDACTED]")
            .field("ephemeral", &self.ephemeral)
            .finish()
    }
}

impl KeyProvider {
    /// Build a provider from configuration.
    ///
    /// With `data_key` set, the key is decoded from URL-safe base64 and must
    /// be exactly 32 bytes. With `data_key` absent, a fresh random key is
    /// generated for this process only and a warning is logged: data
    /// encrypted under it is permanently unrecoverable after restart. That
    /// fallback is tolerated deliberately for local demo use.
    pub fn from_config(config: &CryptoConfig) -> Result<Self, MedvaultError> {
        match &config.data_key {
            Some(encoded) => {
                let provider = Self::from_encoded(encoded)?;
                debug!("payload encryption key loaded from configuration");
                Ok(provider)
            }
            None => {
                warn!(
                    "no payload encryption key configured; generated a temporary in-memory key. \
                     Encrypted data will NOT be recoverable after process restart. \
                     Set MEDVAULT_CRYPTO_DATA_KEY to a stable key for persistent storage."
                );
                Self::ephemeral()
            }
        }
    }

    /// Build a provider from a URL-safe base64 encoded 32-byte key.
    ///
    /// Accepts both padded and unpadded encodings.
    pub fn from_encoded(encoded: &str) -> Result<Self, MedvaultError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded.trim_end_matches('='))
            .map_err(|e| MedvaultError::Config(format!("data key is not valid base64: {e}")))?;
        let key: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            MedvaultError::Config(format!(
                "data key must decode to 32 bytes, got {}",
                b.len()
            ))
        })?;
        Ok(Self {
            key: Zeroizing::new(key),
            ephemeral: false,
        })
    }

    /// Build a provider from raw key bytes. Used by tests and composition
    /// roots that manage key material externally.
    pub fn from_key(key: [u8; 32]) -> Self {
        Self {
            key: Zeroizing::new(key),
            ephemeral: false,
        }
    }

    /// Build a provider with a fresh random key that lives only in memory.
    pub fn ephemeral() -> Result<Self, MedvaultError> {
        Ok(Self {
            key: Zeroizing::new(cipher::generate_random_key()?),
            ephemeral: true,
        })
    }

    /// Whether this key was generated in memory rather than configured.
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    pub(crate) fn key(&self) -> &[u8; 32] {
        &self.key
    }
}
