// SPDX-FileCopyrightText: 2026 Medvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM payload encryption for the medvault case store.
//!
//! Clinical payloads are serialized to canonical JSON, sealed with
//! AES-256-GCM, and stored as URL-safe base64 tokens of
//! `nonce || ciphertext || tag`, suitable for a plain TEXT column.
//! Decryption is authenticated: a tampered or foreign-key token fails with
//! [`MedvaultError::InvalidToken`], never garbage output.

pub mod cipher;
pub mod keys;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use medvault_core::MedvaultError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use zeroize::Zeroizing;

pub use keys::KeyProvider;

/// Length of the random GCM nonce prefixed to every token.
const NONCE_LEN: usize = 12;
/// Length of the GCM authentication tag appended to every ciphertext.
const TAG_LEN: usize = 16;

/// Encrypts and decrypts JSON documents under the process-wide payload key.
///
/// Constructed once from a [`KeyProvider`] at the composition root and shared
/// by reference wherever payloads cross the storage boundary.
pub struct PayloadCipher {
    key: Zeroizing<[u8; 32]>,
}

impl std::fmt::Debug for PayloadCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl PayloadCipher {
    pub fn new(keys: &KeyProvider) -> Self {
        Self {
            key: Zeroizing::new(*keys.key()),
        }
    }

    /// Serialize `document` to JSON, encrypt it, and return a URL-safe token.
    pub fn encrypt_json<T: Serialize>(&self, document: &T) -> Result<String, MedvaultError> {
        let plaintext = serde_json::to_vec(document)
            .map_err(|e| MedvaultError::Crypto(format!("payload serialization failed: {e}")))?;
        let (ciphertext, nonce) = cipher::seal(&self.key, &plaintext)?;

        let mut token_bytes = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        token_bytes.extend_from_slice(&nonce);
        token_bytes.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(token_bytes))
    }

    /// Decrypt a token produced by [`encrypt_json`] back into a document.
    ///
    /// Fails with [`MedvaultError::InvalidToken`] when the token is
    /// malformed, was produced under a different key, or has been tampered
    /// with.
    ///
    /// [`encrypt_json`]: PayloadCipher::encrypt_json
    pub fn decrypt_json<T: DeserializeOwned>(&self, token: &str) -> Result<T, MedvaultError> {
        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| MedvaultError::InvalidToken)?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(MedvaultError::InvalidToken);
        }
        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let nonce: [u8; NONCE_LEN] = nonce_bytes
            .try_into()
            .map_err(|_| MedvaultError::InvalidToken)?;

        let plaintext = cipher::open(&self.key, &nonce, ciphertext)?;
        serde_json::from_slice(&plaintext).map_err(|_| MedvaultError::InvalidToken)
    }
}
