// SPDX-FileCopyrightText: 2026 Medvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the medvault case store.

use thiserror::Error;

/// The primary error type used across all medvault crates.
///
/// Authorization denials are deliberately NOT represented here: an
/// access-checked read reports denial as [`PayloadAccess::NotFoundOrDenied`]
/// so that denied and nonexistent cases are indistinguishable to the caller.
///
/// [`PayloadAccess::NotFoundOrDenied`]: crate::types::PayloadAccess
#[derive(Debug, Error)]
pub enum MedvaultError {
    /// Configuration errors (invalid TOML, malformed data key, bad paths).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Input failed validation (empty username, empty password).
    #[error("validation error: {0}")]
    Validation(String),

    /// A uniqueness constraint was violated (duplicate identifier hash,
    /// duplicate consent share). Distinct from [`MedvaultError::Validation`]
    /// so callers can map it to "already exists" messaging.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The caller attempted an action they are not permitted to perform,
    /// such as sharing a case they do not own or sharing to a non-professional.
    #[error("permission denied: {0}")]
    Permission(String),

    /// A payload token failed authenticated decryption: malformed, produced
    /// under a different key, or tampered with. Never degraded to empty data.
    #[error("invalid token: authenticated decryption failed")]
    InvalidToken,

    /// Cryptographic failures other than token decryption (key setup, CSPRNG).
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
