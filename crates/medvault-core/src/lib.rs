// SPDX-FileCopyrightText: 2026 Medvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the medvault consent-gated case store.
//!
//! Provides the error type, domain enums, and record types shared by the
//! storage, crypto, service, and export crates.

pub mod error;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::MedvaultError;
pub use types::{
    AuditAction, AuditEntry, CasePayload, CaseRecord, CaseStatus, ConsentRecord, ConsentScope,
    PayloadAccess, Requester, ShareWithProvider, SharedCaseRecord, UserRecord, UserRole,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn medvault_error_has_all_variants() {
        let _config = MedvaultError::Config("test".into());
        let _storage = MedvaultError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _validation = MedvaultError::Validation("test".into());
        let _exists = MedvaultError::AlreadyExists("test".into());
        let _permission = MedvaultError::Permission("test".into());
        let _token = MedvaultError::InvalidToken;
        let _crypto = MedvaultError::Crypto("test".into());
        let _internal = MedvaultError::Internal("test".into());
    }

    #[test]
    fn invalid_token_message_does_not_leak_detail() {
        let msg = MedvaultError::InvalidToken.to_string();
        assert!(msg.contains("authenticated decryption failed"));
    }
}
