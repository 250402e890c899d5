// SPDX-FileCopyrightText: 2026 Medvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `medvault-core::types` for use across
//! crate boundaries. This module re-exports them for convenience within the
//! storage crate.

pub use medvault_core::types::{
    AuditAction, AuditEntry, CaseRecord, CaseStatus, ConsentRecord, ConsentScope, Requester,
    ShareWithProvider, SharedCaseRecord, UserRecord, UserRole,
};
