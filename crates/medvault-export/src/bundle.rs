// SPDX-FileCopyrightText: 2026 Medvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Export bundle assembly and the JSON/PDF export entry points.
//!
//! Every entry point re-enforces access control by composing the store's
//! access-checked payload read -- nothing here bypasses authorization to
//! assemble an export, and `export_*` audit rows are written on success only.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use medvault_core::{
    AuditAction, CaseRecord, ConsentScope, MedvaultError, PayloadAccess, Requester, UserRecord,
};
use medvault_crypto::PayloadCipher;
use medvault_storage::queries::{audit, cases, shares};
use medvault_storage::Database;

use crate::pdf;

/// Static legal disclaimer included in every export.
pub const DISCLAIMER: &str = "This document is generated for local demo purposes only. \
     It is NOT a legally valid health record and must NOT be used \
     as a substitute for professional medical advice.";

/// A consent share as it appears in an export (non-sensitive fields only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareSummary {
    pub provider_display_name: String,
    pub consent_scope: ConsentScope,
    pub shared_at: String,
}

/// Everything exportable for one case: metadata, decrypted payload, consent
/// records, and the disclaimer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub export_generated_at: String,
    pub case: CaseRecord,
    pub payload: serde_json::Value,
    pub shares: Vec<ShareSummary>,
    pub disclaimer: String,
}

/// Read-only export service bound to a database and payload cipher.
pub struct Exporter {
    db: Arc<Database>,
    cipher: Arc<PayloadCipher>,
}

impl Exporter {
    pub fn new(db: Arc<Database>, cipher: Arc<PayloadCipher>) -> Self {
        Self { db, cipher }
    }

    /// Assemble all exportable data for a case.
    ///
    /// Returns [`PayloadAccess::NotFoundOrDenied`] when the case does not
    /// exist or the requester fails the payload access check.
    pub async fn build_bundle(
        &self,
        case_id: i64,
        requester: &UserRecord,
    ) -> Result<PayloadAccess<ExportBundle>, MedvaultError> {
        let Some(case) = cases::get_case(&self.db, case_id).await? else {
            return Ok(PayloadAccess::NotFoundOrDenied);
        };

        // Consent-gated payload decrypt; the single authorization choke point.
        let payload = match cases::get_case_payload(
            &self.db,
            case_id,
            Requester::from(requester),
            &self.cipher,
        )
        .await?
        {
            PayloadAccess::Found(payload) => payload,
            PayloadAccess::NotFoundOrDenied => return Ok(PayloadAccess::NotFoundOrDenied),
        };

        let share_rows = shares::get_shares_for_case(&self.db, case_id).await?;

        Ok(PayloadAccess::Found(ExportBundle {
            export_generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            case,
            payload,
            shares: share_rows
                .into_iter()
                .map(|s| ShareSummary {
                    provider_display_name: s.provider_display_name,
                    consent_scope: s.consent_scope,
                    shared_at: s.created_at,
                })
                .collect(),
            disclaimer: DISCLAIMER.to_string(),
        }))
    }

    /// Produce a pretty-printed JSON document for the case handoff.
    pub async fn export_json(
        &self,
        case_id: i64,
        requester: &UserRecord,
    ) -> Result<PayloadAccess<String>, MedvaultError> {
        let bundle = match self.build_bundle(case_id, requester).await? {
            PayloadAccess::Found(bundle) => bundle,
            PayloadAccess::NotFoundOrDenied => return Ok(PayloadAccess::NotFoundOrDenied),
        };
        let text = serde_json::to_string_pretty(&bundle)
            .map_err(|e| MedvaultError::Internal(format!("bundle serialization failed: {e}")))?;

        audit::append_audit(&self.db, requester.id, AuditAction::ExportJson, Some(case_id)).await?;
        info!(case_id, user_id = requester.id, "case exported as JSON");
        Ok(PayloadAccess::Found(text))
    }

    /// Produce a rendered PDF handoff report for the case.
    pub async fn export_pdf(
        &self,
        case_id: i64,
        requester: &UserRecord,
    ) -> Result<PayloadAccess<Vec<u8>>, MedvaultError> {
        let bundle = match self.build_bundle(case_id, requester).await? {
            PayloadAccess::Found(bundle) => bundle,
            PayloadAccess::NotFoundOrDenied => return Ok(PayloadAccess::NotFoundOrDenied),
        };
        let bytes = pdf::render(&bundle)?;

        audit::append_audit(&self.db, requester.id, AuditAction::ExportPdf, Some(case_id)).await?;
        info!(case_id, user_id = requester.id, "case exported as PDF");
        Ok(PayloadAccess::Found(bytes))
    }
}
