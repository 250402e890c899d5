// SPDX-FileCopyrightText: 2026 Medvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Consent share operations.

use medvault_core::MedvaultError;
use rusqlite::params;
use tracing::info;

use crate::database::{map_tr_err, now_utc, Database};
use crate::models::{AuditAction, ConsentRecord, ConsentScope, ShareWithProvider};
use crate::queries::{audit, parse_enum_col};

/// Grant a provider access to a case by inserting a share row.
///
/// Promotes the case status from `open` to `shared`; a case already
/// `shared` or `closed` is left untouched. Appends the `case_shared` audit
/// entry. All three writes happen in one transaction.
///
/// Fails with [`MedvaultError::AlreadyExists`] if a share already exists for
/// this (case, provider) pair.
pub async fn share_case(
    db: &Database,
    case_id: i64,
    patient_user_id: i64,
    provider_user_id: i64,
    consent_scope: ConsentScope,
) -> Result<ConsentRecord, MedvaultError> {
    let now = now_utc();

    let record = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO shares
                     (case_id, patient_user_id, provider_user_id, consent_scope, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    case_id,
                    patient_user_id,
                    provider_user_id,
                    consent_scope.to_string(),
                    now,
                ],
            )?;
            let share_id = tx.last_insert_rowid();

            // Promote status so the patient can see the case is now shared.
            tx.execute(
                "UPDATE cases SET status = 'shared' WHERE id = ?1 AND status = 'open'",
                params![case_id],
            )?;
            audit::append_audit_in(&tx, patient_user_id, AuditAction::CaseShared, Some(case_id))?;
            tx.commit()?;

            Ok(ConsentRecord {
                id: share_id,
                case_id,
                patient_user_id,
                provider_user_id,
                consent_scope,
                created_at: now,
            })
        })
        .await
        .map_err(map_tr_err)?;

    info!(
        case_id,
        provider_user_id,
        scope = %consent_scope,
        "case shared"
    );
    Ok(record)
}

/// All share records for a case, joined with each provider's display name,
/// newest first.
pub async fn get_shares_for_case(
    db: &Database,
    case_id: i64,
) -> Result<Vec<ShareWithProvider>, MedvaultError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT s.id, s.case_id, s.provider_user_id, u.display_name,
                        s.consent_scope, s.created_at
                 FROM shares s
                 JOIN users u ON u.id = s.provider_user_id
                 WHERE s.case_id = ?1
                 ORDER BY s.created_at DESC, s.id DESC",
            )?;
            let rows = stmt.query_map(params![case_id], |row| {
                Ok(ShareWithProvider {
                    id: row.get(0)?,
                    case_id: row.get(1)?,
                    provider_user_id: row.get(2)?,
                    provider_display_name: row.get(3)?,
                    consent_scope: parse_enum_col(4, row.get::<_, String>(4)?)?,
                    created_at: row.get(5)?,
                })
            })?;
            let mut result = Vec::new();
            for row in rows {
                result.push(row?);
            }
            Ok(result)
        })
        .await
        .map_err(map_tr_err)
}
