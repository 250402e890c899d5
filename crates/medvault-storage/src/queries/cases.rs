// SPDX-FileCopyrightText: 2026 Medvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Case and payload operations.
//!
//! [`get_case_payload`] is the single authorization choke point for all
//! payload reads: every caller, including the export path, goes through it.

use medvault_core::{MedvaultError, PayloadAccess};
use medvault_crypto::PayloadCipher;
use rusqlite::params;
use tracing::{error, info, warn};

use crate::database::{map_tr_err, now_utc, Database};
use crate::models::{AuditAction, CaseRecord, Requester, SharedCaseRecord};
use crate::queries::{audit, parse_enum_col};

fn case_from_row(row: &rusqlite::Row<'_>) -> Result<CaseRecord, rusqlite::Error> {
    Ok(CaseRecord {
        id: row.get(0)?,
        patient_user_id: row.get(1)?,
        created_at: row.get(2)?,
        status: parse_enum_col(3, row.get::<_, String>(3)?)?,
        triage_level: row.get(4)?,
        specialty_category: row.get(5)?,
        confidence_level: row.get(6)?,
    })
}

const CASE_COLUMNS: &str =
    "id, patient_user_id, created_at, status, triage_level, specialty_category, confidence_level";

/// Create a case row plus its encrypted payload row and the `case_created`
/// audit entry, all in one transaction.
///
/// The payload arrives already encrypted; this module never sees plaintext
/// on the write path.
pub async fn create_case(
    db: &Database,
    patient_user_id: i64,
    triage_level: Option<String>,
    specialty_category: Option<String>,
    confidence_level: Option<String>,
    encrypted_blob: String,
) -> Result<CaseRecord, MedvaultError> {
    let now = now_utc();

    let record = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO cases
                     (patient_user_id, created_at, status,
                      triage_level, specialty_category, confidence_level)
                 VALUES (?1, ?2, 'open', ?3, ?4, ?5)",
                params![
                    patient_user_id,
                    now,
                    triage_level,
                    specialty_category,
                    confidence_level,
                ],
            )?;
            let case_id = tx.last_insert_rowid();

            tx.execute(
                "INSERT INTO case_payloads (case_id, encrypted_blob) VALUES (?1, ?2)",
                params![case_id, encrypted_blob],
            )?;
            audit::append_audit_in(&tx, patient_user_id, AuditAction::CaseCreated, Some(case_id))?;
            tx.commit()?;

            Ok(CaseRecord {
                id: case_id,
                patient_user_id,
                created_at: now,
                status: crate::models::CaseStatus::Open,
                triage_level,
                specialty_category,
                confidence_level,
            })
        })
        .await
        .map_err(map_tr_err)?;

    info!(case_id = record.id, patient_user_id, "case created");
    Ok(record)
}

/// Fetch a single case's metadata by id.
pub async fn get_case(db: &Database, case_id: i64) -> Result<Option<CaseRecord>, MedvaultError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CASE_COLUMNS} FROM cases WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![case_id], case_from_row);
            match result {
                Ok(case) => Ok(Some(case)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// All case metadata rows owned by a patient, newest first.
///
/// Payloads are NOT included -- use [`get_case_payload`].
pub async fn get_cases_for_patient(
    db: &Database,
    patient_user_id: i64,
) -> Result<Vec<CaseRecord>, MedvaultError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CASE_COLUMNS} FROM cases
                 WHERE patient_user_id = ?1
                 ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt.query_map(params![patient_user_id], case_from_row)?;
            let mut cases = Vec::new();
            for row in rows {
                cases.push(row?);
            }
            Ok(cases)
        })
        .await
        .map_err(map_tr_err)
}

/// All cases a provider has been granted access to via shares, together with
/// the consent scope, newest-shared first.
pub async fn get_shared_cases_for_provider(
    db: &Database,
    provider_user_id: i64,
) -> Result<Vec<SharedCaseRecord>, MedvaultError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.patient_user_id, c.created_at, c.status,
                        c.triage_level, c.specialty_category, c.confidence_level,
                        s.consent_scope
                 FROM cases c
                 JOIN shares s ON s.case_id = c.id
                 WHERE s.provider_user_id = ?1
                 ORDER BY s.created_at DESC, s.id DESC",
            )?;
            let rows = stmt.query_map(params![provider_user_id], |row| {
                Ok(SharedCaseRecord {
                    case: case_from_row(row)?,
                    consent_scope: parse_enum_col(7, row.get::<_, String>(7)?)?,
                })
            })?;
            let mut cases = Vec::new();
            for row in rows {
                cases.push(row?);
            }
            Ok(cases)
        })
        .await
        .map_err(map_tr_err)
}

/// Decrypt and return the clinical payload for a case, enforcing access
/// control.
///
/// Access rules:
/// - the patient who owns the case may always read it;
/// - a professional may read it only if a share row exists for
///   (case, professional) -- any scope grants read access.
///
/// Denials and missing cases are both reported as
/// [`PayloadAccess::NotFoundOrDenied`] so unauthorized callers cannot probe
/// for case existence. A denial appends an `unauthorized_payload_access`
/// audit row; a successful read appends `payload_read`, in the same
/// transaction as the access check.
pub async fn get_case_payload(
    db: &Database,
    case_id: i64,
    requester: Requester,
    cipher: &PayloadCipher,
) -> Result<PayloadAccess<serde_json::Value>, MedvaultError> {
    let blob = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let case_owner: Option<i64> = {
                let result = tx.query_row(
                    "SELECT patient_user_id FROM cases WHERE id = ?1",
                    params![case_id],
                    |row| row.get(0),
                );
                match result {
                    Ok(owner) => Some(owner),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e),
                }
            };
            let Some(patient_user_id) = case_owner else {
                warn!(case_id, "payload requested for unknown case");
                tx.commit()?;
                return Ok(None);
            };

            let requester_id = requester.id();
            let is_owner = patient_user_id == requester_id;
            let is_consented_provider = match requester {
                Requester::Professional { id } => {
                    let result = tx.query_row(
                        "SELECT 1 FROM shares WHERE case_id = ?1 AND provider_user_id = ?2",
                        params![case_id, id],
                        |_| Ok(()),
                    );
                    match result {
                        Ok(()) => true,
                        Err(rusqlite::Error::QueryReturnedNoRows) => false,
                        Err(e) => return Err(e),
                    }
                }
                Requester::Patient { .. } => false,
            };

            if !(is_owner || is_consented_provider) {
                warn!(case_id, requester_id, "payload access denied");
                audit::append_audit_in(
                    &tx,
                    requester_id,
                    AuditAction::UnauthorizedPayloadAccess,
                    Some(case_id),
                )?;
                tx.commit()?;
                return Ok(None);
            }

            let blob: Option<String> = {
                let result = tx.query_row(
                    "SELECT encrypted_blob FROM case_payloads WHERE case_id = ?1",
                    params![case_id],
                    |row| row.get(0),
                );
                match result {
                    Ok(blob) => Some(blob),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e),
                }
            };
            let Some(blob) = blob else {
                error!(case_id, "case_payloads row missing");
                tx.commit()?;
                return Ok(None);
            };

            audit::append_audit_in(&tx, requester_id, AuditAction::PayloadRead, Some(case_id))?;
            tx.commit()?;
            Ok(Some(blob))
        })
        .await
        .map_err(map_tr_err)?;

    match blob {
        Some(blob) => {
            let document = cipher.decrypt_json(&blob)?;
            Ok(PayloadAccess::Found(document))
        }
        None => Ok(PayloadAccess::NotFoundOrDenied),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CaseStatus, ConsentScope, UserRole};
    use crate::queries::audit::get_audit_for_user;
    use crate::queries::{shares, users};
    use medvault_crypto::KeyProvider;
    use serde_json::json;
    use tempfile::tempdir;

    struct Fixture {
        db: Database,
        cipher: PayloadCipher,
        patient: crate::models::UserRecord,
        provider: crate::models::UserRecord,
        _dir: tempfile::TempDir,
    }

    async fn setup() -> Fixture {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let cipher = PayloadCipher::new(&KeyProvider::from_key([11u8; 32]));
        let patient = users::create_user(&db, UserRole::Patient, "Alice", "hash-alice")
            .await
            .unwrap();
        let provider = users::create_user(&db, UserRole::Professional, "Dr Bob", "hash-bob")
            .await
            .unwrap();
        Fixture {
            db,
            cipher,
            patient,
            provider,
            _dir: dir,
        }
    }

    async fn make_case(f: &Fixture, document: &serde_json::Value) -> CaseRecord {
        let blob = f.cipher.encrypt_json(document).unwrap();
        create_case(
            &f.db,
            f.patient.id,
            Some("routine".to_string()),
            Some("pulmonology".to_string()),
            Some("high".to_string()),
            blob,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn create_case_persists_metadata_with_open_status() {
        let f = setup().await;
        let case = make_case(&f, &json!({"summary": "Mild cough"})).await;

        assert_eq!(case.status, CaseStatus::Open);
        assert_eq!(case.triage_level.as_deref(), Some("routine"));

        let fetched = get_case(&f.db, case.id).await.unwrap().unwrap();
        assert_eq!(fetched, case);

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn create_case_appends_case_created_audit() {
        let f = setup().await;
        let case = make_case(&f, &json!({"summary": "s"})).await;

        let entries = get_audit_for_user(&f.db, f.patient.id, 10).await.unwrap();
        assert_eq!(entries[0].action, AuditAction::CaseCreated);
        assert_eq!(entries[0].case_id, Some(case.id));

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn cases_for_patient_are_newest_first_without_payloads() {
        let f = setup().await;
        let first = make_case(&f, &json!({"summary": "first"})).await;
        let second = make_case(&f, &json!({"summary": "second"})).await;

        let cases = get_cases_for_patient(&f.db, f.patient.id).await.unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].id, second.id);
        assert_eq!(cases[1].id, first.id);

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn owner_reads_back_the_original_payload() {
        let f = setup().await;
        let document = json!({"summary": "Mild cough", "triage_level": "routine"});
        let case = make_case(&f, &document).await;

        let outcome = get_case_payload(
            &f.db,
            case.id,
            Requester::Patient { id: f.patient.id },
            &f.cipher,
        )
        .await
        .unwrap();

        assert_eq!(outcome, PayloadAccess::Found(document));

        let entries = get_audit_for_user(&f.db, f.patient.id, 1).await.unwrap();
        assert_eq!(entries[0].action, AuditAction::PayloadRead);

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unshared_professional_is_denied_and_audited() {
        let f = setup().await;
        let case = make_case(&f, &json!({"summary": "s"})).await;

        let outcome = get_case_payload(
            &f.db,
            case.id,
            Requester::Professional { id: f.provider.id },
            &f.cipher,
        )
        .await
        .unwrap();

        assert_eq!(outcome, PayloadAccess::NotFoundOrDenied);

        let entries = get_audit_for_user(&f.db, f.provider.id, 1).await.unwrap();
        assert_eq!(entries[0].action, AuditAction::UnauthorizedPayloadAccess);
        assert_eq!(entries[0].case_id, Some(case.id));

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn foreign_patient_is_denied() {
        let f = setup().await;
        let other = users::create_user(&f.db, UserRole::Patient, "Eve", "hash-eve")
            .await
            .unwrap();
        let case = make_case(&f, &json!({"summary": "s"})).await;

        let outcome =
            get_case_payload(&f.db, case.id, Requester::Patient { id: other.id }, &f.cipher)
                .await
                .unwrap();
        assert_eq!(outcome, PayloadAccess::NotFoundOrDenied);

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn consented_professional_reads_the_same_payload() {
        let f = setup().await;
        let document = json!({"summary": "Mild cough"});
        let case = make_case(&f, &document).await;

        shares::share_case(&f.db, case.id, f.patient.id, f.provider.id, ConsentScope::Read)
            .await
            .unwrap();

        let outcome = get_case_payload(
            &f.db,
            case.id,
            Requester::Professional { id: f.provider.id },
            &f.cipher,
        )
        .await
        .unwrap();
        assert_eq!(outcome, PayloadAccess::Found(document));

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_case_is_not_found_and_leaves_no_audit_row() {
        let f = setup().await;
        let outcome = get_case_payload(
            &f.db,
            4242,
            Requester::Patient { id: f.patient.id },
            &f.cipher,
        )
        .await
        .unwrap();
        assert_eq!(outcome, PayloadAccess::NotFoundOrDenied);

        // Only the user_created row from registration.
        let entries = get_audit_for_user(&f.db, f.patient.id, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::UserCreated);

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn payload_stored_under_a_different_key_fails_decryption() {
        let f = setup().await;
        let foreign_cipher = PayloadCipher::new(&KeyProvider::from_key([99u8; 32]));
        let blob = foreign_cipher.encrypt_json(&json!({"summary": "s"})).unwrap();
        let case = create_case(&f.db, f.patient.id, None, None, None, blob)
            .await
            .unwrap();

        let result = get_case_payload(
            &f.db,
            case.id,
            Requester::Patient { id: f.patient.id },
            &f.cipher,
        )
        .await;
        assert!(matches!(result, Err(MedvaultError::InvalidToken)));

        f.db.close().await.unwrap();
    }

    #[tokio::test]
    async fn shared_cases_for_provider_include_scope_newest_first() {
        let f = setup().await;
        let c1 = make_case(&f, &json!({"summary": "one"})).await;
        let c2 = make_case(&f, &json!({"summary": "two"})).await;

        shares::share_case(&f.db, c1.id, f.patient.id, f.provider.id, ConsentScope::Read)
            .await
            .unwrap();
        shares::share_case(&f.db, c2.id, f.patient.id, f.provider.id, ConsentScope::Full)
            .await
            .unwrap();

        let shared = get_shared_cases_for_provider(&f.db, f.provider.id)
            .await
            .unwrap();
        assert_eq!(shared.len(), 2);
        assert_eq!(shared[0].case.id, c2.id);
        assert_eq!(shared[0].consent_scope, ConsentScope::Full);
        assert_eq!(shared[1].case.id, c1.id);
        assert_eq!(shared[1].consent_scope, ConsentScope::Read);

        f.db.close().await.unwrap();
    }
}
