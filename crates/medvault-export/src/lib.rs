// SPDX-FileCopyrightText: 2026 Medvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access-checked JSON and PDF handoff exports for the medvault case store.
//!
//! Read-only composition layer: every export re-enforces the payload access
//! check by calling through the store's access-checked read path, so a
//! requester who cannot read a case cannot export it either.

pub mod bundle;
mod pdf;

pub use bundle::{ExportBundle, Exporter, ShareSummary, DISCLAIMER};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use secrecy::SecretString;

    use medvault_case::CaseService;
    use medvault_config::AuthConfig;
    use medvault_core::{
        AuditAction, CasePayload, ConsentScope, PayloadAccess, UserRecord, UserRole,
    };
    use medvault_crypto::{KeyProvider, PayloadCipher};
    use medvault_storage::queries::audit::get_audit_for_user;
    use medvault_storage::Database;

    use super::*;

    struct Fixture {
        exporter: Exporter,
        db: Arc<Database>,
        patient: UserRecord,
        provider: UserRecord,
        case_id: i64,
        _dir: tempfile::TempDir,
    }

    async fn setup() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("export.db");
        let db = Arc::new(Database::open(db_path.to_str().unwrap()).await.unwrap());
        let cipher = Arc::new(PayloadCipher::new(&KeyProvider::from_key([33u8; 32])));
        let config = AuthConfig {
            pbkdf2_iterations: 1_000,
        };
        let service =
            CaseService::with_auth_config(Arc::clone(&db), Arc::clone(&cipher), &config);

        let patient = service
            .register(
                "alice",
                &SecretString::from("pw".to_string()),
                UserRole::Patient,
                None,
            )
            .await
            .unwrap();
        let provider = service
            .register(
                "drbob",
                &SecretString::from("pw".to_string()),
                UserRole::Professional,
                Some("Dr Bob"),
            )
            .await
            .unwrap();

        let payload = CasePayload {
            summary: "Mild cough".to_string(),
            triage_level: Some("routine".to_string()),
            specialty_category: None,
            confidence_level: None,
            context: Some("Dry cough, two days.".to_string()),
            raw_model_output: Some("{\"triage_level\": \"routine\"}".to_string()),
            extra: Default::default(),
        };
        let case = service
            .create_case_for_patient(&patient, &payload)
            .await
            .unwrap();
        service
            .share_case_with_provider(case.id, &patient, "drbob", ConsentScope::Read)
            .await
            .unwrap();

        Fixture {
            exporter: Exporter::new(Arc::clone(&db), cipher),
            db,
            patient,
            provider,
            case_id: case.id,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn bundle_contains_metadata_payload_shares_and_disclaimer() {
        let f = setup().await;
        let bundle = f
            .exporter
            .build_bundle(f.case_id, &f.patient)
            .await
            .unwrap()
            .into_option()
            .expect("owner should be able to export");

        assert_eq!(bundle.case.id, f.case_id);
        assert_eq!(bundle.payload["summary"], "Mild cough");
        assert_eq!(bundle.shares.len(), 1);
        assert_eq!(bundle.shares[0].provider_display_name, "Dr Bob");
        assert_eq!(bundle.disclaimer, DISCLAIMER);
    }

    #[tokio::test]
    async fn export_json_is_parseable_and_audited() {
        let f = setup().await;
        let text = f
            .exporter
            .export_json(f.case_id, &f.patient)
            .await
            .unwrap()
            .into_option()
            .expect("owner should be able to export");

        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["payload"]["summary"], "Mild cough");

        let entries = get_audit_for_user(&f.db, f.patient.id, 1).await.unwrap();
        assert_eq!(entries[0].action, AuditAction::ExportJson);
    }

    #[tokio::test]
    async fn export_pdf_renders_and_audits() {
        let f = setup().await;
        let bytes = f
            .exporter
            .export_pdf(f.case_id, &f.patient)
            .await
            .unwrap()
            .into_option()
            .expect("owner should be able to export");
        assert!(bytes.starts_with(b"%PDF"));

        let entries = get_audit_for_user(&f.db, f.patient.id, 1).await.unwrap();
        assert_eq!(entries[0].action, AuditAction::ExportPdf);
    }

    #[tokio::test]
    async fn consented_provider_can_export_too() {
        let f = setup().await;
        let outcome = f.exporter.export_json(f.case_id, &f.provider).await.unwrap();
        assert!(outcome.is_found());
    }

    #[tokio::test]
    async fn denied_requester_gets_absent_and_no_export_audit_row() {
        let f = setup().await;
        // A professional with no share for this case.
        let service = CaseService::with_auth_config(
            Arc::clone(&f.db),
            Arc::new(PayloadCipher::new(&KeyProvider::from_key([33u8; 32]))),
            &AuthConfig {
                pbkdf2_iterations: 1_000,
            },
        );
        let stranger = service
            .register(
                "drcarol",
                &SecretString::from("pw".to_string()),
                UserRole::Professional,
                None,
            )
            .await
            .unwrap();

        let outcome = f.exporter.export_json(f.case_id, &stranger).await.unwrap();
        assert_eq!(outcome, PayloadAccess::NotFoundOrDenied);

        let actions: Vec<_> = get_audit_for_user(&f.db, stranger.id, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect();
        // The denied read is audited; no export row is written.
        assert_eq!(
            actions,
            vec![
                AuditAction::UnauthorizedPayloadAccess,
                AuditAction::UserCreated,
            ]
        );
    }

    #[tokio::test]
    async fn unknown_case_exports_as_absent() {
        let f = setup().await;
        let outcome = f.exporter.export_pdf(4242, &f.patient).await.unwrap();
        assert_eq!(outcome, PayloadAccess::NotFoundOrDenied);
    }
}
