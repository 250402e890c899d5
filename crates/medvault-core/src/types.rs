// SPDX-FileCopyrightText: 2026 Medvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain enums and record types shared across the medvault workspace.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The two roles a registered identity can hold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Patient,
    Professional,
}

/// Lifecycle states of a triage case.
///
/// `Open -> Shared` happens automatically on the first consent share.
/// `Closed` is terminal; no transition into it is currently wired up, but the
/// state must stay representable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Open,
    Shared,
    Closed,
}

/// Granularity of access granted to a provider.
///
/// Recorded on every share but not differentiated on the read path: any
/// share grants payload read access.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConsentScope {
    Read,
    Comment,
    Full,
}

/// Security-relevant actions recorded in the append-only audit log.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    UserCreated,
    LoginSuccess,
    LoginFailure,
    CaseCreated,
    CaseShared,
    PayloadRead,
    UnauthorizedPayloadAccess,
    ExportJson,
    ExportPdf,
}

/// A registered user identity as stored in the users table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub role: UserRole,
    pub display_name: String,
    /// SHA-256 hex digest of the login identifier. The raw identifier is
    /// never stored.
    pub identifier_hash: String,
    /// ISO-8601 UTC timestamp.
    pub created_at: String,
}

/// Case metadata row. The encrypted payload is never part of this record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: i64,
    pub patient_user_id: i64,
    pub created_at: String,
    pub status: CaseStatus,
    pub triage_level: Option<String>,
    pub specialty_category: Option<String>,
    pub confidence_level: Option<String>,
}

/// A case visible to a provider through a consent share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedCaseRecord {
    #[serde(flatten)]
    pub case: CaseRecord,
    pub consent_scope: ConsentScope,
}

/// A consent grant linking a case to a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub id: i64,
    pub case_id: i64,
    pub patient_user_id: i64,
    pub provider_user_id: i64,
    pub consent_scope: ConsentScope,
    pub created_at: String,
}

/// A share row joined with the receiving provider's display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareWithProvider {
    pub id: i64,
    pub case_id: i64,
    pub provider_user_id: i64,
    pub provider_display_name: String,
    pub consent_scope: ConsentScope,
    pub created_at: String,
}

/// One row of the append-only audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub user_id: i64,
    pub action: AuditAction,
    pub case_id: Option<i64>,
    pub timestamp: String,
}

/// The sensitive clinical detail attached to a case.
///
/// This document is the only place clinical content appears. It is
/// serialized to JSON and encrypted before it ever reaches storage; the
/// metadata columns on the case row carry only the classifier fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CasePayload {
    /// Free-text clinical summary.
    pub summary: String,
    /// Urgency classification, e.g. "critical", "urgent", "routine".
    #[serde(default)]
    pub triage_level: Option<String>,
    /// Target specialty, e.g. "cardiology".
    #[serde(default)]
    pub specialty_category: Option<String>,
    /// Classifier confidence, e.g. "high", "medium", "low".
    #[serde(default)]
    pub confidence_level: Option<String>,
    /// Optional clinical context supplied by the patient.
    #[serde(default)]
    pub context: Option<String>,
    /// Truncated raw model output kept for audit purposes.
    #[serde(default)]
    pub raw_model_output: Option<String>,
    /// Arbitrary additional fields, kept for forward compatibility.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// The identity on whose behalf an access-checked read is performed.
///
/// Access control matches on the variant explicitly; there is no role
/// string to inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requester {
    Patient { id: i64 },
    Professional { id: i64 },
}

impl Requester {
    /// The requesting user's id, independent of variant.
    pub fn id(&self) -> i64 {
        match self {
            Requester::Patient { id } | Requester::Professional { id } => *id,
        }
    }
}

impl From<&UserRecord> for Requester {
    fn from(user: &UserRecord) -> Self {
        match user.role {
            UserRole::Patient => Requester::Patient { id: user.id },
            UserRole::Professional => Requester::Professional { id: user.id },
        }
    }
}

/// Outcome of an access-checked payload read.
///
/// Denied and not-found are deliberately indistinguishable so an
/// unauthorized caller cannot probe for case existence. The ambiguity is
/// part of the contract, not an accident of a nullable value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadAccess<T> {
    Found(T),
    NotFoundOrDenied,
}

impl<T> PayloadAccess<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, PayloadAccess::Found(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            PayloadAccess::Found(value) => Some(value),
            PayloadAccess::NotFoundOrDenied => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_and_status_round_trip_through_strings() {
        for role in [UserRole::Patient, UserRole::Professional] {
            let parsed = UserRole::from_str(&role.to_string()).expect("should parse back");
            assert_eq!(role, parsed);
        }
        for status in [CaseStatus::Open, CaseStatus::Shared, CaseStatus::Closed] {
            let parsed = CaseStatus::from_str(&status.to_string()).expect("should parse back");
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn consent_scope_uses_snake_case_strings() {
        assert_eq!(ConsentScope::Read.to_string(), "read");
        assert_eq!(ConsentScope::Comment.to_string(), "comment");
        assert_eq!(ConsentScope::Full.to_string(), "full");
        assert!(ConsentScope::from_str("write").is_err());
    }

    #[test]
    fn audit_actions_render_as_snake_case_labels() {
        assert_eq!(AuditAction::UserCreated.to_string(), "user_created");
        assert_eq!(AuditAction::LoginFailure.to_string(), "login_failure");
        assert_eq!(
            AuditAction::UnauthorizedPayloadAccess.to_string(),
            "unauthorized_payload_access"
        );
        assert_eq!(AuditAction::ExportPdf.to_string(), "export_pdf");
    }

    #[test]
    fn requester_is_built_from_the_user_role() {
        let patient = UserRecord {
            id: 7,
            role: UserRole::Patient,
            display_name: "alice".to_string(),
            identifier_hash: "abc".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        assert_eq!(Requester::from(&patient), Requester::Patient { id: 7 });
        assert_eq!(Requester::from(&patient).id(), 7);

        let professional = UserRecord {
            role: UserRole::Professional,
            id: 9,
            ..patient
        };
        assert_eq!(
            Requester::from(&professional),
            Requester::Professional { id: 9 }
        );
    }

    #[test]
    fn payload_access_helpers() {
        let found: PayloadAccess<i32> = PayloadAccess::Found(5);
        assert!(found.is_found());
        assert_eq!(found.into_option(), Some(5));

        let denied: PayloadAccess<i32> = PayloadAccess::NotFoundOrDenied;
        assert!(!denied.is_found());
        assert_eq!(denied.into_option(), None);
    }

    #[test]
    fn case_payload_json_round_trip_preserves_extra_fields() {
        let mut extra = BTreeMap::new();
        extra.insert("red_flags".to_string(), serde_json::json!(["chest pain"]));

        let payload = CasePayload {
            summary: "Mild cough".to_string(),
            triage_level: Some("routine".to_string()),
            specialty_category: None,
            confidence_level: Some("high".to_string()),
            context: None,
            raw_model_output: None,
            extra,
        };

        let json = serde_json::to_string(&payload).expect("should serialize");
        let back: CasePayload = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(payload, back);
    }
}
