// SPDX-FileCopyrightText: 2026 Medvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Business logic over the relational store: registration, authentication,
//! case creation, consent sharing, and access-checked payload reads.
//!
//! The service owns identity semantics the store does not know about
//! (password material, username normalization, provider-role checks). It
//! holds its collaborators by `Arc` and is constructed once at the
//! application's composition root.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use medvault_config::AuthConfig;
use medvault_core::{
    AuditAction, CasePayload, CaseRecord, ConsentRecord, ConsentScope, MedvaultError,
    PayloadAccess, Requester, ShareWithProvider, SharedCaseRecord, UserRecord, UserRole,
};
use medvault_crypto::PayloadCipher;
use medvault_storage::queries::{audit, cases, shares, users};
use medvault_storage::Database;

use crate::password;

/// Consent-gated case operations bound to a database and payload cipher.
pub struct CaseService {
    db: Arc<Database>,
    cipher: Arc<PayloadCipher>,
    pbkdf2_iterations: u32,
}

impl CaseService {
    /// Build a service with the default password-hashing parameters.
    pub fn new(db: Arc<Database>, cipher: Arc<PayloadCipher>) -> Self {
        Self {
            db,
            cipher,
            pbkdf2_iterations: password::DEFAULT_ITERATIONS,
        }
    }

    /// Build a service with password-hashing parameters from configuration.
    pub fn with_auth_config(
        db: Arc<Database>,
        cipher: Arc<PayloadCipher>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            db,
            cipher,
            pbkdf2_iterations: config.pbkdf2_iterations,
        }
    }

    /// Register a new user.
    ///
    /// The username is matched case- and whitespace-insensitively: a second
    /// registration of `" Alice "` after `"alice"` fails with
    /// [`MedvaultError::AlreadyExists`]. The role is typed, so an invalid
    /// role is unrepresentable at this boundary.
    pub async fn register(
        &self,
        username: &str,
        password: &SecretString,
        role: UserRole,
        display_name: Option<&str>,
    ) -> Result<UserRecord, MedvaultError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(MedvaultError::Validation(
                "username must not be empty".to_string(),
            ));
        }
        if password.expose_secret().is_empty() {
            return Err(MedvaultError::Validation(
                "password must not be empty".to_string(),
            ));
        }

        let lookup_hash = password::username_lookup_hash(username);
        if users::get_user_by_identifier(&self.db, &lookup_hash)
            .await?
            .is_some()
        {
            return Err(MedvaultError::AlreadyExists(format!(
                "username '{username}' is already registered"
            )));
        }

        let password_blob =
            password::hash_password(password.expose_secret(), self.pbkdf2_iterations)?;

        let user = users::create_user(
            &self.db,
            role,
            display_name.unwrap_or(username),
            &lookup_hash,
        )
        .await?;
        users::insert_credentials(&self.db, user.id, &password_blob).await?;

        info!(user_id = user.id, role = %role, "registered user");
        Ok(user)
    }

    /// Verify credentials and return the user on success.
    ///
    /// An unknown username returns `None` with no audit row (there is no
    /// user id to attribute one to). A wrong password appends a
    /// `login_failure` audit row; a success appends `login_success`.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Option<UserRecord>, MedvaultError> {
        let lookup_hash = password::username_lookup_hash(username);
        let Some(user) = users::get_user_by_identifier(&self.db, &lookup_hash).await? else {
            debug!("authentication attempt for unknown username");
            return Ok(None);
        };

        let credentials = users::get_credentials(&self.db, user.id).await?;
        let verified = credentials
            .map(|blob| {
                password::verify_password(password.expose_secret(), &blob, self.pbkdf2_iterations)
            })
            .unwrap_or(false);

        if !verified {
            warn!(user_id = user.id, "login failure");
            audit::append_audit(&self.db, user.id, AuditAction::LoginFailure, None).await?;
            return Ok(None);
        }

        audit::append_audit(&self.db, user.id, AuditAction::LoginSuccess, None).await?;
        info!(user_id = user.id, "login success");
        Ok(Some(user))
    }

    /// Look up a user by username without a password check.
    pub async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, MedvaultError> {
        let lookup_hash = password::username_lookup_hash(username);
        users::get_user_by_identifier(&self.db, &lookup_hash).await
    }

    /// Create a new case owned by `patient`, encrypting `payload`.
    ///
    /// The classifier fields are copied out of the payload into the case
    /// metadata columns for filtering and display; everything else only
    /// exists as ciphertext.
    pub async fn create_case_for_patient(
        &self,
        patient: &UserRecord,
        payload: &CasePayload,
    ) -> Result<CaseRecord, MedvaultError> {
        let encrypted_blob = self.cipher.encrypt_json(payload)?;
        cases::create_case(
            &self.db,
            patient.id,
            payload.triage_level.clone(),
            payload.specialty_category.clone(),
            payload.confidence_level.clone(),
            encrypted_blob,
        )
        .await
    }

    /// All case metadata owned by `patient`, newest first.
    pub async fn get_patient_cases(
        &self,
        patient: &UserRecord,
    ) -> Result<Vec<CaseRecord>, MedvaultError> {
        cases::get_cases_for_patient(&self.db, patient.id).await
    }

    /// All cases shared with `provider`, with consent scope, newest first.
    pub async fn get_provider_cases(
        &self,
        provider: &UserRecord,
    ) -> Result<Vec<SharedCaseRecord>, MedvaultError> {
        cases::get_shared_cases_for_provider(&self.db, provider.id).await
    }

    /// Decrypt and return the payload for `case_id`, enforcing consent.
    pub async fn read_case_payload(
        &self,
        case_id: i64,
        requester: &UserRecord,
    ) -> Result<PayloadAccess<CasePayload>, MedvaultError> {
        let outcome =
            cases::get_case_payload(&self.db, case_id, Requester::from(requester), &self.cipher)
                .await?;
        match outcome {
            PayloadAccess::Found(document) => {
                let payload = serde_json::from_value(document).map_err(|e| {
                    MedvaultError::Internal(format!(
                        "stored payload does not match the case payload shape: {e}"
                    ))
                })?;
                Ok(PayloadAccess::Found(payload))
            }
            PayloadAccess::NotFoundOrDenied => Ok(PayloadAccess::NotFoundOrDenied),
        }
    }

    /// Grant a professional access to `case_id`.
    ///
    /// Returns `Ok(None)` if `provider_username` does not resolve to any
    /// user. Fails with [`MedvaultError::Permission`] if the resolved user is
    /// not a professional, or if `patient` does not own the case -- ownership
    /// is re-verified here independently of the store's read-path check.
    pub async fn share_case_with_provider(
        &self,
        case_id: i64,
        patient: &UserRecord,
        provider_username: &str,
        consent_scope: ConsentScope,
    ) -> Result<Option<ConsentRecord>, MedvaultError> {
        let Some(provider) = self.get_user_by_username(provider_username).await? else {
            warn!(case_id, "share target username does not resolve");
            return Ok(None);
        };

        if provider.role != UserRole::Professional {
            return Err(MedvaultError::Permission(format!(
                "user '{provider_username}' is not a professional"
            )));
        }

        match cases::get_case(&self.db, case_id).await? {
            Some(case) if case.patient_user_id == patient.id => {}
            _ => {
                return Err(MedvaultError::Permission(
                    "patient does not own this case".to_string(),
                ));
            }
        }

        let share =
            shares::share_case(&self.db, case_id, patient.id, provider.id, consent_scope).await?;
        Ok(Some(share))
    }

    /// All share records for a case, with provider display names.
    pub async fn get_shares_for_case(
        &self,
        case_id: i64,
    ) -> Result<Vec<ShareWithProvider>, MedvaultError> {
        shares::get_shares_for_case(&self.db, case_id).await
    }
}
