// SPDX-FileCopyrightText: 2026 Medvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User and credential CRUD operations.
//!
//! No authorization logic lives here; the service layer owns identity
//! semantics. The store only enforces referential integrity and the unique
//! identifier hash.

use medvault_core::MedvaultError;
use rusqlite::params;
use tracing::info;

use crate::database::{map_tr_err, now_utc, Database};
use crate::models::{AuditAction, UserRecord, UserRole};
use crate::queries::{audit, parse_enum_col};

fn user_from_row(row: &rusqlite::Row<'_>) -> Result<UserRecord, rusqlite::Error> {
    Ok(UserRecord {
        id: row.get(0)?,
        role: parse_enum_col(1, row.get::<_, String>(1)?)?,
        display_name: row.get(2)?,
        identifier_hash: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Insert a new user and its `user_created` audit row in one transaction.
///
/// Fails with [`MedvaultError::AlreadyExists`] if the identifier hash is
/// already registered.
pub async fn create_user(
    db: &Database,
    role: UserRole,
    display_name: &str,
    identifier_hash: &str,
) -> Result<UserRecord, MedvaultError> {
    let display_name = display_name.to_string();
    let identifier_hash = identifier_hash.to_string();
    let now = now_utc();

    let record = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO users (role, display_name, identifier_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![role.to_string(), display_name, identifier_hash, now],
            )?;
            let user_id = tx.last_insert_rowid();
            audit::append_audit_in(&tx, user_id, AuditAction::UserCreated, None)?;
            tx.commit()?;
            Ok(UserRecord {
                id: user_id,
                role,
                display_name,
                identifier_hash,
                created_at: now,
            })
        })
        .await
        .map_err(map_tr_err)?;

    info!(user_id = record.id, role = %record.role, "user created");
    Ok(record)
}

/// Retrieve a user row by identifier hash.
pub async fn get_user_by_identifier(
    db: &Database,
    identifier_hash: &str,
) -> Result<Option<UserRecord>, MedvaultError> {
    let identifier_hash = identifier_hash.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, role, display_name, identifier_hash, created_at
                 FROM users WHERE identifier_hash = ?1",
            )?;
            let result = stmt.query_row(params![identifier_hash], user_from_row);
            match result {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Retrieve a user row by id.
pub async fn get_user_by_id(db: &Database, id: i64) -> Result<Option<UserRecord>, MedvaultError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, role, display_name, identifier_hash, created_at
                 FROM users WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], user_from_row);
            match result {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Store the password blob for a user. One row per user.
pub async fn insert_credentials(
    db: &Database,
    user_id: i64,
    password_blob: &str,
) -> Result<(), MedvaultError> {
    let password_blob = password_blob.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO credentials (user_id, password_blob) VALUES (?1, ?2)",
                params![user_id, password_blob],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Retrieve the stored password blob for a user.
pub async fn get_credentials(db: &Database, user_id: i64) -> Result<Option<String>, MedvaultError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT password_blob FROM credentials WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            );
            match result {
                Ok(blob) => Ok(Some(blob)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}
