// SPDX-FileCopyrightText: 2026 Medvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only audit log operations.
//!
//! Rows are only ever inserted. Operations that must stay consistent with
//! their audit trail ([`users::create_user`], [`cases::create_case`],
//! [`shares::share_case`]) call [`append_audit_in`] inside their own
//! transaction so audit and data commit or roll back together.
//!
//! [`users::create_user`]: crate::queries::users::create_user
//! [`cases::create_case`]: crate::queries::cases::create_case
//! [`shares::share_case`]: crate::queries::shares::share_case

use medvault_core::MedvaultError;
use rusqlite::params;
use tracing::debug;

use crate::database::{map_tr_err, now_utc, Database};
use crate::models::{AuditAction, AuditEntry};
use crate::queries::parse_enum_col;

/// Append an audit row on an existing connection or transaction.
///
/// Takes `&rusqlite::Connection` so it composes inside a caller's
/// transaction (`Transaction` derefs to `Connection`) as well as standalone.
pub fn append_audit_in(
    conn: &rusqlite::Connection,
    user_id: i64,
    action: AuditAction,
    case_id: Option<i64>,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO audit_log (user_id, action, case_id, timestamp)
         VALUES (?1, ?2, ?3, ?4)",
        params![user_id, action.to_string(), case_id, now_utc()],
    )?;
    Ok(())
}

/// Append an audit row in its own transaction.
pub async fn append_audit(
    db: &Database,
    user_id: i64,
    action: AuditAction,
    case_id: Option<i64>,
) -> Result<(), MedvaultError> {
    db.connection()
        .call(move |conn| append_audit_in(conn, user_id, action, case_id))
        .await
        .map_err(map_tr_err)?;
    debug!(user_id, action = %action, ?case_id, "audit entry appended");
    Ok(())
}

/// Recent audit entries for a user, newest first.
pub async fn get_audit_for_user(
    db: &Database,
    user_id: i64,
    limit: i64,
) -> Result<Vec<AuditEntry>, MedvaultError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, action, case_id, timestamp
                 FROM audit_log WHERE user_id = ?1
                 ORDER BY id DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![user_id, limit], |row| {
                Ok(AuditEntry {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    action: parse_enum_col(2, row.get::<_, String>(2)?)?,
                    case_id: row.get(3)?,
                    timestamp: row.get(4)?,
                })
            })?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
        .map_err(map_tr_err)
}
