use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

type IdentityParts = (i64, String, String, Option<String>);

fn read_parts(row: &rusqlite::Row<'_>) -> rusqlite::Result<IdentityParts> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn into_identity((id, username, role, contact): IdentityParts) -> Result<Identity, DatabaseError> {
    Ok(Identity {
        id,
        username,
        role: Role::from_str(&role)?,
        contact,
    })
}

/// Insert an identity and return its id. A taken username surfaces as
/// `DatabaseError::UniqueViolation`.
pub fn insert_identity(
    conn: &Connection,
    username: &str,
    password_hash: &str,
    role: Role,
    contact: Option<&str>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO identities (username, password_hash, role, contact) VALUES (?1, ?2, ?3, ?4)",
        params![username, password_hash, role.as_str(), contact],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(conn.last_insert_rowid())
}

pub fn get_identity(conn: &Connection, id: i64) -> Result<Option<Identity>, DatabaseError> {
    conn.query_row(
        "SELECT id, username, role, contact FROM identities WHERE id = ?1",
        params![id],
        read_parts,
    )
    .optional()?
    .map(into_identity)
    .transpose()
}

/// Identity plus its stored password hash, for login only.
pub fn get_credentials(
    conn: &Connection,
    username: &str,
) -> Result<Option<(Identity, String)>, DatabaseError> {
    let found = conn
        .query_row(
            "SELECT id, username, role, contact, password_hash FROM identities WHERE username = ?1",
            params![username],
            |row| Ok((read_parts(row)?, row.get::<_, String>(4)?)),
        )
        .optional()?;

    match found {
        Some((parts, hash)) => Ok(Some((into_identity(parts)?, hash))),
        None => Ok(None),
    }
}

pub fn update_identity(
    conn: &Connection,
    id: i64,
    username: &str,
    contact: Option<&str>,
) -> Result<(), DatabaseError> {
    let updated = conn
        .execute(
            "UPDATE identities SET username = ?2, contact = ?3 WHERE id = ?1",
            params![id, username, contact],
        )
        .map_err(DatabaseError::from_write)?;
    if updated == 0 {
        return Err(DatabaseError::not_found("identity", id));
    }
    Ok(())
}

pub fn update_password_hash(
    conn: &Connection,
    id: i64,
    password_hash: &str,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE identities SET password_hash = ?2 WHERE id = ?1",
        params![id, password_hash],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("identity", id));
    }
    Ok(())
}

/// Delete an identity. Its doctor/patient profile goes with it (ON DELETE CASCADE).
pub fn delete_identity(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn
        .execute("DELETE FROM identities WHERE id = ?1", params![id])
        .map_err(DatabaseError::from_write)?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("identity", id));
    }
    Ok(())
}

pub fn count_identities_with_role(conn: &Connection, role: Role) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM identities WHERE role = ?1",
        params![role.as_str()],
        |row| row.get(0),
    )?;
    Ok(count)
}
