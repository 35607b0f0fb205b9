use rusqlite::{params, Connection, OptionalExtension};

use super::like_pattern;
use crate::db::DatabaseError;
use crate::models::*;

const PATIENT_SELECT: &str =
    "SELECT p.id, p.identity_id, i.username, i.contact, p.contact_info
     FROM patients p JOIN identities i ON i.id = p.identity_id";

fn row_to_patient(row: &rusqlite::Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        identity_id: row.get(1)?,
        username: row.get(2)?,
        contact: row.get(3)?,
        contact_info: row.get(4)?,
    })
}

/// Insert a patient profile. A second profile for the same identity
/// surfaces as `DatabaseError::UniqueViolation`.
pub fn insert_patient(
    conn: &Connection,
    identity_id: i64,
    contact_info: Option<&str>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO patients (identity_id, contact_info) VALUES (?1, ?2)",
        params![identity_id, contact_info],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(conn.last_insert_rowid())
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    let sql = format!("{PATIENT_SELECT} WHERE p.id = ?1");
    Ok(conn.query_row(&sql, params![id], row_to_patient).optional()?)
}

pub fn get_patient_by_identity(
    conn: &Connection,
    identity_id: i64,
) -> Result<Option<Patient>, DatabaseError> {
    let sql = format!("{PATIENT_SELECT} WHERE p.identity_id = ?1");
    Ok(conn.query_row(&sql, params![identity_id], row_to_patient).optional()?)
}

pub fn list_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let sql = format!("{PATIENT_SELECT} ORDER BY p.id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], row_to_patient)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Case-insensitive substring match on username. A blank query lists all.
pub fn search_patients(conn: &Connection, query: &str) -> Result<Vec<Patient>, DatabaseError> {
    let query = query.trim();
    if query.is_empty() {
        return list_patients(conn);
    }

    let sql = format!("{PATIENT_SELECT} WHERE i.username LIKE ?1 ESCAPE '\\' ORDER BY p.id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![like_pattern(query)], row_to_patient)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_patient_contact_info(
    conn: &Connection,
    id: i64,
    contact_info: Option<&str>,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE patients SET contact_info = ?2 WHERE id = ?1",
        params![id, contact_info],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("patient", id));
    }
    Ok(())
}

pub fn count_patients(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?)
}
