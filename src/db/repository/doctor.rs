use rusqlite::{params, Connection, OptionalExtension};

use super::like_pattern;
use crate::db::DatabaseError;
use crate::models::*;

const DOCTOR_SELECT: &str =
    "SELECT d.id, d.identity_id, i.username, i.contact, d.specialization, d.availability
     FROM doctors d JOIN identities i ON i.id = d.identity_id";

fn row_to_doctor(row: &rusqlite::Row<'_>) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        id: row.get(0)?,
        identity_id: row.get(1)?,
        username: row.get(2)?,
        contact: row.get(3)?,
        specialization: row.get(4)?,
        availability: row.get(5)?,
    })
}

pub fn insert_doctor(
    conn: &Connection,
    identity_id: i64,
    specialization: &str,
    availability: Option<&str>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (identity_id, specialization, availability) VALUES (?1, ?2, ?3)",
        params![identity_id, specialization, availability],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(conn.last_insert_rowid())
}

pub fn get_doctor(conn: &Connection, id: i64) -> Result<Option<Doctor>, DatabaseError> {
    let sql = format!("{DOCTOR_SELECT} WHERE d.id = ?1");
    Ok(conn.query_row(&sql, params![id], row_to_doctor).optional()?)
}

pub fn get_doctor_by_identity(
    conn: &Connection,
    identity_id: i64,
) -> Result<Option<Doctor>, DatabaseError> {
    let sql = format!("{DOCTOR_SELECT} WHERE d.identity_id = ?1");
    Ok(conn.query_row(&sql, params![identity_id], row_to_doctor).optional()?)
}

pub fn list_doctors(conn: &Connection) -> Result<Vec<Doctor>, DatabaseError> {
    let sql = format!("{DOCTOR_SELECT} ORDER BY d.id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], row_to_doctor)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Case-insensitive substring match on username or specialization.
/// A blank query lists every doctor.
pub fn search_doctors(conn: &Connection, query: &str) -> Result<Vec<Doctor>, DatabaseError> {
    let query = query.trim();
    if query.is_empty() {
        return list_doctors(conn);
    }

    let sql = format!(
        "{DOCTOR_SELECT}
         WHERE i.username LIKE ?1 ESCAPE '\\' OR d.specialization LIKE ?1 ESCAPE '\\'
         ORDER BY d.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![like_pattern(query)], row_to_doctor)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_doctor_profile(
    conn: &Connection,
    id: i64,
    specialization: &str,
    availability: Option<&str>,
) -> Result<(), DatabaseError> {
    let updated = conn
        .execute(
            "UPDATE doctors SET specialization = ?2, availability = ?3 WHERE id = ?1",
            params![id, specialization, availability],
        )
        .map_err(DatabaseError::from_write)?;
    if updated == 0 {
        return Err(DatabaseError::not_found("doctor", id));
    }
    Ok(())
}

pub fn count_doctors(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM doctors", [], |row| row.get(0))?)
}

/// Doctor headcount per specialization, ordered by specialization.
pub fn specialization_counts(conn: &Connection) -> Result<Vec<(String, i64)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT specialization, COUNT(id) FROM doctors
         GROUP BY specialization
         ORDER BY specialization",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
