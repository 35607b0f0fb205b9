use rusqlite::{params, Connection, OptionalExtension};

use super::appointment::{EntryRow, ENTRY_COLUMNS, ENTRY_JOINS};
use super::like_pattern;
use crate::db::DatabaseError;
use crate::models::*;

fn row_to_treatment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Treatment> {
    Ok(Treatment {
        id: row.get(0)?,
        appointment_id: row.get(1)?,
        diagnosis: row.get(2)?,
        prescription: row.get(3)?,
        notes: row.get(4)?,
    })
}

/// Insert a treatment. A second treatment for the same appointment
/// surfaces as `DatabaseError::UniqueViolation`.
pub fn insert_treatment(
    conn: &Connection,
    appointment_id: i64,
    treatment: &NewTreatment,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO treatments (appointment_id, diagnosis, prescription, notes)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            appointment_id,
            treatment.diagnosis,
            treatment.prescription,
            treatment.notes,
        ],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(conn.last_insert_rowid())
}

pub fn get_treatment(conn: &Connection, id: i64) -> Result<Option<Treatment>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT id, appointment_id, diagnosis, prescription, notes FROM treatments WHERE id = ?1",
            params![id],
            row_to_treatment,
        )
        .optional()?)
}

fn collect_records(
    conn: &Connection,
    where_clause: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<TreatmentRecord>, DatabaseError> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS}, t.id, t.diagnosis, t.prescription, t.notes
         FROM treatments t
         JOIN appointments a ON a.id = t.appointment_id
         {ENTRY_JOINS}
         {where_clause}
         ORDER BY t.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, |row| {
            let entry = EntryRow::read(row)?;
            let treatment_id: i64 = row.get(9)?;
            let diagnosis: Option<String> = row.get(10)?;
            let prescription: Option<String> = row.get(11)?;
            let notes: Option<String> = row.get(12)?;
            Ok((entry, treatment_id, diagnosis, prescription, notes))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(entry, id, diagnosis, prescription, notes)| {
            let appointment = entry.into_entry()?;
            Ok(TreatmentRecord {
                treatment: Treatment {
                    id,
                    appointment_id: appointment.appointment.id,
                    diagnosis,
                    prescription,
                    notes,
                },
                appointment,
            })
        })
        .collect()
}

/// Treatments on a patient's `Completed` appointments. Completed
/// appointments with no treatment are simply absent.
pub fn list_treatment_records_for_patient(
    conn: &Connection,
    patient_id: i64,
) -> Result<Vec<TreatmentRecord>, DatabaseError> {
    collect_records(
        conn,
        "WHERE a.patient_id = ?1 AND a.status = ?2",
        params![patient_id, AppointmentStatus::Completed.as_str()],
    )
}

pub fn list_treatment_records(conn: &Connection) -> Result<Vec<TreatmentRecord>, DatabaseError> {
    collect_records(conn, "", params![])
}

/// Case-insensitive substring match on patient username, diagnosis,
/// prescription or notes. A blank query lists all.
pub fn search_treatment_records(
    conn: &Connection,
    query: &str,
) -> Result<Vec<TreatmentRecord>, DatabaseError> {
    let query = query.trim();
    if query.is_empty() {
        return list_treatment_records(conn);
    }

    collect_records(
        conn,
        "WHERE pi.username LIKE ?1 ESCAPE '\\'
            OR t.diagnosis LIKE ?1 ESCAPE '\\'
            OR t.prescription LIKE ?1 ESCAPE '\\'
            OR t.notes LIKE ?1 ESCAPE '\\'",
        params![like_pattern(query)],
    )
}

/// Count treatments attached to appointments matching `filter`.
pub fn count_treatments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM treatments t
         JOIN appointments a ON a.id = t.appointment_id
         WHERE (?1 IS NULL OR a.patient_id = ?1)
           AND (?2 IS NULL OR a.doctor_id = ?2)
           AND (?3 IS NULL OR a.status = ?3)",
        params![filter.patient_id, filter.doctor_id, filter.status.map(|s| s.as_str())],
        |row| row.get(0),
    )?;
    Ok(count)
}
