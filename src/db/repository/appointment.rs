use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};

use super::like_pattern;
use crate::db::DatabaseError;
use crate::models::*;

/// Columns 0..=8 of every appointment listing, in `EntryRow::read` order.
pub(super) const ENTRY_COLUMNS: &str =
    "a.id, a.patient_id, a.doctor_id, a.date, a.time, a.status, pi.username, di.username, d.specialization";

pub(super) const ENTRY_JOINS: &str =
    "JOIN patients p ON p.id = a.patient_id
     JOIN identities pi ON pi.id = p.identity_id
     JOIN doctors d ON d.id = a.doctor_id
     JOIN identities di ON di.id = d.identity_id";

/// Raw listing row; the status is parsed outside the rusqlite closure.
pub(super) struct EntryRow {
    id: i64,
    patient_id: i64,
    doctor_id: i64,
    date: String,
    time: String,
    status: String,
    patient_name: String,
    doctor_name: String,
    specialization: String,
}

impl EntryRow {
    pub(super) fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            doctor_id: row.get(2)?,
            date: row.get(3)?,
            time: row.get(4)?,
            status: row.get(5)?,
            patient_name: row.get(6)?,
            doctor_name: row.get(7)?,
            specialization: row.get(8)?,
        })
    }

    pub(super) fn into_entry(self) -> Result<AppointmentEntry, DatabaseError> {
        Ok(AppointmentEntry {
            appointment: Appointment {
                id: self.id,
                patient_id: self.patient_id,
                doctor_id: self.doctor_id,
                date: self.date,
                time: self.time,
                status: AppointmentStatus::from_str(&self.status)?,
            },
            patient_name: self.patient_name,
            doctor_name: self.doctor_name,
            specialization: self.specialization,
        })
    }
}

fn collect_entries(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<AppointmentEntry>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, EntryRow::read)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(EntryRow::into_entry).collect()
}

/// Insert a `Booked` appointment. The slot constraint on
/// (doctor_id, date, time) is the arbiter between concurrent bookings: a
/// taken slot surfaces as `DatabaseError::UniqueViolation` whatever the
/// existing appointment's status.
pub fn insert_appointment(
    conn: &Connection,
    patient_id: i64,
    doctor_id: i64,
    date: &str,
    time: &str,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (patient_id, doctor_id, date, time, status)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![patient_id, doctor_id, date, time, AppointmentStatus::Booked.as_str()],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(conn.last_insert_rowid())
}

pub fn get_appointment(conn: &Connection, id: i64) -> Result<Option<Appointment>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, patient_id, doctor_id, date, time, status FROM appointments WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((id, patient_id, doctor_id, date, time, status)) => Ok(Some(Appointment {
            id,
            patient_id,
            doctor_id,
            date,
            time,
            status: AppointmentStatus::from_str(&status)?,
        })),
        None => Ok(None),
    }
}

pub fn get_appointment_entry(
    conn: &Connection,
    id: i64,
) -> Result<Option<AppointmentEntry>, DatabaseError> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM appointments a {ENTRY_JOINS} WHERE a.id = ?1");
    let mut entries = collect_entries(conn, &sql, params![id])?;
    Ok(entries.pop())
}

/// Unconditionally set an appointment's status.
pub fn update_appointment_status(
    conn: &Connection,
    id: i64,
    status: AppointmentStatus,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE appointments SET status = ?2 WHERE id = ?1",
        params![id, status.as_str()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::not_found("appointment", id));
    }
    Ok(())
}

/// Move an appointment from `from` to `to` in one statement.
///
/// Returns `false` when the row was not in `from` at write time, so a
/// concurrent transition cannot be overwritten.
pub fn transition_appointment_status(
    conn: &Connection,
    id: i64,
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE appointments SET status = ?3 WHERE id = ?1 AND status = ?2",
        params![id, from.as_str(), to.as_str()],
    )?;
    Ok(updated > 0)
}

pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<AppointmentEntry>, DatabaseError> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM appointments a {ENTRY_JOINS}
         WHERE (?1 IS NULL OR a.patient_id = ?1)
           AND (?2 IS NULL OR a.doctor_id = ?2)
           AND (?3 IS NULL OR a.status = ?3)
         ORDER BY a.id"
    );
    collect_entries(
        conn,
        &sql,
        params![filter.patient_id, filter.doctor_id, filter.status.map(|s| s.as_str())],
    )
}

pub fn count_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM appointments a
         WHERE (?1 IS NULL OR a.patient_id = ?1)
           AND (?2 IS NULL OR a.doctor_id = ?2)
           AND (?3 IS NULL OR a.status = ?3)",
        params![filter.patient_id, filter.doctor_id, filter.status.map(|s| s.as_str())],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Appointments whose patient or doctor username contains `query`
/// (case-insensitive). One query with an OR, so each appointment appears once.
pub fn search_appointments(
    conn: &Connection,
    query: &str,
) -> Result<Vec<AppointmentEntry>, DatabaseError> {
    let query = query.trim();
    if query.is_empty() {
        return list_appointments(conn, &AppointmentFilter::default());
    }

    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM appointments a {ENTRY_JOINS}
         WHERE pi.username LIKE ?1 ESCAPE '\\' OR di.username LIKE ?1 ESCAPE '\\'
         ORDER BY a.id"
    );
    collect_entries(conn, &sql, params![like_pattern(query)])
}
