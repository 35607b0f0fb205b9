//! Appointment lifecycle: booking, completion, cancellation.
//!
//! ```text
//!            complete (doctor)
//!   Booked ─────────────────────▶ Completed
//!      │
//!      └──────────────────────────▶ Cancelled
//!            cancel (patient, only from Booked)
//! ```
//!
//! A slot is (doctor, date, time) with `date`/`time` compared verbatim. The
//! storage constraint on that triple decides between competing bookings and
//! ignores status, so a cancelled slot is never offered again.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::authorization::{
    acting_doctor, acting_patient, require_ownership, resolve_actor, Actor, AuthContext,
};
use crate::db::repository as repo;
use crate::db::DatabaseError;
use crate::error::CoreError;
use crate::models::*;

fn load_appointment(conn: &Connection, appointment_id: i64) -> Result<Appointment, CoreError> {
    repo::get_appointment(conn, appointment_id)?
        .ok_or_else(|| CoreError::not_found("appointment", appointment_id))
}

/// Book `doctor_id` at (`date`, `time`) for the acting patient.
pub fn book_appointment(
    conn: &Connection,
    ctx: &AuthContext,
    doctor_id: i64,
    date: &str,
    time: &str,
) -> Result<Appointment, CoreError> {
    let patient = acting_patient(conn, ctx)?;
    if date.trim().is_empty() || time.trim().is_empty() {
        return Err(CoreError::InvalidInput("date and time are required".into()));
    }

    // IMMEDIATE: take the write lock before the doctor read, so racing
    // bookings queue on busy_timeout instead of failing a lock upgrade.
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    if repo::get_doctor(&tx, doctor_id)?.is_none() {
        return Err(CoreError::not_found("doctor", doctor_id));
    }
    // No availability pre-read: the UNIQUE constraint is the only arbiter.
    let id = match repo::insert_appointment(&tx, patient.id, doctor_id, date, time) {
        Ok(id) => id,
        Err(DatabaseError::UniqueViolation(_)) => {
            tracing::info!(doctor_id, date, time, "Slot already booked");
            return Err(CoreError::SlotConflict {
                doctor_id,
                date: date.to_string(),
                time: time.to_string(),
            });
        }
        Err(DatabaseError::ForeignKeyViolation(_)) => {
            return Err(CoreError::not_found("doctor", doctor_id));
        }
        Err(e) => return Err(e.into()),
    };
    tx.commit()?;

    tracing::info!(appointment_id = id, patient_id = patient.id, doctor_id, "Appointment booked");
    load_appointment(conn, id)
}

/// Mark the acting doctor's appointment `Completed`.
///
/// Any current status is accepted, matching long-standing behaviour;
/// completing a non-Booked appointment is logged as a warning.
pub fn complete_appointment(
    conn: &Connection,
    ctx: &AuthContext,
    appointment_id: i64,
) -> Result<Appointment, CoreError> {
    let doctor = acting_doctor(conn, ctx)?;
    let appointment = load_appointment(conn, appointment_id)?;
    require_ownership(&appointment, Actor::Doctor(doctor.id))?;

    if appointment.status != AppointmentStatus::Booked {
        tracing::warn!(
            appointment_id,
            status = %appointment.status,
            "Completing an appointment that is not Booked"
        );
    }
    repo::update_appointment_status(conn, appointment_id, AppointmentStatus::Completed)?;

    tracing::info!(appointment_id, doctor_id = doctor.id, "Appointment completed");
    load_appointment(conn, appointment_id)
}

/// Cancel the acting patient's appointment. Only `Booked` appointments
/// can be cancelled.
pub fn cancel_appointment(
    conn: &Connection,
    ctx: &AuthContext,
    appointment_id: i64,
) -> Result<Appointment, CoreError> {
    let patient = acting_patient(conn, ctx)?;
    let appointment = load_appointment(conn, appointment_id)?;
    require_ownership(&appointment, Actor::Patient(patient.id))?;

    let invalid = |status| CoreError::InvalidState {
        appointment_id,
        status,
        expected: AppointmentStatus::Booked,
    };
    if appointment.status != AppointmentStatus::Booked {
        return Err(invalid(appointment.status));
    }

    let moved = repo::transition_appointment_status(
        conn,
        appointment_id,
        AppointmentStatus::Booked,
        AppointmentStatus::Cancelled,
    )?;
    if !moved {
        // Completed by the doctor between our read and write.
        let current = load_appointment(conn, appointment_id)?;
        return Err(invalid(current.status));
    }

    tracing::info!(appointment_id, patient_id = patient.id, "Appointment cancelled");
    load_appointment(conn, appointment_id)
}

/// One appointment with names, visible to admins and to the doctor or
/// patient it belongs to.
pub fn view_appointment(
    conn: &Connection,
    ctx: &AuthContext,
    appointment_id: i64,
) -> Result<AppointmentEntry, CoreError> {
    let actor = resolve_actor(conn, ctx)?;
    let entry = repo::get_appointment_entry(conn, appointment_id)?
        .ok_or_else(|| CoreError::not_found("appointment", appointment_id))?;
    if actor != Actor::Admin {
        require_ownership(&entry.appointment, actor)?;
    }
    Ok(entry)
}

pub fn list_doctor_appointments(
    conn: &Connection,
    ctx: &AuthContext,
) -> Result<Vec<AppointmentEntry>, CoreError> {
    let doctor = acting_doctor(conn, ctx)?;
    Ok(repo::list_appointments(conn, &AppointmentFilter::for_doctor(doctor.id))?)
}

pub fn list_patient_appointments(
    conn: &Connection,
    ctx: &AuthContext,
) -> Result<Vec<AppointmentEntry>, CoreError> {
    let patient = acting_patient(conn, ctx)?;
    Ok(repo::list_appointments(conn, &AppointmentFilter::for_patient(patient.id))?)
}
