//! Treatment records attached to completed appointments.
//!
//! At most one treatment per appointment; the UNIQUE constraint on
//! `treatments.appointment_id` enforces it.

use rusqlite::Connection;

use crate::accounts::{ensure_patient_profile, non_blank};
use crate::authorization::{acting_doctor, require_ownership, Actor, AuthContext};
use crate::db::repository as repo;
use crate::db::DatabaseError;
use crate::error::CoreError;
use crate::models::*;

/// Record a treatment on one of the acting doctor's `Completed`
/// appointments. Blank fields are stored as absent.
pub fn add_treatment(
    conn: &Connection,
    ctx: &AuthContext,
    appointment_id: i64,
    treatment: &NewTreatment,
) -> Result<Treatment, CoreError> {
    let doctor = acting_doctor(conn, ctx)?;
    let appointment = repo::get_appointment(conn, appointment_id)?
        .ok_or_else(|| CoreError::not_found("appointment", appointment_id))?;
    require_ownership(&appointment, Actor::Doctor(doctor.id))?;

    if appointment.status != AppointmentStatus::Completed {
        return Err(CoreError::InvalidState {
            appointment_id,
            status: appointment.status,
            expected: AppointmentStatus::Completed,
        });
    }

    let normalized = NewTreatment {
        diagnosis: non_blank(treatment.diagnosis.as_deref()).map(String::from),
        prescription: non_blank(treatment.prescription.as_deref()).map(String::from),
        notes: non_blank(treatment.notes.as_deref()).map(String::from),
    };

    let id = match repo::insert_treatment(conn, appointment_id, &normalized) {
        Ok(id) => id,
        Err(DatabaseError::UniqueViolation(_)) => {
            return Err(CoreError::AlreadyExists(format!(
                "treatment for appointment {appointment_id}"
            )));
        }
        // Appointment removed between the read and the insert.
        Err(DatabaseError::ForeignKeyViolation(_)) => {
            return Err(CoreError::not_found("appointment", appointment_id));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(treatment_id = id, appointment_id, doctor_id = doctor.id, "Treatment recorded");
    repo::get_treatment(conn, id)?.ok_or_else(|| CoreError::not_found("treatment", id))
}

/// The acting patient's treatments with their appointment details.
pub fn view_treatments(
    conn: &Connection,
    ctx: &AuthContext,
) -> Result<Vec<TreatmentRecord>, CoreError> {
    let patient = ensure_patient_profile(conn, ctx)?;
    Ok(repo::list_treatment_records_for_patient(conn, patient.id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointment::{book_appointment, cancel_appointment, complete_appointment};
    use crate::test_support::*;

    fn notes(diagnosis: &str) -> NewTreatment {
        NewTreatment {
            diagnosis: Some(diagnosis.into()),
            prescription: Some("rest".into()),
            notes: None,
        }
    }

    #[test]
    fn full_visit_then_duplicate_treatment() {
        let (conn, admin) = ward();
        let (house, house_ctx) = doctor(&conn, &admin, "house", "Diagnostics");
        let (_, alice) = patient(&conn, "alice");
        let (_, bob) = patient(&conn, "bob");

        let appt = book_appointment(&conn, &alice, house.id, "2024-01-10", "09:00").unwrap();
        assert!(matches!(
            book_appointment(&conn, &bob, house.id, "2024-01-10", "09:00"),
            Err(CoreError::SlotConflict { .. })
        ));
        complete_appointment(&conn, &house_ctx, appt.id).unwrap();

        let treatment = add_treatment(&conn, &house_ctx, appt.id, &notes("flu")).unwrap();
        assert_eq!(treatment.appointment_id, appt.id);
        assert_eq!(treatment.diagnosis.as_deref(), Some("flu"));

        assert!(matches!(
            add_treatment(&conn, &house_ctx, appt.id, &notes("cold")),
            Err(CoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn treatment_requires_completed_appointment() {
        let (conn, admin) = ward();
        let (house, house_ctx) = doctor(&conn, &admin, "house", "Diagnostics");
        let (_, alice) = patient(&conn, "alice");

        let booked = book_appointment(&conn, &alice, house.id, "d1", "t").unwrap();
        assert!(matches!(
            add_treatment(&conn, &house_ctx, booked.id, &notes("flu")),
            Err(CoreError::InvalidState { status: AppointmentStatus::Booked, .. })
        ));

        let cancelled = book_appointment(&conn, &alice, house.id, "d2", "t").unwrap();
        cancel_appointment(&conn, &alice, cancelled.id).unwrap();
        assert!(matches!(
            add_treatment(&conn, &house_ctx, cancelled.id, &notes("flu")),
            Err(CoreError::InvalidState { status: AppointmentStatus::Cancelled, .. })
        ));
    }

    #[test]
    fn treatment_by_other_doctor_is_unauthorized() {
        let (conn, admin) = ward();
        let (house, house_ctx) = doctor(&conn, &admin, "house", "Diagnostics");
        let (_, wilson) = doctor(&conn, &admin, "wilson", "Oncology");
        let (_, alice) = patient(&conn, "alice");
        let appt = book_appointment(&conn, &alice, house.id, "d1", "t").unwrap();
        complete_appointment(&conn, &house_ctx, appt.id).unwrap();

        assert!(matches!(
            add_treatment(&conn, &wilson, appt.id, &notes("flu")),
            Err(CoreError::Unauthorized(_))
        ));
        assert!(matches!(
            add_treatment(&conn, &alice, appt.id, &notes("flu")),
            Err(CoreError::Unauthorized(_))
        ));
    }

    #[test]
    fn treatment_on_missing_appointment_is_not_found() {
        let (conn, admin) = ward();
        let (_, house) = doctor(&conn, &admin, "house", "Diagnostics");
        assert!(matches!(
            add_treatment(&conn, &house, 404, &notes("flu")),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn blank_fields_stored_as_absent() {
        let (conn, admin) = ward();
        let (house, house_ctx) = doctor(&conn, &admin, "house", "Diagnostics");
        let (_, alice) = patient(&conn, "alice");
        let appt = book_appointment(&conn, &alice, house.id, "d1", "t").unwrap();
        complete_appointment(&conn, &house_ctx, appt.id).unwrap();

        let empty = NewTreatment {
            diagnosis: Some("  ".into()),
            ..NewTreatment::default()
        };
        let treatment = add_treatment(&conn, &house_ctx, appt.id, &empty).unwrap();
        assert!(treatment.diagnosis.is_none());
        assert!(treatment.prescription.is_none());
    }

    #[test]
    fn patient_sees_only_own_treatments() {
        let (conn, admin) = ward();
        let (house, house_ctx) = doctor(&conn, &admin, "house", "Diagnostics");
        let (_, alice) = patient(&conn, "alice");
        let (_, bob) = patient(&conn, "bob");

        let a1 = book_appointment(&conn, &alice, house.id, "d1", "t").unwrap();
        let a2 = book_appointment(&conn, &alice, house.id, "d2", "t").unwrap();
        let b1 = book_appointment(&conn, &bob, house.id, "d3", "t").unwrap();
        for id in [a1.id, a2.id, b1.id] {
            complete_appointment(&conn, &house_ctx, id).unwrap();
        }
        add_treatment(&conn, &house_ctx, a1.id, &notes("flu")).unwrap();
        add_treatment(&conn, &house_ctx, b1.id, &notes("sprain")).unwrap();

        let records = view_treatments(&conn, &alice).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].appointment.appointment.id, a1.id);
        assert_eq!(records[0].appointment.doctor_name, "house");
        assert_eq!(records[0].treatment.diagnosis.as_deref(), Some("flu"));
    }

    #[test]
    fn view_treatments_is_patient_only() {
        let (conn, admin) = ward();
        let (_, house) = doctor(&conn, &admin, "house", "Diagnostics");
        assert!(matches!(
            view_treatments(&conn, &house),
            Err(CoreError::Unauthorized(_))
        ));
        assert!(matches!(
            view_treatments(&conn, &admin),
            Err(CoreError::Unauthorized(_))
        ));
    }
}
