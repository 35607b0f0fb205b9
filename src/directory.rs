//! Directory: searches over doctors, patients, appointments and treatments,
//! plus administrator management of doctor and patient records.
//!
//! Searches are case-insensitive substring matches; a blank query returns
//! everything, ordered by id.

use rusqlite::Connection;

use crate::accounts::{non_blank, username_taken};
use crate::authorization::{require_any_role, require_role, AuthContext};
use crate::crypto::hash_password;
use crate::db::repository as repo;
use crate::db::DatabaseError;
use crate::error::CoreError;
use crate::models::*;

// ─── Searches ─────────────────────────────────────────────────────────────────

/// Doctors whose username or specialization contains `query`. Open to
/// admins and to patients choosing whom to book.
pub fn search_doctors(
    conn: &Connection,
    ctx: &AuthContext,
    query: &str,
) -> Result<Vec<Doctor>, CoreError> {
    require_any_role(ctx, &[Role::Admin, Role::Patient])?;
    Ok(repo::search_doctors(conn, query)?)
}

pub fn search_patients(
    conn: &Connection,
    ctx: &AuthContext,
    query: &str,
) -> Result<Vec<Patient>, CoreError> {
    require_role(ctx, Role::Admin)?;
    Ok(repo::search_patients(conn, query)?)
}

/// Appointments whose patient or doctor username contains `query`.
pub fn search_appointments(
    conn: &Connection,
    ctx: &AuthContext,
    query: &str,
) -> Result<Vec<AppointmentEntry>, CoreError> {
    require_role(ctx, Role::Admin)?;
    Ok(repo::search_appointments(conn, query)?)
}

/// Treatments matching on patient username, diagnosis, prescription or notes.
pub fn search_treatments(
    conn: &Connection,
    ctx: &AuthContext,
    query: &str,
) -> Result<Vec<TreatmentRecord>, CoreError> {
    require_role(ctx, Role::Admin)?;
    Ok(repo::search_treatment_records(conn, query)?)
}

// ─── Doctor management ────────────────────────────────────────────────────────

pub fn list_doctors(conn: &Connection, ctx: &AuthContext) -> Result<Vec<Doctor>, CoreError> {
    require_role(ctx, Role::Admin)?;
    Ok(repo::list_doctors(conn)?)
}

pub fn get_doctor(conn: &Connection, ctx: &AuthContext, doctor_id: i64) -> Result<Doctor, CoreError> {
    require_role(ctx, Role::Admin)?;
    repo::get_doctor(conn, doctor_id)?.ok_or_else(|| CoreError::not_found("doctor", doctor_id))
}

/// Create a doctor identity and profile together.
pub fn add_doctor(
    conn: &Connection,
    ctx: &AuthContext,
    new_doctor: &NewDoctor,
) -> Result<Doctor, CoreError> {
    require_role(ctx, Role::Admin)?;

    let username = new_doctor.username.trim();
    let specialization = new_doctor.specialization.trim();
    if username.is_empty() || new_doctor.password.is_empty() || specialization.is_empty() {
        return Err(CoreError::InvalidInput(
            "username, password and specialization are required".into(),
        ));
    }

    let tx = conn.unchecked_transaction()?;
    let identity_id = repo::insert_identity(
        &tx,
        username,
        &hash_password(&new_doctor.password),
        Role::Doctor,
        non_blank(new_doctor.contact.as_deref()),
    )
    .map_err(|e| username_taken(e, username))?;
    let doctor_id = repo::insert_doctor(
        &tx,
        identity_id,
        specialization,
        non_blank(new_doctor.availability.as_deref()),
    )?;
    tx.commit()?;

    tracing::info!(doctor_id, identity_id, "Doctor added");
    repo::get_doctor(conn, doctor_id)?.ok_or_else(|| CoreError::not_found("doctor", doctor_id))
}

/// Replace a doctor's account and profile fields. The password only
/// changes when `update.password` holds a non-blank value, trimmed as at
/// signup.
pub fn edit_doctor(
    conn: &Connection,
    ctx: &AuthContext,
    doctor_id: i64,
    update: &DoctorUpdate,
) -> Result<Doctor, CoreError> {
    require_role(ctx, Role::Admin)?;
    let doctor = repo::get_doctor(conn, doctor_id)?
        .ok_or_else(|| CoreError::not_found("doctor", doctor_id))?;

    let username = update.username.trim();
    let specialization = update.specialization.trim();
    if username.is_empty() || specialization.is_empty() {
        return Err(CoreError::InvalidInput(
            "username and specialization are required".into(),
        ));
    }

    let tx = conn.unchecked_transaction()?;
    repo::update_identity(&tx, doctor.identity_id, username, non_blank(update.contact.as_deref()))
        .map_err(|e| username_taken(e, username))?;
    if let Some(password) = non_blank(update.password.as_deref()) {
        repo::update_password_hash(&tx, doctor.identity_id, &hash_password(password))?;
    }
    repo::update_doctor_profile(
        &tx,
        doctor_id,
        specialization,
        non_blank(update.availability.as_deref()),
    )?;
    tx.commit()?;

    tracing::info!(doctor_id, "Doctor updated");
    repo::get_doctor(conn, doctor_id)?.ok_or_else(|| CoreError::not_found("doctor", doctor_id))
}

/// Delete a doctor and their identity. Blocked while any appointment,
/// whatever its status, references the doctor.
pub fn delete_doctor(conn: &Connection, ctx: &AuthContext, doctor_id: i64) -> Result<(), CoreError> {
    require_role(ctx, Role::Admin)?;
    let doctor = repo::get_doctor(conn, doctor_id)?
        .ok_or_else(|| CoreError::not_found("doctor", doctor_id))?;

    let appointments = repo::count_appointments(conn, &AppointmentFilter::for_doctor(doctor_id))?;
    if appointments > 0 {
        return Err(has_appointments("doctor", doctor_id));
    }

    delete_profile_identity(conn, doctor.identity_id, "doctor", doctor_id)?;
    tracing::info!(doctor_id, "Doctor deleted");
    Ok(())
}

// ─── Patient management ───────────────────────────────────────────────────────

pub fn list_patients(conn: &Connection, ctx: &AuthContext) -> Result<Vec<Patient>, CoreError> {
    require_role(ctx, Role::Admin)?;
    Ok(repo::list_patients(conn)?)
}

pub fn get_patient(conn: &Connection, ctx: &AuthContext, patient_id: i64) -> Result<Patient, CoreError> {
    require_role(ctx, Role::Admin)?;
    repo::get_patient(conn, patient_id)?.ok_or_else(|| CoreError::not_found("patient", patient_id))
}

pub fn edit_patient(
    conn: &Connection,
    ctx: &AuthContext,
    patient_id: i64,
    contact_info: Option<&str>,
) -> Result<Patient, CoreError> {
    require_role(ctx, Role::Admin)?;
    repo::update_patient_contact_info(conn, patient_id, non_blank(contact_info))?;
    tracing::info!(patient_id, "Patient updated");
    repo::get_patient(conn, patient_id)?.ok_or_else(|| CoreError::not_found("patient", patient_id))
}

/// Delete a patient and their identity. Blocked while any appointment
/// references the patient.
pub fn delete_patient(conn: &Connection, ctx: &AuthContext, patient_id: i64) -> Result<(), CoreError> {
    require_role(ctx, Role::Admin)?;
    let patient = repo::get_patient(conn, patient_id)?
        .ok_or_else(|| CoreError::not_found("patient", patient_id))?;

    let appointments = repo::count_appointments(conn, &AppointmentFilter::for_patient(patient_id))?;
    if appointments > 0 {
        return Err(has_appointments("patient", patient_id));
    }

    delete_profile_identity(conn, patient.identity_id, "patient", patient_id)?;
    tracing::info!(patient_id, "Patient deleted");
    Ok(())
}

fn has_appointments(entity: &str, id: i64) -> CoreError {
    CoreError::HasDependents {
        entity: entity.into(),
        id,
        dependents: "appointments".into(),
    }
}

/// Remove the identity behind a profile; the profile row cascades. A
/// booking that slipped in after the count still blocks via the foreign key.
fn delete_profile_identity(
    conn: &Connection,
    identity_id: i64,
    entity: &str,
    profile_id: i64,
) -> Result<(), CoreError> {
    let tx = conn.unchecked_transaction()?;
    match repo::delete_identity(&tx, identity_id) {
        Ok(()) => {}
        Err(DatabaseError::ForeignKeyViolation(_)) => return Err(has_appointments(entity, profile_id)),
        Err(e) => return Err(e.into()),
    }
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::authenticate;
    use crate::test_support::*;

    #[test]
    fn add_doctor_creates_identity_and_profile() {
        let (conn, admin) = ward();
        let doctor = add_doctor(&conn, &admin, &new_doctor("house", "Diagnostics")).unwrap();
        assert_eq!(doctor.username, "house");
        assert_eq!(doctor.specialization, "Diagnostics");

        let ctx = authenticate(&conn, "house", "password1").unwrap();
        assert_eq!(ctx.role, Role::Doctor);
        assert_eq!(ctx.identity_id, doctor.identity_id);
    }

    #[test]
    fn add_doctor_with_taken_username_leaves_nothing_behind() {
        let (conn, admin) = ward();
        add_doctor(&conn, &admin, &new_doctor("house", "Diagnostics")).unwrap();
        assert!(matches!(
            add_doctor(&conn, &admin, &new_doctor("house", "Oncology")),
            Err(CoreError::AlreadyExists(_))
        ));
        assert_eq!(search_doctors(&conn, &admin, "").unwrap().len(), 1);
    }

    #[test]
    fn add_doctor_requires_admin() {
        let (conn, _) = ward();
        let (_, patient) = patient(&conn, "alice");
        assert!(matches!(
            add_doctor(&conn, &patient, &new_doctor("house", "Diagnostics")),
            Err(CoreError::Unauthorized(_))
        ));
    }

    #[test]
    fn add_doctor_rejects_blank_fields() {
        let (conn, admin) = ward();
        assert!(matches!(
            add_doctor(&conn, &admin, &new_doctor("house", "  ")),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn edit_doctor_keeps_password_unless_given() {
        let (conn, admin) = ward();
        let (doctor, _) = doctor(&conn, &admin, "house", "Diagnostics");

        let mut update = DoctorUpdate {
            username: "greg".into(),
            contact: Some("555".into()),
            password: None,
            specialization: "Nephrology".into(),
            availability: Some("Weekends".into()),
        };
        let edited = edit_doctor(&conn, &admin, doctor.id, &update).unwrap();
        assert_eq!(edited.username, "greg");
        assert_eq!(edited.specialization, "Nephrology");
        assert_eq!(edited.availability.as_deref(), Some("Weekends"));
        assert!(authenticate(&conn, "greg", "password1").is_ok());

        // Whitespace is no password: the current one stays.
        update.password = Some("   ".into());
        edit_doctor(&conn, &admin, doctor.id, &update).unwrap();
        assert!(authenticate(&conn, "greg", "password1").is_ok());

        update.password = Some("new-password".into());
        edit_doctor(&conn, &admin, doctor.id, &update).unwrap();
        assert!(authenticate(&conn, "greg", "new-password").is_ok());
        assert!(matches!(
            authenticate(&conn, "greg", "password1"),
            Err(CoreError::InvalidCredentials)
        ));
    }

    #[test]
    fn edit_doctor_to_taken_username_already_exists() {
        let (conn, admin) = ward();
        let (house, _) = doctor(&conn, &admin, "house", "Diagnostics");
        doctor(&conn, &admin, "wilson", "Oncology");

        let update = DoctorUpdate {
            username: "wilson".into(),
            contact: None,
            password: None,
            specialization: "Diagnostics".into(),
            availability: None,
        };
        assert!(matches!(
            edit_doctor(&conn, &admin, house.id, &update),
            Err(CoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn edit_missing_doctor_is_not_found() {
        let (conn, admin) = ward();
        let update = DoctorUpdate {
            username: "ghost".into(),
            contact: None,
            password: None,
            specialization: "None".into(),
            availability: None,
        };
        assert!(matches!(
            edit_doctor(&conn, &admin, 404, &update),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn delete_doctor_without_appointments() {
        let (conn, admin) = ward();
        let (doctor, _) = doctor(&conn, &admin, "house", "Diagnostics");
        delete_doctor(&conn, &admin, doctor.id).unwrap();

        assert!(matches!(get_doctor(&conn, &admin, doctor.id), Err(CoreError::NotFound { .. })));
        assert!(matches!(
            authenticate(&conn, "house", "password1"),
            Err(CoreError::InvalidCredentials)
        ));
    }

    #[test]
    fn delete_doctor_with_appointments_has_dependents() {
        let (conn, admin) = ward();
        let (doctor, _) = doctor(&conn, &admin, "house", "Diagnostics");
        let (_, alice) = patient(&conn, "alice");
        let appt = crate::appointment::book_appointment(&conn, &alice, doctor.id, "2024-01-10", "09:00").unwrap();
        crate::appointment::cancel_appointment(&conn, &alice, appt.id).unwrap();

        // Even a cancelled appointment blocks deletion.
        assert!(matches!(
            delete_doctor(&conn, &admin, doctor.id),
            Err(CoreError::HasDependents { .. })
        ));
        assert!(get_doctor(&conn, &admin, doctor.id).is_ok());
    }

    #[test]
    fn delete_missing_doctor_is_not_found() {
        let (conn, admin) = ward();
        assert!(matches!(delete_doctor(&conn, &admin, 1), Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn search_doctors_open_to_patients_not_doctors() {
        let (conn, admin) = ward();
        let (_, house) = doctor(&conn, &admin, "house", "Diagnostics");
        doctor(&conn, &admin, "wilson", "Oncology");
        let (_, alice) = patient(&conn, "alice");

        assert_eq!(search_doctors(&conn, &alice, "onco").unwrap().len(), 1);
        assert_eq!(
            search_doctors(&conn, &alice, "").unwrap(),
            list_doctors(&conn, &admin).unwrap()
        );
        assert!(matches!(
            search_doctors(&conn, &house, ""),
            Err(CoreError::Unauthorized(_))
        ));
    }

    #[test]
    fn admin_only_searches() {
        let (conn, admin) = ward();
        let (_, alice) = patient(&conn, "alice");
        assert_eq!(search_patients(&conn, &admin, "ALI").unwrap().len(), 1);
        assert_eq!(list_patients(&conn, &admin).unwrap().len(), 1);
        assert!(matches!(search_patients(&conn, &alice, ""), Err(CoreError::Unauthorized(_))));
        assert!(matches!(list_doctors(&conn, &alice), Err(CoreError::Unauthorized(_))));
        assert!(matches!(search_appointments(&conn, &alice, ""), Err(CoreError::Unauthorized(_))));
        assert!(matches!(search_treatments(&conn, &alice, ""), Err(CoreError::Unauthorized(_))));
    }

    #[test]
    fn appointment_search_by_either_name() {
        let (conn, admin) = ward();
        let (house, _) = doctor(&conn, &admin, "house", "Diagnostics");
        let (_, alice) = patient(&conn, "alice");
        let (_, bob) = patient(&conn, "bob");
        crate::appointment::book_appointment(&conn, &alice, house.id, "d1", "t").unwrap();
        crate::appointment::book_appointment(&conn, &bob, house.id, "d2", "t").unwrap();

        assert_eq!(search_appointments(&conn, &admin, "HOUSE").unwrap().len(), 2);
        assert_eq!(search_appointments(&conn, &admin, "bob").unwrap().len(), 1);
        assert_eq!(search_appointments(&conn, &admin, "").unwrap().len(), 2);
    }

    #[test]
    fn edit_and_delete_patient() {
        let (conn, admin) = ward();
        let (alice, _) = patient(&conn, "alice");
        let edited = edit_patient(&conn, &admin, alice.id, Some("12 Elm St")).unwrap();
        assert_eq!(edited.contact_info.as_deref(), Some("12 Elm St"));

        delete_patient(&conn, &admin, alice.id).unwrap();
        assert!(matches!(get_patient(&conn, &admin, alice.id), Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn delete_patient_with_appointments_has_dependents() {
        let (conn, admin) = ward();
        let (house, _) = doctor(&conn, &admin, "house", "Diagnostics");
        let (alice, alice_ctx) = patient(&conn, "alice");
        crate::appointment::book_appointment(&conn, &alice_ctx, house.id, "d", "t").unwrap();

        assert!(matches!(
            delete_patient(&conn, &admin, alice.id),
            Err(CoreError::HasDependents { .. })
        ));
    }
}
