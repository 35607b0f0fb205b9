//! Shared fixtures for service-level tests.

use rusqlite::Connection;

use crate::accounts::{authenticate, ensure_admin, ensure_patient_profile, register_patient};
use crate::authorization::AuthContext;
use crate::config::AppConfig;
use crate::db::sqlite::open_memory_database;
use crate::directory::add_doctor;
use crate::models::{Doctor, NewDoctor, Patient};

/// Fresh database with the bootstrap admin; returns the admin's context.
pub(crate) fn ward() -> (Connection, AuthContext) {
    let conn = open_memory_database().unwrap();
    let admin = bootstrap_admin(&conn);
    (conn, admin)
}

pub(crate) fn bootstrap_admin(conn: &Connection) -> AuthContext {
    let config = AppConfig::default();
    ensure_admin(conn, &config).unwrap();
    authenticate(conn, &config.admin_username, &config.admin_password).unwrap()
}

pub(crate) fn new_doctor(username: &str, specialization: &str) -> NewDoctor {
    NewDoctor {
        username: username.into(),
        password: "password1".into(),
        contact: None,
        specialization: specialization.into(),
        availability: Some("Mon-Fri 9-17".into()),
    }
}

pub(crate) fn doctor(
    conn: &Connection,
    admin: &AuthContext,
    username: &str,
    specialization: &str,
) -> (Doctor, AuthContext) {
    let doctor = add_doctor(conn, admin, &new_doctor(username, specialization)).unwrap();
    let ctx = authenticate(conn, username, "password1").unwrap();
    (doctor, ctx)
}

/// Registered patient with its profile already created.
pub(crate) fn patient(conn: &Connection, username: &str) -> (Patient, AuthContext) {
    register_patient(conn, username, "password1", None).unwrap();
    let ctx = authenticate(conn, username, "password1").unwrap();
    let patient = ensure_patient_profile(conn, &ctx).unwrap();
    (patient, ctx)
}
