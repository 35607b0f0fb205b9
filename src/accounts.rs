//! Accounts: signup, credential checks, bootstrap admin, lazy patient profiles.
//!
//! The core never issues or validates sessions: `authenticate` only turns a
//! username/password pair into the `AuthContext` the caller keeps.

use rusqlite::Connection;

use crate::authorization::{require_role, AuthContext};
use crate::config::{AppConfig, MIN_PASSWORD_LEN, MIN_USERNAME_LEN};
use crate::crypto::{hash_password, verify_password};
use crate::db::repository::{
    count_identities_with_role, get_credentials, get_identity, get_patient,
    get_patient_by_identity, insert_identity, insert_patient,
};
use crate::db::DatabaseError;
use crate::error::CoreError;
use crate::models::{Identity, Patient, Role};

/// Translate a UNIQUE failure on `identities.username` into `AlreadyExists`.
pub(crate) fn username_taken(err: DatabaseError, username: &str) -> CoreError {
    match err {
        DatabaseError::UniqueViolation(_) => {
            CoreError::AlreadyExists(format!("username '{username}'"))
        }
        other => other.into(),
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn validate_credentials(username: &str, password: &str) -> Result<(), CoreError> {
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(CoreError::InvalidInput(format!(
            "username must be at least {MIN_USERNAME_LEN} characters"
        )));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CoreError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Self-service signup. Creates a patient identity only; the patient
/// profile appears on first [`ensure_patient_profile`].
pub fn register_patient(
    conn: &Connection,
    username: &str,
    password: &str,
    contact: Option<&str>,
) -> Result<Identity, CoreError> {
    let username = username.trim();
    let password = password.trim();
    validate_credentials(username, password)?;

    let id = insert_identity(
        conn,
        username,
        &hash_password(password),
        Role::Patient,
        non_blank(contact),
    )
    .map_err(|e| username_taken(e, username))?;

    tracing::info!(identity_id = id, "Patient account registered");
    get_identity(conn, id)?.ok_or_else(|| CoreError::not_found("identity", id))
}

/// Check a username/password pair. Unknown users and wrong passwords are
/// indistinguishable to the caller.
pub fn authenticate(
    conn: &Connection,
    username: &str,
    password: &str,
) -> Result<AuthContext, CoreError> {
    let Some((identity, stored)) = get_credentials(conn, username.trim())? else {
        return Err(CoreError::InvalidCredentials);
    };

    if !verify_password(password, &stored)? {
        tracing::debug!(identity_id = identity.id, "password mismatch");
        return Err(CoreError::InvalidCredentials);
    }

    Ok(AuthContext::new(identity.id, identity.role))
}

/// Create the configured administrator unless an admin already exists.
///
/// Returns the new identity, or `None` when nothing was created.
pub fn ensure_admin(conn: &Connection, config: &AppConfig) -> Result<Option<Identity>, CoreError> {
    if count_identities_with_role(conn, Role::Admin)? > 0 {
        tracing::info!("Admin already exists");
        return Ok(None);
    }

    let id = insert_identity(
        conn,
        &config.admin_username,
        &hash_password(&config.admin_password),
        Role::Admin,
        None,
    )
    .map_err(|e| username_taken(e, &config.admin_username))?;

    tracing::info!(identity_id = id, username = %config.admin_username, "Admin user created");
    Ok(get_identity(conn, id)?)
}

/// The acting patient's profile, created on first use.
pub fn ensure_patient_profile(conn: &Connection, ctx: &AuthContext) -> Result<Patient, CoreError> {
    require_role(ctx, Role::Patient)?;

    if let Some(patient) = get_patient_by_identity(conn, ctx.identity_id)? {
        return Ok(patient);
    }
    if get_identity(conn, ctx.identity_id)?.is_none() {
        return Err(CoreError::not_found("identity", ctx.identity_id));
    }

    match insert_patient(conn, ctx.identity_id, None) {
        Ok(id) => {
            tracing::info!(patient_id = id, identity_id = ctx.identity_id, "Patient profile created");
            get_patient(conn, id)?.ok_or_else(|| CoreError::not_found("patient", id))
        }
        // Another request created it first.
        Err(DatabaseError::UniqueViolation(_)) => get_patient_by_identity(conn, ctx.identity_id)?
            .ok_or_else(|| CoreError::not_found("patient profile for identity", ctx.identity_id)),
        Err(e) => Err(e.into()),
    }
}
