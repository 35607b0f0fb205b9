use thiserror::Error;

use crate::crypto::CryptoError;
use crate::db::DatabaseError;
use crate::models::{AppointmentStatus, Role};

/// Typed failures of the core operations.
///
/// Every variant is recoverable at the request boundary; turning one into
/// user-facing text is the caller's job.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Appointment {appointment_id} is {status}, expected {expected}")]
    InvalidState {
        appointment_id: i64,
        status: AppointmentStatus,
        expected: AppointmentStatus,
    },

    #[error("Slot taken: doctor {doctor_id} on {date} at {time}")]
    SlotConflict {
        doctor_id: i64,
        date: String,
        time: String,
    },

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("{entity} {id} still has {dependents}")]
    HasDependents {
        entity: String,
        id: i64,
        dependents: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Credential error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Database error: {0}")]
    Database(DatabaseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub(crate) fn wrong_role(actual: Role, allowed: &[Role]) -> Self {
        let allowed: Vec<&str> = allowed.iter().map(Role::as_str).collect();
        CoreError::Unauthorized(format!(
            "role {actual} may not perform this operation (requires {})",
            allowed.join(" or ")
        ))
    }
}

impl From<DatabaseError> for CoreError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, id } => CoreError::NotFound {
                entity: entity_type,
                id,
            },
            other => CoreError::Database(other),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        DatabaseError::from(err).into()
    }
}
