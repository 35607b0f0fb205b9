//! Role and ownership guards shared by every core operation.
//!
//! The caller resolves who is acting (from its own session mechanism) and
//! hands an [`AuthContext`] to each operation. The core trusts the context
//! and checks two things against it:
//! 1. Role: the context's role is one the operation allows.
//! 2. Ownership: the acting doctor/patient profile is the one referenced by
//!    the record being changed.
//!
//! Both checks fail with `CoreError::Unauthorized`; neither redirects.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::repository::{get_doctor_by_identity, get_patient_by_identity};
use crate::error::CoreError;
use crate::models::{Appointment, Doctor, Patient, Role};

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Who is calling: resolved once per request outside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub identity_id: i64,
    pub role: Role,
}

impl AuthContext {
    pub fn new(identity_id: i64, role: Role) -> Self {
        Self { identity_id, role }
    }
}

/// The acting profile behind an [`AuthContext`], for ownership checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Admin,
    Doctor(i64),
    Patient(i64),
}

/// Records whose mutation is restricted to the profiles they reference.
pub trait Owned {
    fn is_owned_by(&self, actor: Actor) -> bool;
}

impl Owned for Appointment {
    fn is_owned_by(&self, actor: Actor) -> bool {
        match actor {
            Actor::Doctor(doctor_id) => self.doctor_id == doctor_id,
            Actor::Patient(patient_id) => self.patient_id == patient_id,
            Actor::Admin => false,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Guards
// ═══════════════════════════════════════════════════════════

pub fn require_role(ctx: &AuthContext, role: Role) -> Result<(), CoreError> {
    require_any_role(ctx, &[role])
}

pub fn require_any_role(ctx: &AuthContext, roles: &[Role]) -> Result<(), CoreError> {
    if roles.contains(&ctx.role) {
        Ok(())
    } else {
        tracing::debug!(identity_id = ctx.identity_id, role = %ctx.role, "role check failed");
        Err(CoreError::wrong_role(ctx.role, roles))
    }
}

pub fn require_ownership<T: Owned>(entity: &T, actor: Actor) -> Result<(), CoreError> {
    if entity.is_owned_by(actor) {
        Ok(())
    } else {
        Err(CoreError::Unauthorized(format!(
            "{actor:?} does not own this record"
        )))
    }
}

// ═══════════════════════════════════════════════════════════
// Acting profile resolution
// ═══════════════════════════════════════════════════════════

/// Doctor profile of a doctor-role context. `NotFound` if the identity has
/// no doctor profile.
pub fn acting_doctor(conn: &Connection, ctx: &AuthContext) -> Result<Doctor, CoreError> {
    require_role(ctx, Role::Doctor)?;
    get_doctor_by_identity(conn, ctx.identity_id)?
        .ok_or_else(|| CoreError::not_found("doctor profile for identity", ctx.identity_id))
}

/// Patient profile of a patient-role context. `NotFound` if the profile
/// has not been created yet.
pub fn acting_patient(conn: &Connection, ctx: &AuthContext) -> Result<Patient, CoreError> {
    require_role(ctx, Role::Patient)?;
    get_patient_by_identity(conn, ctx.identity_id)?
        .ok_or_else(|| CoreError::not_found("patient profile for identity", ctx.identity_id))
}

pub fn resolve_actor(conn: &Connection, ctx: &AuthContext) -> Result<Actor, CoreError> {
    match ctx.role {
        Role::Admin => Ok(Actor::Admin),
        Role::Doctor => Ok(Actor::Doctor(acting_doctor(conn, ctx)?.id)),
        Role::Patient => Ok(Actor::Patient(acting_patient(conn, ctx)?.id)),
    }
}
