//! Per-role dashboard aggregates.
//!
//! Read-only counts and derived percentages. Percentages are whole numbers
//! rounded half-to-even, and a percentage of nothing is 0.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::accounts::ensure_patient_profile;
use crate::authorization::{acting_doctor, require_role, AuthContext};
use crate::db::repository as repo;
use crate::db::DatabaseError;
use crate::error::CoreError;
use crate::models::{AppointmentFilter, AppointmentStatus, Role};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Appointment counts by status for some scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: i64,
    pub booked: i64,
    pub completed: i64,
    pub cancelled: i64,
}

impl StatusCounts {
    fn load(conn: &Connection, scope: &AppointmentFilter) -> Result<Self, DatabaseError> {
        let count = |status| repo::count_appointments(conn, &scope.clone().with_status(status));
        Ok(Self {
            total: repo::count_appointments(conn, scope)?,
            booked: count(AppointmentStatus::Booked)?,
            completed: count(AppointmentStatus::Completed)?,
            cancelled: count(AppointmentStatus::Cancelled)?,
        })
    }

    pub fn completion_rate(&self) -> u32 {
        percentage(self.completed, self.total)
    }
}

/// One bar of the specialization chart, scaled against the largest group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecializationShare {
    pub name: String,
    pub count: i64,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminDashboard {
    pub total_doctors: i64,
    pub total_patients: i64,
    pub appointments: StatusCounts,
    pub completion_rate: u32,
    pub specializations: Vec<SpecializationShare>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorDashboard {
    pub doctor_id: i64,
    pub appointments: StatusCounts,
    pub booked_percentage: u32,
    pub completed_percentage: u32,
    pub cancelled_percentage: u32,
    pub treatments_given: i64,
    /// Treatments given per completed appointment. Every recorded
    /// treatment counts as a success.
    pub success_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientDashboard {
    pub patient_id: i64,
    pub total_appointments: i64,
    pub upcoming: i64,
    pub completed: i64,
    pub completion_rate: u32,
    pub treatments_received: i64,
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

/// `part / whole * 100`, rounded half-to-even. 0 when `whole` is not positive.
pub fn percentage(part: i64, whole: i64) -> u32 {
    if whole <= 0 || part <= 0 {
        return 0;
    }
    let scaled = i128::from(part) * 100;
    let whole = i128::from(whole);
    let mut quotient = scaled / whole;
    let twice_remainder = (scaled % whole) * 2;
    if twice_remainder > whole || (twice_remainder == whole && quotient % 2 == 1) {
        quotient += 1;
    }
    u32::try_from(quotient).unwrap_or(u32::MAX)
}

fn specialization_shares(counts: Vec<(String, i64)>) -> Vec<SpecializationShare> {
    let largest = counts.iter().map(|(_, n)| *n).max().unwrap_or(0);
    counts
        .into_iter()
        .map(|(name, count)| SpecializationShare {
            percentage: percentage(count, largest),
            name,
            count,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

pub fn admin_dashboard(conn: &Connection, ctx: &AuthContext) -> Result<AdminDashboard, CoreError> {
    require_role(ctx, Role::Admin)?;

    let appointments = StatusCounts::load(conn, &AppointmentFilter::default())?;
    Ok(AdminDashboard {
        total_doctors: repo::count_doctors(conn)?,
        total_patients: repo::count_patients(conn)?,
        completion_rate: appointments.completion_rate(),
        appointments,
        specializations: specialization_shares(repo::specialization_counts(conn)?),
    })
}

pub fn doctor_dashboard(conn: &Connection, ctx: &AuthContext) -> Result<DoctorDashboard, CoreError> {
    let doctor = acting_doctor(conn, ctx)?;
    let scope = AppointmentFilter::for_doctor(doctor.id);

    let appointments = StatusCounts::load(conn, &scope)?;
    let treatments_given =
        repo::count_treatments(conn, &scope.with_status(AppointmentStatus::Completed))?;

    Ok(DoctorDashboard {
        doctor_id: doctor.id,
        booked_percentage: percentage(appointments.booked, appointments.total),
        completed_percentage: percentage(appointments.completed, appointments.total),
        cancelled_percentage: percentage(appointments.cancelled, appointments.total),
        treatments_given,
        success_rate: percentage(treatments_given, appointments.completed),
        appointments,
    })
}

/// Creates the patient profile on first visit.
pub fn patient_dashboard(
    conn: &Connection,
    ctx: &AuthContext,
) -> Result<PatientDashboard, CoreError> {
    let patient = ensure_patient_profile(conn, ctx)?;
    let scope = AppointmentFilter::for_patient(patient.id);

    let counts = StatusCounts::load(conn, &scope)?;
    let treatments_received =
        repo::count_treatments(conn, &scope.with_status(AppointmentStatus::Completed))?;

    Ok(PatientDashboard {
        patient_id: patient.id,
        total_appointments: counts.total,
        upcoming: counts.booked,
        completed: counts.completed,
        completion_rate: counts.completion_rate(),
        treatments_received,
    })
}
