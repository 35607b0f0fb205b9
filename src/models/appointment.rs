use serde::{Deserialize, Serialize};

use super::enums::AppointmentStatus;

/// One ledger row. `date` and `time` are opaque and compared verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub date: String,
    pub time: String,
    pub status: AppointmentStatus,
}

/// Appointment with the names a listing needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentEntry {
    pub appointment: Appointment,
    pub patient_name: String,
    pub doctor_name: String,
    pub specialization: String,
}
