use serde::{Deserialize, Serialize};

/// Doctor profile joined with its identity's username and contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: i64,
    pub identity_id: i64,
    pub username: String,
    pub contact: Option<String>,
    pub specialization: String,
    pub availability: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDoctor {
    pub username: String,
    pub password: String,
    pub contact: Option<String>,
    pub specialization: String,
    pub availability: Option<String>,
}

/// Replacement values for an existing doctor. `password: None` keeps the
/// current one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorUpdate {
    pub username: String,
    pub contact: Option<String>,
    pub password: Option<String>,
    pub specialization: String,
    pub availability: Option<String>,
}
