use serde::{Deserialize, Serialize};

/// Patient profile joined with its identity's username and contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub identity_id: i64,
    pub username: String,
    pub contact: Option<String>,
    pub contact_info: Option<String>,
}
