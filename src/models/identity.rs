use serde::{Deserialize, Serialize};

use super::enums::Role;

/// An account. The password hash never leaves the repository layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub contact: Option<String>,
}
