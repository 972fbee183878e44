use serde::{Deserialize, Serialize};

/// A registered doctor account (credentials excluded).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: i64,
    pub full_name: String,
    pub doctor_id: String,
    pub hospital: String,
    pub specialization: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

/// Signup fields for a new doctor account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDoctor {
    pub full_name: String,
    pub doctor_id: String,
    pub hospital: String,
    pub specialization: String,
    pub username: String,
    pub email: String,
}
