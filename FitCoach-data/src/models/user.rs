use serde::{Deserialize, Serialize};

/// Storage model for a user account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub name: String,
    /// `coach` or `client`
    pub role: String,
    /// Owning coach, set for clients only
    pub coach_id: Option<String>,
    pub password_hash: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: String,
    pub coach_id: Option<String>,
    pub password_hash: String,
}

/// Profile fields that may be changed after registration
#[derive(Debug, Clone, Default)]
pub struct UserProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}
