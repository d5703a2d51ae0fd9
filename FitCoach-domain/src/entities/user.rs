use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// The two account roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub enum Role {
    /// Manages clients, plans and habits
    Coach,
    /// Belongs to exactly one coach
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Coach => "coach",
            Role::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "coach" => Ok(Role::Coach),
            "client" => Ok(Role::Client),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// A user account without its credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Set for clients only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coach_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_coach(&self) -> bool {
        self.role == Role::Coach
    }
}

/// Dashboard row describing one client of a coach
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct ClientOverview {
    pub client: User,
    /// Billing status, absent when the client never subscribed
    pub subscription_status: Option<String>,
    pub last_check_in_at: Option<DateTime<Utc>>,
    /// Habit completions so far in the current ISO week
    pub habits_completed_this_week: u32,
    /// Sum of the weekly targets of the client's active habits
    pub habits_target_this_week: u32,
    /// Messages from this client the coach has not read
    pub unread_messages: usize,
}
