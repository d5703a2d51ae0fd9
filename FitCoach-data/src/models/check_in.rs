use serde::{Deserialize, Serialize};

/// Storage model for a check-in questionnaire
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckInFormRecord {
    pub id: String,
    pub coach_id: String,
    pub title: String,
    /// Ordered question list as a JSON array of strings
    pub questions_json: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewCheckInForm {
    pub coach_id: String,
    pub title: String,
    pub questions_json: String,
}

/// Storage model for a check-in entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckInRecord {
    pub id: String,
    pub client_id: String,
    pub author_id: String,
    /// `client_submitted` or `coach_logged`
    pub kind: String,
    pub note: Option<String>,
    pub form_id: Option<String>,
    pub responses_json: String,
    pub weight_kg: Option<f64>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewCheckIn {
    pub client_id: String,
    pub author_id: String,
    pub kind: String,
    pub note: Option<String>,
    pub form_id: Option<String>,
    pub responses_json: String,
    pub weight_kg: Option<f64>,
}
