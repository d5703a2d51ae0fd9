use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// Who created a check-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub enum CheckInKind {
    ClientSubmitted,
    CoachLogged,
}

impl CheckInKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckInKind::ClientSubmitted => "client_submitted",
            CheckInKind::CoachLogged => "coach_logged",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "client_submitted" => Some(CheckInKind::ClientSubmitted),
            "coach_logged" => Some(CheckInKind::CoachLogged),
            _ => None,
        }
    }
}

/// Coach-owned check-in questionnaire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CheckInForm {
    pub id: String,
    pub coach_id: String,
    pub title: String,
    pub questions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CheckInResponse {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CheckIn {
    pub id: String,
    pub client_id: String,
    pub author_id: String,
    pub kind: CheckInKind,
    pub note: Option<String>,
    pub form_id: Option<String>,
    pub responses: Vec<CheckInResponse>,
    pub weight_kg: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckInFormInput {
    pub title: String,
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CheckInInput {
    pub note: Option<String>,
    pub form_id: Option<String>,
    pub responses: Vec<CheckInResponse>,
    pub weight_kg: Option<f64>,
}

impl CheckInForm {
    /// Responses must answer every question of the form and nothing else
    pub fn check_responses(&self, responses: &[CheckInResponse]) -> Result<(), String> {
        for response in responses {
            if !self.questions.iter().any(|q| q == &response.question) {
                return Err(format!("'{}' is not a question of this form", response.question));
            }
        }
        for question in &self.questions {
            let answered = responses
                .iter()
                .any(|r| &r.question == question && !r.answer.trim().is_empty());
            if !answered {
                return Err(format!("Question '{}' must be answered", question));
            }
        }
        Ok(())
    }
}
