use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use fit_coach_domain::entities::check_in::{CheckInFormInput, CheckInInput};
use fit_coach_domain::entities::CheckInResponse;

/// Coach-defined check-in questionnaire
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CheckInFormRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    /// Questions in display order
    #[validate(length(min = 1, max = 30, message = "A form needs between 1 and 30 questions"))]
    pub questions: Vec<String>,
}

impl From<CheckInFormRequest> for CheckInFormInput {
    fn from(req: CheckInFormRequest) -> Self {
        CheckInFormInput { title: req.title, questions: req.questions }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CheckInRequest {
    #[validate(length(max = 4000, message = "Note cannot exceed 4000 characters"))]
    pub note: Option<String>,

    /// Form the responses answer
    pub form_id: Option<String>,

    #[serde(default)]
    pub responses: Vec<CheckInResponse>,

    /// Body weight in kilograms
    pub weight_kg: Option<f64>,
}

impl From<CheckInRequest> for CheckInInput {
    fn from(req: CheckInRequest) -> Self {
        CheckInInput {
            note: req.note,
            form_id: req.form_id,
            responses: req.responses,
            weight_kg: req.weight_kg,
        }
    }
}
