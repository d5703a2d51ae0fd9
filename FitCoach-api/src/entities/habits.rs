use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use fit_coach_domain::entities::habit::{AssignHabitInput, HabitPresetInput, HabitUpdateInput};
use fit_coach_domain::entities::CadenceSpec;

/// Reusable habit template
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct HabitPresetRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,

    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,

    pub cadence: CadenceSpec,
}

impl From<HabitPresetRequest> for HabitPresetInput {
    fn from(req: HabitPresetRequest) -> Self {
        HabitPresetInput { name: req.name, description: req.description, cadence: req.cadence }
    }
}

/// Assign a habit to a client. Omitted fields are taken from the preset.
#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct AssignHabitRequest {
    pub preset_id: Option<String>,

    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,

    pub cadence: Option<CadenceSpec>,
}

impl From<AssignHabitRequest> for AssignHabitInput {
    fn from(req: AssignHabitRequest) -> Self {
        AssignHabitInput {
            preset_id: req.preset_id,
            name: req.name,
            description: req.description,
            cadence: req.cadence,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateHabitRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,

    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,

    pub cadence: CadenceSpec,
}

impl From<UpdateHabitRequest> for HabitUpdateInput {
    fn from(req: UpdateHabitRequest) -> Self {
        HabitUpdateInput { name: req.name, description: req.description, cadence: req.cadence }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HabitListQuery {
    /// Include archived habits (default: false)
    #[serde(default)]
    pub include_archived: bool,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProgressQuery {
    /// Any date in the week of interest (default: today, UTC)
    pub date: Option<NaiveDate>,
}
