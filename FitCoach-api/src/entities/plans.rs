use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use fit_coach_domain::entities::meal_plan::PlanTotals;
use fit_coach_domain::entities::{Meal, MealPlan, MealPlanInput, WorkoutDay, WorkoutPlanInput};

/// Create or replace a meal plan
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct MealPlanRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,

    #[serde(default)]
    pub meals: Vec<Meal>,
}

impl From<MealPlanRequest> for MealPlanInput {
    fn from(req: MealPlanRequest) -> Self {
        MealPlanInput { name: req.name, description: req.description, meals: req.meals }
    }
}

/// Meal plan with per-meal and daily macro totals
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MealPlanResponse {
    #[serde(flatten)]
    pub plan: MealPlan,
    pub totals: PlanTotals,
}

impl From<MealPlan> for MealPlanResponse {
    fn from(plan: MealPlan) -> Self {
        let totals = plan.totals();
        Self { plan, totals }
    }
}

/// Create or replace a workout plan
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct WorkoutPlanRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,

    #[serde(default)]
    pub days: Vec<WorkoutDay>,
}

impl From<WorkoutPlanRequest> for WorkoutPlanInput {
    fn from(req: WorkoutPlanRequest) -> Self {
        WorkoutPlanInput { name: req.name, description: req.description, days: req.days }
    }
}
