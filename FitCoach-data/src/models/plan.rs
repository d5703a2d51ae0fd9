use serde::{Deserialize, Serialize};

/// The two plan families share one storage shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    Meal,
    Workout,
}

impl PlanKind {
    pub(crate) fn table(&self) -> &'static str {
        match self {
            PlanKind::Meal => "meal_plans",
            PlanKind::Workout => "workout_plans",
        }
    }

    pub(crate) fn document_column(&self) -> &'static str {
        match self {
            PlanKind::Meal => "meals_json",
            PlanKind::Workout => "days_json",
        }
    }
}

/// Storage model for a meal or workout plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanRecord {
    pub id: String,
    pub client_id: String,
    pub coach_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Meals or training days as JSON
    pub document_json: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for creating a plan
#[derive(Debug, Clone)]
pub struct NewPlan {
    pub client_id: String,
    pub coach_id: String,
    pub name: String,
    pub description: Option<String>,
    pub document_json: String,
}

/// Replacement content for an existing plan
#[derive(Debug, Clone)]
pub struct PlanUpdate {
    pub name: String,
    pub description: Option<String>,
    pub document_json: String,
}
