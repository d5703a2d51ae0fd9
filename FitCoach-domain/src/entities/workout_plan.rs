use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use super::habit::DayOfWeek;

pub const MIN_SETS: u32 = 1;
pub const MAX_SETS: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Exercise {
    pub name: String,
    pub sets: u32,
    /// Rep target as written by the coach, e.g. "8-12" or "AMRAP"
    pub reps: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One training session of a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct WorkoutDay {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<DayOfWeek>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

/// A client's workout plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct WorkoutPlan {
    pub id: String,
    pub client_id: String,
    pub coach_id: String,
    pub name: String,
    pub description: Option<String>,
    pub days: Vec<WorkoutDay>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutPlanInput {
    pub name: String,
    pub description: Option<String>,
    pub days: Vec<WorkoutDay>,
}

impl WorkoutPlanInput {
    pub fn validate_content(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Plan name must not be empty".to_string());
        }
        for (day_index, day) in self.days.iter().enumerate() {
            if day.name.trim().is_empty() {
                return Err(format!("days[{}]: name must not be empty", day_index));
            }
            for (exercise_index, exercise) in day.exercises.iter().enumerate() {
                let path = format!("days[{}].exercises[{}]", day_index, exercise_index);
                if exercise.name.trim().is_empty() {
                    return Err(format!("{}: name must not be empty", path));
                }
                if !(MIN_SETS..=MAX_SETS).contains(&exercise.sets) {
                    return Err(format!("{}: sets must be between {} and {}", path, MIN_SETS, MAX_SETS));
                }
                if exercise.reps.trim().is_empty() {
                    return Err(format!("{}: reps must not be empty", path));
                }
                if let Some(weight) = exercise.weight_kg {
                    if !weight.is_finite() || weight < 0.0 {
                        return Err(format!("{}: weight_kg must be a non-negative number", path));
                    }
                }
            }
        }
        Ok(())
    }
}
