use serde::{Deserialize, Serialize};

/// Storage model for a coach-owned habit template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HabitPresetRecord {
    pub id: String,
    pub coach_id: String,
    pub name: String,
    pub description: Option<String>,
    pub cadence_json: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewHabitPreset {
    pub coach_id: String,
    pub name: String,
    pub description: Option<String>,
    pub cadence_json: String,
}

/// Storage model for a habit assigned to a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HabitRecord {
    pub id: String,
    pub client_id: String,
    pub coach_id: String,
    pub preset_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub cadence_json: String,
    pub archived: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewHabit {
    pub client_id: String,
    pub coach_id: String,
    pub preset_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub cadence_json: String,
}

#[derive(Debug, Clone)]
pub struct HabitUpdate {
    pub name: String,
    pub description: Option<String>,
    pub cadence_json: String,
}

/// One completed day of a habit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionRecord {
    pub id: String,
    pub habit_id: String,
    /// Calendar date, `YYYY-MM-DD`
    pub completed_on: String,
    pub recorded_by: String,
    pub created_at: String,
}
