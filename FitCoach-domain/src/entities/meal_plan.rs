use std::ops::Add;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// A single food line within a meal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct FoodItem {
    pub name: String,
    pub quantity: f64,
    /// e.g. "g", "ml", "slice"
    pub unit: String,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Meal {
    pub name: String,
    /// Free-form time such as "07:30" or "post-workout"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<String>,
    #[serde(default)]
    pub items: Vec<FoodItem>,
}

/// Summed energy and macronutrients
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct MacroTotals {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

impl Add for MacroTotals {
    type Output = MacroTotals;

    fn add(self, other: MacroTotals) -> MacroTotals {
        MacroTotals {
            calories: self.calories + other.calories,
            protein_g: self.protein_g + other.protein_g,
            carbs_g: self.carbs_g + other.carbs_g,
            fat_g: self.fat_g + other.fat_g,
        }
    }
}

impl From<&FoodItem> for MacroTotals {
    fn from(item: &FoodItem) -> Self {
        MacroTotals {
            calories: item.calories,
            protein_g: item.protein_g,
            carbs_g: item.carbs_g,
            fat_g: item.fat_g,
        }
    }
}

impl Meal {
    pub fn totals(&self) -> MacroTotals {
        self.items.iter().map(MacroTotals::from).fold(MacroTotals::default(), Add::add)
    }
}

/// Per-meal and whole-plan totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct PlanTotals {
    pub meals: Vec<MacroTotals>,
    pub total: MacroTotals,
}

/// A client's meal plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct MealPlan {
    pub id: String,
    pub client_id: String,
    pub coach_id: String,
    pub name: String,
    pub description: Option<String>,
    pub meals: Vec<Meal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MealPlan {
    pub fn totals(&self) -> PlanTotals {
        let meals: Vec<MacroTotals> = self.meals.iter().map(Meal::totals).collect();
        let total = meals.iter().copied().fold(MacroTotals::default(), Add::add);
        PlanTotals { meals, total }
    }
}

/// Content a coach supplies when creating or replacing a meal plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlanInput {
    pub name: String,
    pub description: Option<String>,
    pub meals: Vec<Meal>,
}

impl MealPlanInput {
    /// Check names are present and no amount is negative
    pub fn validate_content(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Plan name must not be empty".to_string());
        }
        for (meal_index, meal) in self.meals.iter().enumerate() {
            if meal.name.trim().is_empty() {
                return Err(format!("meals[{}]: name must not be empty", meal_index));
            }
            for (item_index, item) in meal.items.iter().enumerate() {
                let path = format!("meals[{}].items[{}]", meal_index, item_index);
                if item.name.trim().is_empty() {
                    return Err(format!("{}: name must not be empty", path));
                }
                let amounts = [
                    ("quantity", item.quantity),
                    ("calories", item.calories),
                    ("protein_g", item.protein_g),
                    ("carbs_g", item.carbs_g),
                    ("fat_g", item.fat_g),
                ];
                for (field, value) in amounts {
                    if !value.is_finite() || value < 0.0 {
                        return Err(format!("{}: {} must be a non-negative number", path, field));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, calories: f64, protein: f64) -> FoodItem {
        FoodItem {
            name: name.to_string(),
            quantity: 100.0,
            unit: "g".to_string(),
            calories,
            protein_g: protein,
            carbs_g: 10.0,
            fat_g: 5.0,
        }
    }

    fn input(meals: Vec<Meal>) -> MealPlanInput {
        MealPlanInput { name: "Cut".to_string(), description: None, meals }
    }

    #[test]
    fn test_totals_per_meal_and_plan() {
        let plan = MealPlan {
            id: "p".into(),
            client_id: "c".into(),
            coach_id: "k".into(),
            name: "Cut".into(),
            description: None,
            meals: vec![
                Meal { name: "Breakfast".into(), time_of_day: None, items: vec![item("Oats", 380.0, 13.0), item("Milk", 60.0, 3.5)] },
                Meal { name: "Lunch".into(), time_of_day: Some("12:30".into()), items: vec![item("Chicken", 165.0, 31.0)] },
            ],
            is_active: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let totals = plan.totals();
        assert_eq!(totals.meals.len(), 2);
        assert_eq!(totals.meals[0].calories, 440.0);
        assert_eq!(totals.total.calories, 605.0);
        assert_eq!(totals.total.protein_g, 47.5);
        assert_eq!(totals.total.fat_g, 15.0);
    }

    #[test]
    fn test_validate_rejects_negative_macros() {
        let mut bad = item("Butter", 100.0, 0.0);
        bad.fat_g = -1.0;
        let result = input(vec![Meal { name: "Snack".into(), time_of_day: None, items: vec![bad] }]).validate_content();
        assert!(result.unwrap_err().contains("fat_g"));
    }

    #[test]
    fn test_validate_rejects_blank_names() {
        assert!(MealPlanInput { name: "  ".into(), description: None, meals: vec![] }.validate_content().is_err());
        let result = input(vec![Meal { name: "".into(), time_of_day: None, items: vec![] }]).validate_content();
        assert!(result.is_err());
        assert!(input(vec![]).validate_content().is_ok());
    }
}
