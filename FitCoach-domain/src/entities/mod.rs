// Domain entities and value objects
pub mod account;
pub mod user;
pub mod meal_plan;
pub mod workout_plan;
pub mod habit;
pub mod check_in;
pub mod subscription;
pub mod message;
pub mod pagination;
pub mod conversions;

// Re-export common types for easier imports
pub use account::{AuthSession, LoginInput, NewAccountInput};
pub use user::{ClientOverview, Role, User};
pub use meal_plan::{FoodItem, MacroTotals, Meal, MealPlan, MealPlanInput};
pub use workout_plan::{Exercise, WorkoutDay, WorkoutPlan, WorkoutPlanInput};
pub use habit::{Cadence, CadenceSpec, DayOfWeek, Frequency, Habit, HabitCompletion, HabitPreset, WeeklyProgress};
pub use check_in::{CheckIn, CheckInForm, CheckInKind, CheckInResponse};
pub use subscription::{Subscription, SubscriptionOverview, SubscriptionStatus};
pub use message::{Message, SenderUnread, UnreadSummary};
pub use pagination::{Page, PageRequest};
