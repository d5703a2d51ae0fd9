//! Habit presets, assignment and completion tracking.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, info, instrument};

use fit_coach_data::database::DbPool;
use fit_coach_data::models::habit::{HabitUpdate, NewHabit, NewHabitPreset};
use fit_coach_data::repository::{HabitRepository, HabitRepositoryTrait, RepositoryError, UserRepository};

use crate::auth::AuthUser;
use crate::entities::conversions::{
    convert_to_domain_completion, convert_to_domain_habit, convert_to_domain_preset, format_date, to_json,
};
use crate::entities::habit::{iso_week_bounds, AssignHabitInput, HabitPresetInput, HabitUpdateInput};
use crate::entities::{Cadence, CadenceSpec, Habit, HabitCompletion, HabitPreset, WeeklyProgress};
use crate::services::access::{require_coach, AccessControl};
use crate::services::{normalize_optional, ServiceError};

/// Days past the UTC date a completion may be dated. Covers every zone ahead of UTC.
const COMPLETION_LEAD_DAYS: i64 = 1;

/// Latest date a habit can be completed for at `now`
pub fn latest_completion_date(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive() + Duration::days(COMPLETION_LEAD_DAYS)
}

/// Progress of `habit` over the ISO week containing `date`
pub fn weekly_progress(habit: &Habit, completions: &[HabitCompletion], date: NaiveDate) -> WeeklyProgress {
    let (week_start, week_end) = iso_week_bounds(date);
    let mut completed_dates: Vec<NaiveDate> = completions
        .iter()
        .filter(|c| c.habit_id == habit.id && c.date >= week_start && c.date <= week_end)
        .map(|c| c.date)
        .collect();
    completed_dates.sort();
    completed_dates.dedup();

    WeeklyProgress {
        habit_id: habit.id.clone(),
        week_start,
        week_end,
        completed: completed_dates.len() as u32,
        target: habit.cadence.weekly_target(),
        scheduled_days: habit.cadence.scheduled_days(week_start),
        completed_dates,
    }
}

fn validate_cadence(spec: CadenceSpec) -> Result<Cadence, ServiceError> {
    Cadence::try_from(spec).map_err(|e| ServiceError::Validation(e.to_string()))
}

fn require_name(name: &str) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::Validation("Habit name must not be empty".to_string()));
    }
    if name.chars().count() > 100 {
        return Err(ServiceError::Validation("Habit name must be at most 100 characters".to_string()));
    }
    Ok(name.to_string())
}

#[async_trait]
pub trait HabitServiceTrait: Send + Sync {
    async fn create_preset(&self, actor: &AuthUser, input: HabitPresetInput) -> Result<HabitPreset, ServiceError>;
    async fn list_presets(&self, actor: &AuthUser) -> Result<Vec<HabitPreset>, ServiceError>;
    async fn delete_preset(&self, actor: &AuthUser, preset_id: &str) -> Result<(), ServiceError>;

    async fn list_habits(&self, actor: &AuthUser, client_id: &str, include_archived: bool) -> Result<Vec<Habit>, ServiceError>;
    /// Assign a habit to a client, optionally starting from a preset
    async fn assign_habit(&self, actor: &AuthUser, client_id: &str, input: AssignHabitInput) -> Result<Habit, ServiceError>;
    async fn update_habit(&self, actor: &AuthUser, habit_id: &str, input: HabitUpdateInput) -> Result<Habit, ServiceError>;
    async fn archive_habit(&self, actor: &AuthUser, habit_id: &str) -> Result<(), ServiceError>;

    /// Record a completion. Completing the same day twice returns the
    /// existing completion.
    async fn complete_habit(&self, actor: &AuthUser, habit_id: &str, date: NaiveDate) -> Result<HabitCompletion, ServiceError>;
    async fn uncomplete_habit(&self, actor: &AuthUser, habit_id: &str, date: NaiveDate) -> Result<(), ServiceError>;
    async fn weekly_progress(&self, actor: &AuthUser, habit_id: &str, date: NaiveDate) -> Result<WeeklyProgress, ServiceError>;
}

pub struct HabitService {
    habits: Arc<dyn HabitRepositoryTrait>,
    access: AccessControl,
}

impl HabitService {
    pub fn new(habits: Arc<dyn HabitRepositoryTrait>, access: AccessControl) -> Self {
        Self { habits, access }
    }

    pub fn from_pool(pool: &DbPool) -> Self {
        Self::new(
            Arc::new(HabitRepository::new(pool.clone())),
            AccessControl::new(Arc::new(UserRepository::new(pool.clone()))),
        )
    }

    async fn load_habit(&self, habit_id: &str) -> Result<Habit, ServiceError> {
        let record = self
            .habits
            .get_habit(habit_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Habit {} not found", habit_id)))?;
        Ok(convert_to_domain_habit(record)?)
    }

    /// Habit the actor may read or complete
    async fn accessible_habit(&self, actor: &AuthUser, habit_id: &str) -> Result<Habit, ServiceError> {
        let habit = self.load_habit(habit_id).await?;
        self.access.ensure_can_access_client(actor, &habit.client_id).await?;
        Ok(habit)
    }

    /// Habit the actor coaches
    async fn managed_habit(&self, actor: &AuthUser, habit_id: &str) -> Result<Habit, ServiceError> {
        let habit = self.load_habit(habit_id).await?;
        self.access.ensure_coach_of(actor, &habit.client_id).await?;
        Ok(habit)
    }

    async fn week_completions(&self, habit_id: &str, date: NaiveDate) -> Result<Vec<HabitCompletion>, ServiceError> {
        let (start, end) = iso_week_bounds(date);
        self.habits
            .list_completions(habit_id, &format_date(start), &format_date(end))
            .await?
            .into_iter()
            .map(|r| convert_to_domain_completion(r).map_err(ServiceError::from))
            .collect()
    }

    async fn owned_preset(&self, actor: &AuthUser, preset_id: &str) -> Result<HabitPreset, ServiceError> {
        let record = self
            .habits
            .get_preset(preset_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Habit preset {} not found", preset_id)))?;
        let preset = convert_to_domain_preset(record)?;
        if preset.coach_id != actor.user_id {
            return Err(ServiceError::Forbidden("This preset belongs to another coach".to_string()));
        }
        Ok(preset)
    }
}

#[async_trait]
impl HabitServiceTrait for HabitService {
    async fn create_preset(&self, actor: &AuthUser, input: HabitPresetInput) -> Result<HabitPreset, ServiceError> {
        require_coach(actor)?;
        let name = require_name(&input.name)?;
        let cadence = validate_cadence(input.cadence)?;

        let record = self
            .habits
            .create_preset(NewHabitPreset {
                coach_id: actor.user_id.clone(),
                name,
                description: normalize_optional(input.description),
                cadence_json: to_json(&cadence)?,
            })
            .await?;
        Ok(convert_to_domain_preset(record)?)
    }

    async fn list_presets(&self, actor: &AuthUser) -> Result<Vec<HabitPreset>, ServiceError> {
        require_coach(actor)?;
        self.habits
            .list_presets(&actor.user_id)
            .await?
            .into_iter()
            .map(|r| convert_to_domain_preset(r).map_err(ServiceError::from))
            .collect()
    }

    async fn delete_preset(&self, actor: &AuthUser, preset_id: &str) -> Result<(), ServiceError> {
        require_coach(actor)?;
        self.owned_preset(actor, preset_id).await?;
        self.habits.delete_preset(preset_id).await?;
        Ok(())
    }

    async fn list_habits(&self, actor: &AuthUser, client_id: &str, include_archived: bool) -> Result<Vec<Habit>, ServiceError> {
        self.access.ensure_can_access_client(actor, client_id).await?;
        self.habits
            .list_habits(client_id, include_archived)
            .await?
            .into_iter()
            .map(|r| convert_to_domain_habit(r).map_err(ServiceError::from))
            .collect()
    }

    #[instrument(skip(self, actor, input), fields(coach_id = %actor.user_id))]
    async fn assign_habit(&self, actor: &AuthUser, client_id: &str, input: AssignHabitInput) -> Result<Habit, ServiceError> {
        self.access.ensure_coach_of(actor, client_id).await?;

        let preset = match input.preset_id.as_deref() {
            Some(preset_id) => Some(self.owned_preset(actor, preset_id).await?),
            None => None,
        };

        let name = match (input.name.as_deref(), &preset) {
            (Some(name), _) => require_name(name)?,
            (None, Some(preset)) => preset.name.clone(),
            (None, None) => return Err(ServiceError::Validation("Habit name is required".to_string())),
        };
        let cadence = match (input.cadence, &preset) {
            (Some(spec), _) => validate_cadence(spec)?,
            (None, Some(preset)) => preset.cadence.clone(),
            (None, None) => return Err(ServiceError::Validation("Habit cadence is required".to_string())),
        };
        let description = normalize_optional(input.description)
            .or_else(|| preset.as_ref().and_then(|p| p.description.clone()));

        let record = self
            .habits
            .create_habit(NewHabit {
                client_id: client_id.to_string(),
                coach_id: actor.user_id.clone(),
                preset_id: preset.map(|p| p.id),
                name,
                description,
                cadence_json: to_json(&cadence)?,
            })
            .await?;

        info!("Assigned habit {} to client {}", record.id, client_id);
        Ok(convert_to_domain_habit(record)?)
    }

    async fn update_habit(&self, actor: &AuthUser, habit_id: &str, input: HabitUpdateInput) -> Result<Habit, ServiceError> {
        self.managed_habit(actor, habit_id).await?;
        let cadence = validate_cadence(input.cadence)?;

        let record = self
            .habits
            .update_habit(
                habit_id,
                HabitUpdate {
                    name: require_name(&input.name)?,
                    description: normalize_optional(input.description),
                    cadence_json: to_json(&cadence)?,
                },
            )
            .await?;
        Ok(convert_to_domain_habit(record)?)
    }

    async fn archive_habit(&self, actor: &AuthUser, habit_id: &str) -> Result<(), ServiceError> {
        self.managed_habit(actor, habit_id).await?;
        self.habits.archive_habit(habit_id).await?;
        info!("Archived habit {}", habit_id);
        Ok(())
    }

    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    async fn complete_habit(&self, actor: &AuthUser, habit_id: &str, date: NaiveDate) -> Result<HabitCompletion, ServiceError> {
        let habit = self.accessible_habit(actor, habit_id).await?;
        let day = format_date(date);

        if habit.archived {
            return Err(ServiceError::Validation("Archived habits cannot be completed".to_string()));
        }

        if let Some(existing) = self.habits.get_completion(habit_id, &day).await? {
            debug!("Habit {} already completed on {}", habit_id, day);
            return Ok(convert_to_domain_completion(existing)?);
        }

        if date > latest_completion_date(Utc::now()) {
            return Err(ServiceError::Validation("Habits cannot be completed in the future".to_string()));
        }
        if !habit.cadence.is_scheduled_on(date) {
            return Err(ServiceError::Validation(format!("Habit is not scheduled on {}", day)));
        }
        if habit.cadence.is_any_day() {
            let done = self.week_completions(habit_id, date).await?.len() as u32;
            let target = habit.cadence.weekly_target();
            if done >= target {
                return Err(ServiceError::Validation(format!(
                    "Habit already completed {} of {} times this week",
                    done, target
                )));
            }
        }

        let record = match self.habits.insert_completion(habit_id, &day, &actor.user_id).await {
            Ok(record) => record,
            // Lost a race with a concurrent completion of the same day
            Err(RepositoryError::Conflict(_)) => self
                .habits
                .get_completion(habit_id, &day)
                .await?
                .ok_or_else(|| ServiceError::Conflict("Completion changed concurrently".to_string()))?,
            Err(e) => return Err(e.into()),
        };
        Ok(convert_to_domain_completion(record)?)
    }

    async fn uncomplete_habit(&self, actor: &AuthUser, habit_id: &str, date: NaiveDate) -> Result<(), ServiceError> {
        self.accessible_habit(actor, habit_id).await?;
        if !self.habits.delete_completion(habit_id, &format_date(date)).await? {
            return Err(ServiceError::NotFound(format!("No completion on {}", format_date(date))));
        }
        Ok(())
    }

    async fn weekly_progress(&self, actor: &AuthUser, habit_id: &str, date: NaiveDate) -> Result<WeeklyProgress, ServiceError> {
        let habit = self.accessible_habit(actor, habit_id).await?;
        let completions = self.week_completions(habit_id, date).await?;
        Ok(weekly_progress(&habit, &completions, date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{DayOfWeek, Frequency};
    use crate::services::test_support::{client, coach, pool};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn cadence(frequency: Frequency, times: Option<u8>, days: Vec<DayOfWeek>) -> CadenceSpec {
        CadenceSpec { frequency, times_per_week: times, days }
    }

    fn assign(name: &str, spec: CadenceSpec) -> AssignHabitInput {
        AssignHabitInput { name: Some(name.to_string()), cadence: Some(spec), ..Default::default() }
    }

    struct Fixture {
        service: HabitService,
        coach: AuthUser,
        client: AuthUser,
    }

    async fn fixture() -> Fixture {
        let pool = pool();
        let coach = coach(&pool, "coach@example.com").await;
        let client = client(&pool, &coach, "client@example.com").await;
        Fixture { service: HabitService::from_pool(&pool), coach, client }
    }

    #[tokio::test]
    async fn test_times_per_week_day_count_must_match() {
        let f = fixture().await;
        use DayOfWeek::*;

        let ok = f
            .service
            .assign_habit(&f.coach, &f.client.user_id, assign("Lift", cadence(Frequency::TimesPerWeek, Some(3), vec![Monday, Wednesday, Friday])))
            .await;
        assert!(ok.is_ok());

        let bad = f
            .service
            .assign_habit(&f.coach, &f.client.user_id, assign("Lift", cadence(Frequency::TimesPerWeek, Some(3), vec![Monday, Wednesday])))
            .await;
        assert!(matches!(bad, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_assign_from_preset() {
        let f = fixture().await;
        let preset = f
            .service
            .create_preset(
                &f.coach,
                HabitPresetInput {
                    name: "Drink water".to_string(),
                    description: Some("2 litres".to_string()),
                    cadence: cadence(Frequency::Daily, None, vec![]),
                },
            )
            .await
            .unwrap();

        let habit = f
            .service
            .assign_habit(
                &f.coach,
                &f.client.user_id,
                AssignHabitInput { preset_id: Some(preset.id.clone()), ..Default::default() },
            )
            .await
            .unwrap();

        assert_eq!(habit.name, "Drink water");
        assert_eq!(habit.cadence, Cadence::Daily);
        assert_eq!(habit.preset_id.as_deref(), Some(preset.id.as_str()));
        assert_eq!(f.service.list_presets(&f.coach).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_client_cannot_assign() {
        let f = fixture().await;
        let result = f
            .service
            .assign_habit(&f.client, &f.client.user_id, assign("Walk", cadence(Frequency::Daily, None, vec![])))
            .await;
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_completion_rules() {
        let f = fixture().await;
        let habit = f
            .service
            .assign_habit(&f.coach, &f.client.user_id, assign("Yoga", cadence(Frequency::Weekly, None, vec![DayOfWeek::Monday])))
            .await
            .unwrap();

        // 2024-03-04 is a Monday
        let first = f.service.complete_habit(&f.client, &habit.id, date("2024-03-04")).await.unwrap();
        let again = f.service.complete_habit(&f.client, &habit.id, date("2024-03-04")).await.unwrap();
        assert_eq!(first, again);

        let tuesday = f.service.complete_habit(&f.client, &habit.id, date("2024-03-05")).await;
        assert!(matches!(tuesday, Err(ServiceError::Validation(_))));

        let future = Utc::now().date_naive() + Duration::days(7);
        let result = f.service.complete_habit(&f.client, &habit.id, future).await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));

        let progress = f.service.weekly_progress(&f.coach, &habit.id, date("2024-03-06")).await.unwrap();
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.target, 1);
        assert!(progress.is_met());
        assert_eq!(progress.scheduled_days, vec![date("2024-03-04")]);

        f.service.uncomplete_habit(&f.client, &habit.id, date("2024-03-04")).await.unwrap();
        assert!(matches!(
            f.service.uncomplete_habit(&f.client, &habit.id, date("2024-03-04")).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_any_day_habit_is_capped_per_week() {
        let f = fixture().await;
        let habit = f
            .service
            .assign_habit(&f.coach, &f.client.user_id, assign("Run", cadence(Frequency::TimesPerWeek, Some(2), vec![])))
            .await
            .unwrap();

        f.service.complete_habit(&f.client, &habit.id, date("2024-03-04")).await.unwrap();
        f.service.complete_habit(&f.client, &habit.id, date("2024-03-06")).await.unwrap();
        let third = f.service.complete_habit(&f.client, &habit.id, date("2024-03-08")).await;
        assert!(matches!(third, Err(ServiceError::Validation(_))));

        // Next ISO week starts fresh
        assert!(f.service.complete_habit(&f.client, &habit.id, date("2024-03-11")).await.is_ok());
    }

    #[tokio::test]
    async fn test_archived_habit_cannot_be_completed() {
        let f = fixture().await;
        let habit = f
            .service
            .assign_habit(&f.coach, &f.client.user_id, assign("Stretch", cadence(Frequency::Daily, None, vec![])))
            .await
            .unwrap();
        f.service.archive_habit(&f.coach, &habit.id).await.unwrap();

        let result = f.service.complete_habit(&f.client, &habit.id, date("2024-03-04")).await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert!(f.service.list_habits(&f.client, &f.client.user_id, false).await.unwrap().is_empty());
        assert_eq!(f.service.list_habits(&f.client, &f.client.user_id, true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_archived_habit_rejects_repeat_completion() {
        let f = fixture().await;
        let habit = f
            .service
            .assign_habit(&f.coach, &f.client.user_id, assign("Stretch", cadence(Frequency::Daily, None, vec![])))
            .await
            .unwrap();
        f.service.complete_habit(&f.client, &habit.id, date("2024-03-04")).await.unwrap();
        f.service.archive_habit(&f.coach, &habit.id).await.unwrap();

        let repeat = f.service.complete_habit(&f.client, &habit.id, date("2024-03-04")).await;
        assert!(matches!(repeat, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_completion_allowed_one_day_ahead_of_utc() {
        let f = fixture().await;
        let habit = f
            .service
            .assign_habit(&f.coach, &f.client.user_id, assign("Walk", cadence(Frequency::Daily, None, vec![])))
            .await
            .unwrap();

        let today = Utc::now().date_naive();
        let tomorrow = today + Duration::days(1);
        assert!(f.service.complete_habit(&f.client, &habit.id, tomorrow).await.is_ok());

        let too_far = f.service.complete_habit(&f.client, &habit.id, today + Duration::days(2)).await;
        assert!(matches!(too_far, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn test_latest_completion_date() {
        let now = DateTime::parse_from_rfc3339("2024-03-04T23:30:00Z").unwrap().with_timezone(&Utc);
        assert_eq!(latest_completion_date(now), date("2024-03-05"));
    }
}
