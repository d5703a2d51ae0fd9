//! Habits and their cadence rules.
//!
//! A cadence is either daily, weekly on exactly one day, or N times per week
//! (N in 1..=6) on either any day or exactly N chosen days. Weeks are ISO
//! weeks running Monday to Sunday.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

pub const MIN_TIMES_PER_WEEK: u8 = 1;
pub const MAX_TIMES_PER_WEEK: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }

    /// Days since the Monday of the same ISO week
    pub fn days_from_monday(&self) -> i64 {
        Weekday::from(*self).num_days_from_monday() as i64
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl From<DayOfWeek> for Weekday {
    fn from(day: DayOfWeek) -> Self {
        match day {
            DayOfWeek::Monday => Weekday::Mon,
            DayOfWeek::Tuesday => Weekday::Tue,
            DayOfWeek::Wednesday => Weekday::Wed,
            DayOfWeek::Thursday => Weekday::Thu,
            DayOfWeek::Friday => Weekday::Fri,
            DayOfWeek::Saturday => Weekday::Sat,
            DayOfWeek::Sunday => Weekday::Sun,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub enum Frequency {
    Daily,
    Weekly,
    TimesPerWeek,
}

/// Cadence as submitted by a coach, before the cardinality rules are checked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct CadenceSpec {
    pub frequency: Frequency,
    /// Required for `times_per_week`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times_per_week: Option<u8>,
    /// Selected days; empty means any day for `times_per_week`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub days: Vec<DayOfWeek>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CadenceError {
    #[error("Daily habits cannot select days or a weekly count")]
    DailyWithSelection,

    #[error("Weekly habits must select exactly one day, got {0}")]
    WeeklyDayCount(usize),

    #[error("times_per_week is required for N-times-per-week habits")]
    MissingTimes,

    #[error("times_per_week must be between 1 and 6, got {0}")]
    TimesOutOfRange(u8),

    #[error("Selected days must be distinct")]
    DuplicateDays,

    #[error("Select exactly {expected} days or none for any day, got {actual}")]
    DayCountMismatch { expected: u8, actual: usize },
}

/// Days on which an N-times-per-week habit may be completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaySelection {
    AnyDay,
    Days(BTreeSet<DayOfWeek>),
}

/// A validated cadence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CadenceSpec", into = "CadenceSpec")]
pub enum Cadence {
    Daily,
    Weekly(DayOfWeek),
    TimesPerWeek { times: u8, days: DaySelection },
}

impl TryFrom<CadenceSpec> for Cadence {
    type Error = CadenceError;

    fn try_from(spec: CadenceSpec) -> Result<Self, Self::Error> {
        match spec.frequency {
            Frequency::Daily => {
                if !spec.days.is_empty() || spec.times_per_week.is_some() {
                    return Err(CadenceError::DailyWithSelection);
                }
                Ok(Cadence::Daily)
            }
            Frequency::Weekly => match spec.days.as_slice() {
                [day] => Ok(Cadence::Weekly(*day)),
                days => Err(CadenceError::WeeklyDayCount(days.len())),
            },
            Frequency::TimesPerWeek => {
                let times = spec.times_per_week.ok_or(CadenceError::MissingTimes)?;
                if !(MIN_TIMES_PER_WEEK..=MAX_TIMES_PER_WEEK).contains(&times) {
                    return Err(CadenceError::TimesOutOfRange(times));
                }
                if spec.days.is_empty() {
                    return Ok(Cadence::TimesPerWeek { times, days: DaySelection::AnyDay });
                }

                let distinct: BTreeSet<DayOfWeek> = spec.days.iter().copied().collect();
                if distinct.len() != spec.days.len() {
                    return Err(CadenceError::DuplicateDays);
                }
                if distinct.len() != times as usize {
                    return Err(CadenceError::DayCountMismatch { expected: times, actual: distinct.len() });
                }
                Ok(Cadence::TimesPerWeek { times, days: DaySelection::Days(distinct) })
            }
        }
    }
}

impl From<Cadence> for CadenceSpec {
    fn from(cadence: Cadence) -> Self {
        match cadence {
            Cadence::Daily => CadenceSpec { frequency: Frequency::Daily, times_per_week: None, days: vec![] },
            Cadence::Weekly(day) => CadenceSpec { frequency: Frequency::Weekly, times_per_week: None, days: vec![day] },
            Cadence::TimesPerWeek { times, days } => CadenceSpec {
                frequency: Frequency::TimesPerWeek,
                times_per_week: Some(times),
                days: match days {
                    DaySelection::AnyDay => vec![],
                    DaySelection::Days(days) => days.into_iter().collect(),
                },
            },
        }
    }
}

impl Cadence {
    /// Whether the habit may be completed on `date`
    pub fn is_scheduled_on(&self, date: NaiveDate) -> bool {
        let day = DayOfWeek::of(date);
        match self {
            Cadence::Daily => true,
            Cadence::Weekly(chosen) => *chosen == day,
            Cadence::TimesPerWeek { days: DaySelection::AnyDay, .. } => true,
            Cadence::TimesPerWeek { days: DaySelection::Days(days), .. } => days.contains(&day),
        }
    }

    /// Completions expected per week
    pub fn weekly_target(&self) -> u32 {
        match self {
            Cadence::Daily => 7,
            Cadence::Weekly(_) => 1,
            Cadence::TimesPerWeek { times, .. } => *times as u32,
        }
    }

    /// True for N-times-per-week habits without fixed days
    pub fn is_any_day(&self) -> bool {
        matches!(self, Cadence::TimesPerWeek { days: DaySelection::AnyDay, .. })
    }

    /// Dates of the week starting at `week_start` on which the habit may be done
    pub fn scheduled_days(&self, week_start: NaiveDate) -> Vec<NaiveDate> {
        (0..7)
            .map(|offset| week_start + Duration::days(offset))
            .filter(|date| self.is_scheduled_on(*date))
            .collect()
    }
}

/// Monday and Sunday of the ISO week containing `date`
pub fn iso_week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = date - Duration::days(DayOfWeek::of(date).days_from_monday());
    (start, start + Duration::days(6))
}

/// Coach-owned reusable habit template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct HabitPreset {
    pub id: String,
    pub coach_id: String,
    pub name: String,
    pub description: Option<String>,
    #[cfg_attr(feature = "with-api", schema(value_type = CadenceSpec))]
    pub cadence: Cadence,
    pub created_at: DateTime<Utc>,
}

/// A habit assigned to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Habit {
    pub id: String,
    pub client_id: String,
    pub coach_id: String,
    pub preset_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    #[cfg_attr(feature = "with-api", schema(value_type = CadenceSpec))]
    pub cadence: Cadence,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct HabitCompletion {
    pub habit_id: String,
    pub date: NaiveDate,
    /// User who recorded the completion
    pub recorded_by: String,
    pub created_at: DateTime<Utc>,
}

/// Completion state of one habit for one ISO week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct WeeklyProgress {
    pub habit_id: String,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub completed: u32,
    pub target: u32,
    pub scheduled_days: Vec<NaiveDate>,
    pub completed_dates: Vec<NaiveDate>,
}

impl WeeklyProgress {
    pub fn is_met(&self) -> bool {
        self.completed >= self.target
    }
}

/// Input for a coach-defined preset
#[derive(Debug, Clone, PartialEq)]
pub struct HabitPresetInput {
    pub name: String,
    pub description: Option<String>,
    pub cadence: CadenceSpec,
}

/// Input for assigning a habit to a client. Fields left empty are taken
/// from the preset when one is given.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssignHabitInput {
    pub preset_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub cadence: Option<CadenceSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HabitUpdateInput {
    pub name: String,
    pub description: Option<String>,
    pub cadence: CadenceSpec,
}

#[cfg(test)]
mod tests {
    use super::*;
    use DayOfWeek::*;

    fn spec(frequency: Frequency, times: Option<u8>, days: Vec<DayOfWeek>) -> CadenceSpec {
        CadenceSpec { frequency, times_per_week: times, days }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_times_per_week_requires_matching_day_count() {
        let three = Cadence::try_from(spec(Frequency::TimesPerWeek, Some(3), vec![Monday, Wednesday, Friday]));
        assert!(three.is_ok());

        let two = Cadence::try_from(spec(Frequency::TimesPerWeek, Some(3), vec![Monday, Wednesday]));
        assert_eq!(two, Err(CadenceError::DayCountMismatch { expected: 3, actual: 2 }));

        let any = Cadence::try_from(spec(Frequency::TimesPerWeek, Some(3), vec![])).unwrap();
        assert!(any.is_any_day());
    }

    #[test]
    fn test_times_per_week_bounds() {
        assert_eq!(
            Cadence::try_from(spec(Frequency::TimesPerWeek, Some(0), vec![])),
            Err(CadenceError::TimesOutOfRange(0))
        );
        assert_eq!(
            Cadence::try_from(spec(Frequency::TimesPerWeek, Some(7), vec![])),
            Err(CadenceError::TimesOutOfRange(7))
        );
        assert_eq!(
            Cadence::try_from(spec(Frequency::TimesPerWeek, None, vec![])),
            Err(CadenceError::MissingTimes)
        );
        assert_eq!(
            Cadence::try_from(spec(Frequency::TimesPerWeek, Some(2), vec![Monday, Monday])),
            Err(CadenceError::DuplicateDays)
        );
    }

    #[test]
    fn test_weekly_requires_exactly_one_day() {
        assert_eq!(
            Cadence::try_from(spec(Frequency::Weekly, None, vec![Sunday])),
            Ok(Cadence::Weekly(Sunday))
        );
        assert_eq!(
            Cadence::try_from(spec(Frequency::Weekly, None, vec![])),
            Err(CadenceError::WeeklyDayCount(0))
        );
        assert_eq!(
            Cadence::try_from(spec(Frequency::Weekly, None, vec![Monday, Tuesday])),
            Err(CadenceError::WeeklyDayCount(2))
        );
    }

    #[test]
    fn test_daily_rejects_selection() {
        assert_eq!(Cadence::try_from(spec(Frequency::Daily, None, vec![])), Ok(Cadence::Daily));
        assert!(Cadence::try_from(spec(Frequency::Daily, None, vec![Monday])).is_err());
    }

    #[test]
    fn test_is_scheduled_on() {
        // 2024-03-04 is a Monday
        let monday = date("2024-03-04");
        let tuesday = date("2024-03-05");

        assert!(Cadence::Daily.is_scheduled_on(tuesday));
        assert!(Cadence::Weekly(Monday).is_scheduled_on(monday));
        assert!(!Cadence::Weekly(Monday).is_scheduled_on(tuesday));

        let mwf = Cadence::try_from(spec(Frequency::TimesPerWeek, Some(3), vec![Monday, Wednesday, Friday])).unwrap();
        assert!(mwf.is_scheduled_on(monday));
        assert!(!mwf.is_scheduled_on(tuesday));

        let any = Cadence::try_from(spec(Frequency::TimesPerWeek, Some(2), vec![])).unwrap();
        assert!(any.is_scheduled_on(tuesday));
    }

    #[test]
    fn test_weekly_target_and_scheduled_days() {
        let week_start = date("2024-03-04");
        assert_eq!(Cadence::Daily.weekly_target(), 7);
        assert_eq!(Cadence::Weekly(Friday).weekly_target(), 1);
        assert_eq!(Cadence::Weekly(Friday).scheduled_days(week_start), vec![date("2024-03-08")]);

        let twice = Cadence::try_from(spec(Frequency::TimesPerWeek, Some(2), vec![Tuesday, Sunday])).unwrap();
        assert_eq!(twice.weekly_target(), 2);
        assert_eq!(twice.scheduled_days(week_start), vec![date("2024-03-05"), date("2024-03-10")]);
    }

    #[test]
    fn test_iso_week_bounds() {
        assert_eq!(iso_week_bounds(date("2024-03-07")), (date("2024-03-04"), date("2024-03-10")));
        assert_eq!(iso_week_bounds(date("2024-03-10")), (date("2024-03-04"), date("2024-03-10")));
        assert_eq!(iso_week_bounds(date("2024-12-31")), (date("2024-12-30"), date("2025-01-05")));
    }

    #[test]
    fn test_cadence_json_shape() {
        let cadence = Cadence::try_from(spec(Frequency::TimesPerWeek, Some(2), vec![Friday, Monday])).unwrap();
        let json = serde_json::to_value(&cadence).unwrap();
        assert_eq!(json["frequency"], "times_per_week");
        assert_eq!(json["times_per_week"], 2);
        assert_eq!(json["days"], serde_json::json!(["monday", "friday"]));

        let invalid: Result<Cadence, _> = serde_json::from_str(r#"{"frequency":"weekly","days":[]}"#);
        assert!(invalid.is_err());
    }
}
