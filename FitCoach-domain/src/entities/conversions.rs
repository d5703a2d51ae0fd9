//! Conversions between storage records and domain entities.
//!
//! Records carry RFC 3339 text timestamps and JSON documents; a value that
//! fails to parse surfaces as `RepositoryError::Serialization`.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use fit_coach_data::models::check_in::{CheckInFormRecord, CheckInRecord};
use fit_coach_data::models::habit::{CompletionRecord, HabitPresetRecord, HabitRecord};
use fit_coach_data::models::message::MessageRecord;
use fit_coach_data::models::plan::PlanRecord;
use fit_coach_data::models::subscription::SubscriptionRecord;
use fit_coach_data::models::user::UserRecord;
use fit_coach_data::repository::RepositoryError;

use crate::entities::{
    CheckIn, CheckInForm, CheckInKind, Habit, HabitCompletion, HabitPreset, MealPlan, Message,
    Subscription, User, WorkoutPlan,
};

/// Date format used for completion dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Serialization(format!("Invalid timestamp '{}': {}", value, e)))
}

fn parse_optional_timestamp(value: Option<&str>) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.map(parse_timestamp).transpose()
}

pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_date(value: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| RepositoryError::Serialization(format!("Invalid date '{}': {}", value, e)))
}

pub fn format_date(value: NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

pub fn from_json<T: DeserializeOwned>(value: &str) -> Result<T, RepositoryError> {
    Ok(serde_json::from_str(value)?)
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String, RepositoryError> {
    Ok(serde_json::to_string(value)?)
}

pub fn convert_to_domain_user(record: UserRecord) -> Result<User, RepositoryError> {
    Ok(User {
        role: record.role.parse().map_err(RepositoryError::Serialization)?,
        created_at: parse_timestamp(&record.created_at)?,
        updated_at: parse_timestamp(&record.updated_at)?,
        id: record.id,
        email: record.email,
        name: record.name,
        coach_id: record.coach_id,
    })
}

pub fn convert_to_domain_meal_plan(record: PlanRecord) -> Result<MealPlan, RepositoryError> {
    Ok(MealPlan {
        meals: from_json(&record.document_json)?,
        created_at: parse_timestamp(&record.created_at)?,
        updated_at: parse_timestamp(&record.updated_at)?,
        id: record.id,
        client_id: record.client_id,
        coach_id: record.coach_id,
        name: record.name,
        description: record.description,
        is_active: record.is_active,
    })
}

pub fn convert_to_domain_workout_plan(record: PlanRecord) -> Result<WorkoutPlan, RepositoryError> {
    Ok(WorkoutPlan {
        days: from_json(&record.document_json)?,
        created_at: parse_timestamp(&record.created_at)?,
        updated_at: parse_timestamp(&record.updated_at)?,
        id: record.id,
        client_id: record.client_id,
        coach_id: record.coach_id,
        name: record.name,
        description: record.description,
        is_active: record.is_active,
    })
}

pub fn convert_to_domain_preset(record: HabitPresetRecord) -> Result<HabitPreset, RepositoryError> {
    Ok(HabitPreset {
        cadence: from_json(&record.cadence_json)?,
        created_at: parse_timestamp(&record.created_at)?,
        id: record.id,
        coach_id: record.coach_id,
        name: record.name,
        description: record.description,
    })
}

pub fn convert_to_domain_habit(record: HabitRecord) -> Result<Habit, RepositoryError> {
    Ok(Habit {
        cadence: from_json(&record.cadence_json)?,
        created_at: parse_timestamp(&record.created_at)?,
        updated_at: parse_timestamp(&record.updated_at)?,
        id: record.id,
        client_id: record.client_id,
        coach_id: record.coach_id,
        preset_id: record.preset_id,
        name: record.name,
        description: record.description,
        archived: record.archived,
    })
}

pub fn convert_to_domain_completion(record: CompletionRecord) -> Result<HabitCompletion, RepositoryError> {
    Ok(HabitCompletion {
        date: parse_date(&record.completed_on)?,
        created_at: parse_timestamp(&record.created_at)?,
        habit_id: record.habit_id,
        recorded_by: record.recorded_by,
    })
}

pub fn convert_to_domain_form(record: CheckInFormRecord) -> Result<CheckInForm, RepositoryError> {
    Ok(CheckInForm {
        questions: from_json(&record.questions_json)?,
        created_at: parse_timestamp(&record.created_at)?,
        id: record.id,
        coach_id: record.coach_id,
        title: record.title,
    })
}

pub fn convert_to_domain_check_in(record: CheckInRecord) -> Result<CheckIn, RepositoryError> {
    let kind = CheckInKind::parse(&record.kind)
        .ok_or_else(|| RepositoryError::Serialization(format!("Unknown check-in kind: {}", record.kind)))?;

    Ok(CheckIn {
        kind,
        responses: from_json(&record.responses_json)?,
        created_at: parse_timestamp(&record.created_at)?,
        id: record.id,
        client_id: record.client_id,
        author_id: record.author_id,
        note: record.note,
        form_id: record.form_id,
        weight_kg: record.weight_kg,
    })
}

pub fn convert_to_domain_subscription(record: SubscriptionRecord) -> Result<Subscription, RepositoryError> {
    Ok(Subscription {
        status: record.status.into(),
        current_period_end: parse_optional_timestamp(record.current_period_end.as_deref())?,
        created_at: parse_timestamp(&record.created_at)?,
        updated_at: parse_timestamp(&record.updated_at)?,
        id: record.id,
        client_id: record.client_id,
        coach_id: record.coach_id,
        customer_id: record.customer_id,
        subscription_id: record.subscription_id,
        price_id: record.price_id,
        cancel_at_period_end: record.cancel_at_period_end,
    })
}

pub fn convert_to_domain_message(record: MessageRecord) -> Result<Message, RepositoryError> {
    Ok(Message {
        created_at: parse_timestamp(&record.created_at)?,
        read_at: parse_optional_timestamp(record.read_at.as_deref())?,
        id: record.id,
        sender_id: record.sender_id,
        recipient_id: record.recipient_id,
        body: record.body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Cadence, DayOfWeek, Role, SubscriptionStatus};

    #[test]
    fn test_user_conversion() {
        let record = UserRecord {
            id: "u1".to_string(),
            email: "coach@example.com".to_string(),
            name: "Coach".to_string(),
            role: "coach".to_string(),
            coach_id: None,
            password_hash: "secret".to_string(),
            created_at: "2024-03-01T10:00:00.000000Z".to_string(),
            updated_at: "2024-03-01T10:00:00.000000Z".to_string(),
        };
        let user = convert_to_domain_user(record).unwrap();
        assert_eq!(user.role, Role::Coach);
        assert!(user.is_coach());
    }

    #[test]
    fn test_bad_timestamp_is_serialization_error() {
        let record = MessageRecord {
            id: "m1".to_string(),
            sender_id: "a".to_string(),
            recipient_id: "b".to_string(),
            body: "hi".to_string(),
            created_at: "yesterday".to_string(),
            read_at: None,
        };
        assert!(matches!(convert_to_domain_message(record), Err(RepositoryError::Serialization(_))));
    }

    #[test]
    fn test_habit_cadence_is_validated_on_load() {
        let mut record = HabitRecord {
            id: "h1".to_string(),
            client_id: "c".to_string(),
            coach_id: "k".to_string(),
            preset_id: None,
            name: "Walk".to_string(),
            description: None,
            cadence_json: r#"{"frequency":"weekly","days":["monday"]}"#.to_string(),
            archived: false,
            created_at: "2024-03-01T10:00:00Z".to_string(),
            updated_at: "2024-03-01T10:00:00Z".to_string(),
        };
        let habit = convert_to_domain_habit(record.clone()).unwrap();
        assert_eq!(habit.cadence, Cadence::Weekly(DayOfWeek::Monday));

        record.cadence_json = r#"{"frequency":"weekly","days":[]}"#.to_string();
        assert!(convert_to_domain_habit(record).is_err());
    }

    #[test]
    fn test_subscription_keeps_unknown_status() {
        let record = SubscriptionRecord {
            id: "s1".to_string(),
            client_id: "c".to_string(),
            coach_id: "k".to_string(),
            customer_id: "cus_1".to_string(),
            subscription_id: "sub_1".to_string(),
            price_id: "price_1".to_string(),
            status: "on_hold".to_string(),
            current_period_end: Some("2024-04-01T00:00:00Z".to_string()),
            cancel_at_period_end: false,
            created_at: "2024-03-01T10:00:00Z".to_string(),
            updated_at: "2024-03-01T10:00:00Z".to_string(),
        };
        let subscription = convert_to_domain_subscription(record).unwrap();
        assert_eq!(subscription.status, SubscriptionStatus::Other("on_hold".to_string()));
        assert!(subscription.current_period_end.is_some());
    }

    #[test]
    fn test_date_round_trip_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(format_date(date), "2024-03-04");
        assert_eq!(parse_date("2024-03-04").unwrap(), date);
        assert!(parse_date("04/03/2024").is_err());
    }
}
