//! Next payment retry estimation for failing subscriptions.
//!
//! The billing provider exposes the next attempt on the open invoice when it
//! has scheduled one. When it has not, the attempt is estimated from the
//! provider's default smart-retry spacing counted from invoice creation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

use crate::entities::SubscriptionStatus;

/// Hours after invoice creation at which retries are expected
pub const RETRY_SCHEDULE_HOURS: [i64; 4] = [1, 6, 12, 23];

pub const NO_FURTHER_RETRIES: &str = "No further automatic retries";
pub const RETRY_DUE_NOW: &str = "Payment retry is due now";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub enum RetrySource {
    /// Taken from the invoice's `next_payment_attempt`
    Scheduled,
    /// Derived from the retry schedule
    Estimated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct RetryEstimate {
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub source: Option<RetrySource>,
    pub message: String,
}

/// Invoice facts the estimate is computed from
#[derive(Debug, Clone, Default)]
pub struct RetryInputs {
    pub invoice_created: Option<DateTime<Utc>>,
    pub next_payment_attempt: Option<DateTime<Utc>>,
    /// Charge attempts already made, the initial one included
    pub attempt_count: u32,
    pub payment_intent_created: Option<DateTime<Utc>>,
}

/// Estimate the next automatic payment retry.
///
/// Returns `None` when the status never retries.
pub fn estimate_next_retry(
    status: &SubscriptionStatus,
    inputs: &RetryInputs,
    now: DateTime<Utc>,
) -> Option<RetryEstimate> {
    if !status.is_retrying() {
        return None;
    }

    if let Some(scheduled) = inputs.next_payment_attempt {
        return Some(RetryEstimate {
            next_attempt_at: Some(scheduled),
            source: Some(RetrySource::Scheduled),
            message: format_retry_message(scheduled, now),
        });
    }

    let anchor = inputs
        .invoice_created
        .or(inputs.payment_intent_created)
        .unwrap_or(now);
    let retries_made = inputs.attempt_count.saturating_sub(1) as usize;

    let next = RETRY_SCHEDULE_HOURS
        .iter()
        .skip(retries_made)
        .map(|hours| anchor + Duration::hours(*hours))
        .find(|candidate| *candidate > now);

    Some(match next {
        Some(at) => RetryEstimate {
            next_attempt_at: Some(at),
            source: Some(RetrySource::Estimated),
            message: format_retry_message(at, now),
        },
        None => RetryEstimate {
            next_attempt_at: None,
            source: None,
            message: NO_FURTHER_RETRIES.to_string(),
        },
    })
}

/// Human readable distance to the next retry
pub fn format_retry_message(next_attempt: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (next_attempt - now).num_seconds();
    if seconds <= 0 {
        return RETRY_DUE_NOW.to_string();
    }
    if seconds < 60 {
        return "Next payment retry in less than a minute".to_string();
    }

    let (amount, unit) = if seconds < 3_600 {
        (seconds / 60, "minute")
    } else if seconds < 86_400 {
        (seconds / 3_600, "hour")
    } else {
        (seconds / 86_400, "day")
    };
    let plural = if amount == 1 { "" } else { "s" };
    format!("Next payment retry in {} {}{}", amount, unit, plural)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_non_retrying_status_has_no_estimate() {
        let inputs = RetryInputs { invoice_created: Some(at(0, 0)), ..Default::default() };
        assert!(estimate_next_retry(&SubscriptionStatus::Active, &inputs, at(0, 30)).is_none());
        assert!(estimate_next_retry(&SubscriptionStatus::Canceled, &inputs, at(0, 30)).is_none());
    }

    #[test]
    fn test_scheduled_attempt_wins() {
        let inputs = RetryInputs {
            invoice_created: Some(at(0, 0)),
            next_payment_attempt: Some(at(5, 0)),
            attempt_count: 1,
            payment_intent_created: None,
        };
        let estimate = estimate_next_retry(&SubscriptionStatus::PastDue, &inputs, at(2, 0)).unwrap();
        assert_eq!(estimate.source, Some(RetrySource::Scheduled));
        assert_eq!(estimate.next_attempt_at, Some(at(5, 0)));
        assert_eq!(estimate.message, "Next payment retry in 3 hours");
    }

    #[test]
    fn test_past_scheduled_attempt_is_due_now() {
        let inputs = RetryInputs { next_payment_attempt: Some(at(1, 0)), ..Default::default() };
        let estimate = estimate_next_retry(&SubscriptionStatus::Unpaid, &inputs, at(2, 0)).unwrap();
        assert_eq!(estimate.message, RETRY_DUE_NOW);
    }

    #[test]
    fn test_estimate_uses_first_point_after_now() {
        let inputs = RetryInputs { invoice_created: Some(at(0, 0)), attempt_count: 1, ..Default::default() };
        let estimate = estimate_next_retry(&SubscriptionStatus::PastDue, &inputs, at(2, 0)).unwrap();
        assert_eq!(estimate.source, Some(RetrySource::Estimated));
        assert_eq!(estimate.next_attempt_at, Some(at(6, 0)));
        assert_eq!(estimate.message, "Next payment retry in 4 hours");
    }

    #[test]
    fn test_estimate_skips_attempts_already_made() {
        // Initial charge plus two retries: the next one is the third point (12h)
        let inputs = RetryInputs { invoice_created: Some(at(0, 0)), attempt_count: 3, ..Default::default() };
        let estimate = estimate_next_retry(&SubscriptionStatus::PastDue, &inputs, at(0, 30)).unwrap();
        assert_eq!(estimate.next_attempt_at, Some(at(12, 0)));
    }

    #[test]
    fn test_falls_back_to_payment_intent_then_now() {
        let inputs = RetryInputs { payment_intent_created: Some(at(10, 0)), ..Default::default() };
        let estimate = estimate_next_retry(&SubscriptionStatus::Incomplete, &inputs, at(10, 30)).unwrap();
        assert_eq!(estimate.next_attempt_at, Some(at(11, 0)));
        assert_eq!(estimate.message, "Next payment retry in 30 minutes");

        let estimate = estimate_next_retry(&SubscriptionStatus::Incomplete, &RetryInputs::default(), at(3, 0)).unwrap();
        assert_eq!(estimate.next_attempt_at, Some(at(4, 0)));
        assert_eq!(estimate.message, "Next payment retry in 1 hour");
    }

    #[test]
    fn test_schedule_exhausted() {
        let inputs = RetryInputs { invoice_created: Some(at(0, 0)), attempt_count: 2, ..Default::default() };
        let estimate = estimate_next_retry(&SubscriptionStatus::PastDue, &inputs, at(23, 30)).unwrap();
        assert_eq!(estimate.next_attempt_at, None);
        assert_eq!(estimate.message, NO_FURTHER_RETRIES);

        let inputs = RetryInputs { invoice_created: Some(at(0, 0)), attempt_count: 5, ..Default::default() };
        let estimate = estimate_next_retry(&SubscriptionStatus::PastDue, &inputs, at(0, 10)).unwrap();
        assert_eq!(estimate.message, NO_FURTHER_RETRIES);
    }

    #[test]
    fn test_message_units() {
        let now = at(0, 0);
        assert_eq!(format_retry_message(now + Duration::seconds(59), now), "Next payment retry in less than a minute");
        assert_eq!(format_retry_message(now + Duration::seconds(60), now), "Next payment retry in 1 minute");
        assert_eq!(format_retry_message(now + Duration::minutes(59), now), "Next payment retry in 59 minutes");
        assert_eq!(format_retry_message(now + Duration::hours(23), now), "Next payment retry in 23 hours");
        assert_eq!(format_retry_message(now + Duration::hours(24), now), "Next payment retry in 1 day");
        assert_eq!(format_retry_message(now + Duration::days(3), now), "Next payment retry in 3 days");
        assert_eq!(format_retry_message(now, now), RETRY_DUE_NOW);
    }
}
