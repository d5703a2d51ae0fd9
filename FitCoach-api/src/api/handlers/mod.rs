pub mod auth;
pub mod chat;
pub mod check_ins;
pub mod clients;
pub mod habits;
pub mod health;
pub mod meal_plans;
pub mod subscriptions;
pub mod webhooks;
pub mod workout_plans;

use validator::Validate;

use fit_coach_domain::services::validation_message;

use crate::api::error::{ApiResult, ErrorResponse};

/// Reject a request body that fails its validator rules
pub(crate) fn validate_request<T: Validate>(request: &T) -> ApiResult<()> {
    request
        .validate()
        .map_err(|errors| ErrorResponse::validation_error(validation_message(&errors)))
}
