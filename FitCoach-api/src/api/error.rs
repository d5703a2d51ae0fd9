use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

use fit_coach_domain::billing::BillingError;
use fit_coach_domain::services::ServiceError;

/// Error response format for API
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error type/code - machine-readable identifier
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("forbidden", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("conflict", message)
    }

    pub fn payment_required(message: impl Into<String>) -> Self {
        Self::new("payment_required", message)
    }

    pub fn billing_error(message: impl Into<String>) -> Self {
        Self::new("billing_error", message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new("service_unavailable", message)
    }

    /// Create an internal error response
    pub fn internal_error() -> Self {
        Self::new("internal_error", "An unexpected error occurred")
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status(&self) -> StatusCode {
        match self.error.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "validation_error" | "bad_request" => StatusCode::BAD_REQUEST,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "conflict" => StatusCode::CONFLICT,
            "payment_required" => StatusCode::PAYMENT_REQUIRED,
            "billing_error" => StatusCode::BAD_GATEWAY,
            "service_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ServiceError> for ErrorResponse {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => Self::validation_error(msg),
            ServiceError::NotFound(msg) => Self::not_found(msg),
            ServiceError::Forbidden(msg) => Self::forbidden(msg),
            ServiceError::Conflict(msg) => Self::conflict(msg),
            ServiceError::Unauthorized(msg) => Self::unauthorized(msg),
            ServiceError::Billing(billing) => billing.into(),
            ServiceError::Repository(msg) => {
                error!("Repository failure: {}", msg);
                Self::internal_error()
            }
        }
    }
}

impl From<BillingError> for ErrorResponse {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::InvalidSignature(msg) => {
                warn!("Rejected webhook: {}", msg);
                Self::bad_request("Invalid webhook signature")
            }
            BillingError::Configuration(msg) => {
                warn!("Billing unavailable: {}", msg);
                Self::service_unavailable("Billing is not available")
            }
            BillingError::Api { status, error_type, message } => {
                warn!("Billing provider returned {} ({}): {}", status, error_type, message);
                let details = serde_json::json!({ "provider_status": status, "provider_error": error_type });
                // Auth and rate-limit rejections are ours, not the caller's
                let response = match status {
                    402 => Self::payment_required(message),
                    401 | 403 | 429 => Self::billing_error(message),
                    400..=499 => Self::bad_request(message),
                    _ => Self::billing_error(message),
                };
                response.with_details(details)
            }
            other => {
                error!("Billing request failed: {}", other);
                Self::billing_error("The billing provider could not be reached")
            }
        }
    }
}

/// Result type for handlers
pub type ApiResult<T> = Result<T, ErrorResponse>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServiceError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (ServiceError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ServiceError::Repository("db down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ErrorResponse::from(err).status(), status);
        }
    }

    #[test]
    fn test_billing_errors_map_to_statuses() {
        let signature = ErrorResponse::from(ServiceError::Billing(BillingError::InvalidSignature("t".into())));
        assert_eq!(signature.status(), StatusCode::BAD_REQUEST);

        let config = ErrorResponse::from(BillingError::Configuration("no key".into()));
        assert_eq!(config.status(), StatusCode::SERVICE_UNAVAILABLE);

        let declined = ErrorResponse::from(BillingError::Api {
            status: 402,
            error_type: "card_error".into(),
            message: "Your card was declined.".into(),
        });
        assert_eq!(declined.status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(declined.message, "Your card was declined.");

        let bad_method = ErrorResponse::from(BillingError::Api {
            status: 404,
            error_type: "invalid_request_error".into(),
            message: "No such PaymentMethod: 'pm_x'".into(),
        });
        assert_eq!(bad_method.status(), StatusCode::BAD_REQUEST);

        let bad_key = ErrorResponse::from(BillingError::Api {
            status: 401,
            error_type: "invalid_request_error".into(),
            message: "Invalid API Key provided".into(),
        });
        assert_eq!(bad_key.status(), StatusCode::BAD_GATEWAY);

        let outage = ErrorResponse::from(BillingError::Api {
            status: 500,
            error_type: "api_error".into(),
            message: "Something went wrong".into(),
        });
        assert_eq!(outage.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_internal_details_are_not_returned() {
        let response = ErrorResponse::from(ServiceError::Repository("SQLite error: disk I/O".into()));
        assert_eq!(response.message, "An unexpected error occurred");
    }
}
