use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use fit_coach_domain::entities::{LoginInput, NewAccountInput};

/// Coach self-registration payload
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegistrationRequest {
    /// Display name
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    /// Email address (must be valid format)
    #[validate(email(message = "Must be a valid email address"))]
    pub email: String,

    /// Password (must be at least 8 characters)
    #[validate(length(min = 8, max = 128, message = "Password must be at least 8 characters"))]
    pub password: String,
}

impl From<RegistrationRequest> for NewAccountInput {
    fn from(req: RegistrationRequest) -> Self {
        NewAccountInput { name: req.name, email: req.email, password: req.password }
    }
}

/// Login request payload
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Must be a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl From<LoginRequest> for LoginInput {
    fn from(req: LoginRequest) -> Self {
        LoginInput { email: req.email, password: req.password }
    }
}

/// Refresh token exchange payload
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}
