use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use fit_coach_domain::entities::NewAccountInput;

/// A coach adding a client account
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(email(message = "Must be a valid email address"))]
    pub email: String,

    /// Initial password, shared with the client out of band
    #[validate(length(min = 8, max = 128, message = "Password must be at least 8 characters"))]
    pub password: String,
}

impl From<CreateClientRequest> for NewAccountInput {
    fn from(req: CreateClientRequest) -> Self {
        NewAccountInput { name: req.name, email: req.email, password: req.password }
    }
}
