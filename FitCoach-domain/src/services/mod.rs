//! Application services.
//!
//! Each service is a trait plus one implementation over the repository
//! traits, so handlers can hold `Arc<dyn ...ServiceTrait>` and tests can
//! swap implementations.

use thiserror::Error;
use validator::{Validate, ValidationErrors};

use fit_coach_data::repository::RepositoryError;

use crate::billing::BillingError;

pub mod access;
pub mod accounts;
pub mod chat;
pub mod check_ins;
pub mod clients;
pub mod habits;
pub mod plans;
pub mod subscriptions;

pub use access::AccessControl;
pub use accounts::{AccountService, AccountServiceTrait};
pub use chat::{ChatService, ChatServiceTrait};
pub use check_ins::{CheckInService, CheckInServiceTrait};
pub use clients::{ClientService, ClientServiceTrait};
pub use habits::{HabitService, HabitServiceTrait};
pub use plans::{PlanService, PlanServiceTrait};
pub use subscriptions::{SubscriptionService, SubscriptionServiceTrait, WebhookOutcome};

/// Errors returned by every service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Authenticated, but not allowed to touch the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bad credentials or an unusable token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Billing error: {0}")]
    Billing(#[from] BillingError),

    #[error("Repository error: {0}")]
    Repository(String),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => ServiceError::NotFound(msg),
            RepositoryError::Validation(msg) => ServiceError::Validation(msg),
            RepositoryError::Conflict(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Repository(other.to_string()),
        }
    }
}

/// Flatten validator errors into `field: message; field: message`
pub fn validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let messages: Vec<String> = errors
                .iter()
                .map(|err| match &err.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid {}", field),
                })
                .collect();
            format!("{}: {}", field, messages.join(", "))
        })
        .collect();
    fields.sort();
    fields.join("; ")
}

pub(crate) fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|errors| ServiceError::Validation(validation_message(&errors)))
}

/// Trim an optional text field, dropping it when blank
pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use fit_coach_data::database::{create_in_memory_pool, DbPool};
    use fit_coach_data::models::user::NewUser;
    use fit_coach_data::repository::{UserRepository, UserRepositoryTrait};

    use crate::auth::AuthUser;
    use crate::entities::Role;

    pub fn pool() -> DbPool {
        create_in_memory_pool().unwrap()
    }

    async fn create(pool: &DbPool, email: &str, role: Role, coach_id: Option<&str>) -> AuthUser {
        let record = UserRepository::new(pool.clone())
            .create(NewUser {
                email: email.to_string(),
                name: email.split('@').next().unwrap_or("user").to_string(),
                role: role.as_str().to_string(),
                coach_id: coach_id.map(String::from),
                password_hash: crate::auth::password::hash_password("password123"),
            })
            .await
            .unwrap();
        AuthUser { user_id: record.id, role }
    }

    pub async fn coach(pool: &DbPool, email: &str) -> AuthUser {
        create(pool, email, Role::Coach, None).await
    }

    pub async fn client(pool: &DbPool, coach: &AuthUser, email: &str) -> AuthUser {
        create(pool, email, Role::Client, Some(&coach.user_id)).await
    }

    pub fn users(pool: &DbPool) -> Arc<dyn UserRepositoryTrait> {
        Arc::new(UserRepository::new(pool.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Input {
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn test_validation_message_lists_fields() {
        let input = Input { name: String::new(), email: "nope".to_string() };
        let err = validate_input(&input).unwrap_err();
        match err {
            ServiceError::Validation(msg) => {
                assert!(msg.contains("name: Name is required"), "{}", msg);
                assert!(msg.contains("email: Invalid email"), "{}", msg);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_repository_errors_keep_their_kind() {
        assert!(matches!(ServiceError::from(RepositoryError::NotFound("x".into())), ServiceError::NotFound(_)));
        assert!(matches!(ServiceError::from(RepositoryError::Conflict("x".into())), ServiceError::Conflict(_)));
        assert!(matches!(
            ServiceError::from(RepositoryError::Serialization("x".into())),
            ServiceError::Repository(_)
        ));
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(Some("  hi ".into())), Some("hi".to_string()));
        assert_eq!(normalize_optional(Some("   ".into())), None);
        assert_eq!(normalize_optional(None), None);
    }
}
