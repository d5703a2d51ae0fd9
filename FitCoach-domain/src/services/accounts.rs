use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use fit_coach_data::database::DbPool;
use fit_coach_data::models::user::NewUser;
use fit_coach_data::repository::{UserRepository, UserRepositoryTrait};

use crate::auth::logging::{log_failed_login, log_logout, log_registration, log_successful_login, log_token_refresh};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::token::{TokenPair, TokenService, TokenType};
use crate::entities::conversions::convert_to_domain_user;
use crate::entities::{AuthSession, LoginInput, NewAccountInput, Role, User};
use crate::services::{validate_input, ServiceError};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Registration, sign-in and token lifecycle
#[async_trait]
pub trait AccountServiceTrait: Send + Sync {
    /// Create a coach account and sign it in
    async fn register_coach(&self, input: NewAccountInput) -> Result<AuthSession, ServiceError>;

    async fn login(&self, input: LoginInput) -> Result<AuthSession, ServiceError>;

    /// Exchange a refresh token for a new pair
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ServiceError>;

    /// Revoke every token issued to the user so far
    async fn logout(&self, user_id: &str) -> Result<(), ServiceError>;

    async fn me(&self, user_id: &str) -> Result<User, ServiceError>;
}

pub struct AccountService {
    users: Arc<dyn UserRepositoryTrait>,
    tokens: Arc<TokenService>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepositoryTrait>, tokens: Arc<TokenService>) -> Self {
        Self { users, tokens }
    }

    pub fn from_pool(pool: &DbPool, tokens: Arc<TokenService>) -> Self {
        Self::new(Arc::new(UserRepository::new(pool.clone())), tokens)
    }

    fn session(&self, user: User) -> Result<AuthSession, ServiceError> {
        let tokens = self
            .tokens
            .issue_pair(&user.id, user.role)
            .map_err(|e| ServiceError::Repository(format!("Failed to issue tokens: {}", e)))?;
        Ok(AuthSession { user, tokens })
    }
}

/// Hash the password and store a new account. Shared with client creation.
pub(crate) async fn create_account(
    users: &dyn UserRepositoryTrait,
    input: NewAccountInput,
    role: Role,
    coach_id: Option<String>,
) -> Result<User, ServiceError> {
    validate_input(&input)?;

    let email = input.email.trim().to_lowercase();
    if users.get_by_email(&email).await?.is_some() {
        return Err(ServiceError::Conflict(format!("An account for {} already exists", email)));
    }

    let record = users
        .create(NewUser {
            email,
            name: input.name.trim().to_string(),
            role: role.as_str().to_string(),
            coach_id,
            password_hash: hash_password(&input.password),
        })
        .await?;

    Ok(convert_to_domain_user(record)?)
}

#[async_trait]
impl AccountServiceTrait for AccountService {
    #[instrument(skip(self, input), fields(email = %input.email))]
    async fn register_coach(&self, input: NewAccountInput) -> Result<AuthSession, ServiceError> {
        let user = create_account(self.users.as_ref(), input, Role::Coach, None).await?;
        log_registration(&user.id);
        info!("Registered coach {}", user.id);
        self.session(user)
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    async fn login(&self, input: LoginInput) -> Result<AuthSession, ServiceError> {
        validate_input(&input)?;

        let record = match self.users.get_by_email(input.email.trim()).await? {
            Some(record) => record,
            None => {
                log_failed_login(&input.email, "unknown email");
                return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
        };

        if !verify_password(&input.password, &record.password_hash) {
            log_failed_login(&input.email, "wrong password");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let user = convert_to_domain_user(record)?;
        log_successful_login(&user.id);
        self.session(user)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ServiceError> {
        let claims = self.tokens.validate(refresh_token, TokenType::Refresh).map_err(|e| {
            log_token_refresh(None, false, Some(&e.to_string()));
            ServiceError::Unauthorized(e.to_string())
        })?;

        // The account may have been removed since the token was issued
        let record = self
            .users
            .get_by_id(&claims.sub)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Account no longer exists".to_string()))?;
        let user = convert_to_domain_user(record)?;

        let pair = self
            .tokens
            .issue_pair(&user.id, user.role)
            .map_err(|e| ServiceError::Repository(format!("Failed to issue tokens: {}", e)))?;
        log_token_refresh(Some(&user.id), true, None);
        Ok(pair)
    }

    async fn logout(&self, user_id: &str) -> Result<(), ServiceError> {
        self.tokens.revoke_all(user_id);
        log_logout(user_id);
        Ok(())
    }

    async fn me(&self, user_id: &str) -> Result<User, ServiceError> {
        let record = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;
        Ok(convert_to_domain_user(record)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::TokenConfig;
    use crate::services::test_support::pool;

    fn service() -> AccountService {
        let tokens = Arc::new(TokenService::new(TokenConfig::new("accounts-test", "test")));
        AccountService::from_pool(&pool(), tokens)
    }

    fn registration(email: &str) -> NewAccountInput {
        NewAccountInput {
            name: "Casey Coach".to_string(),
            email: email.to_string(),
            password: "supersecret".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let service = service();
        let session = service.register_coach(registration("Coach@Example.com")).await.unwrap();
        assert_eq!(session.user.role, Role::Coach);
        assert_eq!(session.user.email, "coach@example.com");
        assert_eq!(session.tokens.token_type, "Bearer");

        let login = service
            .login(LoginInput { email: "coach@example.com".to_string(), password: "supersecret".to_string() })
            .await
            .unwrap();
        assert_eq!(login.user.id, session.user.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let service = service();
        service.register_coach(registration("dup@example.com")).await.unwrap();
        let result = service.register_coach(registration("DUP@example.com")).await;
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_registration_is_validated() {
        let mut input = registration("coach@example.com");
        input.password = "short".to_string();
        assert!(matches!(service().register_coach(input).await, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let service = service();
        service.register_coach(registration("coach@example.com")).await.unwrap();
        let result = service
            .login(LoginInput { email: "coach@example.com".to_string(), password: "nope-nope".to_string() })
            .await;
        assert!(matches!(result, Err(ServiceError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_refresh_and_logout() {
        let service = service();
        let session = service.register_coach(registration("coach@example.com")).await.unwrap();

        assert!(service.refresh(&session.tokens.refresh_token).await.is_ok());
        assert!(matches!(
            service.refresh(&session.tokens.access_token).await,
            Err(ServiceError::Unauthorized(_))
        ));

        std::thread::sleep(std::time::Duration::from_millis(5));
        service.logout(&session.user.id).await.unwrap();
        assert!(matches!(
            service.refresh(&session.tokens.refresh_token).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_me() {
        let service = service();
        let session = service.register_coach(registration("coach@example.com")).await.unwrap();
        assert_eq!(service.me(&session.user.id).await.unwrap().name, "Casey Coach");
        assert!(matches!(service.me("missing").await, Err(ServiceError::NotFound(_))));
    }
}
