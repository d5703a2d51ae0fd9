//! Who may act on which client.

use std::sync::Arc;

use tracing::warn;

use fit_coach_data::repository::UserRepositoryTrait;

use crate::auth::AuthUser;
use crate::entities::conversions::convert_to_domain_user;
use crate::entities::{Role, User};
use crate::services::ServiceError;

/// Reject callers that are not coaches
pub fn require_coach(actor: &AuthUser) -> Result<(), ServiceError> {
    if actor.is_coach() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("Only coaches can do this".to_string()))
    }
}

/// Relationship checks shared by the services
#[derive(Clone)]
pub struct AccessControl {
    users: Arc<dyn UserRepositoryTrait>,
}

impl AccessControl {
    pub fn new(users: Arc<dyn UserRepositoryTrait>) -> Self {
        Self { users }
    }

    pub async fn load_user(&self, user_id: &str) -> Result<User, ServiceError> {
        let record = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;
        Ok(convert_to_domain_user(record)?)
    }

    /// A coach may access their own clients and a client only themselves.
    /// Returns the client.
    pub async fn ensure_can_access_client(&self, actor: &AuthUser, client_id: &str) -> Result<User, ServiceError> {
        let client = match self.load_user(client_id).await {
            Ok(user) if user.role == Role::Client => user,
            Ok(_) | Err(ServiceError::NotFound(_)) => {
                return Err(ServiceError::NotFound(format!("Client {} not found", client_id)))
            }
            Err(e) => return Err(e),
        };

        let allowed = match actor.role {
            Role::Coach => client.coach_id.as_deref() == Some(actor.user_id.as_str()),
            Role::Client => client.id == actor.user_id,
        };

        if allowed {
            Ok(client)
        } else {
            warn!("User {} denied access to client {}", actor.user_id, client_id);
            Err(ServiceError::Forbidden("You cannot access this client".to_string()))
        }
    }

    /// Like [`ensure_can_access_client`](Self::ensure_can_access_client) but
    /// only the client's coach passes
    pub async fn ensure_coach_of(&self, actor: &AuthUser, client_id: &str) -> Result<User, ServiceError> {
        require_coach(actor)?;
        self.ensure_can_access_client(actor, client_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{client, coach, pool, users};

    #[tokio::test]
    async fn test_coach_accesses_own_client_only() {
        let pool = pool();
        let coach_a = coach(&pool, "a@example.com").await;
        let coach_b = coach(&pool, "b@example.com").await;
        let client_a = client(&pool, &coach_a, "ca@example.com").await;
        let access = AccessControl::new(users(&pool));

        assert!(access.ensure_can_access_client(&coach_a, &client_a.user_id).await.is_ok());
        assert!(matches!(
            access.ensure_can_access_client(&coach_b, &client_a.user_id).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_client_accesses_only_self() {
        let pool = pool();
        let coach_a = coach(&pool, "a@example.com").await;
        let one = client(&pool, &coach_a, "one@example.com").await;
        let two = client(&pool, &coach_a, "two@example.com").await;
        let access = AccessControl::new(users(&pool));

        assert_eq!(access.ensure_can_access_client(&one, &one.user_id).await.unwrap().id, one.user_id);
        assert!(matches!(
            access.ensure_can_access_client(&one, &two.user_id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(access.ensure_coach_of(&one, &one.user_id).await, Err(ServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_unknown_or_non_client_is_not_found() {
        let pool = pool();
        let coach_a = coach(&pool, "a@example.com").await;
        let access = AccessControl::new(users(&pool));

        assert!(matches!(
            access.ensure_can_access_client(&coach_a, "missing").await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            access.ensure_can_access_client(&coach_a, &coach_a.user_id).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
