// Repository module structure
pub mod errors;
mod user;
mod plan;
mod habit;
mod check_in;
mod subscription;
mod message;

use chrono::{SecondsFormat, Utc};
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;

use crate::database::DbPool;

// Re-export commonly used types
pub use errors::RepositoryError;
pub use user::{UserRepository, UserRepositoryTrait};
pub use plan::{PlanRepository, PlanRepositoryTrait};
pub use habit::{HabitRepository, HabitRepositoryTrait};
pub use check_in::{CheckInRepository, CheckInRepositoryTrait};
pub use subscription::{SubscriptionRepository, SubscriptionRepositoryTrait};
pub use message::{MessageRepository, MessageRepositoryTrait};

pub(crate) type Connection = PooledConnection<SqliteConnectionManager>;

pub(crate) fn connection(pool: &DbPool) -> Result<Connection, RepositoryError> {
    Ok(pool.get()?)
}

/// Current time in the fixed-width RFC 3339 form used for every stored
/// timestamp, so that text ordering matches time ordering.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::database::create_in_memory_pool;
    use crate::models::user::NewUser;

    pub fn pool() -> DbPool {
        create_in_memory_pool().expect("in-memory pool")
    }

    pub async fn coach(pool: &DbPool, email: &str) -> String {
        UserRepository::new(pool.clone())
            .create(NewUser {
                email: email.to_string(),
                name: "Coach".to_string(),
                role: "coach".to_string(),
                coach_id: None,
                password_hash: "hash".to_string(),
            })
            .await
            .expect("coach")
            .id
    }

    pub async fn client(pool: &DbPool, coach_id: &str, email: &str) -> String {
        UserRepository::new(pool.clone())
            .create(NewUser {
                email: email.to_string(),
                name: "Client".to_string(),
                role: "client".to_string(),
                coach_id: Some(coach_id.to_string()),
                password_hash: "hash".to_string(),
            })
            .await
            .expect("client")
            .id
    }
}
