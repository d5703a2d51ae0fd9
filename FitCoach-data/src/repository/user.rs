use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use crate::database::DbPool;
use crate::models::user::{NewUser, UserProfileUpdate, UserRecord};
use super::errors::RepositoryError;
use super::{connection, new_id, now_timestamp};

const USER_COLUMNS: &str =
    "id, email, name, role, coach_id, password_hash, created_at, updated_at";

/// Repository trait for user accounts
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    /// Create a user; duplicate emails are a conflict
    async fn create(&self, user: NewUser) -> Result<UserRecord, RepositoryError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<UserRecord>, RepositoryError>;

    /// Look up by email, case-insensitively
    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError>;

    /// All clients belonging to a coach, ordered by name
    async fn list_clients(&self, coach_id: &str) -> Result<Vec<UserRecord>, RepositoryError>;

    async fn update_profile(&self, id: &str, update: UserProfileUpdate) -> Result<UserRecord, RepositoryError>;
}

/// SQLite-backed user repository
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        role: row.get(3)?,
        coach_id: row.get(4)?,
        password_hash: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn create(&self, user: NewUser) -> Result<UserRecord, RepositoryError> {
        let now = now_timestamp();
        let record = UserRecord {
            id: new_id(),
            email: user.email.trim().to_lowercase(),
            name: user.name,
            role: user.role,
            coach_id: user.coach_id,
            password_hash: user.password_hash,
            created_at: now.clone(),
            updated_at: now,
        };

        debug!("Storing user: id={}, role={}", record.id, record.role);
        let conn = connection(&self.pool)?;
        conn.execute(
            &format!("INSERT INTO users ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)", USER_COLUMNS),
            params![
                record.id,
                record.email,
                record.name,
                record.role,
                record.coach_id,
                record.password_hash,
                record.created_at,
                record.updated_at,
            ],
        )?;

        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let conn = connection(&self.pool)?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                [id],
                map_user,
            )
            .optional()?;
        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let conn = connection(&self.pool)?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
                [email.trim().to_lowercase()],
                map_user,
            )
            .optional()?;
        Ok(user)
    }

    async fn list_clients(&self, coach_id: &str) -> Result<Vec<UserRecord>, RepositoryError> {
        let conn = connection(&self.pool)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users WHERE coach_id = ?1 AND role = 'client' ORDER BY name COLLATE NOCASE, created_at",
            USER_COLUMNS
        ))?;
        let clients = stmt
            .query_map([coach_id], map_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(clients)
    }

    async fn update_profile(&self, id: &str, update: UserProfileUpdate) -> Result<UserRecord, RepositoryError> {
        let mut user = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("User {}", id)))?;

        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(email) = update.email {
            user.email = email.trim().to_lowercase();
        }
        user.updated_at = now_timestamp();

        let conn = connection(&self.pool)?;
        conn.execute(
            "UPDATE users SET name = ?1, email = ?2, updated_at = ?3 WHERE id = ?4",
            params![user.name, user.email, user.updated_at, user.id],
        )?;

        Ok(user)
    }
}
