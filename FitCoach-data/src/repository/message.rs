use async_trait::async_trait;
use rusqlite::{params, Row};
use tracing::debug;

use crate::database::DbPool;
use crate::models::message::{MessageRecord, NewMessage, UnreadCount};
use super::errors::RepositoryError;
use super::{connection, new_id, now_timestamp};

/// Repository trait for chat messages
#[async_trait]
pub trait MessageRepositoryTrait: Send + Sync {
    async fn insert(&self, message: NewMessage) -> Result<MessageRecord, RepositoryError>;

    /// Messages exchanged between two users in either direction, newest
    /// first, with the total count
    async fn conversation(
        &self,
        user_a: &str,
        user_b: &str,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<MessageRecord>, usize), RepositoryError>;

    /// Mark everything `sender_id` sent to `recipient_id` as read. Returns the
    /// number of messages changed.
    async fn mark_read(&self, recipient_id: &str, sender_id: &str) -> Result<usize, RepositoryError>;

    /// Unread messages addressed to a user, grouped by sender
    async fn unread_counts(&self, recipient_id: &str) -> Result<Vec<UnreadCount>, RepositoryError>;
}

/// SQLite-backed message repository
#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: DbPool,
}

impl MessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<MessageRecord> {
    Ok(MessageRecord {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        recipient_id: row.get(2)?,
        body: row.get(3)?,
        created_at: row.get(4)?,
        read_at: row.get(5)?,
    })
}

#[async_trait]
impl MessageRepositoryTrait for MessageRepository {
    async fn insert(&self, message: NewMessage) -> Result<MessageRecord, RepositoryError> {
        let record = MessageRecord {
            id: new_id(),
            sender_id: message.sender_id,
            recipient_id: message.recipient_id,
            body: message.body,
            created_at: now_timestamp(),
            read_at: None,
        };

        debug!("Storing message {} from {} to {}", record.id, record.sender_id, record.recipient_id);
        let conn = connection(&self.pool)?;
        conn.execute(
            "INSERT INTO messages (id, sender_id, recipient_id, body, created_at, read_at)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
            params![record.id, record.sender_id, record.recipient_id, record.body, record.created_at],
        )?;
        Ok(record)
    }

    async fn conversation(
        &self,
        user_a: &str,
        user_b: &str,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<MessageRecord>, usize), RepositoryError> {
        let conn = connection(&self.pool)?;
        let filter = "(sender_id = ?1 AND recipient_id = ?2) OR (sender_id = ?2 AND recipient_id = ?1)";

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM messages WHERE {}", filter),
            [user_a, user_b],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT id, sender_id, recipient_id, body, created_at, read_at FROM messages
             WHERE {} ORDER BY created_at DESC, rowid DESC LIMIT ?3 OFFSET ?4",
            filter
        ))?;
        let messages = stmt
            .query_map(params![user_a, user_b, limit as i64, i64::try_from(offset).unwrap_or(i64::MAX)], map_message)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((messages, total as usize))
    }

    async fn mark_read(&self, recipient_id: &str, sender_id: &str) -> Result<usize, RepositoryError> {
        let conn = connection(&self.pool)?;
        let changed = conn.execute(
            "UPDATE messages SET read_at = ?1
             WHERE recipient_id = ?2 AND sender_id = ?3 AND read_at IS NULL",
            params![now_timestamp(), recipient_id, sender_id],
        )?;
        Ok(changed)
    }

    async fn unread_counts(&self, recipient_id: &str) -> Result<Vec<UnreadCount>, RepositoryError> {
        let conn = connection(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT sender_id, COUNT(*) FROM messages
             WHERE recipient_id = ?1 AND read_at IS NULL
             GROUP BY sender_id ORDER BY sender_id",
        )?;
        let counts = stmt
            .query_map([recipient_id], |row| {
                Ok(UnreadCount {
                    sender_id: row.get(0)?,
                    count: row.get::<_, i64>(1)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;

    fn message(from: &str, to: &str, body: &str) -> NewMessage {
        NewMessage {
            sender_id: from.to_string(),
            recipient_id: to.to_string(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_conversation_and_unread_counts() {
        let pool = test_support::pool();
        let coach = test_support::coach(&pool, "coach@example.com").await;
        let client = test_support::client(&pool, &coach, "client@example.com").await;
        let other = test_support::client(&pool, &coach, "other@example.com").await;
        let repo = MessageRepository::new(pool.clone());

        repo.insert(message(&client, &coach, "hi coach")).await.unwrap();
        repo.insert(message(&coach, &client, "hi client")).await.unwrap();
        let last = repo.insert(message(&client, &coach, "question")).await.unwrap();
        repo.insert(message(&other, &coach, "hello")).await.unwrap();

        let (page, total) = repo.conversation(&coach, &client, 10, 0).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page[0].id, last.id);

        let counts = repo.unread_counts(&coach).await.unwrap();
        let from_client = counts.iter().find(|c| c.sender_id == client).unwrap();
        assert_eq!(from_client.count, 2);
        assert_eq!(counts.iter().map(|c| c.count).sum::<usize>(), 3);

        assert_eq!(repo.mark_read(&coach, &client).await.unwrap(), 2);
        let counts = repo.unread_counts(&coach).await.unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].sender_id, other);

        assert_eq!(repo.unread_counts(&client).await.unwrap()[0].count, 1);
    }

    #[tokio::test]
    async fn test_offset_past_i64_returns_empty_page() {
        let pool = test_support::pool();
        let coach = test_support::coach(&pool, "coach@example.com").await;
        let client = test_support::client(&pool, &coach, "client@example.com").await;
        let repo = MessageRepository::new(pool.clone());
        repo.insert(message(&client, &coach, "hi coach")).await.unwrap();

        let (page, total) = repo.conversation(&coach, &client, 10, usize::MAX).await.unwrap();
        assert_eq!(total, 1);
        assert!(page.is_empty());
    }
}
