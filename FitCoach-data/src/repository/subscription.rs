use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use crate::database::DbPool;
use crate::models::subscription::{SubscriptionRecord, SubscriptionStatusUpdate, SubscriptionUpsert};
use super::errors::RepositoryError;
use super::{connection, new_id, now_timestamp};

const SUBSCRIPTION_COLUMNS: &str = "id, client_id, coach_id, customer_id, subscription_id, price_id, \
    status, current_period_end, cancel_at_period_end, created_at, updated_at";

/// Repository trait for client subscriptions
#[async_trait]
pub trait SubscriptionRepositoryTrait: Send + Sync {
    /// Insert the client's subscription or replace the existing one
    async fn upsert(&self, subscription: SubscriptionUpsert) -> Result<SubscriptionRecord, RepositoryError>;

    async fn get_by_client(&self, client_id: &str) -> Result<Option<SubscriptionRecord>, RepositoryError>;

    /// Look up by the billing provider's subscription id
    async fn get_by_subscription_id(&self, subscription_id: &str) -> Result<Option<SubscriptionRecord>, RepositoryError>;

    async fn update_status(
        &self,
        subscription_id: &str,
        update: SubscriptionStatusUpdate,
    ) -> Result<SubscriptionRecord, RepositoryError>;
}

/// SQLite-backed subscription repository
#[derive(Debug, Clone)]
pub struct SubscriptionRepository {
    pool: DbPool,
}

impl SubscriptionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_subscription(row: &Row<'_>) -> rusqlite::Result<SubscriptionRecord> {
    Ok(SubscriptionRecord {
        id: row.get(0)?,
        client_id: row.get(1)?,
        coach_id: row.get(2)?,
        customer_id: row.get(3)?,
        subscription_id: row.get(4)?,
        price_id: row.get(5)?,
        status: row.get(6)?,
        current_period_end: row.get(7)?,
        cancel_at_period_end: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

#[async_trait]
impl SubscriptionRepositoryTrait for SubscriptionRepository {
    async fn upsert(&self, subscription: SubscriptionUpsert) -> Result<SubscriptionRecord, RepositoryError> {
        let now = now_timestamp();
        debug!(
            "Upserting subscription {} for client {}",
            subscription.subscription_id, subscription.client_id
        );

        let conn = connection(&self.pool)?;
        conn.execute(
            &format!(
                "INSERT INTO subscriptions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
                 ON CONFLICT(client_id) DO UPDATE SET
                    coach_id = excluded.coach_id,
                    customer_id = excluded.customer_id,
                    subscription_id = excluded.subscription_id,
                    price_id = excluded.price_id,
                    status = excluded.status,
                    current_period_end = excluded.current_period_end,
                    cancel_at_period_end = excluded.cancel_at_period_end,
                    updated_at = excluded.updated_at",
                SUBSCRIPTION_COLUMNS
            ),
            params![
                new_id(),
                subscription.client_id,
                subscription.coach_id,
                subscription.customer_id,
                subscription.subscription_id,
                subscription.price_id,
                subscription.status,
                subscription.current_period_end,
                subscription.cancel_at_period_end,
                now,
            ],
        )?;

        conn.query_row(
            &format!("SELECT {} FROM subscriptions WHERE client_id = ?1", SUBSCRIPTION_COLUMNS),
            [&subscription.client_id],
            map_subscription,
        )
        .map_err(RepositoryError::from)
    }

    async fn get_by_client(&self, client_id: &str) -> Result<Option<SubscriptionRecord>, RepositoryError> {
        let conn = connection(&self.pool)?;
        let record = conn
            .query_row(
                &format!("SELECT {} FROM subscriptions WHERE client_id = ?1", SUBSCRIPTION_COLUMNS),
                [client_id],
                map_subscription,
            )
            .optional()?;
        Ok(record)
    }

    async fn get_by_subscription_id(&self, subscription_id: &str) -> Result<Option<SubscriptionRecord>, RepositoryError> {
        let conn = connection(&self.pool)?;
        let record = conn
            .query_row(
                &format!("SELECT {} FROM subscriptions WHERE subscription_id = ?1", SUBSCRIPTION_COLUMNS),
                [subscription_id],
                map_subscription,
            )
            .optional()?;
        Ok(record)
    }

    async fn update_status(
        &self,
        subscription_id: &str,
        update: SubscriptionStatusUpdate,
    ) -> Result<SubscriptionRecord, RepositoryError> {
        let conn = connection(&self.pool)?;
        let changed = conn.execute(
            "UPDATE subscriptions
             SET status = ?1, current_period_end = ?2, cancel_at_period_end = ?3, updated_at = ?4
             WHERE subscription_id = ?5",
            params![
                update.status,
                update.current_period_end,
                update.cancel_at_period_end,
                now_timestamp(),
                subscription_id,
            ],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound(format!("Subscription {}", subscription_id)));
        }

        conn.query_row(
            &format!("SELECT {} FROM subscriptions WHERE subscription_id = ?1", SUBSCRIPTION_COLUMNS),
            [subscription_id],
            map_subscription,
        )
        .map_err(RepositoryError::from)
    }
}
