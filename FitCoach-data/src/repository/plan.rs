use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use crate::database::DbPool;
use crate::models::plan::{NewPlan, PlanKind, PlanRecord, PlanUpdate};
use super::errors::RepositoryError;
use super::{connection, new_id, now_timestamp};

/// Repository trait for meal and workout plans
#[async_trait]
pub trait PlanRepositoryTrait: Send + Sync {
    async fn create(&self, kind: PlanKind, plan: NewPlan) -> Result<PlanRecord, RepositoryError>;

    async fn get(&self, kind: PlanKind, id: &str) -> Result<Option<PlanRecord>, RepositoryError>;

    /// Plans for a client, newest first
    async fn list_by_client(&self, kind: PlanKind, client_id: &str) -> Result<Vec<PlanRecord>, RepositoryError>;

    async fn update(&self, kind: PlanKind, id: &str, update: PlanUpdate) -> Result<PlanRecord, RepositoryError>;

    async fn delete(&self, kind: PlanKind, id: &str) -> Result<(), RepositoryError>;

    /// Mark one plan active and every other plan of the same client inactive
    async fn set_active(&self, kind: PlanKind, id: &str) -> Result<PlanRecord, RepositoryError>;
}

/// SQLite-backed plan repository
#[derive(Debug, Clone)]
pub struct PlanRepository {
    pool: DbPool,
}

impl PlanRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn select_sql(kind: PlanKind) -> String {
    format!(
        "SELECT id, client_id, coach_id, name, description, {}, is_active, created_at, updated_at FROM {}",
        kind.document_column(),
        kind.table()
    )
}

fn map_plan(row: &Row<'_>) -> rusqlite::Result<PlanRecord> {
    Ok(PlanRecord {
        id: row.get(0)?,
        client_id: row.get(1)?,
        coach_id: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        document_json: row.get(5)?,
        is_active: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn not_found(kind: PlanKind, id: &str) -> RepositoryError {
    let label = match kind {
        PlanKind::Meal => "Meal plan",
        PlanKind::Workout => "Workout plan",
    };
    RepositoryError::NotFound(format!("{} {}", label, id))
}

#[async_trait]
impl PlanRepositoryTrait for PlanRepository {
    async fn create(&self, kind: PlanKind, plan: NewPlan) -> Result<PlanRecord, RepositoryError> {
        let now = now_timestamp();
        let record = PlanRecord {
            id: new_id(),
            client_id: plan.client_id,
            coach_id: plan.coach_id,
            name: plan.name,
            description: plan.description,
            document_json: plan.document_json,
            is_active: false,
            created_at: now.clone(),
            updated_at: now,
        };

        debug!("Storing {} row: id={}", kind.table(), record.id);
        let conn = connection(&self.pool)?;
        conn.execute(
            &format!(
                "INSERT INTO {} (id, client_id, coach_id, name, description, {}, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                kind.table(),
                kind.document_column()
            ),
            params![
                record.id,
                record.client_id,
                record.coach_id,
                record.name,
                record.description,
                record.document_json,
                record.is_active,
                record.created_at,
                record.updated_at,
            ],
        )?;

        Ok(record)
    }

    async fn get(&self, kind: PlanKind, id: &str) -> Result<Option<PlanRecord>, RepositoryError> {
        let conn = connection(&self.pool)?;
        let plan = conn
            .query_row(&format!("{} WHERE id = ?1", select_sql(kind)), [id], map_plan)
            .optional()?;
        Ok(plan)
    }

    async fn list_by_client(&self, kind: PlanKind, client_id: &str) -> Result<Vec<PlanRecord>, RepositoryError> {
        let conn = connection(&self.pool)?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE client_id = ?1 ORDER BY created_at DESC, rowid DESC",
            select_sql(kind)
        ))?;
        let plans = stmt
            .query_map([client_id], map_plan)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(plans)
    }

    async fn update(&self, kind: PlanKind, id: &str, update: PlanUpdate) -> Result<PlanRecord, RepositoryError> {
        let conn = connection(&self.pool)?;
        let changed = conn.execute(
            &format!(
                "UPDATE {} SET name = ?1, description = ?2, {} = ?3, updated_at = ?4 WHERE id = ?5",
                kind.table(),
                kind.document_column()
            ),
            params![update.name, update.description, update.document_json, now_timestamp(), id],
        )?;
        if changed == 0 {
            return Err(not_found(kind, id));
        }

        conn.query_row(&format!("{} WHERE id = ?1", select_sql(kind)), [id], map_plan)
            .map_err(RepositoryError::from)
    }

    async fn delete(&self, kind: PlanKind, id: &str) -> Result<(), RepositoryError> {
        let conn = connection(&self.pool)?;
        let changed = conn.execute(&format!("DELETE FROM {} WHERE id = ?1", kind.table()), [id])?;
        if changed == 0 {
            return Err(not_found(kind, id));
        }
        Ok(())
    }

    async fn set_active(&self, kind: PlanKind, id: &str) -> Result<PlanRecord, RepositoryError> {
        let mut conn = connection(&self.pool)?;
        let tx = conn.transaction()?;

        let client_id: String = tx
            .query_row(&format!("SELECT client_id FROM {} WHERE id = ?1", kind.table()), [id], |row| row.get(0))
            .optional()?
            .ok_or_else(|| not_found(kind, id))?;

        let now = now_timestamp();
        tx.execute(
            &format!(
                "UPDATE {} SET is_active = 0, updated_at = ?1 WHERE client_id = ?2 AND is_active = 1 AND id <> ?3",
                kind.table()
            ),
            params![now, client_id, id],
        )?;
        tx.execute(
            &format!("UPDATE {} SET is_active = 1, updated_at = ?1 WHERE id = ?2", kind.table()),
            params![now, id],
        )?;

        let plan = tx.query_row(&format!("{} WHERE id = ?1", select_sql(kind)), [id], map_plan)?;
        tx.commit()?;

        debug!("Activated {} row {} for client {}", kind.table(), id, client_id);
        Ok(plan)
    }
}
