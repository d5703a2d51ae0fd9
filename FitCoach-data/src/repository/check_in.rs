use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use crate::database::DbPool;
use crate::models::check_in::{CheckInFormRecord, CheckInRecord, NewCheckIn, NewCheckInForm};
use super::errors::RepositoryError;
use super::{connection, new_id, now_timestamp};

const CHECK_IN_COLUMNS: &str =
    "id, client_id, author_id, kind, note, form_id, responses_json, weight_kg, created_at";

/// Repository trait for check-in forms and check-ins
#[async_trait]
pub trait CheckInRepositoryTrait: Send + Sync {
    async fn create_form(&self, form: NewCheckInForm) -> Result<CheckInFormRecord, RepositoryError>;
    async fn list_forms(&self, coach_id: &str) -> Result<Vec<CheckInFormRecord>, RepositoryError>;
    async fn get_form(&self, id: &str) -> Result<Option<CheckInFormRecord>, RepositoryError>;

    async fn create(&self, check_in: NewCheckIn) -> Result<CheckInRecord, RepositoryError>;
    async fn get(&self, id: &str) -> Result<Option<CheckInRecord>, RepositoryError>;

    /// A page of a client's check-ins, newest first, with the total count
    async fn list_by_client(
        &self,
        client_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<CheckInRecord>, usize), RepositoryError>;

    async fn latest_for_client(&self, client_id: &str) -> Result<Option<CheckInRecord>, RepositoryError>;
}

/// SQLite-backed check-in repository
#[derive(Debug, Clone)]
pub struct CheckInRepository {
    pool: DbPool,
}

impl CheckInRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_form(row: &Row<'_>) -> rusqlite::Result<CheckInFormRecord> {
    Ok(CheckInFormRecord {
        id: row.get(0)?,
        coach_id: row.get(1)?,
        title: row.get(2)?,
        questions_json: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn map_check_in(row: &Row<'_>) -> rusqlite::Result<CheckInRecord> {
    Ok(CheckInRecord {
        id: row.get(0)?,
        client_id: row.get(1)?,
        author_id: row.get(2)?,
        kind: row.get(3)?,
        note: row.get(4)?,
        form_id: row.get(5)?,
        responses_json: row.get(6)?,
        weight_kg: row.get(7)?,
        created_at: row.get(8)?,
    })
}

#[async_trait]
impl CheckInRepositoryTrait for CheckInRepository {
    async fn create_form(&self, form: NewCheckInForm) -> Result<CheckInFormRecord, RepositoryError> {
        let record = CheckInFormRecord {
            id: new_id(),
            coach_id: form.coach_id,
            title: form.title,
            questions_json: form.questions_json,
            created_at: now_timestamp(),
        };

        let conn = connection(&self.pool)?;
        conn.execute(
            "INSERT INTO check_in_forms (id, coach_id, title, questions_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![record.id, record.coach_id, record.title, record.questions_json, record.created_at],
        )?;
        Ok(record)
    }

    async fn list_forms(&self, coach_id: &str) -> Result<Vec<CheckInFormRecord>, RepositoryError> {
        let conn = connection(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT id, coach_id, title, questions_json, created_at
             FROM check_in_forms WHERE coach_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )?;
        let forms = stmt
            .query_map([coach_id], map_form)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(forms)
    }

    async fn get_form(&self, id: &str) -> Result<Option<CheckInFormRecord>, RepositoryError> {
        let conn = connection(&self.pool)?;
        let form = conn
            .query_row(
                "SELECT id, coach_id, title, questions_json, created_at FROM check_in_forms WHERE id = ?1",
                [id],
                map_form,
            )
            .optional()?;
        Ok(form)
    }

    async fn create(&self, check_in: NewCheckIn) -> Result<CheckInRecord, RepositoryError> {
        let record = CheckInRecord {
            id: new_id(),
            client_id: check_in.client_id,
            author_id: check_in.author_id,
            kind: check_in.kind,
            note: check_in.note,
            form_id: check_in.form_id,
            responses_json: check_in.responses_json,
            weight_kg: check_in.weight_kg,
            created_at: now_timestamp(),
        };

        debug!("Storing check-in: id={}, client={}", record.id, record.client_id);
        let conn = connection(&self.pool)?;
        conn.execute(
            &format!("INSERT INTO check_ins ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)", CHECK_IN_COLUMNS),
            params![
                record.id,
                record.client_id,
                record.author_id,
                record.kind,
                record.note,
                record.form_id,
                record.responses_json,
                record.weight_kg,
                record.created_at,
            ],
        )?;
        Ok(record)
    }

    async fn get(&self, id: &str) -> Result<Option<CheckInRecord>, RepositoryError> {
        let conn = connection(&self.pool)?;
        let check_in = conn
            .query_row(
                &format!("SELECT {} FROM check_ins WHERE id = ?1", CHECK_IN_COLUMNS),
                [id],
                map_check_in,
            )
            .optional()?;
        Ok(check_in)
    }

    async fn list_by_client(
        &self,
        client_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<CheckInRecord>, usize), RepositoryError> {
        let conn = connection(&self.pool)?;

        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM check_ins WHERE client_id = ?1",
            [client_id],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM check_ins WHERE client_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
            CHECK_IN_COLUMNS
        ))?;
        let items = stmt
            .query_map(params![client_id, limit as i64, i64::try_from(offset).unwrap_or(i64::MAX)], map_check_in)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((items, total as usize))
    }

    async fn latest_for_client(&self, client_id: &str) -> Result<Option<CheckInRecord>, RepositoryError> {
        let conn = connection(&self.pool)?;
        let latest = conn
            .query_row(
                &format!(
                    "SELECT {} FROM check_ins WHERE client_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                    CHECK_IN_COLUMNS
                ),
                [client_id],
                map_check_in,
            )
            .optional()?;
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;

    #[tokio::test]
    async fn test_list_by_client_pages_newest_first() {
        let pool = test_support::pool();
        let coach = test_support::coach(&pool, "coach@example.com").await;
        let client = test_support::client(&pool, &coach, "client@example.com").await;
        let repo = CheckInRepository::new(pool.clone());

        let mut ids = Vec::new();
        for i in 0..5 {
            let record = repo
                .create(NewCheckIn {
                    client_id: client.clone(),
                    author_id: client.clone(),
                    kind: "client_submitted".to_string(),
                    note: Some(format!("week {}", i)),
                    form_id: None,
                    responses_json: "[]".to_string(),
                    weight_kg: Some(80.0 - i as f64),
                })
                .await
                .unwrap();
            ids.push(record.id);
        }

        let (page, total) = repo.list_by_client(&client, 2, 0).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, ids[4]);
        assert_eq!(page[1].id, ids[3]);

        let (last, _) = repo.list_by_client(&client, 2, 4).await.unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].id, ids[0]);

        let latest = repo.latest_for_client(&client).await.unwrap().unwrap();
        assert_eq!(latest.id, ids[4]);
    }

    #[tokio::test]
    async fn test_forms() {
        let pool = test_support::pool();
        let coach = test_support::coach(&pool, "coach@example.com").await;
        let repo = CheckInRepository::new(pool.clone());

        let form = repo
            .create_form(NewCheckInForm {
                coach_id: coach.clone(),
                title: "Weekly".to_string(),
                questions_json: "[\"Energy?\",\"Sleep?\"]".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(repo.list_forms(&coach).await.unwrap().len(), 1);
        assert_eq!(repo.get_form(&form.id).await.unwrap().unwrap().title, "Weekly");
        assert!(repo.get_form("missing").await.unwrap().is_none());
    }
}
