use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use crate::database::DbPool;
use crate::models::habit::{
    CompletionRecord, HabitPresetRecord, HabitRecord, HabitUpdate, NewHabit, NewHabitPreset,
};
use super::errors::RepositoryError;
use super::{connection, new_id, now_timestamp};

const HABIT_COLUMNS: &str =
    "id, client_id, coach_id, preset_id, name, description, cadence_json, archived, created_at, updated_at";

/// Repository trait for habit presets, habits and their completions
#[async_trait]
pub trait HabitRepositoryTrait: Send + Sync {
    async fn create_preset(&self, preset: NewHabitPreset) -> Result<HabitPresetRecord, RepositoryError>;
    async fn list_presets(&self, coach_id: &str) -> Result<Vec<HabitPresetRecord>, RepositoryError>;
    async fn get_preset(&self, id: &str) -> Result<Option<HabitPresetRecord>, RepositoryError>;
    async fn delete_preset(&self, id: &str) -> Result<(), RepositoryError>;

    async fn create_habit(&self, habit: NewHabit) -> Result<HabitRecord, RepositoryError>;
    async fn get_habit(&self, id: &str) -> Result<Option<HabitRecord>, RepositoryError>;
    /// Habits of a client, archived ones only when asked for
    async fn list_habits(&self, client_id: &str, include_archived: bool) -> Result<Vec<HabitRecord>, RepositoryError>;
    async fn update_habit(&self, id: &str, update: HabitUpdate) -> Result<HabitRecord, RepositoryError>;
    async fn archive_habit(&self, id: &str) -> Result<(), RepositoryError>;

    /// Insert a completion; a second completion for the same day is a conflict
    async fn insert_completion(&self, habit_id: &str, date: &str, recorded_by: &str) -> Result<CompletionRecord, RepositoryError>;
    async fn get_completion(&self, habit_id: &str, date: &str) -> Result<Option<CompletionRecord>, RepositoryError>;
    /// Remove a completion, returning whether one existed
    async fn delete_completion(&self, habit_id: &str, date: &str) -> Result<bool, RepositoryError>;
    /// Completions between two dates inclusive, oldest first
    async fn list_completions(&self, habit_id: &str, from: &str, to: &str) -> Result<Vec<CompletionRecord>, RepositoryError>;
}

/// SQLite-backed habit repository
#[derive(Debug, Clone)]
pub struct HabitRepository {
    pool: DbPool,
}

impl HabitRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_preset(row: &Row<'_>) -> rusqlite::Result<HabitPresetRecord> {
    Ok(HabitPresetRecord {
        id: row.get(0)?,
        coach_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        cadence_json: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn map_habit(row: &Row<'_>) -> rusqlite::Result<HabitRecord> {
    Ok(HabitRecord {
        id: row.get(0)?,
        client_id: row.get(1)?,
        coach_id: row.get(2)?,
        preset_id: row.get(3)?,
        name: row.get(4)?,
        description: row.get(5)?,
        cadence_json: row.get(6)?,
        archived: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn map_completion(row: &Row<'_>) -> rusqlite::Result<CompletionRecord> {
    Ok(CompletionRecord {
        id: row.get(0)?,
        habit_id: row.get(1)?,
        completed_on: row.get(2)?,
        recorded_by: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[async_trait]
impl HabitRepositoryTrait for HabitRepository {
    async fn create_preset(&self, preset: NewHabitPreset) -> Result<HabitPresetRecord, RepositoryError> {
        let record = HabitPresetRecord {
            id: new_id(),
            coach_id: preset.coach_id,
            name: preset.name,
            description: preset.description,
            cadence_json: preset.cadence_json,
            created_at: now_timestamp(),
        };

        let conn = connection(&self.pool)?;
        conn.execute(
            "INSERT INTO habit_presets (id, coach_id, name, description, cadence_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.coach_id,
                record.name,
                record.description,
                record.cadence_json,
                record.created_at,
            ],
        )?;
        Ok(record)
    }

    async fn list_presets(&self, coach_id: &str) -> Result<Vec<HabitPresetRecord>, RepositoryError> {
        let conn = connection(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT id, coach_id, name, description, cadence_json, created_at
             FROM habit_presets WHERE coach_id = ?1 ORDER BY name COLLATE NOCASE",
        )?;
        let presets = stmt
            .query_map([coach_id], map_preset)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(presets)
    }

    async fn get_preset(&self, id: &str) -> Result<Option<HabitPresetRecord>, RepositoryError> {
        let conn = connection(&self.pool)?;
        let preset = conn
            .query_row(
                "SELECT id, coach_id, name, description, cadence_json, created_at
                 FROM habit_presets WHERE id = ?1",
                [id],
                map_preset,
            )
            .optional()?;
        Ok(preset)
    }

    async fn delete_preset(&self, id: &str) -> Result<(), RepositoryError> {
        let conn = connection(&self.pool)?;
        let changed = conn.execute("DELETE FROM habit_presets WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(RepositoryError::NotFound(format!("Habit preset {}", id)));
        }
        Ok(())
    }

    async fn create_habit(&self, habit: NewHabit) -> Result<HabitRecord, RepositoryError> {
        let now = now_timestamp();
        let record = HabitRecord {
            id: new_id(),
            client_id: habit.client_id,
            coach_id: habit.coach_id,
            preset_id: habit.preset_id,
            name: habit.name,
            description: habit.description,
            cadence_json: habit.cadence_json,
            archived: false,
            created_at: now.clone(),
            updated_at: now,
        };

        debug!("Storing habit: id={}, client={}", record.id, record.client_id);
        let conn = connection(&self.pool)?;
        conn.execute(
            &format!("INSERT INTO habits ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)", HABIT_COLUMNS),
            params![
                record.id,
                record.client_id,
                record.coach_id,
                record.preset_id,
                record.name,
                record.description,
                record.cadence_json,
                record.archived,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(record)
    }

    async fn get_habit(&self, id: &str) -> Result<Option<HabitRecord>, RepositoryError> {
        let conn = connection(&self.pool)?;
        let habit = conn
            .query_row(&format!("SELECT {} FROM habits WHERE id = ?1", HABIT_COLUMNS), [id], map_habit)
            .optional()?;
        Ok(habit)
    }

    async fn list_habits(&self, client_id: &str, include_archived: bool) -> Result<Vec<HabitRecord>, RepositoryError> {
        let conn = connection(&self.pool)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM habits WHERE client_id = ?1 AND (?2 OR archived = 0) ORDER BY created_at, rowid",
            HABIT_COLUMNS
        ))?;
        let habits = stmt
            .query_map(params![client_id, include_archived], map_habit)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(habits)
    }

    async fn update_habit(&self, id: &str, update: HabitUpdate) -> Result<HabitRecord, RepositoryError> {
        let conn = connection(&self.pool)?;
        let changed = conn.execute(
            "UPDATE habits SET name = ?1, description = ?2, cadence_json = ?3, updated_at = ?4 WHERE id = ?5",
            params![update.name, update.description, update.cadence_json, now_timestamp(), id],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound(format!("Habit {}", id)));
        }

        conn.query_row(&format!("SELECT {} FROM habits WHERE id = ?1", HABIT_COLUMNS), [id], map_habit)
            .map_err(RepositoryError::from)
    }

    async fn archive_habit(&self, id: &str) -> Result<(), RepositoryError> {
        let conn = connection(&self.pool)?;
        let changed = conn.execute(
            "UPDATE habits SET archived = 1, updated_at = ?1 WHERE id = ?2",
            params![now_timestamp(), id],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound(format!("Habit {}", id)));
        }
        Ok(())
    }

    async fn insert_completion(&self, habit_id: &str, date: &str, recorded_by: &str) -> Result<CompletionRecord, RepositoryError> {
        let record = CompletionRecord {
            id: new_id(),
            habit_id: habit_id.to_string(),
            completed_on: date.to_string(),
            recorded_by: recorded_by.to_string(),
            created_at: now_timestamp(),
        };

        let conn = connection(&self.pool)?;
        conn.execute(
            "INSERT INTO habit_completions (id, habit_id, completed_on, recorded_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id,
                record.habit_id,
                record.completed_on,
                record.recorded_by,
                record.created_at,
            ],
        )?;
        Ok(record)
    }

    async fn get_completion(&self, habit_id: &str, date: &str) -> Result<Option<CompletionRecord>, RepositoryError> {
        let conn = connection(&self.pool)?;
        let completion = conn
            .query_row(
                "SELECT id, habit_id, completed_on, recorded_by, created_at
                 FROM habit_completions WHERE habit_id = ?1 AND completed_on = ?2",
                [habit_id, date],
                map_completion,
            )
            .optional()?;
        Ok(completion)
    }

    async fn delete_completion(&self, habit_id: &str, date: &str) -> Result<bool, RepositoryError> {
        let conn = connection(&self.pool)?;
        let changed = conn.execute(
            "DELETE FROM habit_completions WHERE habit_id = ?1 AND completed_on = ?2",
            [habit_id, date],
        )?;
        Ok(changed > 0)
    }

    async fn list_completions(&self, habit_id: &str, from: &str, to: &str) -> Result<Vec<CompletionRecord>, RepositoryError> {
        let conn = connection(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT id, habit_id, completed_on, recorded_by, created_at
             FROM habit_completions
             WHERE habit_id = ?1 AND completed_on >= ?2 AND completed_on <= ?3
             ORDER BY completed_on",
        )?;
        let completions = stmt
            .query_map([habit_id, from, to], map_completion)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(completions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;

    async fn habit(pool: &DbPool) -> (HabitRecord, String) {
        let coach = test_support::coach(pool, "coach@example.com").await;
        let client = test_support::client(pool, &coach, "client@example.com").await;
        let habit = HabitRepository::new(pool.clone())
            .create_habit(NewHabit {
                client_id: client.clone(),
                coach_id: coach,
                preset_id: None,
                name: "Walk".to_string(),
                description: None,
                cadence_json: "{\"type\":\"daily\"}".to_string(),
            })
            .await
            .unwrap();
        (habit, client)
    }

    #[tokio::test]
    async fn test_completion_is_unique_per_day() {
        let pool = test_support::pool();
        let repo = HabitRepository::new(pool.clone());
        let (habit, client) = habit(&pool).await;

        repo.insert_completion(&habit.id, "2024-03-04", &client).await.unwrap();
        let duplicate = repo.insert_completion(&habit.id, "2024-03-04", &client).await;
        assert!(matches!(duplicate, Err(RepositoryError::Conflict(_))));

        repo.insert_completion(&habit.id, "2024-03-06", &client).await.unwrap();
        repo.insert_completion(&habit.id, "2024-03-11", &client).await.unwrap();

        let week = repo.list_completions(&habit.id, "2024-03-04", "2024-03-10").await.unwrap();
        let dates: Vec<_> = week.iter().map(|c| c.completed_on.as_str()).collect();
        assert_eq!(dates, vec!["2024-03-04", "2024-03-06"]);

        assert!(repo.delete_completion(&habit.id, "2024-03-04").await.unwrap());
        assert!(!repo.delete_completion(&habit.id, "2024-03-04").await.unwrap());
        assert!(repo.get_completion(&habit.id, "2024-03-04").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_archived_habits_are_hidden_by_default() {
        let pool = test_support::pool();
        let repo = HabitRepository::new(pool.clone());
        let (habit, client) = habit(&pool).await;

        repo.archive_habit(&habit.id).await.unwrap();
        assert!(repo.list_habits(&client, false).await.unwrap().is_empty());

        let all = repo.list_habits(&client, true).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].archived);
    }

    #[tokio::test]
    async fn test_presets() {
        let pool = test_support::pool();
        let repo = HabitRepository::new(pool.clone());
        let coach = test_support::coach(&pool, "coach@example.com").await;

        let preset = repo
            .create_preset(NewHabitPreset {
                coach_id: coach.clone(),
                name: "Hydrate".to_string(),
                description: Some("2l of water".to_string()),
                cadence_json: "{\"type\":\"daily\"}".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(repo.list_presets(&coach).await.unwrap().len(), 1);
        assert_eq!(repo.get_preset(&preset.id).await.unwrap().unwrap().name, "Hydrate");

        repo.delete_preset(&preset.id).await.unwrap();
        assert!(matches!(repo.delete_preset(&preset.id).await, Err(RepositoryError::NotFound(_))));
    }
}
