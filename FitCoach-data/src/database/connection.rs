//! Database connection module for the FitCoach application
//!
//! SQLite is the only backend. Connections are pooled with r2d2 and every
//! connection is opened with foreign key enforcement switched on.

use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use tracing::{error, info};

use super::migrations::run_sqlite_migrations;
use super::DatabaseError;

/// Shared connection pool handle
pub type DbPool = Arc<r2d2::Pool<SqliteConnectionManager>>;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub sqlite_path: String,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "data/fit_coach.db".to_string(),
            max_connections: 10,
            timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    /// Create a new database configuration from environment variables
    pub fn from_env() -> Result<Self, DatabaseError> {
        let defaults = Self::default();

        let sqlite_path = match env::var("DB_SQLITE_PATH") {
            Ok(path) if !path.trim().is_empty() => path,
            Ok(_) => return Err(DatabaseError::ConfigError("DB_SQLITE_PATH is empty".to_string())),
            Err(_) => {
                let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());
                Path::new(&data_dir).join("fit_coach.db").to_string_lossy().to_string()
            }
        };

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_connections);

        let timeout_seconds = env::var("DB_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.timeout_seconds);

        info!("Database configuration: path={}, max_connections={}, timeout={}s",
            sqlite_path, max_connections, timeout_seconds);

        Ok(Self {
            sqlite_path,
            max_connections,
            timeout_seconds,
        })
    }
}

/// Create a file-backed SQLite pool and bring the schema up to date
pub fn create_pool(config: &DatabaseConfig) -> Result<DbPool, DatabaseError> {
    info!("Initializing SQLite database at: {}", config.sqlite_path);

    if let Some(parent) = Path::new(&config.sqlite_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            info!("Creating parent directory: {:?}", parent);
            fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::ConfigError(format!("Failed to create {:?}: {}", parent, e))
            })?;
        }
    }

    let manager = SqliteConnectionManager::file(&config.sqlite_path)
        .with_flags(OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE)
        .with_init(|conn| {
            conn.busy_timeout(Duration::from_secs(5))?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")
        });

    let pool = r2d2::Pool::builder()
        .max_size(config.max_connections)
        .connection_timeout(Duration::from_secs(config.timeout_seconds))
        .build(manager)?;

    let pool = Arc::new(pool);
    run_migrations(&pool)?;

    info!("SQLite connection pool created successfully");
    Ok(pool)
}

/// Create an in-memory SQLite pool.
///
/// Every in-memory connection is its own database, so the pool is capped at
/// a single connection.
pub fn create_in_memory_pool() -> Result<DbPool, DatabaseError> {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

    let pool = r2d2::Pool::builder()
        .max_size(1)
        .connection_timeout(Duration::from_secs(5))
        .build(manager)?;

    let pool = Arc::new(pool);
    run_migrations(&pool)?;

    Ok(pool)
}

fn run_migrations(pool: &DbPool) -> Result<(), DatabaseError> {
    let conn = pool.get()?;
    run_sqlite_migrations(&conn)
        .map_err(DatabaseError::MigrationError)
}

/// Describe the database behind a pool, or the reason it is unreachable
pub fn get_connection_info(pool: &DbPool) -> Result<String, DatabaseError> {
    let conn = pool.get().map_err(|e| {
        error!("Failed to get SQLite connection: {}", e);
        DatabaseError::PoolError(e)
    })?;

    let path: String = conn.query_row("PRAGMA database_list", [], |row| row.get(2))?;
    let location = if path.is_empty() || path == ":memory:" {
        "SQLite in-memory database".to_string()
    } else {
        format!("SQLite database at {}", path)
    };

    let state = pool.state();
    Ok(format!("{} (connections: active={}, idle={})",
        location,
        state.connections,
        state.idle_connections
    ))
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_database_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.sqlite_path, "data/fit_coach.db");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn test_in_memory_pool_has_schema() {
        let pool = create_in_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'habits', 'subscriptions', 'messages')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 4);
    }

    #[test]
    fn test_connection_info_for_memory_pool() {
        let pool = create_in_memory_pool().unwrap();
        let info = get_connection_info(&pool).unwrap();
        assert!(info.contains("in-memory"), "unexpected info: {}", info);
    }

    #[test]
    fn test_file_pool_creates_parent_directory() {
        let dir = std::env::temp_dir().join(format!("fit_coach_test_{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("db.sqlite");
        let config = DatabaseConfig {
            sqlite_path: path.to_string_lossy().to_string(),
            max_connections: 2,
            timeout_seconds: 5,
        };

        let pool = create_pool(&config).unwrap();
        assert!(path.exists());
        drop(pool);
        let _ = std::fs::remove_dir_all(dir);
    }
}
