// Schema migrations. Only SQLite is supported.
mod sqlite;
pub use sqlite::run_migrations as run_sqlite_migrations;
