use rusqlite::Connection;
use tracing::{debug, info};

/// Tables in creation order; later tables reference earlier ones.
const TABLES: &[(&str, &str)] = &[
    ("users", "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        role TEXT NOT NULL,
        coach_id TEXT REFERENCES users(id),
        password_hash TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"),
    ("meal_plans", "CREATE TABLE IF NOT EXISTS meal_plans (
        id TEXT PRIMARY KEY,
        client_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        coach_id TEXT NOT NULL REFERENCES users(id),
        name TEXT NOT NULL,
        description TEXT,
        meals_json TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"),
    ("workout_plans", "CREATE TABLE IF NOT EXISTS workout_plans (
        id TEXT PRIMARY KEY,
        client_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        coach_id TEXT NOT NULL REFERENCES users(id),
        name TEXT NOT NULL,
        description TEXT,
        days_json TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"),
    ("habit_presets", "CREATE TABLE IF NOT EXISTS habit_presets (
        id TEXT PRIMARY KEY,
        coach_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        description TEXT,
        cadence_json TEXT NOT NULL,
        created_at TEXT NOT NULL
    )"),
    ("habits", "CREATE TABLE IF NOT EXISTS habits (
        id TEXT PRIMARY KEY,
        client_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        coach_id TEXT NOT NULL REFERENCES users(id),
        preset_id TEXT REFERENCES habit_presets(id) ON DELETE SET NULL,
        name TEXT NOT NULL,
        description TEXT,
        cadence_json TEXT NOT NULL,
        archived INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"),
    ("habit_completions", "CREATE TABLE IF NOT EXISTS habit_completions (
        id TEXT PRIMARY KEY,
        habit_id TEXT NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
        completed_on TEXT NOT NULL,
        recorded_by TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE (habit_id, completed_on)
    )"),
    ("check_in_forms", "CREATE TABLE IF NOT EXISTS check_in_forms (
        id TEXT PRIMARY KEY,
        coach_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        questions_json TEXT NOT NULL,
        created_at TEXT NOT NULL
    )"),
    ("check_ins", "CREATE TABLE IF NOT EXISTS check_ins (
        id TEXT PRIMARY KEY,
        client_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        author_id TEXT NOT NULL REFERENCES users(id),
        kind TEXT NOT NULL,
        note TEXT,
        form_id TEXT REFERENCES check_in_forms(id) ON DELETE SET NULL,
        responses_json TEXT NOT NULL,
        weight_kg REAL,
        created_at TEXT NOT NULL
    )"),
    ("subscriptions", "CREATE TABLE IF NOT EXISTS subscriptions (
        id TEXT PRIMARY KEY,
        client_id TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
        coach_id TEXT NOT NULL REFERENCES users(id),
        customer_id TEXT NOT NULL,
        subscription_id TEXT NOT NULL UNIQUE,
        price_id TEXT NOT NULL,
        status TEXT NOT NULL,
        current_period_end TEXT,
        cancel_at_period_end INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"),
    ("messages", "CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        sender_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        recipient_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        body TEXT NOT NULL,
        created_at TEXT NOT NULL,
        read_at TEXT
    )"),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_users_coach_id ON users (coach_id)",
    "CREATE INDEX IF NOT EXISTS idx_meal_plans_client_id ON meal_plans (client_id)",
    "CREATE INDEX IF NOT EXISTS idx_workout_plans_client_id ON workout_plans (client_id)",
    "CREATE INDEX IF NOT EXISTS idx_habit_presets_coach_id ON habit_presets (coach_id)",
    "CREATE INDEX IF NOT EXISTS idx_habits_client_id ON habits (client_id)",
    "CREATE INDEX IF NOT EXISTS idx_habit_completions_habit_date ON habit_completions (habit_id, completed_on)",
    "CREATE INDEX IF NOT EXISTS idx_check_ins_client_created ON check_ins (client_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_messages_pair_created ON messages (sender_id, recipient_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_messages_recipient_unread ON messages (recipient_id, read_at)",
];

/// Run SQLite migrations
pub fn run_migrations(conn: &Connection) -> Result<(), String> {
    info!("Running SQLite migrations");

    for (name, ddl) in TABLES {
        create_table(conn, name, ddl)?;
    }
    create_indexes(conn)?;

    info!("SQLite migrations completed successfully");
    Ok(())
}

fn create_table(conn: &Connection, name: &str, ddl: &str) -> Result<(), String> {
    debug!("Creating {} table if not exists", name);

    conn.execute(ddl, [])
        .map_err(|e| format!("Failed to create table {}: {}", name, e))?;

    Ok(())
}

fn create_indexes(conn: &Connection) -> Result<(), String> {
    debug!("Creating indexes");

    for ddl in INDEXES {
        conn.execute(ddl, [])
            .map_err(|e| format!("Failed to create index: {}", e))?;
    }

    Ok(())
}
