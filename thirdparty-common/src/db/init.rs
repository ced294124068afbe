//! Database initialization
//!
//! Creates the SQLite database on first run and brings the schema up to date.
//! Every statement is idempotent, so calling [`init_database`] on an existing
//! database is safe.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// SQLite busy timeout applied to every pooled connection
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Initialize database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Connection options apply per connection, so foreign keys stay enforced
    // on every pooled connection (cascade delete depends on it).
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables used by the arbiter
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_arguments_table(pool).await?;
    create_judgments_table(pool).await?;
    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the arguments table
///
/// `transcript` is empty while a media submission is still being transcribed.
pub async fn create_arguments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS arguments (
            id TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL,
            person_a_name TEXT NOT NULL,
            person_b_name TEXT NOT NULL,
            persona TEXT NOT NULL DEFAULT 'mediator',
            transcript TEXT NOT NULL DEFAULT '',
            transcript_language TEXT,
            transcript_duration_seconds REAL,
            transcript_segments TEXT,
            status TEXT NOT NULL DEFAULT 'processing'
                CHECK (status IN ('processing', 'complete', 'failed')),
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_arguments_user_id ON arguments(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the judgments table
///
/// At most one judgment per argument (UNIQUE), removed with its argument.
pub async fn create_judgments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS judgments (
            id TEXT PRIMARY KEY,
            argument_id TEXT NOT NULL UNIQUE
                REFERENCES arguments(id) ON DELETE CASCADE,
            winner TEXT NOT NULL CHECK (winner IN ('person_a', 'person_b', 'tie')),
            reasoning TEXT NOT NULL,
            full_response TEXT NOT NULL,
            respect INTEGER NOT NULL CHECK (respect BETWEEN 1 AND 10),
            empathy INTEGER NOT NULL CHECK (empathy BETWEEN 1 AND 10),
            accountability INTEGER NOT NULL CHECK (accountability BETWEEN 1 AND 10),
            emotional_regulation INTEGER NOT NULL CHECK (emotional_regulation BETWEEN 1 AND 10),
            manipulation_toxicity INTEGER NOT NULL CHECK (manipulation_toxicity BETWEEN 1 AND 10),
            conversation_health_score INTEGER NOT NULL
                CHECK (conversation_health_score BETWEEN 10 AND 100),
            contract_version TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
