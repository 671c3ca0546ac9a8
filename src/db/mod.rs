mod models;

pub use models::*;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Sqlite, SqlitePool, Transaction,
};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

pub type DbPool = SqlitePool;

/// How long a writer waits for another connection's write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Start a transaction that holds the write lock from its first statement.
///
/// Read-then-write transactions must use this. A deferred transaction that
/// has already read cannot wait for the lock in WAL mode; SQLite fails it
/// with `SQLITE_BUSY` straight away.
pub async fn begin_write(pool: &DbPool) -> sqlx::Result<Transaction<'static, Sqlite>> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

/// Render a timestamp the way every TEXT time column is stored.
///
/// All stored times share this fixed-width UTC layout, so SQL string
/// comparisons (`departure_time < ?`) order the same way the instants do.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a stored or submitted RFC 3339 timestamp into UTC
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        // Strip SQL comment lines (lines starting with --)
        let cleaned: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = cleaned.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

pub async fn init(data_dir: &Path) -> Result<DbPool> {
    let db_path = data_dir.join("airdesk.db");
    let db_url = format!("sqlite:{}", db_path.display());

    info!("Initializing database at {}", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

/// Open a private in-memory database with the full schema applied.
///
/// The pool holds a single connection that never expires, because every
/// SQLite connection to `:memory:` sees its own empty database.
pub async fn init_in_memory() -> Result<DbPool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: Identity store, flights, passengers, bookings, feedback
    execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await?;

    // Migration 002: Add seat capacity to flights
    let has_total_seats: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM pragma_table_info('flights') WHERE name = 'total_seats'",
    )
    .fetch_optional(pool)
    .await?;
    if has_total_seats.is_none() {
        execute_sql(pool, include_str!("../../migrations/002_flight_capacity.sql")).await?;
    }

    // Migration 003: Drop the legacy numeric booking status
    let has_status2: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM pragma_table_info('bookings') WHERE name = 'status2'",
    )
    .fetch_optional(pool)
    .await?;
    if has_status2.is_some() {
        execute_sql(
            pool,
            include_str!("../../migrations/003_drop_legacy_booking_status.sql"),
        )
        .await?;
    }

    // Migration 004: Unique active seat per flight
    let has_seat_index: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type='index' AND name='idx_bookings_active_seat'",
    )
    .fetch_optional(pool)
    .await?;
    if has_seat_index.is_none() {
        execute_sql(pool, include_str!("../../migrations/004_active_seat_index.sql")).await?;
    }

    info!("Migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_is_fixed_width_utc() {
        let at = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(timestamp(at), "2026-03-04T05:06:07Z");
    }

    #[test]
    fn test_parse_timestamp_normalizes_offset() {
        let parsed = parse_timestamp("2026-03-04T07:06:07+02:00").unwrap();
        assert_eq!(timestamp(parsed), "2026-03-04T05:06:07Z");
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = init_in_memory().await.unwrap();
        run_migrations(&pool).await.unwrap();

        let legacy: Option<(String,)> = sqlx::query_as(
            "SELECT name FROM pragma_table_info('bookings') WHERE name = 'status2'",
        )
        .fetch_optional(&pool)
        .await
        .unwrap();
        assert!(legacy.is_none());

        let capacity: Option<(String,)> = sqlx::query_as(
            "SELECT name FROM pragma_table_info('flights') WHERE name = 'total_seats'",
        )
        .fetch_optional(&pool)
        .await
        .unwrap();
        assert!(capacity.is_some());
    }

    #[tokio::test]
    async fn test_init_creates_database_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let pool = init(temp_dir.path()).await.unwrap();
        pool.close().await;
        assert!(temp_dir.path().join("airdesk.db").exists());
    }
}
