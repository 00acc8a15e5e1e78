mod models;
mod repos;
mod seeders;

pub use models::*;
pub use repos::*;
pub use seeders::{seed_course_modes, seed_sample_courses};

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

pub type DbPool = SqlitePool;

/// Format a timestamp the way every TEXT timestamp column stores it.
///
/// Fixed microsecond precision with a `Z` suffix keeps lexicographic order
/// equal to chronological order, so `ORDER BY started_at` works on strings.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time in storage format
pub fn now() -> String {
    timestamp(Utc::now())
}

/// Parse a stored timestamp back into a `DateTime<Utc>`
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
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
    let db_path = data_dir.join("sanpo.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    info!("Initializing database at {}", db_path.display());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    // Enable WAL mode for better concurrency
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: Initial schema
    let has_users_table: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type='table' AND name='users'",
    )
    .fetch_optional(pool)
    .await?;
    if has_users_table.is_none() {
        execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await?;
    }

    // Built-in course modes are upserted on every startup
    seeders::seed_course_modes(pool).await?;

    info!("Migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_format_is_fixed_width() {
        let at = Utc.with_ymd_and_hms(2025, 4, 1, 9, 30, 0).unwrap();
        assert_eq!(timestamp(at), "2025-04-01T09:30:00.000000Z");
    }

    #[test]
    fn test_timestamp_roundtrip_preserves_order() {
        let earlier = Utc.with_ymd_and_hms(2025, 4, 1, 9, 30, 0).unwrap();
        let later = earlier + chrono::Duration::milliseconds(1500);
        assert!(timestamp(earlier) < timestamp(later));
        assert_eq!(parse_timestamp(&timestamp(later)), Some(later));
    }

    #[tokio::test]
    async fn test_init_creates_schema_and_modes() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init(dir.path()).await.unwrap();

        let modes: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM course_modes")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(modes.0, 3);

        // Running init again on the same file must be a no-op
        drop(pool);
        let pool = init(dir.path()).await.unwrap();
        let modes: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM course_modes")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(modes.0, 3);
    }
}
