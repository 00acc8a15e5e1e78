//! Repository for the `users` and `sessions` tables.

use sqlx::SqlitePool;

use crate::db::{now, Session, User};

pub struct UserRepo;

impl UserRepo {
    /// Insert a new user with an already-hashed password.
    pub async fn create(
        pool: &SqlitePool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        let now = now();
        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, password_hash, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) \
             RETURNING *",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(&now)
        .bind(&now)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_username(
        pool: &SqlitePool,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    pub async fn username_exists(pool: &SqlitePool, username: &str) -> Result<bool, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(pool)
            .await?;
        Ok(count.0 > 0)
    }

    /// Email uniqueness is case-insensitive (the column is `COLLATE NOCASE`).
    pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(pool)
            .await?;
        Ok(count.0 > 0)
    }

    // -----------------------------------------------------------------------
    // Login sessions
    // -----------------------------------------------------------------------

    /// Store a login session keyed by the SHA-256 of its bearer token.
    pub async fn create_session(
        pool: &SqlitePool,
        user_id: i64,
        token_hash: &str,
        expires_at: &str,
    ) -> Result<Session, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at) \
             VALUES (?, ?, ?, ?, ?) \
             RETURNING *",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .bind(now())
        .fetch_one(pool)
        .await
    }

    /// Resolve an unexpired session token hash to its user.
    pub async fn find_by_token_hash(
        pool: &SqlitePool,
        token_hash: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT u.* FROM users u \
             JOIN sessions s ON s.user_id = u.id \
             WHERE s.token_hash = ? AND s.expires_at > ?",
        )
        .bind(token_hash)
        .bind(now())
        .fetch_optional(pool)
        .await
    }

    /// Returns `true` if a session was removed.
    pub async fn delete_session(pool: &SqlitePool, token_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Drop every expired session, returning how many were removed.
    pub async fn purge_expired_sessions(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now())
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
