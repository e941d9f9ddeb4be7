//! Login sessions backing the session cookie
//!
//! Opening a session updates the user's last-login timestamp in the same
//! transaction that inserts the session row.

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::models::{Session, User};
use crate::Result;

/// Session lifetime from the settings table, with the seeded default as
/// fallback if the row is missing
pub async fn session_timeout_seconds(pool: &SqlitePool) -> Result<i64> {
    let value: Option<String> = sqlx::query_scalar(
        "SELECT value FROM settings WHERE key = 'session_timeout_seconds'",
    )
    .fetch_optional(pool)
    .await?;

    Ok(value.and_then(|v| v.parse().ok()).unwrap_or(43200))
}

/// Open a session for an authenticated user: updates `ultimo_accesso` and
/// inserts the session row atomically, returning the new session.
pub async fn open(pool: &SqlitePool, user: &User) -> Result<Session> {
    let timeout = session_timeout_seconds(pool).await?;
    let now = Utc::now().naive_utc();
    let expires_at = now + Duration::seconds(timeout);
    let token = Uuid::new_v4().to_string();

    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE users SET ultimo_accesso = ? WHERE id = ?")
        .bind(now)
        .bind(&user.id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&token)
    .bind(&user.id)
    .bind(now)
    .bind(expires_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Session {
        token,
        user_id: user.id.clone(),
        created_at: now,
        expires_at,
    })
}

/// Resolve a session token to its active, unexpired user
pub async fn find_user(pool: &SqlitePool, token: &str) -> Result<Option<User>> {
    let now = Utc::now().naive_utc();
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT u.* FROM users u
        JOIN sessions s ON s.user_id = u.id
        WHERE s.token = ? AND s.expires_at > ? AND u.attivo = 1
        "#,
    )
    .bind(token)
    .bind(now)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Close a session (logout). Closing an unknown token is a no-op.
pub async fn close(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Drop expired session rows
pub async fn purge_expired(pool: &SqlitePool) -> Result<u64> {
    let now = Utc::now().naive_utc();
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
