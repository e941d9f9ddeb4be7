//! Repository queries for user accounts

use sqlx::SqlitePool;

use super::models::User;
use crate::auth::verify_password;
use crate::Result;

/// Look up an active account by username
pub async fn find_active_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ? AND attivo = 1")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Verify credentials against the stored salted hash.
///
/// Returns `None` both for unknown/inactive accounts and for a wrong
/// password; callers surface the same generic failure either way.
pub async fn verify_credentials(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<Option<User>> {
    let Some(user) = find_active_by_username(pool, username).await? else {
        return Ok(None);
    };

    if verify_password(password, &user.password_salt, &user.password_hash) {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

pub async fn get(pool: &SqlitePool, id: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}
