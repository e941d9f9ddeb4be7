//! Database initialization
//!
//! Creates the schema idempotently on startup and seeds the two default
//! accounts on first run. All tables use TEXT uuid primary keys.

use crate::auth::{generate_salt, hash_password, Ruolo};
use crate::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Initialize database connection, create tables and seed data if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys (cassoni cascade on molitura delete relies on this)
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;
    init_default_settings(&pool).await?;
    seed_default_users(&pool).await?;

    Ok(pool)
}

/// In-memory pool for tests.
///
/// A single connection is mandatory: every `:memory:` connection opens its
/// own private database, so a larger pool would scatter tables across
/// connections.
pub async fn connect_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent, safe to call multiple times)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_clienti_table(pool).await?;
    create_moliture_table(pool).await?;
    create_cassoni_table(pool).await?;
    create_users_table(pool).await?;
    create_sessions_table(pool).await?;
    create_settings_table(pool).await?;
    Ok(())
}

async fn create_clienti_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clienti (
            id TEXT PRIMARY KEY,
            nome TEXT NOT NULL,
            cognome TEXT NOT NULL,
            telefono TEXT,
            indirizzo TEXT,
            email TEXT,
            note TEXT,
            data_creazione TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_clienti_cognome ON clienti(cognome, nome)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_moliture_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS moliture (
            id TEXT PRIMARY KEY,
            cliente_id TEXT NOT NULL REFERENCES clienti(id),
            sezione INTEGER NOT NULL CHECK (sezione >= 1 AND sezione <= 4),
            data_ora TIMESTAMP NOT NULL,
            stato TEXT NOT NULL DEFAULT 'accettazione'
                CHECK (stato IN ('accettazione', 'in molitura', 'completa', 'archiviata')),
            note TEXT,
            data_creazione TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_moliture_cliente ON moliture(cliente_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_moliture_data_ora ON moliture(data_ora)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_moliture_sezione ON moliture(sezione)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_cassoni_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cassoni (
            id TEXT PRIMARY KEY,
            molitura_id TEXT NOT NULL REFERENCES moliture(id) ON DELETE CASCADE,
            numero_cassone INTEGER NOT NULL,
            quantita INTEGER NOT NULL CHECK (quantita >= 0),
            note TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cassoni_molitura ON cassoni(molitura_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            ruolo TEXT NOT NULL DEFAULT 'limitato' CHECK (ruolo IN ('completo', 'limitato')),
            attivo INTEGER NOT NULL DEFAULT 1,
            data_creazione TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            ultimo_accesso TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            expires_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at)")
        .execute(pool)
        .await?;

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

/// Ensure all required settings exist with default values
pub async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "session_timeout_seconds", "43200").await?; // 12 hours
    Ok(())
}

/// Ensure a setting exists with the specified default value
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(default_value)
        .execute(pool)
        .await?;

    Ok(())
}

/// Seed the two default accounts on first run.
///
/// Fixed initial credentials: a deployment must rotate these before
/// production use.
pub async fn seed_default_users(pool: &SqlitePool) -> Result<()> {
    let existing: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = 'admin')")
            .fetch_one(pool)
            .await?;

    if existing {
        return Ok(());
    }

    insert_seed_user(pool, "admin", "admin123", Ruolo::Completo).await?;
    insert_seed_user(pool, "operatore", "operatore123", Ruolo::Limitato).await?;

    info!("Seeded default accounts 'admin' and 'operatore' (rotate credentials before production)");
    Ok(())
}

async fn insert_seed_user(
    pool: &SqlitePool,
    username: &str,
    password: &str,
    ruolo: Ruolo,
) -> Result<()> {
    let salt = generate_salt();
    let hash = hash_password(password, &salt);

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO users (id, username, password_hash, password_salt, ruolo, attivo)
        VALUES (?, ?, ?, ?, ?, 1)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(username)
    .bind(hash)
    .bind(salt)
    .bind(ruolo.as_str())
    .execute(pool)
    .await?;

    Ok(())
}
