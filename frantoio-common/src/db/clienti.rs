//! Repository queries for clienti

use sqlx::SqlitePool;
use uuid::Uuid;

use super::models::{Cliente, NuovoCliente};
use crate::{Error, Result};

/// Insert a new client and return the stored row
pub async fn insert(pool: &SqlitePool, dati: &NuovoCliente) -> Result<Cliente> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO clienti (id, nome, cognome, telefono, indirizzo, email, note)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&dati.nome)
    .bind(&dati.cognome)
    .bind(&dati.telefono)
    .bind(&dati.indirizzo)
    .bind(&dati.email)
    .bind(&dati.note)
    .execute(pool)
    .await?;

    get(pool, &id).await
}

/// Full field overwrite of an existing client
pub async fn update(pool: &SqlitePool, id: &str, dati: &NuovoCliente) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE clienti
        SET nome = ?, cognome = ?, telefono = ?, indirizzo = ?, email = ?, note = ?
        WHERE id = ?
        "#,
    )
    .bind(&dati.nome)
    .bind(&dati.cognome)
    .bind(&dati.telefono)
    .bind(&dati.indirizzo)
    .bind(&dati.email)
    .bind(&dati.note)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("cliente {}", id)));
    }

    Ok(())
}

/// Delete a client. Rejected while any molitura still references it.
pub async fn delete(pool: &SqlitePool, id: &str) -> Result<()> {
    let moliture: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM moliture WHERE cliente_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;

    if moliture > 0 {
        return Err(Error::Conflict(
            "client has associated moliture and cannot be deleted".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM clienti WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("cliente {}", id)));
    }

    Ok(())
}

pub async fn get(pool: &SqlitePool, id: &str) -> Result<Cliente> {
    sqlx::query_as::<_, Cliente>("SELECT * FROM clienti WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("cliente {}", id)))
}

/// All clients ordered by surname then first name
pub async fn list(pool: &SqlitePool) -> Result<Vec<Cliente>> {
    let clienti = sqlx::query_as::<_, Cliente>("SELECT * FROM clienti ORDER BY cognome, nome")
        .fetch_all(pool)
        .await?;
    Ok(clienti)
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clienti")
        .fetch_one(pool)
        .await?;
    Ok(n)
}

/// Case-insensitive substring search over nome OR cognome, capped at 10
/// rows. Queries shorter than 2 characters return empty immediately.
pub async fn search(pool: &SqlitePool, query: &str) -> Result<Vec<Cliente>> {
    let query = query.trim();
    if query.chars().count() < 2 {
        return Ok(Vec::new());
    }

    let pattern = format!("%{}%", query.to_lowercase());
    let clienti = sqlx::query_as::<_, Cliente>(
        r#"
        SELECT * FROM clienti
        WHERE lower(nome) LIKE ? OR lower(cognome) LIKE ?
        ORDER BY cognome, nome
        LIMIT 10
        "#,
    )
    .bind(&pattern)
    .bind(&pattern)
    .fetch_all(pool)
    .await?;

    Ok(clienti)
}
