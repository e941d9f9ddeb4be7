//! Repository queries for moliture and their cassoni
//!
//! Multi-step writes (molitura + cassoni, inline client creation, full
//! replace-on-edit) each run inside a single transaction: a failure in any
//! step rolls everything back before an error surfaces.

use chrono::{NaiveDateTime, NaiveTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::models::{
    Cassone, CassoneInput, Molitura, MolituraRiepilogo, NuovoCliente, StatoMolitura,
};
use crate::{Error, Result};

/// Client reference on molitura creation: either an existing id or inline
/// new-client fields (inserted first, in the same transaction).
#[derive(Debug, Clone)]
pub enum RiferimentoCliente {
    Esistente(String),
    Nuovo(NuovoCliente),
}

/// Validated input for creating a molitura
#[derive(Debug, Clone)]
pub struct NuovaMolitura {
    pub cliente: RiferimentoCliente,
    pub sezione: i64,
    pub data_ora: NaiveDateTime,
    pub stato: StatoMolitura,
    pub note: Option<String>,
    pub cassoni: Vec<CassoneInput>,
}

/// Validated input for editing a molitura. The submitted cassoni fully
/// replace the existing set.
#[derive(Debug, Clone)]
pub struct ModificaMolitura {
    pub sezione: i64,
    pub data_ora: NaiveDateTime,
    pub stato: StatoMolitura,
    pub note: Option<String>,
    pub cassoni: Vec<CassoneInput>,
}

/// Additive list filters; section restriction is applied on top of these.
/// `data_a` is an exclusive upper bound (start of the day after the
/// requested inclusive end date).
#[derive(Debug, Clone, Default)]
pub struct FiltroMoliture {
    pub data_da: Option<NaiveDateTime>,
    pub data_a: Option<NaiveDateTime>,
    pub stato: Option<StatoMolitura>,
    pub sezione: Option<i64>,
}

pub fn validate_sezione(sezione: i64) -> Result<()> {
    if !(1..=4).contains(&sezione) {
        return Err(Error::InvalidInput(format!(
            "sezione must be between 1 and 4, got {}",
            sezione
        )));
    }
    Ok(())
}

const RIEPILOGO_SELECT: &str = r#"
SELECT m.id, m.cliente_id, c.nome || ' ' || c.cognome AS cliente_nome,
       m.sezione, m.data_ora, m.stato, m.note,
       COUNT(k.id) AS numero_cassoni,
       COALESCE(SUM(k.quantita), 0) AS quantita_totale
FROM moliture m
JOIN clienti c ON c.id = m.cliente_id
LEFT JOIN cassoni k ON k.molitura_id = m.id
"#;

/// Inline IN-list for the caller's accessible sections. Values come from
/// `Ruolo::accessible_sections`, never from user input.
fn sezioni_in(sezioni: &[i64]) -> String {
    if sezioni.is_empty() {
        return "(-1)".to_string();
    }
    let elenco: Vec<String> = sezioni.iter().map(|s| s.to_string()).collect();
    format!("({})", elenco.join(","))
}

/// Create a molitura with its cassoni, resolving the client reference
/// first. Atomic: nothing is persisted if any step fails.
pub async fn create(pool: &SqlitePool, dati: NuovaMolitura) -> Result<Molitura> {
    validate_sezione(dati.sezione)?;

    let mut tx = pool.begin().await?;

    let cliente_id = match dati.cliente {
        RiferimentoCliente::Esistente(id) => {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM clienti WHERE id = ?)")
                .bind(&id)
                .fetch_one(&mut *tx)
                .await?;
            if !exists {
                return Err(Error::NotFound(format!("cliente {}", id)));
            }
            id
        }
        RiferimentoCliente::Nuovo(nuovo) => {
            let id = Uuid::new_v4().to_string();
            sqlx::query(
                r#"
                INSERT INTO clienti (id, nome, cognome, telefono, indirizzo, email, note)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(&nuovo.nome)
            .bind(&nuovo.cognome)
            .bind(&nuovo.telefono)
            .bind(&nuovo.indirizzo)
            .bind(&nuovo.email)
            .bind(&nuovo.note)
            .execute(&mut *tx)
            .await?;
            id
        }
    };

    let molitura_id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO moliture (id, cliente_id, sezione, data_ora, stato, note)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&molitura_id)
    .bind(&cliente_id)
    .bind(dati.sezione)
    .bind(dati.data_ora)
    .bind(dati.stato)
    .bind(&dati.note)
    .execute(&mut *tx)
    .await?;

    insert_cassoni(&mut tx, &molitura_id, &dati.cassoni).await?;

    tx.commit().await?;

    get(pool, &molitura_id).await
}

/// Update molitura fields and fully replace its cassoni set, atomically
pub async fn update(pool: &SqlitePool, id: &str, dati: ModificaMolitura) -> Result<()> {
    validate_sezione(dati.sezione)?;

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE moliture
        SET sezione = ?, data_ora = ?, stato = ?, note = ?
        WHERE id = ?
        "#,
    )
    .bind(dati.sezione)
    .bind(dati.data_ora)
    .bind(dati.stato)
    .bind(&dati.note)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("molitura {}", id)));
    }

    sqlx::query("DELETE FROM cassoni WHERE molitura_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    insert_cassoni(&mut tx, id, &dati.cassoni).await?;

    tx.commit().await?;
    Ok(())
}

async fn insert_cassoni(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    molitura_id: &str,
    cassoni: &[CassoneInput],
) -> Result<()> {
    for cassone in cassoni {
        sqlx::query(
            r#"
            INSERT INTO cassoni (id, molitura_id, numero_cassone, quantita)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(molitura_id)
        .bind(cassone.numero_cassone)
        .bind(cassone.quantita)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Delete a molitura; its cassoni cascade
pub async fn delete(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM moliture WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("molitura {}", id)));
    }

    Ok(())
}

pub async fn get(pool: &SqlitePool, id: &str) -> Result<Molitura> {
    sqlx::query_as::<_, Molitura>("SELECT * FROM moliture WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("molitura {}", id)))
}

/// Single molitura in list-row shape (client name + computed totals)
pub async fn get_riepilogo(pool: &SqlitePool, id: &str) -> Result<MolituraRiepilogo> {
    let sql = format!("{} WHERE m.id = ? GROUP BY m.id", RIEPILOGO_SELECT);
    sqlx::query_as::<_, MolituraRiepilogo>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("molitura {}", id)))
}

/// Cassoni of one molitura ordered by crate number
pub async fn cassoni(pool: &SqlitePool, molitura_id: &str) -> Result<Vec<Cassone>> {
    let rows = sqlx::query_as::<_, Cassone>(
        "SELECT * FROM cassoni WHERE molitura_id = ? ORDER BY numero_cassone",
    )
    .bind(molitura_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Derived total quantity: always recomputed from current cassoni rows
pub async fn quantita_totale(pool: &SqlitePool, molitura_id: &str) -> Result<i64> {
    let totale: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(quantita), 0) FROM cassoni WHERE molitura_id = ?")
            .bind(molitura_id)
            .fetch_one(pool)
            .await?;
    Ok(totale)
}

/// Filtered list, additionally restricted to the caller's accessible
/// sections, ordered by scheduled date/time descending
pub async fn list_filtered(
    pool: &SqlitePool,
    filtro: &FiltroMoliture,
    sezioni: &[i64],
) -> Result<Vec<MolituraRiepilogo>> {
    let mut sql = format!(
        "{} WHERE m.sezione IN {}",
        RIEPILOGO_SELECT,
        sezioni_in(sezioni)
    );

    if filtro.data_da.is_some() {
        sql.push_str(" AND m.data_ora >= ?");
    }
    if filtro.data_a.is_some() {
        sql.push_str(" AND m.data_ora < ?");
    }
    if filtro.stato.is_some() {
        sql.push_str(" AND m.stato = ?");
    }
    if filtro.sezione.is_some() {
        sql.push_str(" AND m.sezione = ?");
    }
    sql.push_str(" GROUP BY m.id ORDER BY m.data_ora DESC");

    let mut query = sqlx::query_as::<_, MolituraRiepilogo>(&sql);
    if let Some(da) = filtro.data_da {
        query = query.bind(da);
    }
    if let Some(a) = filtro.data_a {
        query = query.bind(a);
    }
    if let Some(stato) = filtro.stato {
        query = query.bind(stato);
    }
    if let Some(sezione) = filtro.sezione {
        query = query.bind(sezione);
    }

    let rows = query.fetch_all(pool).await?;
    Ok(rows)
}

/// Batch history of one client, section-restricted, newest first
pub async fn list_for_cliente(
    pool: &SqlitePool,
    cliente_id: &str,
    sezioni: &[i64],
) -> Result<Vec<MolituraRiepilogo>> {
    let sql = format!(
        "{} WHERE m.cliente_id = ? AND m.sezione IN {} GROUP BY m.id ORDER BY m.data_ora DESC",
        RIEPILOGO_SELECT,
        sezioni_in(sezioni)
    );

    let rows = sqlx::query_as::<_, MolituraRiepilogo>(&sql)
        .bind(cliente_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Selected moliture for the report, oldest first. Unknown ids are simply
/// absent from the result.
pub async fn get_by_ids(pool: &SqlitePool, ids: &[String]) -> Result<Vec<MolituraRiepilogo>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(",");
    let sql = format!(
        "{} WHERE m.id IN ({}) GROUP BY m.id ORDER BY m.data_ora ASC",
        RIEPILOGO_SELECT, placeholders
    );

    let mut query = sqlx::query_as::<_, MolituraRiepilogo>(&sql);
    for id in ids {
        query = query.bind(id);
    }

    let rows = query.fetch_all(pool).await?;
    Ok(rows)
}

/// Moliture still being processed (dashboard counter)
pub async fn count_in_progress(pool: &SqlitePool, sezioni: &[i64]) -> Result<i64> {
    let sql = format!(
        "SELECT COUNT(*) FROM moliture WHERE stato IN ('accettazione', 'in molitura') AND sezione IN {}",
        sezioni_in(sezioni)
    );
    let n: i64 = sqlx::query_scalar(&sql).fetch_one(pool).await?;
    Ok(n)
}

/// Moliture scheduled from the start of today onwards (dashboard counter)
pub async fn count_today(pool: &SqlitePool, sezioni: &[i64]) -> Result<i64> {
    let oggi = Utc::now().date_naive().and_time(NaiveTime::MIN);
    let sql = format!(
        "SELECT COUNT(*) FROM moliture WHERE data_ora >= ? AND sezione IN {}",
        sezioni_in(sezioni)
    );
    let n: i64 = sqlx::query_scalar(&sql).bind(oggi).fetch_one(pool).await?;
    Ok(n)
}

/// Most recently created moliture (dashboard preview)
pub async fn recent(
    pool: &SqlitePool,
    sezioni: &[i64],
    limit: i64,
) -> Result<Vec<MolituraRiepilogo>> {
    let sql = format!(
        "{} WHERE m.sezione IN {} GROUP BY m.id ORDER BY m.data_creazione DESC LIMIT ?",
        RIEPILOGO_SELECT,
        sezioni_in(sezioni)
    );

    let rows = sqlx::query_as::<_, MolituraRiepilogo>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
