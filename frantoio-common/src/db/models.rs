//! Database models

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::auth::Ruolo;
use crate::{Error, Result};

/// Client of the mill, owner of zero or more moliture
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Cliente {
    pub id: String,
    pub nome: String,
    pub cognome: String,
    pub telefono: Option<String>,
    pub indirizzo: Option<String>,
    pub email: Option<String>,
    pub note: Option<String>,
    pub data_creazione: NaiveDateTime,
}

impl Cliente {
    pub fn nome_completo(&self) -> String {
        format!("{} {}", self.nome, self.cognome)
    }
}

/// Fields for creating a client, also used for full-overwrite updates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NuovoCliente {
    pub nome: String,
    pub cognome: String,
    pub telefono: Option<String>,
    pub indirizzo: Option<String>,
    pub email: Option<String>,
    pub note: Option<String>,
}

/// Processing state of a molitura
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum StatoMolitura {
    #[serde(rename = "accettazione")]
    #[sqlx(rename = "accettazione")]
    Accettazione,
    #[serde(rename = "in molitura")]
    #[sqlx(rename = "in molitura")]
    InMolitura,
    #[serde(rename = "completa")]
    #[sqlx(rename = "completa")]
    Completa,
    #[serde(rename = "archiviata")]
    #[sqlx(rename = "archiviata")]
    Archiviata,
}

impl StatoMolitura {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatoMolitura::Accettazione => "accettazione",
            StatoMolitura::InMolitura => "in molitura",
            StatoMolitura::Completa => "completa",
            StatoMolitura::Archiviata => "archiviata",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "accettazione" => Ok(StatoMolitura::Accettazione),
            "in molitura" => Ok(StatoMolitura::InMolitura),
            "completa" => Ok(StatoMolitura::Completa),
            "archiviata" => Ok(StatoMolitura::Archiviata),
            other => Err(Error::InvalidInput(format!("invalid stato: '{}'", other))),
        }
    }
}

/// One pressing batch for a client in a mill section
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Molitura {
    pub id: String,
    pub cliente_id: String,
    pub sezione: i64,
    pub data_ora: NaiveDateTime,
    pub stato: StatoMolitura,
    pub note: Option<String>,
    pub data_creazione: NaiveDateTime,
}

/// One weighed container contributing to a molitura's total quantity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Cassone {
    pub id: String,
    pub molitura_id: String,
    pub numero_cassone: i64,
    pub quantita: i64,
    pub note: Option<String>,
}

/// List-view row: molitura joined with its client and aggregate quantities.
/// `quantita_totale` is always recomputed from cassoni rows, never stored.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MolituraRiepilogo {
    pub id: String,
    pub cliente_id: String,
    pub cliente_nome: String,
    pub sezione: i64,
    pub data_ora: NaiveDateTime,
    pub stato: StatoMolitura,
    pub note: Option<String>,
    pub numero_cassoni: i64,
    pub quantita_totale: i64,
}

/// Application user account
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub password_salt: String,
    pub ruolo: Ruolo,
    pub attivo: bool,
    pub data_creazione: NaiveDateTime,
    pub ultimo_accesso: Option<NaiveDateTime>,
}

/// Login session row backing the session cookie
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub created_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

/// Structured cassone entry, parsed from the `"<numero>:<quantita>"` wire
/// form before it reaches any persistence logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CassoneInput {
    pub numero_cassone: i64,
    pub quantita: i64,
}

impl CassoneInput {
    /// Parse a single wire entry. Empty entries yield `None` (skipped);
    /// malformed entries are a validation error, never a crash.
    pub fn parse(raw: &str) -> Result<Option<Self>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        let (numero, quantita) = raw.split_once(':').ok_or_else(|| {
            Error::InvalidInput(format!("invalid cassone entry: '{}'", raw))
        })?;

        let numero_cassone: i64 = numero.trim().parse().map_err(|_| {
            Error::InvalidInput(format!("invalid cassone number: '{}'", numero))
        })?;
        let quantita: i64 = quantita.trim().parse().map_err(|_| {
            Error::InvalidInput(format!("invalid cassone quantity: '{}'", quantita))
        })?;

        if quantita < 0 {
            return Err(Error::InvalidInput(format!(
                "cassone quantity cannot be negative: {}",
                quantita
            )));
        }

        Ok(Some(Self {
            numero_cassone,
            quantita,
        }))
    }

    /// Parse a submitted list of wire entries, skipping empty ones
    pub fn parse_list(raw: &[String]) -> Result<Vec<Self>> {
        let mut parsed = Vec::with_capacity(raw.len());
        for entry in raw {
            if let Some(cassone) = Self::parse(entry)? {
                parsed.push(cassone);
            }
        }
        Ok(parsed)
    }
}

/// Parse the `data` (`%Y-%m-%d`) + `ora` (`%H:%M`) form fields into one
/// timestamp. Parsing failure is a user error, not fatal.
pub fn parse_data_ora(data: &str, ora: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&format!("{} {}", data.trim(), ora.trim()), "%Y-%m-%d %H:%M")
        .map_err(|_| {
            Error::InvalidInput(format!("invalid date/time: '{}' '{}'", data, ora))
        })
}

/// Parse a `%Y-%m-%d` filter bound into the start of that day
pub fn parse_data_filtro(data: &str) -> Result<NaiveDateTime> {
    chrono::NaiveDate::parse_from_str(data.trim(), "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|_| Error::InvalidInput(format!("invalid date: '{}'", data)))
}

/// Exclusive upper bound covering the whole of `data` (start of the next day)
pub fn parse_data_filtro_fine(data: &str) -> Result<NaiveDateTime> {
    let giorno = chrono::NaiveDate::parse_from_str(data.trim(), "%Y-%m-%d")
        .map_err(|_| Error::InvalidInput(format!("invalid date: '{}'", data)))?;
    giorno
        .succ_opt()
        .map(|d| d.and_time(NaiveTime::MIN))
        .ok_or_else(|| Error::InvalidInput(format!("date out of range: '{}'", data)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cassone_entry_parses() {
        let parsed = CassoneInput::parse("3:120").unwrap();
        assert_eq!(
            parsed,
            Some(CassoneInput {
                numero_cassone: 3,
                quantita: 120
            })
        );
    }

    #[test]
    fn empty_cassone_entry_is_skipped() {
        assert_eq!(CassoneInput::parse("").unwrap(), None);
        assert_eq!(CassoneInput::parse("   ").unwrap(), None);
    }

    #[test]
    fn malformed_cassone_entries_are_rejected() {
        assert!(CassoneInput::parse("3").is_err());
        assert!(CassoneInput::parse("3-120").is_err());
        assert!(CassoneInput::parse("a:120").is_err());
        assert!(CassoneInput::parse("3:kg").is_err());
        assert!(CassoneInput::parse("3:-5").is_err());
    }

    #[test]
    fn cassone_list_skips_empty_entries() {
        let raw = vec!["1:50".to_string(), "".to_string(), "2:30".to_string()];
        let parsed = CassoneInput::parse_list(&raw).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].quantita, 30);
    }

    #[test]
    fn cassone_list_fails_on_any_malformed_entry() {
        let raw = vec!["1:50".to_string(), "boom".to_string()];
        assert!(CassoneInput::parse_list(&raw).is_err());
    }

    #[test]
    fn data_ora_parses() {
        let dt = parse_data_ora("2024-11-05", "14:30").unwrap();
        assert_eq!(dt.format("%d/%m/%Y %H:%M").to_string(), "05/11/2024 14:30");
    }

    #[test]
    fn bad_data_ora_is_rejected() {
        assert!(parse_data_ora("05/11/2024", "14:30").is_err());
        assert!(parse_data_ora("2024-11-05", "25:00").is_err());
        assert!(parse_data_ora("", "").is_err());
    }

    #[test]
    fn filter_bounds_cover_whole_day() {
        let da = parse_data_filtro("2024-11-05").unwrap();
        let a = parse_data_filtro_fine("2024-11-05").unwrap();
        assert_eq!(da.format("%H:%M:%S").to_string(), "00:00:00");
        assert_eq!(a.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-11-06 00:00:00");
    }

    #[test]
    fn stato_round_trips_known_values() {
        for s in ["accettazione", "in molitura", "completa", "archiviata"] {
            assert_eq!(StatoMolitura::parse(s).unwrap().as_str(), s);
        }
        assert!(StatoMolitura::parse("fermo").is_err());
    }
}
