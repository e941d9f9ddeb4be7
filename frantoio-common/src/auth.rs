//! Authentication and authorization primitives
//!
//! Roles are a closed two-variant enum: an unrecognized role string in the
//! database is a decode error, never a silent no-access fallback. Passwords
//! are stored as salted SHA-256 hex digests alongside their per-user salt.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Name of the session cookie issued on login
pub const SESSION_COOKIE: &str = "frantoio_session";

/// User role gating access to the mill's processing sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Ruolo {
    /// Access to all four sections
    Completo,
    /// Access to sections 1 and 2 only
    Limitato,
}

impl Ruolo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ruolo::Completo => "completo",
            Ruolo::Limitato => "limitato",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "completo" => Ok(Ruolo::Completo),
            "limitato" => Ok(Ruolo::Limitato),
            other => Err(Error::InvalidInput(format!("unknown role: '{}'", other))),
        }
    }

    /// Sections this role may read and write
    pub fn accessible_sections(&self) -> &'static [i64] {
        match self {
            Ruolo::Completo => &[1, 2, 3, 4],
            Ruolo::Limitato => &[1, 2],
        }
    }

    /// Whether this role may read or write batches in `sezione`
    pub fn can_access_section(&self, sezione: i64) -> bool {
        self.accessible_sections().contains(&sezione)
    }
}

/// Generate a random 16-character alphanumeric salt
pub fn generate_salt() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

/// Salted SHA-256 password hash, 64 hex characters
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Constant-shape verification of a candidate password against a stored hash
pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    hash_password(password, salt) == expected_hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_role_accesses_all_sections() {
        for sezione in 1..=4 {
            assert!(Ruolo::Completo.can_access_section(sezione));
        }
        assert_eq!(Ruolo::Completo.accessible_sections(), &[1, 2, 3, 4]);
    }

    #[test]
    fn limited_role_accesses_first_two_sections() {
        assert!(Ruolo::Limitato.can_access_section(1));
        assert!(Ruolo::Limitato.can_access_section(2));
        assert!(!Ruolo::Limitato.can_access_section(3));
        assert!(!Ruolo::Limitato.can_access_section(4));
        assert_eq!(Ruolo::Limitato.accessible_sections(), &[1, 2]);
    }

    #[test]
    fn unknown_role_string_is_rejected() {
        assert!(Ruolo::parse("completo").is_ok());
        assert!(Ruolo::parse("limitato").is_ok());
        assert!(Ruolo::parse("admin").is_err());
        assert!(Ruolo::parse("").is_err());
    }

    #[test]
    fn password_hash_round_trip() {
        let salt = generate_salt();
        assert_eq!(salt.len(), 16);

        let hash = hash_password("segreto123", &salt);
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));

        assert!(verify_password("segreto123", &salt, &hash));
        assert!(!verify_password("sbagliata", &salt, &hash));
    }

    #[test]
    fn same_password_different_salt_differs() {
        let h1 = hash_password("segreto123", &generate_salt());
        let h2 = hash_password("segreto123", &generate_salt());
        assert_ne!(h1, h2);
    }
}
