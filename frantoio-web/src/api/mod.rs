//! HTTP API handlers

pub mod clienti;
pub mod dashboard;
pub mod health;
pub mod moliture;
pub mod report;
pub mod ricevuta;
pub mod session;

use crate::ApiError;
use session::CurrentUser;

/// Section gate applied before every molitura read or write
pub(crate) fn ensure_section_access(user: &CurrentUser, sezione: i64) -> Result<(), ApiError> {
    if user.ruolo.can_access_section(sezione) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "section {} is not accessible with your role",
            sezione
        )))
    }
}
