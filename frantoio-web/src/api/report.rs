//! PDF report generation over a selection of moliture
//!
//! Pure read + render: nothing is persisted.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;

use frantoio_common::db::moliture;

use crate::api::{ensure_section_access, session::CurrentUser};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub moliture_selezionate: Vec<String>,
}

/// POST /genera_report_pdf
pub async fn generate_report(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<ReportRequest>,
) -> ApiResult<Response> {
    if payload.moliture_selezionate.is_empty() {
        return Err(ApiError::BadRequest(
            "select at least one molitura for the report".to_string(),
        ));
    }

    let selezione = moliture::get_by_ids(&state.db, &payload.moliture_selezionate).await?;
    if selezione.is_empty() {
        return Err(ApiError::NotFound(
            "no moliture found for the requested ids".to_string(),
        ));
    }

    // The whole selection must lie in the caller's accessible sections
    for molitura in &selezione {
        ensure_section_access(&user, molitura.sezione)?;
    }

    let mut dettagli = Vec::with_capacity(selezione.len());
    for molitura in selezione {
        let cassoni = moliture::cassoni(&state.db, &molitura.id).await?;
        dettagli.push((molitura, cassoni));
    }

    let bytes = crate::pdf::render_report(&dettagli)?;
    let filename = format!("report_moliture_{}.pdf", Utc::now().format("%Y%m%d_%H%M%S"));

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}
