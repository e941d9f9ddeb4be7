//! Dashboard counts, scoped to the caller's accessible sections

use axum::{extract::State, Extension, Json};
use serde::Serialize;

use frantoio_common::db::models::MolituraRiepilogo;
use frantoio_common::db::{clienti, moliture};

use crate::api::session::CurrentUser;
use crate::{ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub totale_clienti: i64,
    pub moliture_in_corso: i64,
    pub moliture_oggi: i64,
    pub ultime_moliture: Vec<MolituraRiepilogo>,
}

/// GET /
pub async fn index(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<DashboardResponse>> {
    let sezioni = user.ruolo.accessible_sections();

    let totale_clienti = clienti::count(&state.db).await?;
    let moliture_in_corso = moliture::count_in_progress(&state.db, sezioni).await?;
    let moliture_oggi = moliture::count_today(&state.db, sezioni).await?;
    let ultime_moliture = moliture::recent(&state.db, sezioni, 5).await?;

    Ok(Json(DashboardResponse {
        totale_clienti,
        moliture_in_corso,
        moliture_oggi,
        ultime_moliture,
    }))
}
