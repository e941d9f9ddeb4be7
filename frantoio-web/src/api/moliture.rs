//! Molitura workflow handlers: create, list/filter, edit, delete
//!
//! Every read and write path checks the molitura's section against the
//! acting user's role before touching anything. All validation happens at
//! the boundary; the repository layer only sees structured input.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use frantoio_common::db::models::{
    parse_data_filtro, parse_data_filtro_fine, parse_data_ora, CassoneInput, NuovoCliente,
    StatoMolitura,
};
use frantoio_common::db::moliture::{
    FiltroMoliture, ModificaMolitura, NuovaMolitura, RiferimentoCliente,
};
use frantoio_common::db::{clienti, moliture};

use crate::api::{ensure_section_access, session::CurrentUser};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct CreaMolituraRequest {
    /// Existing client id; when absent, `nuovo_cliente` must carry the
    /// inline new-client fields
    pub cliente_id: Option<String>,
    pub nuovo_cliente: Option<NuovoCliente>,
    pub sezione: i64,
    #[serde(default)]
    pub usa_ora_corrente: bool,
    pub data: Option<String>,
    pub ora: Option<String>,
    pub stato: String,
    pub note: Option<String>,
    /// Wire-encoded cassoni entries, `"<numero>:<quantita>"` each
    #[serde(default)]
    pub cassoni: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModificaMolituraRequest {
    pub sezione: i64,
    #[serde(default)]
    pub usa_ora_corrente: bool,
    pub data: Option<String>,
    pub ora: Option<String>,
    pub stato: String,
    pub note: Option<String>,
    #[serde(default)]
    pub cassoni: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct MolitureQuery {
    pub data_da: Option<String>,
    pub data_a: Option<String>,
    pub stato: Option<String>,
    pub sezione: Option<String>,
}

fn resolve_data_ora(
    usa_ora_corrente: bool,
    data: Option<&str>,
    ora: Option<&str>,
) -> ApiResult<NaiveDateTime> {
    if usa_ora_corrente {
        return Ok(Utc::now().naive_utc());
    }

    match (data, ora) {
        (Some(data), Some(ora)) => Ok(parse_data_ora(data, ora)?),
        _ => Err(ApiError::BadRequest(
            "data and ora are required unless usa_ora_corrente is set".to_string(),
        )),
    }
}

/// GET /nuova_molitura
///
/// Form data for batch creation: client list plus the sections available
/// to the caller.
pub async fn new_molitura_form(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<Value>> {
    let elenco = clienti::list(&state.db).await?;
    let clienti: Vec<Value> = elenco.iter().map(super::clienti::cliente_json).collect();

    Ok(Json(json!({
        "clienti": clienti,
        "sezioni": user.ruolo.accessible_sections(),
    })))
}

/// POST /nuova_molitura
pub async fn create_molitura(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreaMolituraRequest>,
) -> ApiResult<impl IntoResponse> {
    ensure_section_access(&user, payload.sezione)?;

    let stato = StatoMolitura::parse(&payload.stato)?;
    let data_ora = resolve_data_ora(
        payload.usa_ora_corrente,
        payload.data.as_deref(),
        payload.ora.as_deref(),
    )?;
    let cassoni = CassoneInput::parse_list(&payload.cassoni)?;

    let cliente_id = payload.cliente_id.filter(|id| !id.trim().is_empty());
    let cliente = match (cliente_id, payload.nuovo_cliente) {
        (Some(id), _) => RiferimentoCliente::Esistente(id),
        (None, Some(nuovo)) => RiferimentoCliente::Nuovo(nuovo),
        (None, None) => {
            return Err(ApiError::BadRequest(
                "either cliente_id or nuovo_cliente is required".to_string(),
            ))
        }
    };

    let molitura = moliture::create(
        &state.db,
        NuovaMolitura {
            cliente,
            sezione: payload.sezione,
            data_ora,
            stato,
            note: payload.note,
            cassoni,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": molitura.id }))))
}

/// GET /moliture?data_da&data_a&stato&sezione
///
/// Additive filters on top of the caller's accessible sections, ordered by
/// scheduled date/time descending.
pub async fn list_moliture(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<MolitureQuery>,
) -> ApiResult<Json<Value>> {
    let mut filtro = FiltroMoliture::default();

    if let Some(data_da) = query.data_da.as_deref().filter(|s| !s.is_empty()) {
        filtro.data_da = Some(parse_data_filtro(data_da)?);
    }
    if let Some(data_a) = query.data_a.as_deref().filter(|s| !s.is_empty()) {
        filtro.data_a = Some(parse_data_filtro_fine(data_a)?);
    }
    if let Some(stato) = query.stato.as_deref().filter(|s| !s.is_empty()) {
        filtro.stato = Some(StatoMolitura::parse(stato)?);
    }
    if let Some(sezione) = query.sezione.as_deref().filter(|s| !s.is_empty()) {
        let sezione: i64 = sezione
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("invalid sezione: '{}'", sezione)))?;
        filtro.sezione = Some(sezione);
    }

    let elenco =
        moliture::list_filtered(&state.db, &filtro, user.ruolo.accessible_sections()).await?;

    Ok(Json(json!({ "moliture": elenco })))
}

/// GET /modifica_molitura/{id}
///
/// Molitura detail with its cassoni, for the edit form.
pub async fn get_molitura(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let molitura = moliture::get_riepilogo(&state.db, &id).await?;
    ensure_section_access(&user, molitura.sezione)?;

    let cassoni = moliture::cassoni(&state.db, &id).await?;

    Ok(Json(json!({
        "molitura": molitura,
        "cassoni": cassoni,
    })))
}

/// POST /modifica_molitura/{id}
///
/// Field update plus full replace of the cassoni set, in one transaction.
/// Both the molitura's current section and the requested one must be
/// accessible.
pub async fn update_molitura(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(payload): Json<ModificaMolituraRequest>,
) -> ApiResult<Json<Value>> {
    let esistente = moliture::get(&state.db, &id).await?;
    ensure_section_access(&user, esistente.sezione)?;
    ensure_section_access(&user, payload.sezione)?;

    let stato = StatoMolitura::parse(&payload.stato)?;
    let data_ora = resolve_data_ora(
        payload.usa_ora_corrente,
        payload.data.as_deref(),
        payload.ora.as_deref(),
    )?;
    let cassoni = CassoneInput::parse_list(&payload.cassoni)?;

    moliture::update(
        &state.db,
        &id,
        ModificaMolitura {
            sezione: payload.sezione,
            data_ora,
            stato,
            note: payload.note,
            cassoni,
        },
    )
    .await?;

    Ok(Json(json!({ "success": true })))
}

/// POST /elimina_molitura/{id}
pub async fn delete_molitura(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let esistente = moliture::get(&state.db, &id).await?;
    ensure_section_access(&user, esistente.sezione)?;

    moliture::delete(&state.db, &id).await?;
    Ok(Json(json!({ "success": true })))
}
