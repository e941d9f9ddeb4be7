//! Client management handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use frantoio_common::db::models::{Cliente, NuovoCliente};
use frantoio_common::db::{clienti, moliture};

use crate::api::session::CurrentUser;
use crate::{ApiResult, AppState};

/// JSON shape shared by the list, search and history endpoints
pub(crate) fn cliente_json(cliente: &Cliente) -> Value {
    json!({
        "id": cliente.id,
        "nome": cliente.nome,
        "cognome": cliente.cognome,
        "nome_completo": cliente.nome_completo(),
        "telefono": cliente.telefono,
        "indirizzo": cliente.indirizzo,
        "email": cliente.email,
        "note": cliente.note,
    })
}

/// GET /clienti
pub async fn list_clienti(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let elenco = clienti::list(&state.db).await?;
    let clienti: Vec<Value> = elenco.iter().map(cliente_json).collect();
    Ok(Json(json!({ "clienti": clienti })))
}

/// POST /nuovo_cliente
pub async fn create_cliente(
    State(state): State<AppState>,
    Json(payload): Json<NuovoCliente>,
) -> ApiResult<impl IntoResponse> {
    let cliente = clienti::insert(&state.db, &payload).await?;
    Ok((StatusCode::CREATED, Json(cliente_json(&cliente))))
}

/// POST /modifica_cliente/{id}
///
/// Full field overwrite.
pub async fn update_cliente(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<NuovoCliente>,
) -> ApiResult<Json<Value>> {
    clienti::update(&state.db, &id, &payload).await?;
    let cliente = clienti::get(&state.db, &id).await?;
    Ok(Json(cliente_json(&cliente)))
}

/// POST /elimina_cliente/{id}
///
/// Rejected with 409 while the client owns any molitura.
pub async fn delete_cliente(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    clienti::delete(&state.db, &id).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /search_clienti?q=
///
/// Case-insensitive substring search over first name or surname; at most
/// 10 results; empty array for queries shorter than 2 characters.
pub async fn search_clienti(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Value>>> {
    let trovati = clienti::search(&state.db, &query.q).await?;
    Ok(Json(trovati.iter().map(cliente_json).collect()))
}

/// GET /cliente/{id}/moliture
///
/// Batch history of one client, restricted to the caller's accessible
/// sections.
pub async fn cliente_moliture(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let cliente = clienti::get(&state.db, &id).await?;
    let storico =
        moliture::list_for_cliente(&state.db, &id, user.ruolo.accessible_sections()).await?;

    Ok(Json(json!({
        "cliente": cliente_json(&cliente),
        "moliture": storico,
    })))
}
