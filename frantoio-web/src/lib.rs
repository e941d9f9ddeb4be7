//! frantoio-web library - HTTP service for the mill's record keeping
//!
//! Exposes the application state and router so integration tests can drive
//! the full request pipeline without binding a socket.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod pdf;

pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// Build application router
///
/// Protected routes require a valid session cookie; the middleware inserts
/// the request-scoped `CurrentUser` every handler reads its identity from.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let protected = Router::new()
        .route("/", get(api::dashboard::index))
        .route("/logout", get(api::session::logout))
        .route(
            "/nuova_molitura",
            get(api::moliture::new_molitura_form).post(api::moliture::create_molitura),
        )
        .route("/moliture", get(api::moliture::list_moliture))
        .route(
            "/modifica_molitura/:id",
            get(api::moliture::get_molitura).post(api::moliture::update_molitura),
        )
        .route("/elimina_molitura/:id", post(api::moliture::delete_molitura))
        .route("/clienti", get(api::clienti::list_clienti))
        .route("/nuovo_cliente", post(api::clienti::create_cliente))
        .route("/modifica_cliente/:id", post(api::clienti::update_cliente))
        .route("/elimina_cliente/:id", post(api::clienti::delete_cliente))
        .route("/search_clienti", get(api::clienti::search_clienti))
        .route("/cliente/:id/moliture", get(api::clienti::cliente_moliture))
        .route("/genera_report_pdf", post(api::report::generate_report))
        .route("/stampa_ricevuta/:id", get(api::ricevuta::print_receipt))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::session::require_session,
        ));

    // Public routes (no authentication)
    let public = Router::new()
        .route("/login", post(api::session::login))
        .merge(api::health::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
