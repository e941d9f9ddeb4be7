//! Login, logout and the session middleware
//!
//! Sessions are database rows keyed by a random token carried in an
//! HttpOnly cookie. The middleware resolves the token into a request-scoped
//! `CurrentUser` extension; no handler reads identity from ambient state.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use frantoio_common::auth::{Ruolo, SESSION_COOKIE};
use frantoio_common::db::{sessions, users};

use crate::{ApiError, ApiResult, AppState};

/// Authenticated identity attached to each request by the middleware
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    pub ruolo: Ruolo,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub username: String,
    pub ruolo: Ruolo,
    pub sezioni: Vec<i64>,
}

/// POST /login
///
/// Verifies credentials, updates the last-login timestamp and opens a
/// session in one transaction, then sets the session cookie.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Response> {
    let Some(user) =
        users::verify_credentials(&state.db, &payload.username, &payload.password).await?
    else {
        return Err(ApiError::Unauthorized(
            "invalid username or password".to_string(),
        ));
    };

    let sessione = sessions::open(&state.db, &user).await?;
    let timeout = sessions::session_timeout_seconds(&state.db).await?;

    info!("User '{}' logged in ({})", user.username, user.ruolo.as_str());

    let body = LoginResponse {
        username: user.username,
        ruolo: user.ruolo,
        sezioni: user.ruolo.accessible_sections().to_vec(),
    };

    Ok((
        [(
            header::SET_COOKIE,
            build_session_cookie(&sessione.token, timeout),
        )],
        Json(body),
    )
        .into_response())
}

/// GET /logout
///
/// Deletes the session row and clears the cookie.
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    if let Some(token) = session_token(&headers) {
        sessions::close(&state.db, &token).await?;
    }

    info!("User '{}' logged out", user.username);

    Ok((
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(json!({ "success": true })),
    )
        .into_response())
}

/// Session middleware for protected routes
///
/// Resolves the session cookie into a `CurrentUser` extension. Requests
/// without a valid, unexpired session get 401 and never reach a handler.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = session_token(request.headers()) else {
        return Err(ApiError::Unauthorized("login required".to_string()));
    };

    let Some(user) = sessions::find_user(&state.db, &token).await? else {
        return Err(ApiError::Unauthorized(
            "session expired or invalid".to_string(),
        ));
    };

    request.extensions_mut().insert(CurrentUser {
        id: user.id,
        username: user.username,
        ruolo: user.ruolo,
    });

    Ok(next.run(request).await)
}

/// Extract the session token from the Cookie header
fn session_token(headers: &HeaderMap) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for cookie in cookie_header.split(';') {
        let mut parts = cookie.trim().splitn(2, '=');
        if parts.next() == Some(SESSION_COOKIE) {
            return parts.next().map(|v| v.to_string());
        }
    }
    None
}

fn build_session_cookie(token: &str, max_age_seconds: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_seconds
    )
}

fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}
