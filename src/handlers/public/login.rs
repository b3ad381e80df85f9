use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::handlers::json_body;
use crate::middleware::auth::session_cookie;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /login - verify credentials, return the session token and set it
/// as an HttpOnly cookie
pub async fn login_post(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let req = json_body(payload)?;
    let token = state.accounts().login(req.username.trim(), &req.password).await?;
    let cookie = session_cookie(&token, &state.config.security);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "status": "ok", "token": token })),
    )
        .into_response())
}
