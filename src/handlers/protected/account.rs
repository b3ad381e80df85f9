use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::json_body;
use crate::middleware::auth::cleared_session_cookie;
use crate::middleware::AuthUser;
use crate::services::account::{AccountStatus, ApiCredentials, BusinessInput, CriteriaInput, CriteriaView};
use crate::state::AppState;

/// POST /api/logout
pub async fn logout_post(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> Response {
    tracing::info!(username = %user.username, "logout");
    (
        [(header::SET_COOKIE, cleared_session_cookie(&state.config.security))],
        Json(json!({ "status": "logged_out" })),
    )
        .into_response()
}

/// GET /api/account_status
pub async fn account_status_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<AccountStatus>, ApiError> {
    Ok(Json(state.accounts().status(&user.username).await?))
}

/// GET /api/config
pub async fn config_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiCredentials>, ApiError> {
    Ok(Json(state.accounts().api_credentials(&user.username).await?))
}

/// POST /api/config - all five credential fields are required
pub async fn config_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<ApiCredentials>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let credentials = json_body(payload)?;
    state.accounts().set_api_credentials(&user.username, &credentials).await?;
    Ok(Json(json!({ "status": "ok" })))
}

/// GET /api/business - the stored profile, or `{}`
pub async fn business_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    let profile = state.accounts().business(&user.username).await?;
    let body = match profile {
        Some(profile) => serde_json::to_value(profile).map_err(|e| {
            tracing::error!("JSON serialization error: {}", e);
            ApiError::internal_server_error("Failed to format response")
        })?,
        None => json!({}),
    };
    Ok(Json(body))
}

/// POST /api/business
pub async fn business_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<BusinessInput>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    state.accounts().set_business(&user.username, json_body(payload)?).await?;
    Ok(Json(json!({ "status": "ok" })))
}

/// GET /api/criteria
pub async fn criteria_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CriteriaView>, ApiError> {
    Ok(Json(state.accounts().criteria(&user.username).await?))
}

/// POST /api/criteria
pub async fn criteria_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<CriteriaInput>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let input = json_body(payload)?;
    state.accounts().set_criteria(&user.username, &input).await?;
    Ok(Json(json!({ "status": "ok" })))
}
