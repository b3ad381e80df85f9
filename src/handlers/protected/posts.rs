use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::json_body;
use crate::middleware::AuthUser;
use crate::services::posts::{CalendarEvent, PostUpdate};
use crate::state::AppState;

/// GET /api/posts - calendar events, earliest first
pub async fn posts_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<CalendarEvent>>, ApiError> {
    Ok(Json(state.posts().events(&user.username).await?))
}

/// PUT /api/posts/:id
pub async fn post_put(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    payload: Result<Json<PostUpdate>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    state.posts().update(&user.username, id, json_body(payload)?).await?;
    Ok(Json(json!({ "status": "updated" })))
}

/// DELETE /api/posts/:id
pub async fn post_delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state.posts().delete(&user.username, id).await?;
    Ok(Json(json!({ "status": "success" })))
}
