use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::json_body;
use crate::middleware::AuthUser;
use crate::services::workflows::WorkflowInput;
use crate::state::AppState;
use crate::store::models::Workflow;

#[derive(Debug, Serialize)]
pub struct WorkflowView {
    pub id: Option<i64>,
    pub name: String,
    pub trigger: String,
    pub conditions: Value,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Workflow> for WorkflowView {
    fn from(workflow: Workflow) -> Self {
        Self {
            id: workflow.id,
            name: workflow.name,
            trigger: workflow.trigger,
            conditions: workflow.conditions,
            created_at: workflow.created_at,
        }
    }
}

/// GET /api/workflows - newest first
pub async fn workflows_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<WorkflowView>>, ApiError> {
    let workflows = state.workflows().list(&user.username).await?;
    Ok(Json(workflows.into_iter().map(WorkflowView::from).collect()))
}

/// POST /api/workflows
pub async fn workflows_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<WorkflowInput>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    state.workflows().create(&user.username, json_body(payload)?).await?;
    Ok(Json(json!({ "status": "created" })))
}

/// PUT /api/workflows/:id
pub async fn workflow_put(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    payload: Result<Json<WorkflowInput>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    state.workflows().update(&user.username, id, json_body(payload)?).await?;
    Ok(Json(json!({ "status": "updated" })))
}

/// DELETE /api/workflows/:id
pub async fn workflow_delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state.workflows().delete(&user.username, id).await?;
    Ok(Json(json!({ "status": "deleted" })))
}
