use axum::{extract::State, Extension, Json};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::analytics::{AnalyticsReport, InsightsReport};
use crate::state::AppState;

/// GET|POST /api/analytics - profile and recent media from the graph API
pub async fn analytics_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<AnalyticsReport>, ApiError> {
    Ok(Json(state.analytics().analytics(&user.username).await?))
}

/// GET|POST /api/insights - 28-day reach series and engagement totals
pub async fn insights_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<InsightsReport>, ApiError> {
    Ok(Json(state.analytics().insights(&user.username).await?))
}
