use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::{AppConfig, SecurityConfig, StoreBackend};
use crate::handlers::{protected, public};
use crate::middleware::session_auth_middleware;
use crate::notify;
use crate::services::GraphClient;
use crate::state::AppState;
use crate::store::{CredentialStore, DatabaseManager, MemoryStore, PgStore};

/// Wires the store, notifier and graph client selected by `config`
pub async fn build_state(config: AppConfig) -> anyhow::Result<AppState> {
    let store: Arc<dyn CredentialStore> = match config.store {
        StoreBackend::Postgres => {
            let pool = DatabaseManager::connect(&config.database).await?;
            if config.database.run_migrations {
                DatabaseManager::migrate(&pool).await?;
            }
            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            warn!("using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let notifier = notify::from_config(&config.mail)?;
    let graph = GraphClient::new(&config.graph)?;
    Ok(AppState::new(store, notifier, graph, config))
}

pub fn app(state: AppState) -> Router {
    let security = state.config.security.clone();
    let body_limit = state.config.api.max_request_size_bytes;

    let mut router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        .nest("/api", protected_routes(state.clone()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http());

    if security.enable_cors {
        router = router.layer(cors_layer(&security));
    }

    router.with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(public::signup_post))
        .route("/send_otp", post(public::send_otp_post))
        .route("/login", post(public::login_post))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/logout", post(protected::logout_post))
        .route("/account_status", get(protected::account_status_get))
        .route("/config", get(protected::config_get).post(protected::config_post))
        .route("/business", get(protected::business_get).post(protected::business_post))
        .route("/criteria", get(protected::criteria_get).post(protected::criteria_post))
        .route("/posts", get(protected::posts_get))
        .route("/posts/:id", put(protected::post_put).delete(protected::post_delete))
        .route("/workflows", get(protected::workflows_get).post(protected::workflows_post))
        .route(
            "/workflows/:id",
            put(protected::workflow_put).delete(protected::workflow_delete),
        )
        .route("/analytics", get(protected::analytics_get).post(protected::analytics_get))
        .route("/insights", get(protected::insights_get).post(protected::insights_get))
        .route_layer(from_fn_with_state(state, session_auth_middleware))
}

/// Any origin when none are configured, otherwise the listed ones
fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": "Postcraft API",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": format!("{:?}", state.config.environment),
        "endpoints": {
            "public": ["/signup", "/send_otp", "/login", "/health"],
            "session": "/api/* (Bearer token or session cookie)",
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "timestamp": now, "store": "ok" })),
        ),
        Err(e) => {
            warn!("health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "error": "store unavailable",
                })),
            )
        }
    }
}

/// Binds `0.0.0.0:{port}` and serves until the process is stopped
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let bind_addr = format!("0.0.0.0:{}", state.config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Postcraft API listening on http://{}", bind_addr);
    axum::serve(listener, app(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    use crate::notify::LogNotifier;

    fn test_app() -> Router {
        let mut config = AppConfig::development();
        config.store = StoreBackend::Memory;
        let graph = GraphClient::new(&config.graph).unwrap();
        app(AppState::new(Arc::new(MemoryStore::new()), Arc::new(LogNotifier), graph, config))
    }

    async fn json_of(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_store() {
        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_of(response).await["store"], "ok");
    }

    #[tokio::test]
    async fn api_routes_need_a_session() {
        let response = test_app()
            .oneshot(Request::get("/api/workflows").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_of(response).await["error"], "unauthorized");
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let request = Request::post("/signup")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_of(response).await["error"].is_string());
    }
}
