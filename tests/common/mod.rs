#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{extract::Path, routing::get, Json, Router};
use reqwest::StatusCode;
use serde_json::{json, Value};

use postcraft_api::config::{AppConfig, StoreBackend};
use postcraft_api::notify::{Notifier, NotifyError};
use postcraft_api::services::GraphClient;
use postcraft_api::store::{CredentialStore, MemoryStore, Row, Table};
use postcraft_api::{app, AppState};

pub const PASSWORD: &str = "correct-horse-1";

/// Keeps every verification code so tests can complete signups
#[derive(Debug, Default)]
pub struct CapturedCodes {
    codes: Mutex<Vec<(String, String)>>,
}

impl CapturedCodes {
    pub fn latest_for(&self, username: &str) -> Option<String> {
        let codes = self.codes.lock().unwrap();
        codes.iter().rev().find(|(user, _)| user == username).map(|(_, code)| code.clone())
    }

    pub fn count(&self) -> usize {
        self.codes.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for CapturedCodes {
    async fn send_verification_code(&self, _to_email: &str, code: &str, username: &str) -> Result<(), NotifyError> {
        self.codes.lock().unwrap().push((username.to_string(), code.to_string()));
        Ok(())
    }
}

/// In-process server on a free port, backed by the in-memory store
pub struct TestServer {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub codes: Arc<CapturedCodes>,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with_graph(None).await
    }

    /// `graph_base_url` points the analytics client at a mock graph API
    pub async fn start_with_graph(graph_base_url: Option<String>) -> Result<Self> {
        let mut config = AppConfig::development();
        config.store = StoreBackend::Memory;
        config.security.jwt_secret = "integration-secret".to_string();
        if let Some(url) = graph_base_url {
            config.graph.base_url = url;
        }

        let store = Arc::new(MemoryStore::new());
        let codes = Arc::new(CapturedCodes::default());
        let graph = GraphClient::new(&config.graph)?;
        let state = AppState::new(store.clone(), codes.clone(), graph, config);

        let base_url = spawn(app(state)).await?;
        let server = Self {
            base_url,
            store,
            codes,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn post_json(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self.client.post(self.url(path)).json(&body).send().await?;
        let status = res.status();
        Ok((status, res.json().await?))
    }

    pub async fn authed(&self, method: reqwest::Method, path: &str, token: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut req = self.client.request(method, self.url(path)).bearer_auth(token);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await?;
        let status = res.status();
        Ok((status, res.json().await?))
    }

    /// Signs up, verifies and logs in; returns the session token
    pub async fn register(&self, username: &str, plan: &str) -> Result<String> {
        let (status, body) = self
            .post_json(
                "/signup",
                json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": PASSWORD,
                    "plan": plan,
                }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "signup failed: {} {}", status, body);

        let code = self.codes.latest_for(username).context("no verification code captured")?;
        let (status, body) = self.post_json("/send_otp", json!({ "username": username, "otp": code })).await?;
        anyhow::ensure!(body["status"] == "verified", "verification failed: {} {}", status, body);

        self.login(username).await
    }

    pub async fn login(&self, username: &str) -> Result<String> {
        let (status, body) = self
            .post_json("/login", json!({ "username": username, "password": PASSWORD }))
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed: {} {}", status, body);
        body["token"].as_str().map(str::to_string).context("login response without token")
    }

    pub async fn seed(&self, table: Table, row: Value) -> Result<Row> {
        let row = row.as_object().cloned().context("seed row must be an object")?;
        Ok(self.store.insert(table, row).await?)
    }
}

async fn spawn(router: Router) -> Result<String> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(format!("http://127.0.0.1:{}", port))
}

/// Minimal graph API double serving fixed profile, media and insights data
pub async fn mock_graph() -> Result<String> {
    async fn profile(Path(id): Path<String>) -> Json<Value> {
        Json(json!({ "id": id, "username": "brand", "followers_count": 1200, "media_count": 3 }))
    }

    async fn media() -> Json<Value> {
        Json(json!({
            "data": [
                { "id": "m1", "like_count": 10, "comments_count": 2 },
                { "id": "m2", "like_count": 5, "comments_count": 1 },
                { "id": "m3" }
            ]
        }))
    }

    async fn insights() -> Json<Value> {
        Json(json!({
            "data": [{
                "name": "reach",
                "values": [
                    { "value": 100, "end_time": "2024-05-01T07:00:00+0000" },
                    { "value": 140, "end_time": "2024-05-02T07:00:00+0000" }
                ]
            }]
        }))
    }

    let router = Router::new()
        .route("/v19.0/:id", get(profile))
        .route("/v19.0/:id/media", get(media))
        .route("/v19.0/:id/insights", get(insights));
    spawn(router).await
}
