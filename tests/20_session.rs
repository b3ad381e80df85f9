mod common;

use anyhow::Result;
use reqwest::{header, Method, StatusCode};
use serde_json::{json, Value};

use common::TestServer;

#[tokio::test]
async fn service_endpoints() -> Result<()> {
    let server = TestServer::start().await?;

    let root: Value = server.client.get(server.url("/")).send().await?.json().await?;
    assert_eq!(root["name"], "Postcraft API");

    let res = server.client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_session() -> Result<()> {
    let server = TestServer::start().await?;

    for path in ["/api/account_status", "/api/posts", "/api/workflows", "/api/criteria"] {
        let res = server.client.get(server.url(path)).send().await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{}", path);
        assert_eq!(res.json::<Value>().await?["error"], "unauthorized");
    }

    let (status, _) = server.authed(Method::GET, "/api/account_status", "garbage", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn login_sets_cookie_and_token() -> Result<()> {
    let server = TestServer::start().await?;
    server.register("alice", "Premium").await?;

    let res = server
        .client
        .post(server.url("/login"))
        .json(&json!({ "username": "alice", "password": common::PASSWORD }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .expect("session cookie");
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));

    let session = cookie.split(';').next().unwrap_or_default().to_string();
    let res = server
        .client
        .get(server.url("/api/account_status"))
        .header(header::COOKIE, session)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let status: Value = res.json().await?;
    assert_eq!(status["user_name"], "alice");
    assert_eq!(status["total_token_limit"], 120);
    Ok(())
}

#[tokio::test]
async fn bad_credentials() -> Result<()> {
    let server = TestServer::start().await?;
    server.register("alice", "Standard").await?;

    let (status, body) = server
        .post_json("/login", json!({ "username": "alice", "password": "wrong" }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, _) = server
        .post_json("/login", json!({ "username": "nobody", "password": "wrong" }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn logout_clears_cookie() -> Result<()> {
    let server = TestServer::start().await?;
    let token = server.register("alice", "Standard").await?;

    let res = server.client.post(server.url("/api/logout")).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res.headers().get(header::SET_COOKIE).and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
    assert!(cookie.contains("Max-Age=0"));
    assert_eq!(res.json::<Value>().await?, json!({ "status": "logged_out" }));
    Ok(())
}
