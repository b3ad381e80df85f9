mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::TestServer;
use postcraft_api::filter::FilterData;
use postcraft_api::store::{CredentialStore, Table};

fn signup_body(username: &str, email: &str, plan: &str) -> serde_json::Value {
    json!({ "username": username, "email": email, "password": common::PASSWORD, "plan": plan })
}

#[tokio::test]
async fn signup_then_verify_creates_account() -> Result<()> {
    let server = TestServer::start().await?;

    let (status, body) = server.post_json("/signup", signup_body("alice", "a@x.com", "Standard")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "username": "alice" }));
    assert_eq!(server.store.len(Table::PendingSignups).await, 1);

    let code = server.codes.latest_for("alice").expect("code sent");
    let (status, body) = server.post_json("/send_otp", json!({ "username": "alice", "otp": code })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "verified" }));

    assert_eq!(server.store.len(Table::PendingSignups).await, 0);
    let accounts = server
        .store
        .select(Table::Accounts, FilterData::matching(json!({ "user_name": "alice" })))
        .await?;
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0]["total_token_limit"], 60);
    assert_eq!(accounts[0]["tokens_used"], 0);
    assert_eq!(accounts[0]["is_trial"], false);
    assert_ne!(accounts[0]["password"], common::PASSWORD);
    Ok(())
}

#[tokio::test]
async fn wrong_code_keeps_pending_signup() -> Result<()> {
    let server = TestServer::start().await?;
    server.post_json("/signup", signup_body("alice", "a@x.com", "Premium")).await?;

    let code = server.codes.latest_for("alice").expect("code sent");
    let wrong = if code == "999999" { "100000" } else { "999999" };
    let (status, body) = server.post_json("/send_otp", json!({ "username": "alice", "otp": wrong })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "error", "error": "Invalid OTP" }));

    assert_eq!(server.store.len(Table::PendingSignups).await, 1);
    assert_eq!(server.store.len(Table::Accounts).await, 0);
    Ok(())
}

#[tokio::test]
async fn numeric_otp_is_accepted() -> Result<()> {
    let server = TestServer::start().await?;
    server.post_json("/signup", signup_body("alice", "a@x.com", "Trial - 7 posts")).await?;

    let code: u64 = server.codes.latest_for("alice").expect("code sent").parse()?;
    let (_, body) = server.post_json("/send_otp", json!({ "username": "alice", "otp": code })).await?;
    assert_eq!(body["status"], "verified");
    Ok(())
}

#[tokio::test]
async fn unknown_pending_user() -> Result<()> {
    let server = TestServer::start().await?;
    let (status, body) = server.post_json("/send_otp", json!({ "username": "ghost", "otp": "123456" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "error", "error": "User not found" }));
    Ok(())
}

#[tokio::test]
async fn repeated_signup_keeps_only_latest_code() -> Result<()> {
    let server = TestServer::start().await?;
    server.post_json("/signup", signup_body("bob", "b@x.com", "Trial - 7 posts")).await?;
    server.post_json("/signup", signup_body("bob", "b@x.com", "Trial - 7 posts")).await?;
    assert_eq!(server.codes.count(), 2);
    assert_eq!(server.store.len(Table::PendingSignups).await, 1);

    let latest = server.codes.latest_for("bob").expect("code sent");
    let (_, body) = server.post_json("/send_otp", json!({ "username": "bob", "otp": latest })).await?;
    assert_eq!(body["status"], "verified");
    Ok(())
}

#[tokio::test]
async fn existing_identity_is_rejected() -> Result<()> {
    let server = TestServer::start().await?;
    server.register("alice", "Standard").await?;

    let (status, body) = server.post_json("/signup", signup_body("alice", "other@x.com", "Standard")).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username / email already taken");

    let (status, _) = server
        .post_json("/signup", signup_body("someone", "alice@example.com", "Standard"))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(server.store.len(Table::PendingSignups).await, 0);
    Ok(())
}

#[tokio::test]
async fn invalid_input_is_rejected() -> Result<()> {
    let server = TestServer::start().await?;

    let (status, _) = server.post_json("/signup", signup_body("alice", "not-an-email", "Standard")).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server.post_json("/signup", signup_body("alice", "a@x.com", "Enterprise")).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server.post_json("/signup", json!({ "username": "alice" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(server.codes.count(), 0);
    Ok(())
}

#[tokio::test]
async fn padded_username_verifies_as_submitted() -> Result<()> {
    let server = TestServer::start().await?;

    let (status, body) = server.post_json("/signup", signup_body("alice ", "a@x.com", "Standard")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");

    let code = server.codes.latest_for("alice").expect("code sent");
    let (status, body) = server.post_json("/send_otp", json!({ "username": "alice ", "otp": code })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "verified" }));
    assert_eq!(server.store.len(Table::Accounts).await, 1);
    Ok(())
}
