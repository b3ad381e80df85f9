mod common;

use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::json;

use common::TestServer;

#[tokio::test]
async fn api_credentials_round_trip() -> Result<()> {
    let server = TestServer::start().await?;
    let token = server.register("alice", "Standard").await?;

    let (status, body) = server.authed(Method::GET, "/api/config", &token, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inst_access_token"], "");

    let credentials = json!({
        "inst_access_token": "tok",
        "ig_user_id": "1784",
        "cloudinary_cloud_name": "cloud",
        "cloudinary_api_key": "key",
        "cloudinary_api_secret": "secret"
    });
    let (status, body) = server.authed(Method::POST, "/api/config", &token, Some(credentials.clone())).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    let (_, body) = server.authed(Method::GET, "/api/config", &token, None).await?;
    assert_eq!(body, credentials);

    let (status, _) = server
        .authed(Method::POST, "/api/config", &token, Some(json!({ "inst_access_token": "only" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn business_profile_upserts() -> Result<()> {
    let server = TestServer::start().await?;
    let token = server.register("alice", "Standard").await?;

    let (_, body) = server.authed(Method::GET, "/api/business", &token, None).await?;
    assert_eq!(body, json!({}));

    for introduction in ["Bakery", "Bakery and cafe"] {
        let input = json!({
            "business_name": "Crumbs",
            "business_introduction": introduction,
            "products_services": "bread"
        });
        let (status, _) = server.authed(Method::POST, "/api/business", &token, Some(input)).await?;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = server.authed(Method::GET, "/api/business", &token, None).await?;
    assert_eq!(body["user_name"], "alice");
    assert_eq!(body["business_introduction"], "Bakery and cafe");
    Ok(())
}

#[tokio::test]
async fn criteria_defaults_and_updates() -> Result<()> {
    let server = TestServer::start().await?;
    let token = server.register("alice", "Standard").await?;

    let (_, body) = server.authed(Method::GET, "/api/criteria", &token, None).await?;
    assert_eq!(body, json!({ "message": "No criteria set yet" }));

    let input = json!({ "num_of_posts": 3, "frequency": "", "dontuseuntil": "", "posting_hours": "09:00" });
    let (status, body) = server.authed(Method::POST, "/api/criteria", &token, Some(input)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    let (_, body) = server.authed(Method::GET, "/api/criteria", &token, None).await?;
    assert_eq!(body["num_of_posts"], 3);
    assert_eq!(body["frequency"], "Daily");
    assert_eq!(body["dontuseuntil"], 90);
    assert_eq!(body["posting_hours"], "09:00");
    Ok(())
}
