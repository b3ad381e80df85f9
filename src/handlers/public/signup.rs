use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::json_body;
use crate::services::signup::SignupError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub plan: String,
}

/// Codes arrive as text or as a JSON number; numbers compare by their
/// decimal rendering
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OtpCode {
    Text(String),
    Number(serde_json::Number),
}

impl OtpCode {
    pub fn as_code(&self) -> String {
        match self {
            OtpCode::Text(s) => s.clone(),
            OtpCode::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub username: String,
    pub otp: OtpCode,
}

/// POST /signup - record a pending signup and email its code
pub async fn signup_post(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let req = json_body(payload)?;
    let username = state
        .signup()
        .initiate_signup(req.username.trim(), req.email.trim(), &req.password, &req.plan)
        .await?;

    Ok(Json(json!({ "status": "ok", "username": username })))
}

/// POST /send_otp - confirm the emailed code and provision the account.
///
/// Unknown users and wrong codes answer 200 with `"status": "error"`.
pub async fn send_otp_post(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let req = json_body(payload)?;

    match state.signup().verify_signup(req.username.trim(), &req.otp.as_code()).await {
        Ok(_) => Ok(Json(json!({ "status": "verified" }))),
        Err(err @ (SignupError::NotFound | SignupError::InvalidCode)) => {
            Ok(Json(json!({ "status": "error", "error": err.to_string() })))
        }
        Err(other) => Err(other.into()),
    }
}
