// Route handlers, split by access tier:
// public (no session) and protected (valid session token, /api/*)
pub mod protected;
pub mod public;

use axum::{extract::rejection::JsonRejection, Json};

use crate::error::ApiError;

/// Unwraps a JSON body, reporting malformed or incomplete bodies as 400
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}
