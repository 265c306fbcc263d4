use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::engine::EngineError;
use crate::payment::GatewayError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    BadGateway(String),
}

/// JSON body extractor whose rejections render as [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadGateway(msg) => {
                tracing::error!("payment provider failure: {msg}");
                (StatusCode::BAD_GATEWAY, msg)
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Unavailable { .. } => {
                ApiError::Conflict("Dates no longer available".into())
            }
            EngineError::UnknownListing(_) | EngineError::HoldNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            EngineError::LimitExceeded(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unauthenticated | GatewayError::Malformed(_) => {
                ApiError::BadRequest(format!("Webhook Error: {err}"))
            }
            GatewayError::Provider(_) => ApiError::BadGateway(err.to_string()),
        }
    }
}
