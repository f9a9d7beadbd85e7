//! Failure-to-status mapping for the ingest front-end (spec §4.6, §7),
//! grounded on `ferrex-server::errors::AppError`'s `IntoResponse` shape.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use vitals_core::error::PhysioError;

#[derive(Debug)]
pub struct AppError(pub PhysioError);

impl From<PhysioError> for AppError {
    fn from(err: PhysioError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            PhysioError::Validation(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "field": e.field, "reason": e.reason }),
            ),
            PhysioError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "detail": "rate limit exceeded" }),
            ),
            // Reaches the top level only if a unique-index race is detected
            // after the idempotency cache already missed; success-equivalent
            // per spec §4.3/§4.6.
            PhysioError::DuplicatePersisted => {
                return (
                    StatusCode::OK,
                    Json(json!({ "status": "ignored", "detail": "duplicate_event_cache" })),
                )
                    .into_response();
            }
            PhysioError::StorageUnavailable(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "detail": msg }))
            }
            PhysioError::StreamUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, json!({ "detail": msg }))
            }
            PhysioError::ModelUnloadable(msg) | PhysioError::StreamReadError(msg) | PhysioError::Processing(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "detail": msg }))
            }
        };

        (status, Json(json!({ "error": detail }))).into_response()
    }
}
