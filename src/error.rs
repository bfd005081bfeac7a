//! HTTP-facing error mapping.
//!
//! Status policy: not-found → 404; missing identifier header or empty
//! sheet → 500 schema error; anything from the Sheets client → 500 with a
//! generic message plus upstream details. Upstream failures are logged with
//! their payload before being surfaced.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::store::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            StoreError::NotFound(id) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("Customer not found: {id}") })),
            )
                .into_response(),
            err @ (StoreError::MissingKeyColumn(_) | StoreError::EmptySheet) => {
                log::error!("sheet schema error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "Sheet schema error",
                        "details": err.to_string(),
                    })),
                )
                    .into_response()
            }
            StoreError::Sheets(err) => {
                log::error!("spreadsheet request failed: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "Spreadsheet request failed",
                        "details": err.to_string(),
                    })),
                )
                    .into_response()
            }
        }
    }
}
