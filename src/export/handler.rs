//! HTTP handlers for the export API
//!
//! Provides 3 endpoints:
//! - POST /export        encode and store a keyframe payload
//! - GET  /download/:id  fetch a stored document
//! - POST /publish       encode and hand a payload to the publisher

use super::service::ExportService;
use super::types::{ApiError, ExportReceipt, ExportRequest, PublishRequest};
use crate::error::Error;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Shared state for export handlers
#[derive(Clone)]
pub struct ExportState {
    pub service: Arc<ExportService>,
}

/// Create the export router
pub fn export_router(state: ExportState) -> Router {
    Router::new()
        .route("/export", post(export_sequence))
        .route("/download/:id", get(download_artifact))
        .route("/publish", post(publish_sequence))
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /export
async fn export_sequence(
    State(state): State<ExportState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request: ExportRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(err) => return error_response(err),
    };

    match state.service.export(request).await {
        Ok(stored) => {
            let host = headers.get(header::HOST).and_then(|h| h.to_str().ok());
            let scheme = headers
                .get("x-forwarded-proto")
                .and_then(|h| h.to_str().ok());
            let receipt = ExportReceipt {
                success: true,
                download_url: state.service.download_url(stored.id, host, scheme),
                file_id: stored.id,
                file_name: stored.file_name,
            };
            (StatusCode::OK, Json(receipt)).into_response()
        }
        Err(err) => error_response(err),
    }
}

/// GET /download/:id
async fn download_artifact(State(state): State<ExportState>, Path(id): Path<String>) -> Response {
    match state.service.download(&id).await {
        Ok(download) => {
            let disposition = HeaderValue::from_str(&format!(
                "attachment; filename=\"{}\"",
                download.file_name
            ))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

            (
                StatusCode::OK,
                [
                    (
                        header::CONTENT_TYPE,
                        HeaderValue::from_static("application/octet-stream"),
                    ),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                download.document,
            )
                .into_response()
        }
        Err(err) => error_response(err),
    }
}

/// POST /publish
async fn publish_sequence(State(state): State<ExportState>, body: Bytes) -> Response {
    let request: PublishRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(err) => return error_response(err),
    };

    match state.service.publish(request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => error_response(err),
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Decode a JSON body, reporting any failure as invalid input
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> crate::Result<T> {
    serde_json::from_slice(body).map_err(|e| Error::InvalidInput(format!("Malformed request body: {}", e)))
}

/// Map a service error onto a status code and the API error envelope
pub fn error_response(err: Error) -> Response {
    let (status, body) = match err {
        Error::InvalidInput(msg) => (StatusCode::BAD_REQUEST, ApiError::bad_request(msg)),
        Error::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::not_found(msg)),
        Error::EncodingFailure(msg) => {
            tracing::error!("Encoding failed: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("ENCODING_FAILED", msg),
            )
        }
        Error::Publish(msg) => {
            tracing::warn!("Publish failed: {}", msg);
            (StatusCode::BAD_GATEWAY, ApiError::new("PUBLISH_FAILED", msg))
        }
        other => {
            tracing::error!("Request failed: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::internal("Internal server error"),
            )
        }
    };
    (status, Json(body)).into_response()
}
