//! Unified API router for kfseq
//!
//! Merges the export router with the health probe and wraps everything in
//! CORS, request tracing and a body size limit.
//!
//! ## Endpoint Map
//!
//! | Path            | Module | Description                        |
//! |-----------------|--------|------------------------------------|
//! | `/health`       | api    | Liveness probe                     |
//! | `/export`       | export | Encode and store a keyframe payload |
//! | `/download/:id` | export | Fetch a stored document            |
//! | `/publish`      | export | Encode and publish a payload       |

use crate::artifact::ArtifactStore;
use crate::config::ServerConfig;
use crate::export::{export_router, ExportState};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// State for the health probe
#[derive(Clone)]
pub struct HealthState {
    pub store: Arc<ArtifactStore>,
    pub started: Instant,
}

/// Health probe response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub artifacts: usize,
}

/// Build the complete kfseq HTTP application
pub fn build_app(export_state: ExportState, started: Instant, config: &ServerConfig) -> Router {
    let health = HealthState {
        store: export_state.service.store().clone(),
        started,
    };

    Router::new()
        .route("/health", get(health_check))
        .with_state(health)
        .merge(export_router(export_state))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(&config.cors_origins))
}

// =============================================================================
// Root handlers
// =============================================================================

async fn health_check(State(state): State<HealthState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "online".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started.elapsed().as_secs(),
        artifacts: state.store.len().await,
    })
}

// =============================================================================
// CORS
// =============================================================================

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(parsed)
    }
}
