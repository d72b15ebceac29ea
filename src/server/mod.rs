//! HTTP server surface
//!
//! Thin axum layer over the [`PipelineOrchestrator`]: handlers deserialize
//! the wire types, delegate, and let [`Alive3dError`]'s response conversion
//! pick the status code. Middleware is permissive CORS (browser drawing
//! clients POST from arbitrary origins) plus per-request tracing.

mod routes;

use crate::error::{Alive3dError, Stage};
use crate::pipeline::PipelineOrchestrator;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::info;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<PipelineOrchestrator>,
}

impl AppState {
    #[must_use]
    pub fn new(orchestrator: Arc<PipelineOrchestrator>) -> Self {
        Self { orchestrator }
    }

    #[must_use]
    pub fn orchestrator(&self) -> &PipelineOrchestrator {
        &self.orchestrator
    }
}

/// Build the service router with all endpoints and middleware
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/segment", post(routes::segment))
        .route("/transform_to_3d_alive", post(routes::transform_to_3d_alive))
        .route("/Thumbnails", get(routes::thumbnails))
        .route("/generated_images/{filename}", get(routes::artifact))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Bind the address and serve requests until the task is stopped.
///
/// # Errors
///
/// Returns [`Alive3dError::Io`] when the address cannot be bound or the
/// accept loop fails.
pub async fn run(addr: SocketAddr, state: AppState) -> crate::error::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("alive3d server listening on {addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Wire shape of every error response
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<Stage>,
}

impl IntoResponse for Alive3dError {
    fn into_response(self) -> Response {
        let status = match &self {
            Alive3dError::Decode(_) | Alive3dError::EmptyMask | Alive3dError::InvalidConfig(_) => {
                StatusCode::BAD_REQUEST
            }
            Alive3dError::NotFound(_) => StatusCode::NOT_FOUND,
            Alive3dError::UpstreamService { .. } | Alive3dError::UpstreamUnavailable { .. } => {
                StatusCode::BAD_GATEWAY
            }
            Alive3dError::Image(_)
            | Alive3dError::Io(_)
            | Alive3dError::Persistence(_)
            | Alive3dError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            log::error!("Request failed: {self}");
        } else {
            log::warn!("Request rejected: {self}");
        }
        let body = ErrorBody {
            error: self.to_string(),
            kind: error_kind(&self),
            stage: self.stage(),
        };
        (status, Json(body)).into_response()
    }
}

fn error_kind(error: &Alive3dError) -> &'static str {
    match error {
        Alive3dError::InvalidConfig(_) => "invalid-config",
        Alive3dError::Image(_) => "image-error",
        Alive3dError::Io(_) => "io-error",
        Alive3dError::Decode(_) => "decode-error",
        Alive3dError::EmptyMask => "empty-mask",
        Alive3dError::UpstreamService { .. } => "upstream-error",
        Alive3dError::UpstreamUnavailable { .. } => "upstream-unavailable",
        Alive3dError::NotFound(_) => "not-found",
        Alive3dError::Persistence(_) => "persistence-error",
        Alive3dError::Internal(_) => "internal-error",
    }
}
