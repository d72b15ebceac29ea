//! Request handlers for the orchestration endpoints

use super::AppState;
use crate::error::Alive3dError;
use crate::pipeline::{TransformRequest, TransformResponse};
use crate::store::{ArtifactRecord, ArtifactStore};
use crate::upstream::{SegmentRequest, SegmentResponse};
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tokio_util::io::ReaderStream;

/// Service liveness summary
#[derive(Debug, Serialize)]
pub(super) struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Resolve the source image and forward the segmentation request upstream
pub(super) async fn segment(
    State(state): State<AppState>,
    Json(request): Json<SegmentRequest>,
) -> Result<Json<SegmentResponse>, Alive3dError> {
    state.orchestrator().segment(&request).await.map(Json)
}

/// Run the full erase-and-synthesize pipeline
pub(super) async fn transform_to_3d_alive(
    State(state): State<AppState>,
    Json(request): Json<TransformRequest>,
) -> Result<Json<TransformResponse>, Alive3dError> {
    let outcome = state.orchestrator().transform(&request).await?;
    Ok(Json(outcome.response))
}

/// One artifact entry in the thumbnail listing
#[derive(Debug, Serialize)]
pub(super) struct ThumbnailEntry {
    id: String,
    url: String,
    prompt: String,
    timestamp: i64,
}

impl From<&ArtifactRecord> for ThumbnailEntry {
    fn from(record: &ArtifactRecord) -> Self {
        Self {
            id: record.id.clone(),
            url: record.url.clone(),
            prompt: record
                .prompt
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
            timestamp: record.timestamp_ms,
        }
    }
}

/// Newest-first listing of persisted raster artifacts. Non-raster artifacts
/// (generated 3D assets) are stored alongside but never listed here.
pub(super) async fn thumbnails(
    State(state): State<AppState>,
) -> Result<Json<Vec<ThumbnailEntry>>, Alive3dError> {
    let records = state.orchestrator().store().list()?;
    Ok(Json(
        records
            .iter()
            .filter(|record| record.is_raster())
            .map(ThumbnailEntry::from)
            .collect(),
    ))
}

/// Stream one stored artifact with the MIME type implied by its extension
pub(super) async fn artifact(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, Alive3dError> {
    let path = state.orchestrator().store().resolve(&filename)?;
    let file = tokio::fs::File::open(&path).await?;
    let content_type = ArtifactStore::content_type_for(&filename);
    Ok((
        [(header::CONTENT_TYPE, content_type)],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}
