//! Upstream inference service clients
//!
//! Each heavyweight model (segmentation, inpainting, image-to-3D) runs as an
//! independently deployed HTTP service. The orchestrator talks to them
//! through the [`InferenceClient`] capability so tests can substitute mocks
//! without any network involvement. Binary payloads travel as base64 data
//! URLs in both directions.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod http;
#[cfg(test)]
pub(crate) mod mock;

pub use http::HttpInferenceClient;

/// Request for the interactive segmentation service.
///
/// Point coordinates are normalized to `0..1`; labels mark each point as
/// foreground (1) or background (0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRequest {
    /// Source image as a data URL
    pub image_url: String,
    /// Click locations, normalized `[x, y]` pairs
    pub input_points: Vec<[f64; 2]>,
    /// Foreground/background label per point
    pub input_labels: Vec<i32>,
}

/// One mask candidate produced by the segmentation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskCandidate {
    /// Mask raster as base64 PNG
    pub mask: String,
    /// Model confidence for this candidate
    pub score: f64,
    /// Optional composite preview as base64 PNG
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visualization: Option<String>,
    /// Normalized bounding box of the candidate, when the service computed one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<NormalizedBbox>,
}

/// Axis-aligned box in normalized coordinates, field names matching the
/// segmentation service's camelCase wire format
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBbox {
    #[serde(rename = "minX")]
    pub min_x: f64,
    #[serde(rename = "minY")]
    pub min_y: f64,
    #[serde(rename = "maxX")]
    pub max_x: f64,
    #[serde(rename = "maxY")]
    pub max_y: f64,
}

/// Response from the segmentation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentResponse {
    /// Upstream status marker, `"success"` on the happy path
    pub status: String,
    /// Mask candidates, best first
    pub masks: Vec<MaskCandidate>,
    /// Opaque upstream diagnostics, passed through untouched
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub debug: serde_json::Value,
}

/// Request for the inpainting service; image and mask are both data URLs
/// with stride-aligned dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InpaintRequest {
    /// Padded source image as a data URL
    pub image: String,
    /// Padded binary mask as a data URL
    pub mask: String,
}

/// Response from the inpainting service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InpaintResponse {
    /// Upstream status marker
    pub status: String,
    /// Inpainted result as a data URL, still at padded dimensions
    pub inpainted_image: String,
}

/// Request for the image-to-3D service; expects the object pre-isolated and
/// centered on the fixed-size transparent canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateModelRequest {
    /// Isolated object as a data URL
    pub image: String,
}

/// Response from the image-to-3D service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateModelResponse {
    /// Upstream status marker
    pub status: String,
    /// Generated point-cloud asset as bare base64
    pub ply_data: String,
    /// Filename suggested by the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Uniform capability for invoking the external inference stages.
///
/// Implementations must be cheap to clone behind an `Arc` and safe to share
/// across concurrent requests; the HTTP implementation holds one pooled
/// client for all three stages.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Invoke the interactive segmentation service
    async fn segment(&self, request: &SegmentRequest) -> Result<SegmentResponse>;

    /// Invoke the inpainting service
    async fn inpaint(&self, request: &InpaintRequest) -> Result<InpaintResponse>;

    /// Invoke the image-to-3D generation service
    async fn generate_model(&self, request: &GenerateModelRequest) -> Result<GenerateModelResponse>;
}
