#![allow(clippy::too_many_lines)]

//! # alive3d
//!
//! Orchestration service that erases a masked object from a photo and
//! synthesizes a 3D asset in its place. The heavyweight models
//! (interactive segmentation, inpainting, image-to-3D) run as independent
//! HTTP services; this crate owns everything between them: mask decoding
//! and refinement, stride padding, region isolation, artifact persistence,
//! and the HTTP surface clients talk to.
//!
//! ## Pipeline
//!
//! One request moves through a fixed linear sequence, aborting on the
//! first failing stage:
//!
//! 1. Resolve the source image and decode the drawn mask against it
//! 2. Binarize and dilate the mask so inpainting covers object fringes
//! 3. Pad to the inpainting model's stride, inpaint, crop back
//! 4. Isolate the masked object on a fixed-size transparent canvas
//! 5. Generate the 3D asset from the isolated object
//! 6. Persist the inpainted scene and the asset (best effort)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use alive3d::{
//!     AppConfig, ArtifactEvents, ArtifactStore, HttpInferenceClient, PipelineOrchestrator,
//!     TransformRequest,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AppConfig::from_env()?;
//! let store = ArtifactStore::new(&config.artifact_dir)?;
//! let client = Arc::new(HttpInferenceClient::from_config(&config)?);
//! let orchestrator =
//!     PipelineOrchestrator::new(config, client, store, ArtifactEvents::default())?;
//!
//! let outcome = orchestrator
//!     .transform(&TransformRequest {
//!         image_url: "/generated_images/scene__1716400000_ab12.png".to_string(),
//!         mask_data: std::fs::read_to_string("mask.b64")?,
//!         context: Some("red armchair".to_string()),
//!     })
//!     .await?;
//! println!("generated {} bytes of base64 PLY", outcome.response.ply_data.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! - `server` (default): axum HTTP surface and the `alive3d-server` binary
//! - `webp-support` (default): WebP decoding for sources and masks
//!
//! To embed the pipeline without the HTTP layer:
//!
//! ```toml
//! [dependencies]
//! alive3d = { version = "0.2", default-features = false }
//! ```
//!
//! The inference client sits behind the [`InferenceClient`] trait, so
//! embedders and tests can substitute their own transport for the three
//! model services.

pub mod config;
pub mod dataurl;
pub mod error;
pub mod events;
pub mod isolate;
pub mod mask;
pub mod padding;
pub mod pipeline;
#[cfg(feature = "server")]
pub mod server;
pub mod store;
#[cfg(feature = "server")]
pub mod tracing_config;
pub mod upstream;

use std::sync::Arc;

// Public API exports
pub use config::{AppConfig, AppConfigBuilder, UpstreamEndpoints};
pub use error::{Alive3dError, Result, Stage};
pub use events::{ArtifactEvent, ArtifactEvents};
pub use mask::{DecodedMask, MaskEncoding};
pub use padding::PaddedPair;
pub use pipeline::{
    PipelineOrchestrator, StageTimings, TransformOutcome, TransformRequest, TransformResponse,
};
pub use store::{ArtifactRecord, ArtifactStore};
pub use upstream::{
    GenerateModelRequest, GenerateModelResponse, HttpInferenceClient, InferenceClient,
    InpaintRequest, InpaintResponse, MaskCandidate, NormalizedBbox, SegmentRequest,
    SegmentResponse,
};

/// Run the erase-and-synthesize pipeline once with default wiring.
///
/// Builds an HTTP inference client, an artifact store, and an orchestrator
/// from the given configuration, then processes the single request. Embedders
/// serving many requests should construct a [`PipelineOrchestrator`] once and
/// reuse it instead.
///
/// # Arguments
///
/// * `config` - Service configuration naming the upstream endpoints
/// * `request` - The source image reference and mask payload to process
///
/// # Errors
///
/// Propagates construction errors and whichever pipeline stage failed first.
///
/// # Examples
///
/// ```rust,no_run
/// use alive3d::{transform_with_config, AppConfig, TransformRequest};
///
/// # async fn example(image_url: String, mask_data: String) -> anyhow::Result<()> {
/// let outcome = transform_with_config(
///     AppConfig::from_env()?,
///     &TransformRequest {
///         image_url,
///         mask_data,
///         context: None,
///     },
/// )
/// .await?;
/// assert_eq!(outcome.response.status, "success");
/// # Ok(())
/// # }
/// ```
pub async fn transform_with_config(
    config: AppConfig,
    request: &TransformRequest,
) -> Result<TransformOutcome> {
    let store = ArtifactStore::new(&config.artifact_dir)?;
    let client = Arc::new(HttpInferenceClient::from_config(&config)?);
    let orchestrator =
        PipelineOrchestrator::new(config, client, store, ArtifactEvents::default())?;
    orchestrator.transform(request).await
}
