//! Pipeline orchestration for the erase-and-synthesize workflow
//!
//! One request moves through a fixed linear stage sequence: decode the mask
//! against the resolved source image, refine it, inpaint the masked region
//! out of the scene, isolate the object for the 3D model, generate the
//! asset, then persist everything. The first failing stage aborts the run;
//! only persistence is best-effort.

use crate::config::AppConfig;
use crate::dataurl;
use crate::error::{Alive3dError, Result, Stage};
use crate::events::{ArtifactEvent, ArtifactEvents};
use crate::isolate;
use crate::mask;
use crate::padding::{self, PaddedPair};
use crate::store::{self, ArtifactRecord, ArtifactStore};
use crate::upstream::{
    GenerateModelRequest, GenerateModelResponse, InferenceClient, InpaintRequest, SegmentRequest,
    SegmentResponse,
};
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use instant::Instant;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{instrument, span, Level};

/// Artifact context used when the request carries none
const DEFAULT_CONTEXT: &str = "erased object";

/// Request for the full erase-and-synthesize pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformRequest {
    /// Source image: a data URL, an http(s) URL, or a stored-artifact
    /// reference (`/generated_images/<filename>` or a bare filename)
    pub image_url: String,
    /// Mask payload as base64, with or without a data-URL prefix
    pub mask_data: String,
    /// Optional context used to label persisted artifacts
    #[serde(default)]
    pub context: Option<String>,
}

/// Successful pipeline result carrying the full provenance chain
#[derive(Debug, Clone, Serialize)]
pub struct TransformResponse {
    /// Always `"success"`; failures travel as error responses instead
    pub status: String,
    /// Inpainted scene at the original dimensions, as a PNG data URL
    pub inpainted_image: String,
    /// Generated point-cloud asset as bare base64
    pub ply_data: String,
    /// Store identifier of the persisted inpainted scene, when the write
    /// succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inpainted_artifact: Option<String>,
    /// Store identifier of the persisted 3D asset, when the write succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_artifact: Option<String>,
}

/// Wall-clock duration of each pipeline stage in milliseconds
#[derive(Debug, Clone, Copy, Default)]
pub struct StageTimings {
    pub decode_ms: u64,
    pub refine_ms: u64,
    pub inpaint_ms: u64,
    pub isolate_ms: u64,
    pub generate_ms: u64,
    pub persist_ms: u64,
    pub total_ms: u64,
}

/// A completed pipeline run: the wire response plus its timings
#[derive(Debug, Clone)]
pub struct TransformOutcome {
    pub response: TransformResponse,
    pub timings: StageTimings,
}

/// Drives requests through the fixed stage sequence.
///
/// Holds the inference client behind the [`InferenceClient`] capability so
/// tests can substitute mocks, plus the artifact store and event hub shared
/// with the HTTP surface.
pub struct PipelineOrchestrator {
    config: AppConfig,
    client: Arc<dyn InferenceClient>,
    store: ArtifactStore,
    events: ArtifactEvents,
    fetcher: reqwest::Client,
}

impl PipelineOrchestrator {
    /// Assemble an orchestrator from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`Alive3dError::Internal`] if the HTTP client used for
    /// fetching remote source images cannot be constructed.
    pub fn new(
        config: AppConfig,
        client: Arc<dyn InferenceClient>,
        store: ArtifactStore,
        events: ArtifactEvents,
    ) -> Result<Self> {
        let fetcher = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Alive3dError::internal(format!("failed to build fetch client: {e}")))?;
        Ok(Self {
            config,
            client,
            store,
            events,
            fetcher,
        })
    }

    /// The artifact store backing this orchestrator
    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// The artifact event hub
    #[must_use]
    pub fn events(&self) -> &ArtifactEvents {
        &self.events
    }

    /// The active configuration
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the full erase-and-synthesize pipeline for one request.
    ///
    /// Stages run strictly in order and the first failure aborts the run;
    /// no later stage is invoked after an earlier one errors. Artifact
    /// persistence is the exception: a failed write is logged and reflected
    /// as a missing artifact id, never as a request failure.
    ///
    /// # Errors
    ///
    /// Propagates decode, refinement, isolation, and upstream errors from
    /// whichever stage failed first.
    #[instrument(skip(self, request), fields(source = source_kind(&request.image_url)))]
    pub async fn transform(&self, request: &TransformRequest) -> Result<TransformOutcome> {
        let total_start = Instant::now();
        let mut timings = StageTimings::default();

        let stage_start = Instant::now();
        let source = self.resolve_source(&request.image_url).await?;
        let mask_bytes = dataurl::parse(&request.mask_data)?;
        let decoded = mask::decode_mask(&mask_bytes, (source.width(), source.height()))?;
        timings.decode_ms = stage_start.elapsed().as_millis() as u64;
        debug!(
            "Decoded {:?}-encoded mask for {}x{} source",
            decoded.encoding,
            source.width(),
            source.height()
        );

        let stage_start = Instant::now();
        let refined = {
            let _span = span!(Level::DEBUG, "mask_refinement").entered();
            mask::refine(&decoded.mask, self.config.dilation_kernel)?
        };
        timings.refine_ms = stage_start.elapsed().as_millis() as u64;

        let stage_start = Instant::now();
        let inpainted = self.run_inpaint(&source, &refined).await?;
        timings.inpaint_ms = stage_start.elapsed().as_millis() as u64;

        let stage_start = Instant::now();
        let isolated = {
            let _span = span!(Level::DEBUG, "region_isolation").entered();
            isolate::isolate_region(&source, &refined, self.config.canvas_size)?
        };
        timings.isolate_ms = stage_start.elapsed().as_millis() as u64;

        let stage_start = Instant::now();
        let generated = self.run_generate(isolated).await?;
        let ply_bytes = dataurl::parse(&generated.ply_data).map_err(|e| {
            Alive3dError::UpstreamService {
                stage: Stage::ModelGeneration,
                status: 200,
                body: format!("ply_data payload is not valid base64: {e}"),
            }
        })?;
        timings.generate_ms = stage_start.elapsed().as_millis() as u64;

        let stage_start = Instant::now();
        let inpainted_png = dataurl::image_to_png_bytes(&DynamicImage::ImageRgb8(inpainted))?;
        let context = request.context.as_deref().unwrap_or(DEFAULT_CONTEXT);
        let (inpainted_record, model_record) =
            self.persist_artifacts(context, &inpainted_png, &ply_bytes);
        timings.persist_ms = stage_start.elapsed().as_millis() as u64;
        timings.total_ms = total_start.elapsed().as_millis() as u64;

        info!(
            "Pipeline complete in {}ms (decode {}ms, refine {}ms, inpaint {}ms, isolate {}ms, generate {}ms, persist {}ms)",
            timings.total_ms,
            timings.decode_ms,
            timings.refine_ms,
            timings.inpaint_ms,
            timings.isolate_ms,
            timings.generate_ms,
            timings.persist_ms
        );

        Ok(TransformOutcome {
            response: TransformResponse {
                status: "success".to_string(),
                inpainted_image: dataurl::encode(&inpainted_png, dataurl::PNG_MIME),
                ply_data: generated.ply_data,
                inpainted_artifact: inpainted_record.map(|r| r.id),
                model_artifact: model_record.map(|r| r.id),
            },
            timings,
        })
    }

    /// Resolve the caller's image reference locally and forward the
    /// segmentation request with the image inlined as a data URL. Points and
    /// labels pass through verbatim, as does the upstream response.
    ///
    /// # Errors
    ///
    /// Returns resolution errors for the image reference and upstream errors
    /// from the segmentation service.
    #[instrument(skip(self, request), fields(points = request.input_points.len()))]
    pub async fn segment(&self, request: &SegmentRequest) -> Result<SegmentResponse> {
        let image = self.resolve_source(&request.image_url).await?;
        debug!(
            "Forwarding segmentation request for {}x{} image",
            image.width(),
            image.height()
        );
        let forwarded = SegmentRequest {
            image_url: dataurl::image_to_data_url(&image)?,
            input_points: request.input_points.clone(),
            input_labels: request.input_labels.clone(),
        };
        self.client.segment(&forwarded).await
    }

    /// Resolve an image reference: data URLs decode in place, stored-artifact
    /// references read from the store, and http(s) URLs are fetched with the
    /// configured timeout.
    async fn resolve_source(&self, reference: &str) -> Result<DynamicImage> {
        if reference.starts_with("data:") {
            return dataurl::parse_image(reference);
        }
        if let Some(name) = reference.strip_prefix(store::ARTIFACT_URL_PREFIX) {
            let bytes = self.store.get(name.trim_start_matches('/'))?;
            return dataurl::decode_image(&bytes);
        }
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return self.fetch_remote(reference).await;
        }
        // Anything else is treated as a bare artifact filename
        let bytes = self.store.get(reference)?;
        dataurl::decode_image(&bytes)
    }

    async fn fetch_remote(&self, url: &str) -> Result<DynamicImage> {
        debug!("Fetching source image from {url}");
        let response = self.fetcher.get(url).send().await.map_err(|e| {
            Alive3dError::decode(format!("failed to fetch source image '{url}': {e}"))
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(Alive3dError::decode(format!(
                "source image fetch '{url}' returned status {status}"
            )));
        }
        let bytes = response.bytes().await.map_err(|e| {
            Alive3dError::decode(format!("failed to read source image body from '{url}': {e}"))
        })?;
        dataurl::decode_image(&bytes)
    }

    /// Pad, call the inpainting service, and crop the result back to the
    /// original dimensions
    #[instrument(skip_all, fields(width = source.width(), height = source.height()))]
    async fn run_inpaint(&self, source: &DynamicImage, refined: &GrayImage) -> Result<RgbImage> {
        let rgb = source.to_rgb8();
        let PaddedPair {
            image: padded_image,
            mask: padded_mask,
            original_dimensions,
        } = padding::pad_to_stride(&rgb, Some(refined), self.config.stride)?;
        let padded_mask =
            padded_mask.ok_or_else(|| Alive3dError::internal("mask dropped during padding"))?;

        let request = InpaintRequest {
            image: dataurl::image_to_data_url(&DynamicImage::ImageRgb8(padded_image))?,
            mask: dataurl::image_to_data_url(&DynamicImage::ImageLuma8(padded_mask))?,
        };
        let response = self.client.inpaint(&request).await?;
        ensure_success(Stage::Inpainting, &response.status)?;

        let inpainted = dataurl::parse_image(&response.inpainted_image).map_err(|e| {
            Alive3dError::UpstreamService {
                stage: Stage::Inpainting,
                status: 200,
                body: format!("inpainted_image payload is not a decodable image: {e}"),
            }
        })?;
        padding::unpad(&inpainted.to_rgb8(), original_dimensions)
    }

    #[instrument(skip_all)]
    async fn run_generate(&self, isolated: RgbaImage) -> Result<GenerateModelResponse> {
        let request = GenerateModelRequest {
            image: dataurl::image_to_data_url(&DynamicImage::ImageRgba8(isolated))?,
        };
        let response = self.client.generate_model(&request).await?;
        ensure_success(Stage::ModelGeneration, &response.status)?;
        Ok(response)
    }

    fn persist_artifacts(
        &self,
        context: &str,
        inpainted_png: &[u8],
        ply_bytes: &[u8],
    ) -> (Option<ArtifactRecord>, Option<ArtifactRecord>) {
        let inpainted =
            self.persist_one(inpainted_png, dataurl::PNG_MIME, context, "inpainted scene");
        let model = self.persist_one(ply_bytes, store::PLY_MIME, context, "3D asset");
        (inpainted, model)
    }

    fn persist_one(
        &self,
        bytes: &[u8],
        content_type: &str,
        context: &str,
        what: &str,
    ) -> Option<ArtifactRecord> {
        match self.store.put(bytes, content_type, context) {
            Ok(record) => {
                debug!("Persisted {what} as {}", record.filename);
                self.events.publish(ArtifactEvent::from(&record));
                Some(record)
            }
            Err(e) => {
                warn!("Failed to persist {what}: {e}");
                None
            }
        }
    }
}

// A 2xx answer whose body marks failure is still a failed stage
fn ensure_success(stage: Stage, status: &str) -> Result<()> {
    if status == "success" {
        Ok(())
    } else {
        Err(Alive3dError::UpstreamService {
            stage,
            status: 200,
            body: format!("service reported status '{status}'"),
        })
    }
}

fn source_kind(reference: &str) -> &'static str {
    if reference.starts_with("data:") {
        "data-url"
    } else if reference.starts_with("http://") || reference.starts_with("https://") {
        "http"
    } else {
        "artifact"
    }
}
