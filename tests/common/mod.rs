//! Shared builders for the integration suites
#![allow(dead_code)]

use alive3d::upstream::{
    GenerateModelRequest, GenerateModelResponse, InferenceClient, InpaintRequest, InpaintResponse,
    MaskCandidate, NormalizedBbox, SegmentRequest, SegmentResponse,
};
use alive3d::{
    dataurl, Alive3dError, AppConfig, ArtifactEvents, ArtifactStore, PipelineOrchestrator, Result,
    Stage, TransformRequest,
};
use async_trait::async_trait;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Minimal valid ASCII point cloud used as the canned generation result
pub const PLY_FIXTURE: &[u8] = b"ply\nformat ascii 1.0\nelement vertex 2\nproperty float x\nproperty float y\nproperty float z\nend_header\n0.0 0.0 0.0\n1.0 1.0 1.0\n";

/// What a scripted stage does when invoked
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Succeed,
    FailStatus(u16, &'static str),
    Unavailable,
}

/// Scripted inference client recording every stage invocation
pub struct RecordingClient {
    calls: Mutex<Vec<&'static str>>,
    last_segment_image: Mutex<Option<String>>,
    segment: Behavior,
    inpaint: Behavior,
    generate: Behavior,
}

impl RecordingClient {
    pub fn succeeding() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            last_segment_image: Mutex::new(None),
            segment: Behavior::Succeed,
            inpaint: Behavior::Succeed,
            generate: Behavior::Succeed,
        }
    }

    pub fn with_inpaint(mut self, behavior: Behavior) -> Self {
        self.inpaint = behavior;
        self
    }

    pub fn with_generate(mut self, behavior: Behavior) -> Self {
        self.generate = behavior;
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, stage: &str) -> usize {
        self.calls().iter().filter(|name| **name == stage).count()
    }

    /// The `image_url` the segmentation service last received
    pub fn last_segment_image(&self) -> Option<String> {
        self.last_segment_image.lock().unwrap().clone()
    }

    fn enact(&self, stage: Stage, behavior: Behavior) -> Result<()> {
        self.calls.lock().unwrap().push(stage.as_str());
        match behavior {
            Behavior::Succeed => Ok(()),
            Behavior::FailStatus(status, body) => Err(Alive3dError::UpstreamService {
                stage,
                status,
                body: body.to_string(),
            }),
            Behavior::Unavailable => Err(Alive3dError::UpstreamUnavailable {
                stage,
                reason: "connection refused".to_string(),
            }),
        }
    }
}

#[async_trait]
impl InferenceClient for RecordingClient {
    async fn segment(&self, request: &SegmentRequest) -> Result<SegmentResponse> {
        self.enact(Stage::Segmentation, self.segment)?;
        *self.last_segment_image.lock().unwrap() = Some(request.image_url.clone());

        let image = dataurl::parse_image(&request.image_url)?;
        let mask = DynamicImage::ImageLuma8(GrayImage::from_pixel(
            image.width(),
            image.height(),
            Luma([255]),
        ));
        Ok(SegmentResponse {
            status: "success".to_string(),
            masks: vec![MaskCandidate {
                mask: dataurl::encode_bare(&dataurl::image_to_png_bytes(&mask)?),
                score: 0.91,
                visualization: None,
                bbox: Some(NormalizedBbox {
                    min_x: 0.1,
                    min_y: 0.2,
                    max_x: 0.7,
                    max_y: 0.8,
                }),
            }],
            debug: serde_json::json!({"image_size": [image.width(), image.height()]}),
        })
    }

    async fn inpaint(&self, request: &InpaintRequest) -> Result<InpaintResponse> {
        self.enact(Stage::Inpainting, self.inpaint)?;
        // Answer at the padded dimensions so the caller's crop-back is real
        let padded = dataurl::parse_image(&request.image)?;
        let filled = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            padded.width(),
            padded.height(),
            Rgb([40, 160, 220]),
        ));
        Ok(InpaintResponse {
            status: "success".to_string(),
            inpainted_image: dataurl::image_to_data_url(&filled)?,
        })
    }

    async fn generate_model(&self, request: &GenerateModelRequest) -> Result<GenerateModelResponse> {
        self.enact(Stage::ModelGeneration, self.generate)?;
        dataurl::parse_image(&request.image)?;
        Ok(GenerateModelResponse {
            status: "success".to_string(),
            ply_data: dataurl::encode_bare(PLY_FIXTURE),
            filename: Some("generated.ply".to_string()),
        })
    }
}

/// Gradient source image so crops and resizes are visually meaningful
pub fn gradient_source(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

/// PNG bytes of a grayscale mask with one rectangular blob
pub fn rect_mask_png(width: u32, height: u32, rect: Option<(u32, u32, u32, u32)>) -> Vec<u8> {
    let mask = GrayImage::from_fn(width, height, |x, y| match rect {
        Some((bx, by, bw, bh)) if x >= bx && x < bx + bw && y >= by && y < by + bh => Luma([255]),
        _ => Luma([0]),
    });
    dataurl::image_to_png_bytes(&DynamicImage::ImageLuma8(mask)).unwrap()
}

/// A complete pipeline request for a gradient source and rectangular mask
pub fn transform_request(
    width: u32,
    height: u32,
    rect: Option<(u32, u32, u32, u32)>,
) -> TransformRequest {
    TransformRequest {
        image_url: dataurl::image_to_data_url(&gradient_source(width, height)).unwrap(),
        mask_data: dataurl::encode_bare(&rect_mask_png(width, height, rect)),
        context: Some("integration test".to_string()),
    }
}

/// Orchestrator wired to the given client with artifacts under `dir`
pub fn orchestrator(client: Arc<dyn InferenceClient>, dir: &Path) -> PipelineOrchestrator {
    let config = AppConfig::builder()
        .artifact_dir(dir)
        .timeout_secs(5)
        .build()
        .unwrap();
    let store = ArtifactStore::new(dir).unwrap();
    PipelineOrchestrator::new(config, client, store, ArtifactEvents::default()).unwrap()
}
