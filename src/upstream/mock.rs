//! Mock inference client for orchestrator tests
//!
//! Records every call and answers with programmable canned behavior, so
//! pipeline tests can drive the full stage sequence without any network.

use super::{
    GenerateModelRequest, GenerateModelResponse, InferenceClient, InpaintRequest, InpaintResponse,
    MaskCandidate, SegmentRequest, SegmentResponse,
};
use crate::dataurl;
use crate::error::{Alive3dError, Result, Stage};
use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use std::sync::{Arc, Mutex};

/// Minimal valid ASCII point cloud the mock hands back from generation
pub(crate) const MOCK_PLY: &[u8] = b"ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nend_header\n0.0 0.0 0.0\n";

/// What a programmed stage does when invoked
#[derive(Debug, Clone)]
pub(crate) enum StageBehavior {
    /// Answer with a plausible success payload
    Succeed,
    /// Answer as a reachable service reporting an HTTP failure
    FailStatus(u16, &'static str),
    /// Answer as an unreachable service
    Unavailable,
}

pub(crate) struct MockInferenceClient {
    calls: Arc<Mutex<Vec<&'static str>>>,
    segment: StageBehavior,
    inpaint: StageBehavior,
    generate: StageBehavior,
}

impl MockInferenceClient {
    /// Mock where every stage succeeds
    pub(crate) fn succeeding() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            segment: StageBehavior::Succeed,
            inpaint: StageBehavior::Succeed,
            generate: StageBehavior::Succeed,
        }
    }

    pub(crate) fn with_segment(mut self, behavior: StageBehavior) -> Self {
        self.segment = behavior;
        self
    }

    pub(crate) fn with_inpaint(mut self, behavior: StageBehavior) -> Self {
        self.inpaint = behavior;
        self
    }

    pub(crate) fn with_generate(mut self, behavior: StageBehavior) -> Self {
        self.generate = behavior;
        self
    }

    /// Stage names in invocation order
    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self, stage: &'static str) -> usize {
        self.calls().iter().filter(|name| **name == stage).count()
    }

    fn enact(&self, stage: Stage, behavior: &StageBehavior) -> Result<()> {
        self.calls.lock().unwrap().push(stage.as_str());
        match behavior {
            StageBehavior::Succeed => Ok(()),
            StageBehavior::FailStatus(status, body) => Err(Alive3dError::UpstreamService {
                stage,
                status: *status,
                body: (*body).to_string(),
            }),
            StageBehavior::Unavailable => Err(Alive3dError::UpstreamUnavailable {
                stage,
                reason: "connection refused".to_string(),
            }),
        }
    }
}

#[async_trait]
impl InferenceClient for MockInferenceClient {
    async fn segment(&self, request: &SegmentRequest) -> Result<SegmentResponse> {
        self.enact(Stage::Segmentation, &self.segment)?;
        // Echo a mask matching the request's image dimensions
        let image = dataurl::parse_image(&request.image_url)?;
        let mask = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
            image.width(),
            image.height(),
            image::Luma([255]),
        ));
        Ok(SegmentResponse {
            status: "success".to_string(),
            masks: vec![MaskCandidate {
                mask: dataurl::encode_bare(&dataurl::image_to_png_bytes(&mask)?),
                score: 0.93,
                visualization: None,
                bbox: None,
            }],
            debug: serde_json::Value::Null,
        })
    }

    async fn inpaint(&self, request: &InpaintRequest) -> Result<InpaintResponse> {
        self.enact(Stage::Inpainting, &self.inpaint)?;
        // Return a solid fill at the padded dimensions of the request so the
        // caller's unpad step has real work to do
        let padded = dataurl::parse_image(&request.image)?;
        let filled = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            padded.width(),
            padded.height(),
            Rgb([12, 200, 64]),
        ));
        Ok(InpaintResponse {
            status: "success".to_string(),
            inpainted_image: dataurl::image_to_data_url(&filled)?,
        })
    }

    async fn generate_model(&self, request: &GenerateModelRequest) -> Result<GenerateModelResponse> {
        self.enact(Stage::ModelGeneration, &self.generate)?;
        // Input must still be a decodable image, as the real service requires
        dataurl::parse_image(&request.image)?;
        Ok(GenerateModelResponse {
            status: "success".to_string(),
            ply_data: dataurl::encode_bare(MOCK_PLY),
            filename: Some("mock_output.ply".to_string()),
        })
    }
}
