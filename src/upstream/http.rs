//! HTTP implementation of the inference client

use super::{
    GenerateModelRequest, GenerateModelResponse, InferenceClient, InpaintRequest, InpaintResponse,
    SegmentRequest, SegmentResponse,
};
use crate::config::{AppConfig, UpstreamEndpoints};
use crate::error::{Alive3dError, Result, Stage};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Calls the external inference services over HTTP with a bounded wait.
///
/// One pooled [`reqwest::Client`] serves all three stages; the timeout
/// applies to each call end to end.
#[derive(Debug, Clone)]
pub struct HttpInferenceClient {
    http: reqwest::Client,
    endpoints: UpstreamEndpoints,
}

impl HttpInferenceClient {
    /// Build a client for the given endpoints and per-call timeout
    ///
    /// # Errors
    ///
    /// Returns [`Alive3dError::Internal`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(endpoints: UpstreamEndpoints, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Alive3dError::internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, endpoints })
    }

    /// Build a client from the service configuration
    ///
    /// # Errors
    ///
    /// Returns [`Alive3dError::Internal`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(config.upstream.clone(), config.request_timeout())
    }

    async fn post_stage<Req, Resp>(&self, stage: Stage, url: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        log::debug!("Calling {stage} service at {url}");
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| unavailable(stage, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("{stage} service returned {status}: {body}");
            return Err(Alive3dError::UpstreamService {
                stage,
                status: status.as_u16(),
                body,
            });
        }

        response.json::<Resp>().await.map_err(|e| {
            // 2xx with an undecodable body is still an upstream contract breach
            Alive3dError::UpstreamService {
                stage,
                status: status.as_u16(),
                body: format!("undecodable response body: {e}"),
            }
        })
    }
}

fn unavailable(stage: Stage, error: &reqwest::Error) -> Alive3dError {
    let reason = if error.is_timeout() {
        format!("timed out: {error}")
    } else {
        error.to_string()
    };
    Alive3dError::UpstreamUnavailable { stage, reason }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn segment(&self, request: &SegmentRequest) -> Result<SegmentResponse> {
        self.post_stage(Stage::Segmentation, &self.endpoints.segment, request)
            .await
    }

    async fn inpaint(&self, request: &InpaintRequest) -> Result<InpaintResponse> {
        self.post_stage(Stage::Inpainting, &self.endpoints.inpaint, request)
            .await
    }

    async fn generate_model(&self, request: &GenerateModelRequest) -> Result<GenerateModelResponse> {
        self.post_stage(Stage::ModelGeneration, &self.endpoints.generate, request)
            .await
    }
}
