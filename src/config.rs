//! Service configuration
//!
//! All tunables live in one immutable [`AppConfig`] constructed at startup,
//! either programmatically through the builder or from `ALIVE3D_*`
//! environment variables. Nothing reads the environment after construction;
//! the orchestrator and clients receive the config explicitly.

use crate::error::{Alive3dError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default bounded wait for upstream inference calls, generous because these
/// are heavyweight synchronous model invocations
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default stride required by the inpainting model
pub const DEFAULT_STRIDE: u32 = 8;

/// Default square structuring element side for mask dilation
pub const DEFAULT_DILATION_KERNEL: u32 = 15;

/// Default canvas side length expected by the 3D-generation model
pub const DEFAULT_CANVAS_SIZE: u32 = 256;

/// Full endpoint URLs of the external inference services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamEndpoints {
    /// Interactive segmentation endpoint
    pub segment: String,
    /// Inpainting endpoint
    pub inpaint: String,
    /// Image-to-3D generation endpoint
    pub generate: String,
}

impl Default for UpstreamEndpoints {
    fn default() -> Self {
        Self {
            segment: "http://localhost:5000/segment".to_string(),
            inpaint: "http://localhost:5002/inpaint".to_string(),
            generate: "http://localhost:5001/process".to_string(),
        }
    }
}

/// Immutable service configuration, constructed once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// External inference service endpoints
    pub upstream: UpstreamEndpoints,

    /// Bounded wait for each upstream call, in seconds
    pub timeout_secs: u64,

    /// Stride the inpainting model requires dimensions to divide by
    pub stride: u32,

    /// Side length of the square dilation structuring element; must be odd
    pub dilation_kernel: u32,

    /// Side length of the square canvas fed to the 3D-generation model
    pub canvas_size: u32,

    /// Flat directory artifacts are persisted into
    pub artifact_dir: PathBuf,

    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            upstream: UpstreamEndpoints::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            stride: DEFAULT_STRIDE,
            dilation_kernel: DEFAULT_DILATION_KERNEL,
            canvas_size: DEFAULT_CANVAS_SIZE,
            artifact_dir: default_artifact_dir(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
        }
    }
}

impl AppConfig {
    /// Create a new configuration builder for fluent construction
    ///
    /// # Examples
    ///
    /// ```rust
    /// use alive3d::AppConfig;
    ///
    /// let config = AppConfig::builder()
    ///     .stride(8)
    ///     .canvas_size(256)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.timeout_secs, 300);
    /// ```
    #[must_use]
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Build a configuration from `ALIVE3D_*` environment variables, falling
    /// back to defaults for anything unset.
    ///
    /// Recognized variables: `ALIVE3D_SEGMENT_URL`, `ALIVE3D_INPAINT_URL`,
    /// `ALIVE3D_GENERATE_URL`, `ALIVE3D_ARTIFACT_DIR`, `ALIVE3D_BIND_ADDR`,
    /// `ALIVE3D_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns [`Alive3dError::InvalidConfig`] for unparsable values or a
    /// configuration that fails validation.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder();

        if let Ok(url) = std::env::var("ALIVE3D_SEGMENT_URL") {
            builder = builder.segment_url(url);
        }
        if let Ok(url) = std::env::var("ALIVE3D_INPAINT_URL") {
            builder = builder.inpaint_url(url);
        }
        if let Ok(url) = std::env::var("ALIVE3D_GENERATE_URL") {
            builder = builder.generate_url(url);
        }
        if let Ok(dir) = std::env::var("ALIVE3D_ARTIFACT_DIR") {
            builder = builder.artifact_dir(dir);
        }
        if let Ok(addr) = std::env::var("ALIVE3D_BIND_ADDR") {
            let parsed = addr.parse().map_err(|e| {
                Alive3dError::invalid_config(format!("ALIVE3D_BIND_ADDR '{addr}': {e}"))
            })?;
            builder = builder.bind_addr(parsed);
        }
        if let Ok(secs) = std::env::var("ALIVE3D_TIMEOUT_SECS") {
            let parsed = secs.parse().map_err(|e| {
                Alive3dError::invalid_config(format!("ALIVE3D_TIMEOUT_SECS '{secs}': {e}"))
            })?;
            builder = builder.timeout_secs(parsed);
        }

        builder.build()
    }

    /// The bounded wait applied to each upstream call
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    ///
    /// Returns [`Alive3dError::InvalidConfig`] when the stride or canvas size
    /// is zero, the dilation kernel is even or zero, the timeout is zero, or
    /// an upstream URL is not http(s).
    pub fn validate(&self) -> Result<()> {
        if self.stride == 0 {
            return Err(Alive3dError::invalid_config("stride must be positive"));
        }
        if self.canvas_size == 0 {
            return Err(Alive3dError::invalid_config("canvas size must be positive"));
        }
        if self.dilation_kernel == 0 || self.dilation_kernel % 2 == 0 {
            return Err(Alive3dError::invalid_config(format!(
                "dilation kernel must be odd and positive, got {}",
                self.dilation_kernel
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Alive3dError::invalid_config("timeout must be positive"));
        }
        for (name, url) in [
            ("segment", &self.upstream.segment),
            ("inpaint", &self.upstream.inpaint),
            ("generate", &self.upstream.generate),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Alive3dError::invalid_config(format!(
                    "{name} URL must be http(s), got '{url}'"
                )));
            }
        }
        Ok(())
    }
}

/// Builder for [`AppConfig`]
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set the segmentation service endpoint URL
    #[must_use]
    pub fn segment_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.upstream.segment = url.into();
        self
    }

    /// Set the inpainting service endpoint URL
    #[must_use]
    pub fn inpaint_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.upstream.inpaint = url.into();
        self
    }

    /// Set the 3D-generation service endpoint URL
    #[must_use]
    pub fn generate_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.upstream.generate = url.into();
        self
    }

    /// Set the upstream call timeout in seconds
    #[must_use]
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// Set the inpainting stride
    #[must_use]
    pub fn stride(mut self, stride: u32) -> Self {
        self.config.stride = stride;
        self
    }

    /// Set the dilation kernel side length
    #[must_use]
    pub fn dilation_kernel(mut self, kernel: u32) -> Self {
        self.config.dilation_kernel = kernel;
        self
    }

    /// Set the 3D-stage canvas side length
    #[must_use]
    pub fn canvas_size(mut self, size: u32) -> Self {
        self.config.canvas_size = size;
        self
    }

    /// Set the artifact storage directory
    #[must_use]
    pub fn artifact_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.artifact_dir = dir.into();
        self
    }

    /// Set the server bind address
    #[must_use]
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    /// Validate and produce the final configuration
    ///
    /// # Errors
    ///
    /// Returns [`Alive3dError::InvalidConfig`] when validation fails.
    pub fn build(self) -> Result<AppConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn default_artifact_dir() -> PathBuf {
    dirs::data_dir().map_or_else(
        || PathBuf::from("generated_images"),
        |dir| dir.join("alive3d").join("generated_images"),
    )
}
