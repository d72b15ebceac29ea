//! Error types for the object-erase and 3D-synthesis pipeline

use serde::Serialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Identifies which external inference stage an error originated from.
///
/// Carried inside upstream error variants so callers can report the failing
/// stage without inspecting error strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Interactive segmentation service (`POST /segment`)
    Segmentation,
    /// Image inpainting service (`POST /inpaint`)
    Inpainting,
    /// Image-to-3D generation service (`POST /process`)
    ModelGeneration,
}

impl Stage {
    /// Stable lowercase name used in logs and error bodies
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Segmentation => "segmentation",
            Self::Inpainting => "inpainting",
            Self::ModelGeneration => "model-generation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while decoding, refining, orchestrating, or
/// persisting pipeline artifacts
#[derive(Error, Debug)]
pub enum Alive3dError {
    /// Invalid configuration supplied at startup
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Image decoding or processing errors from the imaging layer
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Byte payload could not be decoded (malformed base64, bad data-URL
    /// prefix, or bytes that are not a raster image)
    #[error("Decode error: {0}")]
    Decode(String),

    /// Mask contains no foreground pixels after compositing
    #[error("Mask contains no foreground pixels")]
    EmptyMask,

    /// An upstream inference service answered with a non-success status
    #[error("Upstream {stage} service returned status {status}: {body}")]
    UpstreamService {
        /// Pipeline stage whose service failed
        stage: Stage,
        /// HTTP status code returned by the service
        status: u16,
        /// Raw response body, preserved for diagnostics
        body: String,
    },

    /// An upstream inference service could not be reached in time
    #[error("Upstream {stage} service unavailable: {reason}")]
    UpstreamUnavailable {
        /// Pipeline stage whose service was unreachable
        stage: Stage,
        /// Timeout or connection detail
        reason: String,
    },

    /// A referenced artifact does not exist in the store
    #[error("Artifact not found: {0}")]
    NotFound(String),

    /// Artifact write failed; non-fatal at the orchestration level
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Internal invariant violations and unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Alive3dError {
    /// Create a decode error with context
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an invalid configuration error with context
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an internal error with context
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a non-fatal persistence error with context
    pub fn persistence<S: Into<String>>(msg: S) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a file I/O error with operation and path context
    pub fn file_io(operation: &str, path: &Path, source: &std::io::Error) -> Self {
        Self::Persistence(format!(
            "Failed to {} at '{}': {}",
            operation,
            path.display(),
            source
        ))
    }

    /// The upstream stage this error originated from, when applicable
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::UpstreamService { stage, .. } | Self::UpstreamUnavailable { stage, .. } => {
                Some(*stage)
            }
            _ => None,
        }
    }
}

/// Convenient result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Alive3dError>;
