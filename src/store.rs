//! Flat-directory artifact persistence
//!
//! Generated images and 3D assets land in one flat directory; there is no
//! hierarchical namespace and no index beyond filesystem metadata. Filenames
//! double as identifiers: a sanitized context prefix, the creation timestamp,
//! and a short random suffix keep concurrent writers from colliding without
//! any locking.

use crate::error::{Alive3dError, Result};
use chrono::Utc;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// URL prefix artifacts are served under
pub const ARTIFACT_URL_PREFIX: &str = "/generated_images";

/// MIME type used for generated point-cloud assets
pub const PLY_MIME: &str = "model/ply";

/// Maximum length of the sanitized context prefix in an artifact filename
const CONTEXT_PREFIX_LIMIT: usize = 50;

/// Raster extensions eligible for the thumbnail listing
const RASTER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Metadata for one persisted artifact
#[derive(Debug, Clone)]
pub struct ArtifactRecord {
    /// Identifier, the filename up to its first dot
    pub id: String,
    /// Full filename inside the store directory
    pub filename: String,
    /// Context the artifact was generated from, recovered from the filename
    pub prompt: Option<String>,
    /// Creation time in milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    /// URL the artifact is served under
    pub url: String,
    /// Absolute path of the stored bytes
    pub path: PathBuf,
}

impl ArtifactRecord {
    /// Whether this artifact is a raster image eligible for thumbnails
    #[must_use]
    pub fn is_raster(&self) -> bool {
        Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                RASTER_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
    }
}

/// Durable store for generated artifacts backed by a flat directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open a store rooted at the given directory, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns [`Alive3dError::Persistence`] when the directory cannot be
    /// created.
    pub fn new<P: Into<PathBuf>>(root: P) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root)
                .map_err(|e| Alive3dError::file_io("create artifact directory", &root, &e))?;
        }
        Ok(Self { root })
    }

    /// Directory this store persists into
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist artifact bytes and return the new record.
    ///
    /// The filename is `<sanitized-context>__<unix-seconds>_<4-hex>.<ext>`
    /// with the extension implied by `content_type`. Bytes are written to a
    /// temporary file in the store directory and moved into place, so a
    /// concurrent reader never observes a partial artifact.
    ///
    /// # Errors
    ///
    /// Returns [`Alive3dError::Persistence`] when the write fails. Callers
    /// orchestrating a pipeline treat this as a warning, not a request
    /// failure.
    pub fn put(&self, bytes: &[u8], content_type: &str, context: &str) -> Result<ArtifactRecord> {
        fs::create_dir_all(&self.root)
            .map_err(|e| Alive3dError::file_io("create artifact directory", &self.root, &e))?;

        let filename = Self::generate_filename(context, content_type);
        let path = self.root.join(&filename);

        let mut staged = tempfile::NamedTempFile::new_in(&self.root)
            .map_err(|e| Alive3dError::file_io("stage artifact write", &self.root, &e))?;
        staged
            .write_all(bytes)
            .map_err(|e| Alive3dError::file_io("write artifact bytes", &path, &e))?;
        staged
            .persist(&path)
            .map_err(|e| Alive3dError::file_io("persist artifact", &path, &e.error))?;

        log::debug!("Persisted {} byte artifact as {filename}", bytes.len());
        Ok(Self::build_record(filename, path, Utc::now().timestamp_millis()))
    }

    /// Resolve an artifact name to its on-disk path.
    ///
    /// Names containing path separators or parent references never resolve;
    /// the store is a flat namespace and lookups cannot escape it.
    ///
    /// # Errors
    ///
    /// Returns [`Alive3dError::NotFound`] for invalid names and for names with
    /// no stored artifact.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
        {
            return Err(Alive3dError::NotFound(name.to_string()));
        }
        let path = self.root.join(name);
        if !path.is_file() {
            return Err(Alive3dError::NotFound(name.to_string()));
        }
        Ok(path)
    }

    /// Read a stored artifact's bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Alive3dError::NotFound`] when no artifact has that name, or
    /// [`Alive3dError::Io`] when the read itself fails.
    pub fn get(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.resolve(name)?;
        Ok(fs::read(path)?)
    }

    /// List all stored artifacts, newest first.
    ///
    /// Ordering uses filesystem creation time, falling back to modification
    /// time where the filesystem does not record creation.
    ///
    /// # Errors
    ///
    /// Returns [`Alive3dError::Io`] when the store directory cannot be read.
    pub fn list(&self) -> Result<Vec<ArtifactRecord>> {
        let mut records = Vec::new();
        if !self.root.exists() {
            return Ok(records);
        }

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(filename) = path.file_name().and_then(|n| n.to_str()).map(String::from)
            else {
                log::debug!("Skipping non-UTF-8 artifact name: {}", path.display());
                continue;
            };
            let timestamp_ms = entry
                .metadata()
                .ok()
                .map_or(0, |meta| Self::creation_time_ms(&meta));
            records.push(Self::build_record(filename, path, timestamp_ms));
        }

        records.sort_by(|a, b| {
            b.timestamp_ms
                .cmp(&a.timestamp_ms)
                .then_with(|| b.filename.cmp(&a.filename))
        });
        Ok(records)
    }

    /// MIME type an artifact should be served with, from its extension
    #[must_use]
    pub fn content_type_for(name: &str) -> &'static str {
        match Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("png") => "image/png",
            Some("jpg" | "jpeg") => "image/jpeg",
            Some("webp") => "image/webp",
            Some("ply") => PLY_MIME,
            _ => "application/octet-stream",
        }
    }

    fn generate_filename(context: &str, content_type: &str) -> String {
        let prefix = sanitize_context(context);
        let timestamp = Utc::now().timestamp();
        let token = uuid::Uuid::new_v4().simple().to_string();
        let suffix = token.get(..4).unwrap_or(&token);
        let ext = Self::extension_for(content_type);
        format!("{prefix}__{timestamp}_{suffix}.{ext}")
    }

    fn extension_for(content_type: &str) -> &'static str {
        match content_type {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            PLY_MIME => "ply",
            _ => "bin",
        }
    }

    fn build_record(filename: String, path: PathBuf, timestamp_ms: i64) -> ArtifactRecord {
        ArtifactRecord {
            id: filename.split('.').next().unwrap_or(&filename).to_string(),
            prompt: prompt_from_filename(&filename),
            timestamp_ms,
            url: format!("{ARTIFACT_URL_PREFIX}/{filename}"),
            path,
            filename,
        }
    }

    fn creation_time_ms(metadata: &fs::Metadata) -> i64 {
        metadata
            .created()
            .or_else(|_| metadata.modified())
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |elapsed| elapsed.as_millis() as i64)
    }
}

/// Reduce a free-form context string to a filename-safe prefix: keep
/// alphanumerics, spaces, and underscores, trim trailing whitespace, cap the
/// length, then replace spaces with underscores.
fn sanitize_context(context: &str) -> String {
    let kept: String = context
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .collect();
    kept.trim_end()
        .chars()
        .take(CONTEXT_PREFIX_LIMIT)
        .collect::<String>()
        .replace(' ', "_")
}

/// Recover the context from an artifact filename: the segment before the
/// `__` separator with underscores restored to spaces
fn prompt_from_filename(filename: &str) -> Option<String> {
    filename
        .split_once("__")
        .map(|(prefix, _)| prefix.replace('_', " "))
        .filter(|prompt| !prompt.is_empty())
}
