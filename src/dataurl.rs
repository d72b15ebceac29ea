//! Data-URL and base64 payload handling
//!
//! Every binary payload crosses the service boundary as base64 text,
//! optionally wrapped in a `data:<mime>;base64,` prefix. Decoding strips the
//! prefix when present; encoding adds it back symmetrically so round-trips
//! preserve the convention upstream services expect.

use crate::error::{Alive3dError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// MIME type used for all image payloads produced by this service
pub const PNG_MIME: &str = "image/png";

/// Decode a base64 payload that may carry a `data:<mime>;base64,` prefix.
///
/// A bare base64 string is accepted as-is. ASCII whitespace (line wraps from
/// transport layers) is tolerated inside the base64 body.
///
/// # Errors
///
/// Returns [`Alive3dError::Decode`] when a declared `data:` prefix is
/// malformed or the base64 body does not decode.
pub fn parse(payload: &str) -> Result<Vec<u8>> {
    let body = if let Some(rest) = payload.strip_prefix("data:") {
        let (_, after_marker) = rest.split_once(";base64,").ok_or_else(|| {
            Alive3dError::decode("data-URL prefix is missing the ';base64,' marker")
        })?;
        after_marker
    } else {
        payload
    };

    let cleaned: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| Alive3dError::decode(format!("invalid base64 payload: {e}")))
}

/// Encode raw bytes as a data URL with the given MIME type
#[must_use]
pub fn encode(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Encode raw bytes as bare base64 without any prefix
#[must_use]
pub fn encode_bare(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a byte payload into an image.
///
/// # Errors
///
/// Returns [`Alive3dError::Decode`] when the bytes are not a parsable raster
/// image in any supported format.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|e| Alive3dError::decode(format!("payload is not a decodable image: {e}")))
}

/// Decode a base64/data-URL payload straight into an image
///
/// # Errors
///
/// Returns [`Alive3dError::Decode`] for malformed base64 or unparsable bytes.
pub fn parse_image(payload: &str) -> Result<DynamicImage> {
    decode_image(&parse(payload)?)
}

/// Encode an image as PNG bytes
///
/// # Errors
///
/// Returns [`Alive3dError::Image`] if PNG encoding fails.
pub fn image_to_png_bytes(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}

/// Encode an image as a `data:image/png;base64,` URL
///
/// # Errors
///
/// Returns [`Alive3dError::Image`] if PNG encoding fails.
pub fn image_to_data_url(image: &DynamicImage) -> Result<String> {
    Ok(encode(&image_to_png_bytes(image)?, PNG_MIME))
}
