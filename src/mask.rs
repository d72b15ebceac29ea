//! Mask decoding and morphological refinement
//!
//! Incoming masks arrive in whatever encoding the drawing client produced:
//! RGBA with opacity marking the selection, plain RGB screenshots of a mask,
//! or an already single-channel grayscale raster. Decoding collapses all of
//! them to a canonical single-channel mask and records which encoding was
//! seen, so later stages never have to re-inspect channel layouts.

use crate::dataurl;
use crate::error::{Alive3dError, Result};
use image::imageops::FilterType;
use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// Near-zero binarization threshold: any non-trivial mark counts as selected.
///
/// Deliberately not a mid-point threshold. Drawn masks encode intent with any
/// nonzero opacity, so a value of 2 is already foreground here.
const DRAWN_MASK_THRESHOLD: u8 = 1;

const FOREGROUND: u8 = 255;
const BACKGROUND: u8 = 0;

/// Channel layout the mask payload arrived in, decided once at decode time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskEncoding {
    /// Source carried an alpha channel; opacity is the mask signal
    Alpha,
    /// Source was already a single-channel raster
    Grayscale,
    /// Source was multi-channel color without alpha; reduced via luma weights
    ColorNoAlpha,
}

/// A canonical single-channel mask plus the encoding it was decoded from
#[derive(Debug, Clone)]
pub struct DecodedMask {
    /// Single-channel mask data, same dimensions as the reference image
    pub mask: GrayImage,
    /// Channel layout of the original payload
    pub encoding: MaskEncoding,
}

/// Decode raw mask bytes of unknown channel layout into a canonical
/// single-channel mask matching the reference image dimensions.
///
/// Sources with an alpha channel contribute their alpha plane directly;
/// alpha-less color sources are reduced with standard luma weights; a
/// single-channel source passes through unchanged. If the mask dimensions
/// differ from the reference, the mask is resized with Lanczos interpolation
/// to match. The reference image is never resized to fit the mask.
///
/// # Arguments
///
/// * `bytes` - Raw mask payload (PNG, JPEG, ... in any supported format)
/// * `reference_dimensions` - `(width, height)` of the accompanying image
///
/// # Errors
///
/// Returns [`Alive3dError::Decode`] when the bytes cannot be parsed as a
/// raster image.
pub fn decode_mask(bytes: &[u8], reference_dimensions: (u32, u32)) -> Result<DecodedMask> {
    let image = dataurl::decode_image(bytes)?;
    let color = image.color();

    let (mask, encoding) = if color.has_alpha() {
        (alpha_plane(&image.to_rgba8()), MaskEncoding::Alpha)
    } else if color.channel_count() == 1 {
        (image.to_luma8(), MaskEncoding::Grayscale)
    } else {
        (image.to_luma8(), MaskEncoding::ColorNoAlpha)
    };

    let (ref_width, ref_height) = reference_dimensions;
    let mask = if mask.dimensions() == reference_dimensions {
        mask
    } else {
        log::debug!(
            "Resizing {}x{} mask to match {ref_width}x{ref_height} reference image",
            mask.width(),
            mask.height()
        );
        image::imageops::resize(&mask, ref_width, ref_height, FilterType::Lanczos3)
    };

    Ok(DecodedMask { mask, encoding })
}

fn alpha_plane(rgba: &image::RgbaImage) -> GrayImage {
    GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        Luma([rgba.get_pixel(x, y)[3]])
    })
}

/// Binarize a mask with the drawn-mask threshold: values above 1 become 255,
/// everything else 0. Idempotent.
#[must_use]
pub fn binarize(mask: &GrayImage) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        if mask.get_pixel(x, y)[0] > DRAWN_MASK_THRESHOLD {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    })
}

/// Dilate a binary mask with a square structuring element of the given side
/// length, one iteration. Dilation only grows the foreground: every
/// foreground pixel of the input is foreground in the output.
///
/// # Arguments
///
/// * `mask` - Binary mask with values in {0, 255}
/// * `kernel_size` - Side length of the square structuring element; must be
///   odd so the element has a center pixel
///
/// # Errors
///
/// Returns [`Alive3dError::InvalidConfig`] for even, zero, or oversized
/// kernel sizes.
pub fn dilate(mask: &GrayImage, kernel_size: u32) -> Result<GrayImage> {
    let radius = kernel_radius(kernel_size)?;
    // Chebyshev distance k reaches exactly the (2k+1)x(2k+1) square
    Ok(morphology::dilate(mask, Norm::LInf, radius))
}

/// Binarize then dilate in one step, the standard refinement applied to every
/// incoming mask before inpainting.
///
/// # Errors
///
/// Returns [`Alive3dError::InvalidConfig`] for an invalid kernel size.
pub fn refine(mask: &GrayImage, kernel_size: u32) -> Result<GrayImage> {
    dilate(&binarize(mask), kernel_size)
}

fn kernel_radius(kernel_size: u32) -> Result<u8> {
    if kernel_size == 0 || kernel_size % 2 == 0 {
        return Err(Alive3dError::invalid_config(format!(
            "dilation kernel size must be odd and positive, got {kernel_size}"
        )));
    }
    let radius = (kernel_size - 1) / 2;
    u8::try_from(radius).map_err(|_| {
        Alive3dError::invalid_config(format!("dilation kernel size {kernel_size} is too large"))
    })
}
