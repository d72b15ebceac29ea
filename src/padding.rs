//! Stride padding for fixed-stride inference calls
//!
//! The inpainting model only accepts spatial dimensions divisible by its
//! stride. Padding extends the bottom and right edges just far enough to
//! align, and the original dimensions ride along so the result can be
//! cropped back after inference. Images pad by edge reflection; masks pad
//! with zeros, since reflecting a binary mask would fabricate foreground
//! past the edge.

use crate::error::{Alive3dError, Result};
use image::{GrayImage, Luma, RgbImage};

/// An image/mask pair extended to stride-aligned dimensions, carrying the
/// pre-padding size needed to reverse the operation after inference
#[derive(Debug, Clone)]
pub struct PaddedPair {
    /// Image padded with edge reflection
    pub image: RgbImage,
    /// Mask padded with zero fill, when a mask accompanies the image
    pub mask: Option<GrayImage>,
    /// `(width, height)` before padding
    pub original_dimensions: (u32, u32),
}

/// Compute `(pad_w, pad_h)` needed to align `width`/`height` to `stride`.
///
/// Both amounts are always in `0..stride`; already-aligned dimensions yield
/// zero padding.
///
/// # Errors
///
/// Returns [`Alive3dError::InvalidConfig`] when `stride` is zero.
pub fn pad_amounts(width: u32, height: u32, stride: u32) -> Result<(u32, u32)> {
    if stride == 0 {
        return Err(Alive3dError::invalid_config("stride must be positive"));
    }
    let pad_w = (stride - width % stride) % stride;
    let pad_h = (stride - height % stride) % stride;
    Ok((pad_w, pad_h))
}

/// Pad an image (and optional mask) to the next stride-aligned size.
///
/// # Errors
///
/// Returns [`Alive3dError::InvalidConfig`] for a zero stride and
/// [`Alive3dError::Internal`] when the mask dimensions do not match the
/// image.
pub fn pad_to_stride(
    image: &RgbImage,
    mask: Option<&GrayImage>,
    stride: u32,
) -> Result<PaddedPair> {
    let (width, height) = image.dimensions();
    if let Some(m) = mask {
        if m.dimensions() != (width, height) {
            return Err(Alive3dError::internal(format!(
                "mask dimensions {:?} do not match image dimensions {:?}",
                m.dimensions(),
                (width, height)
            )));
        }
    }

    let (pad_w, pad_h) = pad_amounts(width, height, stride)?;
    if pad_w == 0 && pad_h == 0 {
        return Ok(PaddedPair {
            image: image.clone(),
            mask: mask.cloned(),
            original_dimensions: (width, height),
        });
    }

    log::debug!("Padding {width}x{height} by +{pad_w}x+{pad_h} to stride {stride}");
    Ok(PaddedPair {
        image: pad_image_reflect(image, pad_w, pad_h),
        mask: mask.map(|m| pad_mask_zero(m, pad_w, pad_h)),
        original_dimensions: (width, height),
    })
}

/// Crop a padded inference result back to its pre-padding dimensions.
///
/// Must be called with dimensions captured *before* padding, carried through
/// the inference call in [`PaddedPair::original_dimensions`].
///
/// # Errors
///
/// Returns [`Alive3dError::Internal`] if the result is smaller than the
/// original dimensions, which indicates the upstream service changed the
/// spatial extent.
pub fn unpad(image: &RgbImage, original_dimensions: (u32, u32)) -> Result<RgbImage> {
    let (width, height) = original_dimensions;
    if width > image.width() || height > image.height() {
        return Err(Alive3dError::internal(format!(
            "inference result {}x{} is smaller than pre-padding dimensions {width}x{height}",
            image.width(),
            image.height()
        )));
    }
    Ok(image::imageops::crop_imm(image, 0, 0, width, height).to_image())
}

fn pad_image_reflect(image: &RgbImage, pad_w: u32, pad_h: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    RgbImage::from_fn(width + pad_w, height + pad_h, |x, y| {
        *image.get_pixel(reflect_index(x, width), reflect_index(y, height))
    })
}

fn pad_mask_zero(mask: &GrayImage, pad_w: u32, pad_h: u32) -> GrayImage {
    let (width, height) = mask.dimensions();
    GrayImage::from_fn(width + pad_w, height + pad_h, |x, y| {
        if x < width && y < height {
            *mask.get_pixel(x, y)
        } else {
            Luma([0])
        }
    })
}

// Exclusive edge reflection: the first padded row mirrors row len-2, the
// second row len-3, and so on. Clamps at index 0 when the pad run exceeds
// the source extent (only reachable when a dimension is below the stride).
fn reflect_index(index: u32, len: u32) -> u32 {
    if index < len {
        return index;
    }
    let overshoot = index - len;
    len.saturating_sub(2).saturating_sub(overshoot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn test_pad_amounts_reference_scenario() {
        // 500x333 at stride 8 pads by 4 columns and 3 rows
        assert_eq!(pad_amounts(500, 333, 8).unwrap(), (4, 3));
    }

    #[test]
    fn test_pad_amounts_aligned_is_zero() {
        assert_eq!(pad_amounts(512, 328, 8).unwrap(), (0, 0));
        assert_eq!(pad_amounts(8, 8, 8).unwrap(), (0, 0));
    }

    #[test]
    fn test_pad_amounts_always_below_stride() {
        for width in 1..40 {
            for height in 1..40 {
                let (pad_w, pad_h) = pad_amounts(width, height, 8).unwrap();
                assert!(pad_w < 8 && pad_h < 8);
                assert_eq!((width + pad_w) % 8, 0);
                assert_eq!((height + pad_h) % 8, 0);
            }
        }
    }

    #[test]
    fn test_zero_stride_rejected() {
        assert!(matches!(
            pad_amounts(10, 10, 0),
            Err(Alive3dError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_pad_unpad_round_trip() {
        let image = gradient_image(500, 333);
        let padded = pad_to_stride(&image, None, 8).unwrap();
        assert_eq!(padded.image.dimensions(), (504, 336));
        assert_eq!(padded.original_dimensions, (500, 333));

        let restored = unpad(&padded.image, padded.original_dimensions).unwrap();
        assert_eq!(restored, image);
    }

    #[test]
    fn test_pad_aligned_is_noop() {
        let image = gradient_image(64, 32);
        let padded = pad_to_stride(&image, None, 8).unwrap();
        assert_eq!(padded.image, image);
    }

    #[test]
    fn test_image_padding_reflects_edge() {
        let image = gradient_image(4, 3);
        let padded = pad_to_stride(&image, None, 8).unwrap();
        assert_eq!(padded.image.dimensions(), (8, 8));

        // Reflection excludes the edge row itself: column 4 mirrors column 2
        assert_eq!(padded.image.get_pixel(4, 0), image.get_pixel(2, 0));
        assert_eq!(padded.image.get_pixel(5, 0), image.get_pixel(1, 0));
        assert_eq!(padded.image.get_pixel(6, 0), image.get_pixel(0, 0));
        // Pad run longer than the source extent clamps at the first column
        assert_eq!(padded.image.get_pixel(7, 0), image.get_pixel(0, 0));
    }

    #[test]
    fn test_mask_padding_is_zero_filled() {
        let image = gradient_image(5, 5);
        let mask = GrayImage::from_pixel(5, 5, Luma([255]));
        let padded = pad_to_stride(&image, Some(&mask), 8).unwrap();
        let padded_mask = padded.mask.unwrap();

        assert_eq!(padded_mask.dimensions(), (8, 8));
        for (x, y, pixel) in padded_mask.enumerate_pixels() {
            if x >= 5 || y >= 5 {
                assert_eq!(pixel[0], 0, "padded region must be background at ({x},{y})");
            } else {
                assert_eq!(pixel[0], 255);
            }
        }
    }

    #[test]
    fn test_mismatched_mask_rejected() {
        let image = gradient_image(8, 8);
        let mask = GrayImage::from_pixel(4, 4, Luma([255]));
        assert!(pad_to_stride(&image, Some(&mask), 8).is_err());
    }

    #[test]
    fn test_unpad_rejects_shrunken_result() {
        let image = gradient_image(16, 16);
        assert!(unpad(&image, (32, 16)).is_err());
    }
}
