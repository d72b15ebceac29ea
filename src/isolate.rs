//! Region isolation for the image-to-3D stage
//!
//! The 3D-generation model expects the object of interest alone on a
//! fixed-size transparent canvas. Isolation composites the source image
//! against the refined mask, crops to the bounding box of what remains,
//! resizes preserving aspect ratio, and centers the result.

use crate::error::{Alive3dError, Result};
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};

/// Mid-point foreground test. Masks reaching this module are already
/// refined to {0, 255}; this is the photographic-mask convention, distinct
/// from the near-zero threshold applied to freshly drawn masks.
const MIDPOINT_THRESHOLD: u8 = 127;

/// Composite the source image against a mask: source pixels where the mask
/// is foreground, fully transparent everywhere else.
#[must_use]
pub fn composite_masked(image: &DynamicImage, mask: &image::GrayImage) -> RgbaImage {
    let rgba = image.to_rgba8();
    RgbaImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        if mask.get_pixel(x, y)[0] > MIDPOINT_THRESHOLD {
            let p = rgba.get_pixel(x, y);
            Rgba([p[0], p[1], p[2], 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

/// Minimal rectangle enclosing all non-transparent pixels, as inclusive
/// `(min_x, min_y, max_x, max_y)`, or `None` when every pixel is transparent
#[must_use]
pub fn bounding_box(image: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((min_x, min_y, max_x, max_y)) => {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            }
        });
    }
    bounds
}

/// Dimensions that fit `width x height` inside a `target x target` box while
/// preserving aspect ratio: `scale = min(target/width, target/height)`,
/// rounded and clamped to at least one pixel per side.
#[must_use]
pub fn fit_dimensions(width: u32, height: u32, target: u32) -> (u32, u32) {
    let scale = (target as f32 / width as f32).min(target as f32 / height as f32);
    let new_width = ((width as f32 * scale).round() as u32).max(1);
    let new_height = ((height as f32 * scale).round() as u32).max(1);
    (new_width, new_height)
}

/// Extract the masked object onto a centered, fixed-size transparent canvas.
///
/// Composites, crops to the bounding box of non-transparent content, resizes
/// aspect-preserving to fit `canvas_size`, and centers with floor-division
/// offsets (an odd remainder biases toward the top-left by one pixel).
///
/// # Arguments
///
/// * `image` - Source image the object is lifted from
/// * `mask` - Refined binary mask, same dimensions as the image
/// * `canvas_size` - Side length of the square output canvas
///
/// # Errors
///
/// * [`Alive3dError::EmptyMask`] when the mask selects no pixels
/// * [`Alive3dError::InvalidConfig`] when `canvas_size` is zero
/// * [`Alive3dError::Internal`] when mask and image dimensions differ
pub fn isolate_region(
    image: &DynamicImage,
    mask: &image::GrayImage,
    canvas_size: u32,
) -> Result<RgbaImage> {
    if canvas_size == 0 {
        return Err(Alive3dError::invalid_config("canvas size must be positive"));
    }
    if mask.dimensions() != (image.width(), image.height()) {
        return Err(Alive3dError::internal(format!(
            "mask dimensions {:?} do not match image dimensions {:?}",
            mask.dimensions(),
            (image.width(), image.height())
        )));
    }

    let composited = composite_masked(image, mask);
    let (min_x, min_y, max_x, max_y) = bounding_box(&composited).ok_or(Alive3dError::EmptyMask)?;

    let crop_width = max_x - min_x + 1;
    let crop_height = max_y - min_y + 1;
    let crop = image::imageops::crop_imm(&composited, min_x, min_y, crop_width, crop_height)
        .to_image();

    let (new_width, new_height) = fit_dimensions(crop_width, crop_height, canvas_size);
    let resized = image::imageops::resize(&crop, new_width, new_height, FilterType::Lanczos3);

    let offset_x = (canvas_size - new_width) / 2;
    let offset_y = (canvas_size - new_height) / 2;
    log::debug!(
        "Isolated {crop_width}x{crop_height} region, resized to {new_width}x{new_height}, centered at ({offset_x},{offset_y})"
    );

    let mut canvas = RgbaImage::new(canvas_size, canvas_size);
    for (x, y, pixel) in resized.enumerate_pixels() {
        canvas.put_pixel(x + offset_x, y + offset_y, *pixel);
    }
    Ok(canvas)
}
