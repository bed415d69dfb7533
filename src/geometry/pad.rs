//! Pixel side of the resize: scaling through an [`ImageService`] and
//! filling the padded canvas.

use image::{Rgb, RgbImage};
use rand::{Rng, RngExt};

use super::{compute_transform, PadFill, ResizeSpec, Transform};
use crate::error::BeardError;
use crate::imaging::ImageService;

/// Resizes and pads `image` according to `spec`.
///
/// Returns the new image together with the transform its boxes must go
/// through. Without a target the image is returned as is.
pub fn resize_image<S, R>(
    image: &RgbImage,
    spec: &ResizeSpec,
    service: &S,
    rng: &mut R,
) -> Result<(RgbImage, Transform), BeardError>
where
    S: ImageService + ?Sized,
    R: Rng + ?Sized,
{
    let plan = compute_transform((image.height(), image.width()), spec)?;
    if spec.target.is_none() {
        return Ok((image.clone(), plan.transform));
    }

    let (scaled_h, scaled_w) = plan.scaled_size;
    let scaled = service.resize(image, scaled_w, scaled_h);
    if plan.padding() == (0, 0) {
        return Ok((scaled, plan.transform));
    }

    let offset = (plan.transform.offset.0 as u32, plan.transform.offset.1 as u32);
    let canvas = pad_image(&scaled, plan.canvas_size, offset, spec.fill, rng);
    Ok((canvas, plan.transform))
}

/// Places `image` on a `(height, width)` canvas with its top-left corner at
/// `offset` (`(y, x)`) and fills the rest according to `fill`.
pub fn pad_image<R: Rng + ?Sized>(
    image: &RgbImage,
    canvas_size: (u32, u32),
    offset: (u32, u32),
    fill: PadFill,
    rng: &mut R,
) -> RgbImage {
    let (height, width) = canvas_size;
    let mut canvas = match fill {
        PadFill::Color(color) => RgbImage::from_pixel(width, height, Rgb(color)),
        PadFill::Mean => RgbImage::from_pixel(width, height, mean_color(image)),
        PadFill::Random => RgbImage::from_fn(width, height, |_, _| {
            Rgb([
                rng.random_range(0..=255u8),
                rng.random_range(0..=255u8),
                rng.random_range(0..=255u8),
            ])
        }),
        PadFill::Edge => {
            if image.width() == 0 || image.height() == 0 {
                RgbImage::new(width, height)
            } else {
                let (oy, ox) = (offset.0 as i64, offset.1 as i64);
                let max_x = image.width() as i64 - 1;
                let max_y = image.height() as i64 - 1;
                RgbImage::from_fn(width, height, |x, y| {
                    let sx = (x as i64 - ox).clamp(0, max_x) as u32;
                    let sy = (y as i64 - oy).clamp(0, max_y) as u32;
                    *image.get_pixel(sx, sy)
                })
            }
        }
    };

    image::imageops::replace(&mut canvas, image, offset.1 as i64, offset.0 as i64);
    canvas
}

/// Per-channel mean of all pixels, rounded.
pub fn mean_color(image: &RgbImage) -> Rgb<u8> {
    let count = image.width() as u64 * image.height() as u64;
    if count == 0 {
        return Rgb([0, 0, 0]);
    }
    let mut sums = [0u64; 3];
    for pixel in image.pixels() {
        for (sum, channel) in sums.iter_mut().zip(pixel.0) {
            *sum += channel as u64;
        }
    }
    let mean = |sum: u64| ((sum as f64 / count as f64).round()).min(255.0) as u8;
    Rgb([mean(sums[0]), mean(sums[1]), mean(sums[2])])
}
