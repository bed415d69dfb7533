//! Realized augmentation operations.
//!
//! A [`RealizedOp`] holds concrete parameters drawn once per output sample.
//! The same value transforms the pixels and every box of that sample.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, RngExt, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use super::affine::{warp_box, warp_image, AffineParams, WarpFill};
use super::AugmentParams;
use crate::ir::{BBox, Pixel};

/// The operation families that can be enabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Flip,
    Blur,
    Crop,
    Contrast,
    Noise,
    Affine,
}

/// One operation with fixed parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum RealizedOp {
    /// Mirror along the vertical axis.
    FlipHorizontal,
    GaussianBlur {
        sigma: f32,
    },
    /// Pixels removed from each side; the rest is resized back.
    Crop {
        top: u32,
        right: u32,
        bottom: u32,
        left: u32,
    },
    /// `v' = 128 + alpha * (v - 128)`.
    Contrast {
        alpha: f64,
    },
    AdditiveNoise {
        sigma: f64,
        per_channel: bool,
        seed: u64,
    },
    /// Scale, shear, rotation and translation about the canvas center.
    Affine { params: AffineParams, fill: WarpFill },
}

impl RealizedOp {
    /// Draws parameters for `kind` on an image of `size` (`(height, width)`).
    ///
    /// Returns `None` when a probabilistic op (flip, affine) does not fire
    /// for this sample.
    pub fn draw<R: Rng + ?Sized>(
        kind: OpKind,
        params: &AugmentParams,
        size: (u32, u32),
        rng: &mut R,
    ) -> Option<RealizedOp> {
        let (height, width) = size;
        match kind {
            OpKind::Flip => {
                let p = params.flip.unwrap_or(0.0);
                (rng.random::<f64>() < p).then_some(RealizedOp::FlipHorizontal)
            }
            OpKind::Blur => {
                let max = params.blur.unwrap_or(0.0).max(0.0);
                Some(RealizedOp::GaussianBlur {
                    sigma: rng.random_range(0.0..=max),
                })
            }
            OpKind::Crop => {
                let px = params.crop.unwrap_or(0);
                // Leave at least one pixel per axis.
                let max_x = px.min(width.saturating_sub(1) / 2);
                let max_y = px.min(height.saturating_sub(1) / 2);
                Some(RealizedOp::Crop {
                    top: rng.random_range(0..=max_y),
                    right: rng.random_range(0..=max_x),
                    bottom: rng.random_range(0..=max_y),
                    left: rng.random_range(0..=max_x),
                })
            }
            OpKind::Contrast => {
                let [lo, hi] = params.contrast.unwrap_or([1.0, 1.0]);
                Some(RealizedOp::Contrast {
                    alpha: rng.random_range(lo..=hi),
                })
            }
            OpKind::Noise => {
                let [strength, per_channel] = params.noise.unwrap_or([0.0, 0.0]);
                Some(RealizedOp::AdditiveNoise {
                    sigma: rng.random_range(0.0..=strength * 255.0),
                    per_channel: rng.random::<f64>() < per_channel,
                    seed: rng.random(),
                })
            }
            OpKind::Affine => {
                let p = params.transform.unwrap_or(0.0);
                if rng.random::<f64>() >= p {
                    return None;
                }
                let [lo, hi] = params.scale.unwrap_or([1.0, 1.0]);
                let translate = params.translate.unwrap_or(0.0);
                let rotate = params.rotate.unwrap_or(0.0);
                let shear = params.shear.unwrap_or(0.0);

                let (w, h) = (width as f64, height as f64);
                let affine = AffineParams {
                    scale_x: rng.random_range(lo..=hi) as f32,
                    scale_y: rng.random_range(lo..=hi) as f32,
                    translate_x: (rng.random_range(-translate..=translate) * w) as f32,
                    translate_y: (rng.random_range(-translate..=translate) * h) as f32,
                    rotate: rng.random_range(-rotate..=rotate) as f32,
                    shear: rng.random_range(-shear..=shear) as f32,
                    center: ((w / 2.0) as f32, (h / 2.0) as f32),
                };

                let fill = if rng.random::<bool>() {
                    WarpFill::Constant(rng.random_range(0..=255u8))
                } else {
                    WarpFill::Edge
                };
                Some(RealizedOp::Affine {
                    params: affine,
                    fill,
                })
            }
        }
    }

    pub fn is_geometric(&self) -> bool {
        matches!(
            self,
            RealizedOp::FlipHorizontal | RealizedOp::Crop { .. } | RealizedOp::Affine { .. }
        )
    }

    /// Applies the operation to pixels. The canvas size never changes.
    pub fn apply_image(&self, image: &RgbImage) -> RgbImage {
        match self {
            RealizedOp::FlipHorizontal => imageops::flip_horizontal(image),
            RealizedOp::GaussianBlur { sigma } => {
                if *sigma <= 0.0 {
                    image.clone()
                } else {
                    imageops::blur(image, *sigma)
                }
            }
            RealizedOp::Crop {
                top,
                right,
                bottom,
                left,
            } => {
                let (width, height) = image.dimensions();
                let inner_w = width.saturating_sub(left + right).max(1);
                let inner_h = height.saturating_sub(top + bottom).max(1);
                let cropped = imageops::crop_imm(image, *left, *top, inner_w, inner_h).to_image();
                imageops::resize(&cropped, width, height, FilterType::Triangle)
            }
            RealizedOp::Contrast { alpha } => {
                let mut out = image.clone();
                for pixel in out.pixels_mut() {
                    for channel in pixel.0.iter_mut() {
                        let v = 128.0 + alpha * (*channel as f64 - 128.0);
                        *channel = v.round().clamp(0.0, 255.0) as u8;
                    }
                }
                out
            }
            RealizedOp::AdditiveNoise {
                sigma,
                per_channel,
                seed,
            } => add_noise(image, *sigma, *per_channel, *seed),
            RealizedOp::Affine { params, fill } => warp_image(image, params, *fill),
        }
    }

    /// Maps a box on a `(height, width)` canvas. Photometric ops return it
    /// unchanged.
    pub fn apply_box(&self, bbox: &BBox<Pixel>, size: (u32, u32)) -> BBox<Pixel> {
        let (h, w) = (size.0 as f64, size.1 as f64);
        match self {
            RealizedOp::FlipHorizontal => {
                BBox::from_yxyx(bbox.ymin(), w - bbox.xmax(), bbox.ymax(), w - bbox.xmin())
            }
            RealizedOp::Crop {
                top,
                right,
                bottom,
                left,
            } => {
                let inner_w = (w - (*left + *right) as f64).max(1.0);
                let inner_h = (h - (*top + *bottom) as f64).max(1.0);
                let (fx, fy) = (w / inner_w, h / inner_h);
                let (l, t) = (*left as f64, *top as f64);
                BBox::from_yxyx(
                    (bbox.ymin() - t) * fy,
                    (bbox.xmin() - l) * fx,
                    (bbox.ymax() - t) * fy,
                    (bbox.xmax() - l) * fx,
                )
            }
            RealizedOp::Affine { params, .. } => warp_box(bbox, params),
            RealizedOp::GaussianBlur { .. }
            | RealizedOp::Contrast { .. }
            | RealizedOp::AdditiveNoise { .. } => *bbox,
        }
    }
}

fn add_noise(image: &RgbImage, sigma: f64, per_channel: bool, seed: u64) -> RgbImage {
    if sigma <= 0.0 {
        return image.clone();
    }
    let Ok(normal) = Normal::new(0.0, sigma) else {
        return image.clone();
    };
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let shared = normal.sample(&mut rng);
        let Rgb(channels) = pixel;
        for channel in channels.iter_mut() {
            let delta = if per_channel {
                normal.sample(&mut rng)
            } else {
                shared
            };
            *channel = (*channel as f64 + delta).round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}
