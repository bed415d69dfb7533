//! Affine warps built on `imageproc` projections.
//!
//! An [`AffineParams`] is drawn once per sample. Its [`Projection`] moves the
//! pixels and every box corner, so both always agree.

use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{warp, warp_with, Interpolation, Projection};

use crate::ir::{BBox, Coord, Pixel};

/// Realized affine parameters, applied about the canvas center in the order
/// scale, shear, rotate, translate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffineParams {
    pub scale_x: f32,
    pub scale_y: f32,
    /// Offset in pixels.
    pub translate_x: f32,
    pub translate_y: f32,
    /// Degrees, counter-clockwise on screen.
    pub rotate: f32,
    /// Degrees; `x' = x + tan(shear) * y`.
    pub shear: f32,
    /// `(x, y)` pivot, usually the canvas center.
    pub center: (f32, f32),
}

impl AffineParams {
    /// Pure translation about `center`.
    pub fn translation(tx: f32, ty: f32, center: (f32, f32)) -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            translate_x: tx,
            translate_y: ty,
            rotate: 0.0,
            shear: 0.0,
            center,
        }
    }

    /// Source-to-destination projection, or `None` if it collapses the plane.
    pub fn projection(&self) -> Option<Projection> {
        let scale_ok = |s: f32| s.is_finite() && s.abs() > f32::EPSILON;
        if !scale_ok(self.scale_x) || !scale_ok(self.scale_y) {
            return None;
        }
        let tan = self.shear.to_radians().tan();
        if !tan.is_finite() {
            return None;
        }
        let shear = Projection::from_matrix([1.0, tan, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])?;
        let (cx, cy) = self.center;

        // Right-most factor applies first.
        Some(
            Projection::translate(cx + self.translate_x, cy + self.translate_y)
                * Projection::rotate(-self.rotate.to_radians())
                * shear
                * Projection::scale(self.scale_x, self.scale_y)
                * Projection::translate(-cx, -cy),
        )
    }
}

/// How pixels mapped from outside the source are filled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WarpFill {
    /// Constant grey level.
    Constant(u8),
    /// Nearest border pixel.
    Edge,
}

/// Warps `image` on a canvas of the same size, sampling nearest neighbours.
pub fn warp_image(image: &RgbImage, params: &AffineParams, fill: WarpFill) -> RgbImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    let Some(projection) = params.projection() else {
        return match fill {
            WarpFill::Constant(v) => RgbImage::from_pixel(width, height, Rgb([v, v, v])),
            WarpFill::Edge => image.clone(),
        };
    };

    match fill {
        WarpFill::Constant(v) => warp(image, &projection, Interpolation::Nearest, Rgb([v, v, v])),
        WarpFill::Edge => {
            let inverse = projection.invert();
            let (max_x, max_y) = ((width - 1) as f32, (height - 1) as f32);
            warp_with(
                image,
                move |x, y| {
                    let (sx, sy) = inverse * (x, y);
                    (sx.clamp(0.0, max_x), sy.clamp(0.0, max_y))
                },
                Interpolation::Nearest,
                Rgb([0, 0, 0]),
            )
        }
    }
}

/// Box enclosing the four projected corners of `bbox`.
///
/// A collapsing projection yields the zero box.
pub fn warp_box(bbox: &BBox<Pixel>, params: &AffineParams) -> BBox<Pixel> {
    let Some(projection) = params.projection() else {
        return BBox::default();
    };
    BBox::enclosing(bbox.corners().into_iter().map(|corner| {
        let (x, y) = projection * (corner.x as f32, corner.y as f32);
        Coord::new(y as f64, x as f64)
    }))
}
