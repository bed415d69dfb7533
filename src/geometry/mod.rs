//! Resize/pad geometry and box normalization.
//!
//! [`compute_transform`] decides how a source image is mapped onto a target
//! canvas and returns the [`Transform`] (`target = source * scale + offset`)
//! that every box of the same image must go through. [`normalize_box`]
//! applies it to a raw box-array, whatever its declared order and reference.

pub mod pad;

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::BeardError;
use crate::ir::{BBox, Coord, Normalized, Pixel};
use crate::schema::{BoxOrder, BoxReference};

pub use pad::{pad_image, resize_image};

/// Requested output size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TargetSize {
    /// A square canvas; `Fit` scales by the longer source edge.
    Square(u32),
    /// An explicit canvas.
    Exact { height: u32, width: u32 },
}

impl TargetSize {
    /// `(height, width)` of the canvas.
    pub fn dims(&self) -> (u32, u32) {
        match *self {
            TargetSize::Square(size) => (size, size),
            TargetSize::Exact { height, width } => (height, width),
        }
    }

    /// Interprets a config value: an integer or a `[height, width]` pair.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, BeardError> {
        match value {
            serde_json::Value::Number(n) => {
                let size = n
                    .as_u64()
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| BeardError::Geometry(format!("size {n} is not a valid edge")))?;
                TargetSize::try_from(&[size][..])
            }
            serde_json::Value::Array(items) => {
                let dims = items
                    .iter()
                    .map(|item| item.as_u64().and_then(|v| u32::try_from(v).ok()))
                    .collect::<Option<Vec<u32>>>()
                    .ok_or_else(|| {
                        BeardError::Geometry(format!("size {value} must contain integers"))
                    })?;
                TargetSize::try_from(dims.as_slice())
            }
            other => Err(BeardError::Geometry(format!(
                "size has unknown type ({other})"
            ))),
        }
    }
}

impl TryFrom<&[u32]> for TargetSize {
    type Error = BeardError;

    fn try_from(dims: &[u32]) -> Result<Self, Self::Error> {
        let size = match *dims {
            [size] => TargetSize::Square(size),
            [height, width] => TargetSize::Exact { height, width },
            _ => {
                return Err(BeardError::Geometry(format!(
                    "size must have one or two entries, found {}",
                    dims.len()
                )));
            }
        };
        let (height, width) = size.dims();
        if height == 0 || width == 0 {
            return Err(BeardError::Geometry(format!(
                "size {height}x{width} must be positive"
            )));
        }
        Ok(size)
    }
}

impl FromStr for TargetSize {
    type Err = BeardError;

    /// `"416"` or `"HEIGHTxWIDTH"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dims = s
            .split(['x', 'X', ','])
            .map(|part| part.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| BeardError::Geometry(format!("cannot parse size '{s}'")))?;
        TargetSize::try_from(dims.as_slice())
    }
}

impl<'de> Deserialize<'de> for TargetSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        TargetSize::from_json(&value).map_err(de::Error::custom)
    }
}

/// How the source is scaled onto the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// One factor for both axes; the rest of the canvas is padding.
    #[default]
    Fit,
    /// Independent factors per axis; no padding.
    Stretch,
}

impl FromStr for ResizeMode {
    type Err = BeardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fit" => Ok(ResizeMode::Fit),
            "stretch" => Ok(ResizeMode::Stretch),
            other => Err(BeardError::Geometry(format!(
                "unknown resize mode '{other}' (expected fit or stretch)"
            ))),
        }
    }
}

/// Where the scaled image sits on the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadPlacement {
    /// Flush top-left; padding on the bottom and right.
    #[default]
    Edge,
    /// Centered; the leading margin is the floor of half the padding.
    Center,
}

impl FromStr for PadPlacement {
    type Err = BeardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "edge" => Ok(PadPlacement::Edge),
            "center" | "centre" => Ok(PadPlacement::Center),
            other => Err(BeardError::Geometry(format!(
                "unknown pad placement '{other}' (expected edge or center)"
            ))),
        }
    }
}

/// What the padding is filled with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PadFill {
    Color([u8; 3]),
    /// Per-channel mean of the scaled image.
    Mean,
    /// Replicates the nearest border pixel.
    Edge,
    /// Uniform noise in `[0, 255]`.
    Random,
}

impl Default for PadFill {
    fn default() -> Self {
        PadFill::Color([0, 0, 0])
    }
}

impl FromStr for PadFill {
    type Err = BeardError;

    /// Named colors, `mean`, `edge`, `random`, or an `r,g,b` triple.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fill = match s.trim().to_ascii_lowercase().as_str() {
            "black" => PadFill::Color([0, 0, 0]),
            "red" => PadFill::Color([255, 0, 0]),
            "green" => PadFill::Color([0, 255, 0]),
            "blue" => PadFill::Color([0, 0, 255]),
            "mean" => PadFill::Mean,
            "edge" => PadFill::Edge,
            "random" => PadFill::Random,
            other => {
                let channels = other
                    .split(',')
                    .map(|c| c.trim().parse::<u8>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| BeardError::Geometry(format!("unknown pad fill '{s}'")))?;
                let [r, g, b] = channels[..] else {
                    return Err(BeardError::Geometry(format!("unknown pad fill '{s}'")));
                };
                PadFill::Color([r, g, b])
            }
        };
        Ok(fill)
    }
}

/// Everything needed to resize and pad one image.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ResizeSpec {
    /// `None` keeps images untouched.
    pub target: Option<TargetSize>,
    pub mode: ResizeMode,
    pub placement: PadPlacement,
    pub fill: PadFill,
}

impl ResizeSpec {
    pub fn new(target: TargetSize) -> Self {
        Self {
            target: Some(target),
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: ResizeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_placement(mut self, placement: PadPlacement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_fill(mut self, fill: PadFill) -> Self {
        self.fill = fill;
        self
    }
}

/// Mapping from source pixels to target pixels: `target = source * scale + offset`.
///
/// Both pairs are `(y, x)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub scale: (f64, f64),
    pub offset: (f64, f64),
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            scale: (1.0, 1.0),
            offset: (0.0, 0.0),
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Maps a point; receives both scale and offset.
    pub fn apply(&self, point: Coord<Pixel>) -> Coord<Pixel> {
        point
            .scaled(self.scale.0, self.scale.1)
            .translated(self.offset.0, self.offset.1)
    }

    pub fn apply_bbox(&self, bbox: &BBox<Pixel>) -> BBox<Pixel> {
        BBox::new(self.apply(bbox.min), self.apply(bbox.max))
    }

    /// The mapping from target pixels back to source pixels.
    pub fn inverse(&self) -> Self {
        let (sy, sx) = self.scale;
        Self {
            scale: (1.0 / sy, 1.0 / sx),
            offset: (-self.offset.0 / sy, -self.offset.1 / sx),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scale=({:.4}, {:.4}) offset=({}, {})",
            self.scale.0, self.scale.1, self.offset.0, self.offset.1
        )
    }
}

/// Outcome of [`compute_transform`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResizePlan {
    /// `(height, width)` of the scaled image before padding.
    pub scaled_size: (u32, u32),
    /// `(height, width)` of the final canvas.
    pub canvas_size: (u32, u32),
    pub transform: Transform,
}

impl ResizePlan {
    /// Total padding `(height, width)` around the scaled image.
    pub fn padding(&self) -> (u32, u32) {
        (
            self.canvas_size.0 - self.scaled_size.0,
            self.canvas_size.1 - self.scaled_size.1,
        )
    }
}

/// Computes the scaled size, canvas size and transform for one image.
///
/// `source` is `(height, width)`. Without a target the plan is the
/// identity.
pub fn compute_transform(source: (u32, u32), spec: &ResizeSpec) -> Result<ResizePlan, BeardError> {
    let (src_h, src_w) = source;
    if src_h == 0 || src_w == 0 {
        return Err(BeardError::Geometry(format!(
            "source image {src_h}x{src_w} has no pixels"
        )));
    }

    let Some(target) = spec.target else {
        return Ok(ResizePlan {
            scaled_size: source,
            canvas_size: source,
            transform: Transform::identity(),
        });
    };

    let (dst_h, dst_w) = target.dims();
    if dst_h == 0 || dst_w == 0 {
        return Err(BeardError::Geometry(format!(
            "target size {dst_h}x{dst_w} must be positive"
        )));
    }

    let fy = dst_h as f64 / src_h as f64;
    let fx = dst_w as f64 / src_w as f64;

    let (scale, scaled_size) = match spec.mode {
        ResizeMode::Stretch => ((fy, fx), (dst_h, dst_w)),
        ResizeMode::Fit => {
            let f = fy.min(fx);
            let scaled = (
                scaled_edge(src_h, f).min(dst_h),
                scaled_edge(src_w, f).min(dst_w),
            );
            ((f, f), scaled)
        }
    };

    let margin = (dst_h - scaled_size.0, dst_w - scaled_size.1);
    let offset = match spec.placement {
        PadPlacement::Edge => (0, 0),
        PadPlacement::Center => (margin.0 / 2, margin.1 / 2),
    };

    Ok(ResizePlan {
        scaled_size,
        canvas_size: (dst_h, dst_w),
        transform: Transform {
            scale,
            offset: (offset.0 as f64, offset.1 as f64),
        },
    })
}

/// `ceil(edge * factor)`, tolerant to floating-point noise, at least 1.
fn scaled_edge(edge: u32, factor: f64) -> u32 {
    ((edge as f64 * factor - 1e-9).ceil() as u32).max(1)
}

/// Normalizes a raw box-array onto the transformed image.
///
/// The result is always absolute `[y1, x1, y2, x2]`. For relative boxes the
/// four values are origin and size as fractions of `source` (`(height,
/// width)`): the origin receives scale and offset, the size only scale.
pub fn normalize_box(
    raw: [f64; 4],
    order: BoxOrder,
    reference: BoxReference,
    source: (u32, u32),
    transform: &Transform,
) -> BBox<Pixel> {
    let [a, b, c, d] = match order {
        BoxOrder::YX => raw,
        BoxOrder::XY => [raw[1], raw[0], raw[3], raw[2]],
    };

    match reference {
        BoxReference::Absolute => transform.apply_bbox(&BBox::from_yxyx(a, b, c, d)),
        BoxReference::Relative => {
            // Mapping both corners leaves the size with scale only.
            let relative = BBox::<Normalized>::from_origin_size(a, b, c, d);
            transform.apply_bbox(&relative.to_pixel(source.0 as f64, source.1 as f64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn no_target_is_identity() {
        let plan = compute_transform((30, 40), &ResizeSpec::default()).expect("plan");
        assert!(plan.transform.is_identity());
        assert_eq!(plan.canvas_size, (30, 40));
        assert_eq!(plan.padding(), (0, 0));
    }

    #[test]
    fn same_size_target_is_identity() {
        let spec = ResizeSpec::new(TargetSize::Exact {
            height: 100,
            width: 200,
        });
        let first = compute_transform((100, 200), &spec).expect("plan");
        let second = compute_transform(first.canvas_size, &spec).expect("plan");
        assert_eq!(first.transform, Transform::identity());
        assert_eq!(second.transform, Transform::identity());
    }

    #[test]
    fn fit_uses_the_limiting_edge() {
        let spec = ResizeSpec::new(TargetSize::Exact {
            height: 50,
            width: 50,
        });
        let plan = compute_transform((100, 200), &spec).expect("plan");
        assert_eq!(plan.transform.scale, (0.25, 0.25));
        assert_eq!(plan.scaled_size, (25, 50));
        assert_eq!(plan.padding(), (25, 0));
        assert_eq!(plan.transform.offset, (0.0, 0.0));

        let centered = compute_transform((100, 200), &spec.with_placement(PadPlacement::Center))
            .expect("plan");
        assert_eq!(centered.transform.offset, (12.0, 0.0));
    }

    #[test]
    fn square_target_scales_by_longer_edge() {
        let plan = compute_transform((300, 150), &ResizeSpec::new(TargetSize::Square(100)))
            .expect("plan");
        assert!(approx(plan.transform.scale.0, 1.0 / 3.0));
        assert_eq!(plan.scaled_size, (100, 50));
        assert_eq!(plan.canvas_size, (100, 100));
    }

    #[test]
    fn stretch_scales_axes_independently() {
        let spec = ResizeSpec::new(TargetSize::Exact {
            height: 50,
            width: 50,
        })
        .with_mode(ResizeMode::Stretch);
        let plan = compute_transform((100, 200), &spec).expect("plan");
        assert_eq!(plan.transform.scale, (0.5, 0.25));
        assert_eq!(plan.padding(), (0, 0));
    }

    #[test]
    fn center_padding_floors_the_leading_edge() {
        let spec = ResizeSpec::new(TargetSize::Exact {
            height: 10,
            width: 9,
        })
        .with_placement(PadPlacement::Center);
        let plan = compute_transform((4, 4), &spec).expect("plan");
        // f = min(2.5, 2.25) = 2.25 -> 9x9, one row of margin.
        assert_eq!(plan.scaled_size, (9, 9));
        assert_eq!(plan.transform.offset, (0.0, 0.0));

        let plan = compute_transform((2, 4), &spec).expect("plan");
        // f = 2.25 -> 5x9 (ceil 4.5), margin 5 -> offset 2.
        assert_eq!(plan.scaled_size, (5, 9));
        assert_eq!(plan.transform.offset, (2.0, 0.0));
    }

    #[test]
    fn zero_sizes_are_geometry_errors() {
        assert!(matches!(
            compute_transform((0, 10), &ResizeSpec::default()),
            Err(BeardError::Geometry(_))
        ));
        assert!(TargetSize::try_from(&[0u32][..]).is_err());
        assert!(TargetSize::try_from(&[1u32, 2, 3][..]).is_err());
    }

    #[test]
    fn target_size_parsing() {
        assert_eq!("416".parse::<TargetSize>().ok(), Some(TargetSize::Square(416)));
        assert_eq!(
            "240x320".parse::<TargetSize>().ok(),
            Some(TargetSize::Exact {
                height: 240,
                width: 320
            })
        );
        assert!("big".parse::<TargetSize>().is_err());

        let from_json = TargetSize::from_json(&serde_json::json!([64, 32])).expect("pair");
        assert_eq!(from_json.dims(), (64, 32));
        let err = TargetSize::from_json(&serde_json::json!("large")).unwrap_err();
        assert!(matches!(err, BeardError::Geometry(_)));
    }

    #[test]
    fn pad_fill_parsing() {
        assert_eq!("blue".parse::<PadFill>().ok(), Some(PadFill::Color([0, 0, 255])));
        assert_eq!("10, 20,30".parse::<PadFill>().ok(), Some(PadFill::Color([10, 20, 30])));
        assert_eq!("MEAN".parse::<PadFill>().ok(), Some(PadFill::Mean));
        assert!("1,2".parse::<PadFill>().is_err());
    }

    #[test]
    fn relative_xy_box_is_swapped_and_scaled() {
        let transform = Transform {
            scale: (2.0, 2.0),
            offset: (0.0, 0.0),
        };
        let bbox = normalize_box(
            [0.1, 0.2, 0.3, 0.4],
            BoxOrder::XY,
            BoxReference::Relative,
            (100, 100),
            &transform,
        );
        let [y1, x1, y2, x2] = bbox.to_yxyx();
        assert!(approx(y1, 0.2 * 2.0 * 100.0));
        assert!(approx(x1, 0.1 * 2.0 * 100.0));
        assert!(approx(y2, 40.0 + 0.4 * 2.0 * 100.0));
        assert!(approx(x2, 20.0 + 0.3 * 2.0 * 100.0));
    }

    #[test]
    fn relative_size_is_not_offset() {
        let transform = Transform {
            scale: (0.5, 0.5),
            offset: (10.0, 0.0),
        };
        let bbox = normalize_box(
            [0.5, 0.5, 0.25, 0.25],
            BoxOrder::YX,
            BoxReference::Relative,
            (200, 100),
            &transform,
        );
        assert!(approx(bbox.ymin(), 60.0));
        assert!(approx(bbox.xmin(), 25.0));
        assert!(approx(bbox.height(), 25.0));
        assert!(approx(bbox.width(), 12.5));
    }

    #[test]
    fn absolute_xy_box_receives_offset_on_both_corners() {
        let transform = Transform {
            scale: (0.5, 0.25),
            offset: (4.0, 0.0),
        };
        let bbox = normalize_box(
            [40.0, 10.0, 80.0, 30.0],
            BoxOrder::XY,
            BoxReference::Absolute,
            (100, 200),
            &transform,
        );
        assert_eq!(bbox.to_yxyx(), [9.0, 10.0, 19.0, 20.0]);
    }

    #[test]
    fn inverse_undoes_transform() {
        let transform = Transform {
            scale: (0.5, 2.0),
            offset: (3.0, 7.0),
        };
        let point = Coord::<Pixel>::new(12.0, 5.0);
        let back = transform.inverse().apply(transform.apply(point));
        assert!(approx(back.y, 12.0));
        assert!(approx(back.x, 5.0));
    }
}
