//! Randomized augmentation of record streams.
//!
//! For every output sample an [`AugmentPlan`] is drawn: a random, randomly
//! ordered subset (at least one) of the enabled operation kinds, each with
//! concrete parameters. The plan is applied to the pixels and to every box of
//! the record, so geometry stays consistent. Boxes are clipped to the canvas
//! afterwards and objects whose box collapsed are dropped.

pub mod affine;
pub mod ops;

pub use affine::{AffineParams, WarpFill};
pub use ops::{OpKind, RealizedOp};

use std::fmt;
use std::fs;
use std::path::Path;

use image::RgbImage;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngExt, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BeardError;
use crate::ir::{BBox, Fields, Pixel, Record, Split, Value};
use crate::schema::is_yaml;

/// Enabled operations and their ranges; absent keys disable an operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentParams {
    /// Probability of a horizontal flip.
    pub flip: Option<f64>,
    /// Maximum Gaussian blur sigma.
    pub blur: Option<f32>,
    /// Maximum pixels cropped per side.
    pub crop: Option<u32>,
    /// Contrast multiplier range `[lo, hi]`.
    pub contrast: Option<[f64; 2]>,
    /// `[strength, per_channel_probability]`; sigma is drawn up to `strength * 255`.
    pub noise: Option<[f64; 2]>,
    /// Probability of the affine operation.
    pub transform: Option<f64>,
    /// Affine scale range `[lo, hi]`.
    pub scale: Option<[f64; 2]>,
    /// Affine translation as a fraction of the image size.
    pub translate: Option<f64>,
    /// Affine rotation limit in degrees.
    pub rotate: Option<f64>,
    /// Affine shear limit in degrees.
    pub shear: Option<f64>,
    /// Augmented samples per input record.
    pub per_img: usize,
    /// Also emit the untouched input before its variants.
    pub keep: bool,
    /// Splits to augment; others pass through. `None` augments all.
    pub stages: Option<Vec<Split>>,
    pub seed: Option<u64>,
}

impl Default for AugmentParams {
    fn default() -> Self {
        Self {
            flip: None,
            blur: None,
            crop: None,
            contrast: None,
            noise: None,
            transform: None,
            scale: None,
            translate: None,
            rotate: None,
            shear: None,
            per_img: 1,
            keep: false,
            stages: None,
            seed: None,
        }
    }
}

impl AugmentParams {
    /// Parses a JSON parameter document.
    pub fn from_json_str(json: &str) -> Result<Self, BeardError> {
        let params: Self = serde_json::from_str(json).map_err(|err| invalid(err.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Reads a JSON or YAML parameter file, chosen by extension.
    pub fn from_path(path: &Path) -> Result<Self, BeardError> {
        let data = fs::read_to_string(path)?;
        if !is_yaml(path) {
            return Self::from_json_str(&data);
        }
        let params: Self = serde_yaml::from_str(&data).map_err(|err| invalid(err.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Enabled kinds in canonical order.
    pub fn kinds(&self) -> Vec<OpKind> {
        let mut kinds = Vec::new();
        if self.flip.is_some() {
            kinds.push(OpKind::Flip);
        }
        if self.blur.is_some() {
            kinds.push(OpKind::Blur);
        }
        if self.crop.is_some() {
            kinds.push(OpKind::Crop);
        }
        if self.contrast.is_some() {
            kinds.push(OpKind::Contrast);
        }
        if self.noise.is_some() {
            kinds.push(OpKind::Noise);
        }
        if self.transform.is_some() {
            kinds.push(OpKind::Affine);
        }
        kinds
    }

    pub fn validate(&self) -> Result<(), BeardError> {
        check_probability("flip", self.flip)?;
        check_probability("transform", self.transform)?;
        if let Some(blur) = self.blur {
            if !(blur >= 0.0 && blur.is_finite()) {
                return Err(invalid(format!("blur must be a non-negative sigma, got {blur}")));
            }
        }
        if let Some([lo, hi]) = self.contrast {
            check_range("contrast", lo, hi)?;
        }
        if let Some([strength, per_channel]) = self.noise {
            check_probability("noise strength", Some(strength))?;
            check_probability("noise per-channel", Some(per_channel))?;
        }
        if let Some([lo, hi]) = self.scale {
            check_range("scale", lo, hi)?;
        }
        for (name, value) in [
            ("translate", self.translate),
            ("rotate", self.rotate),
            ("shear", self.shear),
        ] {
            if let Some(v) = value {
                if !(v >= 0.0 && v.is_finite()) {
                    return Err(invalid(format!("{name} must be a non-negative limit, got {v}")));
                }
            }
        }
        if let Some(shear) = self.shear {
            if shear >= 90.0 {
                return Err(invalid(format!("shear must stay below 90 degrees, got {shear}")));
            }
        }
        if self.per_img == 0 {
            return Err(invalid("per_img must be at least 1"));
        }
        Ok(())
    }

    fn augments(&self, split: Split) -> bool {
        self.stages
            .as_ref()
            .map(|stages| stages.contains(&split))
            .unwrap_or(true)
    }
}

fn invalid(message: impl Into<String>) -> BeardError {
    BeardError::InvalidAugmentParams {
        message: message.into(),
    }
}

fn check_probability(name: &str, value: Option<f64>) -> Result<(), BeardError> {
    match value {
        Some(p) if !(0.0..=1.0).contains(&p) => {
            Err(invalid(format!("{name} must be in [0, 1], got {p}")))
        }
        _ => Ok(()),
    }
}

fn check_range(name: &str, lo: f64, hi: f64) -> Result<(), BeardError> {
    if !(lo > 0.0 && lo <= hi && hi.is_finite()) {
        return Err(invalid(format!(
            "{name} range [{lo}, {hi}] must be positive and ordered"
        )));
    }
    Ok(())
}

/// One realization: the ordered operations applied to one output sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AugmentPlan {
    pub ops: Vec<RealizedOp>,
}

impl AugmentPlan {
    /// Draws a plan for an image of `size` (`(height, width)`).
    pub fn draw<R: Rng + ?Sized>(
        kinds: &[OpKind],
        params: &AugmentParams,
        size: (u32, u32),
        rng: &mut R,
    ) -> Self {
        if kinds.is_empty() {
            return Self::default();
        }
        let mut chosen = kinds.to_vec();
        chosen.shuffle(rng);
        chosen.truncate(rng.random_range(1..=kinds.len()));

        let ops = chosen
            .into_iter()
            .filter_map(|kind| RealizedOp::draw(kind, params, size, rng))
            .collect();
        Self { ops }
    }

    pub fn apply_image(&self, image: &RgbImage) -> RgbImage {
        self.ops
            .iter()
            .fold(image.clone(), |acc, op| op.apply_image(&acc))
    }

    /// Maps a box through every geometric op and clips it to the canvas.
    ///
    /// Returns `None` when the result has no area.
    pub fn apply_box(&self, bbox: &BBox<Pixel>, size: (u32, u32)) -> Option<BBox<Pixel>> {
        let mapped = self
            .ops
            .iter()
            .fold(*bbox, |acc, op| op.apply_box(&acc, size))
            .clipped(size.0 as f64, size.1 as f64);
        (!mapped.is_degenerate() && mapped.is_finite()).then_some(mapped)
    }

    /// Produces the augmented copy of `record`.
    ///
    /// Objects with any collapsed box are removed.
    pub fn apply(&self, record: &Record) -> Record {
        let size = record.size();
        let objects = record
            .objects
            .iter()
            .filter_map(|object| self.apply_object(object, size))
            .collect();
        Record {
            image: self.apply_image(&record.image),
            global: record.global.clone(),
            objects,
            split: record.split,
        }
    }

    fn apply_object(&self, object: &Fields, size: (u32, u32)) -> Option<Fields> {
        let mut out = object.clone();
        for value in out.values_mut() {
            if let Value::Box(bbox) = value {
                *bbox = self.apply_box(bbox, size)?;
            }
        }
        Some(out)
    }
}

impl fmt::Display for AugmentPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self
            .ops
            .iter()
            .map(|op| match op {
                RealizedOp::FlipHorizontal => "flip",
                RealizedOp::GaussianBlur { .. } => "blur",
                RealizedOp::Crop { .. } => "crop",
                RealizedOp::Contrast { .. } => "contrast",
                RealizedOp::AdditiveNoise { .. } => "noise",
                RealizedOp::Affine { .. } => "affine",
            })
            .collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// Post-processing hook: receives the augmented objects, the global data and
/// the realized plan; returns their replacements.
pub type MetaHook = Box<dyn FnMut(Vec<Fields>, Fields, &AugmentPlan) -> (Vec<Fields>, Fields)>;

/// Wraps `records` in an [`Augmenter`] after validating `params`.
pub fn augment<I>(records: I, params: AugmentParams) -> Result<Augmenter<I::IntoIter>, BeardError>
where
    I: IntoIterator<Item = Result<Record, BeardError>>,
{
    params.validate()?;
    let seed = params.seed.unwrap_or_else(|| rand::rng().random());
    Ok(Augmenter {
        records: records.into_iter(),
        kinds: params.kinds(),
        params,
        rng: StdRng::seed_from_u64(seed),
        hook: None,
        current: None,
    })
}

/// Lazy augmentation stage; see [`augment`].
pub struct Augmenter<I> {
    records: I,
    params: AugmentParams,
    kinds: Vec<OpKind>,
    rng: StdRng,
    hook: Option<MetaHook>,
    /// Record being expanded and the number of variants still owed.
    current: Option<(Record, usize)>,
}

impl<I> Augmenter<I> {
    pub fn with_hook(
        mut self,
        hook: impl FnMut(Vec<Fields>, Fields, &AugmentPlan) -> (Vec<Fields>, Fields) + 'static,
    ) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    fn variant(&mut self, record: &Record) -> Record {
        let plan = AugmentPlan::draw(&self.kinds, &self.params, record.size(), &mut self.rng);
        let mut out = plan.apply(record);
        let dropped = record.objects.len() - out.objects.len();
        if dropped > 0 {
            debug!("plan {plan} dropped {dropped} collapsed objects");
        }
        if let Some(hook) = self.hook.as_mut() {
            let (objects, global) = hook(std::mem::take(&mut out.objects), out.global, &plan);
            out.objects = objects;
            out.global = global;
        }
        out
    }
}

impl<I> Iterator for Augmenter<I>
where
    I: Iterator<Item = Result<Record, BeardError>>,
{
    type Item = Result<Record, BeardError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((record, remaining)) = self.current.take() {
            let out = self.variant(&record);
            if remaining > 1 {
                self.current = Some((record, remaining - 1));
            }
            return Some(Ok(out));
        }

        let record = match self.records.next()? {
            Ok(record) => record,
            Err(err) => return Some(Err(err)),
        };
        if !self.params.augments(record.split) {
            return Some(Ok(record));
        }

        let per_img = self.params.per_img;
        if self.params.keep {
            self.current = Some((record.clone(), per_img));
            return Some(Ok(record));
        }

        let out = self.variant(&record);
        if per_img > 1 {
            self.current = Some((record, per_img - 1));
        }
        Some(Ok(out))
    }
}
