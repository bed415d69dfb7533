//! Hard-negative synthesis: paint over every object and mark it `DONTCARE`.

use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, RngExt, SeedableRng};

use crate::error::BeardError;
use crate::geometry::pad::mean_color;
use crate::ir::{BBox, Pixel, Record, Value};
use crate::schema::CLASS_FIELD;

/// Class assigned to painted-over objects.
pub const DONTCARE: &str = "DONTCARE";

/// How an object's region is overwritten.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillMode {
    Color([u8; 3]),
    /// Per-channel mean of the untouched image.
    Mean,
    /// Uniform noise in `[0, 255]`.
    Random,
}

#[derive(Clone, Debug)]
pub struct NegativeOptions {
    pub fill: FillMode,
    /// Fraction of each axis' extent added on both sides of a box.
    pub margin: f64,
    pub box_field: String,
    pub class_field: String,
    pub seed: Option<u64>,
}

impl Default for NegativeOptions {
    fn default() -> Self {
        Self {
            fill: FillMode::Color([0, 0, 0]),
            margin: 0.1,
            box_field: "bbox".to_string(),
            class_field: CLASS_FIELD.to_string(),
            seed: None,
        }
    }
}

/// Overwrites the pixels covered by `region`, clipped to the image.
pub fn fill_patch<R: Rng + ?Sized>(
    image: &mut RgbImage,
    region: &BBox<Pixel>,
    fill: FillMode,
    mean: Rgb<u8>,
    rng: &mut R,
) {
    let (width, height) = image.dimensions();
    let region = region.clipped(height as f64, width as f64);
    let x0 = region.xmin().floor() as u32;
    let y0 = region.ymin().floor() as u32;
    let x1 = (region.xmax().ceil() as u32).min(width);
    let y1 = (region.ymax().ceil() as u32).min(height);

    for y in y0..y1 {
        for x in x0..x1 {
            let pixel = match fill {
                FillMode::Color(color) => Rgb(color),
                FillMode::Mean => mean,
                FillMode::Random => Rgb([
                    rng.random_range(0..=255u8),
                    rng.random_range(0..=255u8),
                    rng.random_range(0..=255u8),
                ]),
            };
            image.put_pixel(x, y, pixel);
        }
    }
}

/// Turns `records` into their negative counterparts.
pub fn negatives<I>(records: I, options: NegativeOptions) -> Negatives<I::IntoIter>
where
    I: IntoIterator<Item = Result<Record, BeardError>>,
{
    let seed = options.seed.unwrap_or_else(|| rand::rng().random());
    Negatives {
        records: records.into_iter(),
        options,
        rng: StdRng::seed_from_u64(seed),
    }
}

/// Lazy negative-sample stage; see [`negatives`].
pub struct Negatives<I> {
    records: I,
    options: NegativeOptions,
    rng: StdRng,
}

impl<I> Negatives<I> {
    fn convert(&mut self, mut record: Record) -> Record {
        let mean = mean_color(&record.image);
        let options = &self.options;
        for object in &mut record.objects {
            let Some(bbox) = object.get(&options.box_field).and_then(Value::as_bbox) else {
                continue;
            };
            let region = bbox.expanded(options.margin);
            fill_patch(&mut record.image, &region, options.fill, mean, &mut self.rng);
            object.insert(options.box_field.clone(), Value::Box(BBox::default()));
            object.insert(options.class_field.clone(), Value::from(DONTCARE));
        }
        record
    }
}

impl<I> Iterator for Negatives<I>
where
    I: Iterator<Item = Result<Record, BeardError>>,
{
    type Item = Result<Record, BeardError>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.records.next()?.map(|record| self.convert(record)))
    }
}
