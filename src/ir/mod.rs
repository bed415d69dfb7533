//! In-memory representation shared by every stage.
//!
//! Loaders decode annotation files of any configured layout into
//! [`Record`]s; augmentation, negative sampling and the writer only ever see
//! this representation.
//!
//! # Design Principles
//!
//! 1. **Type Safety**: marker types keep pixel boxes apart from boxes stored
//!    relative to the image size.
//!
//! 2. **Canonical Format**: every normalized box is `[y1, x1, y2, x2]` in
//!    absolute pixels of the record's own image.
//!
//! 3. **Permissive Construction**: boxes may be degenerate; the stages that
//!    can produce degenerate boxes decide whether to drop them.
//!
//! # Example
//!
//! ```
//! use beardstore::ir::{BBox, Fields, Pixel, Record, Split, Value};
//! use image::RgbImage;
//!
//! let mut object = Fields::new();
//! object.insert("class".into(), Value::from("Car"));
//! object.insert("bbox".into(), Value::Box(BBox::<Pixel>::from_yxyx(10.0, 20.0, 40.0, 80.0)));
//!
//! let record = Record::new(RgbImage::new(100, 100), Split::Training).with_objects(vec![object]);
//! assert_eq!(record.objects.len(), 1);
//! ```

mod bbox;
mod coord;
mod record;
mod space;
mod value;

// Re-export core types for convenient access
pub use bbox::BBox;
pub use coord::Coord;
pub use record::{Record, Split};
pub use space::{Normalized, Pixel};
pub use value::{Fields, Value};
