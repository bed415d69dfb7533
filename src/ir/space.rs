//! Coordinate space marker types.
//!
//! Zero-sized types used as type parameters so that boxes measured in image
//! pixels cannot be mixed up with boxes stored as fractions of the image size.

use std::fmt;

/// Marker type for absolute pixel coordinates.
///
/// (0, 0) is the top-left corner of the image; y grows downward.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Marker type for coordinates relative to the image size (0.0 to 1.0).
///
/// Boxes declared with `bb_type: relative` in a dataset config are decoded
/// into this space before they are scaled onto the source image.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalized {}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Normalized {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}
