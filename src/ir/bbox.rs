//! Axis-aligned bounding boxes in canonical y-x corner form.

use super::coord::Coord;
use super::{Normalized, Pixel};

/// An axis-aligned bounding box stored as its top-left (`min`) and
/// bottom-right (`max`) corners.
///
/// The flat representation used in annotation files and records is
/// `[y1, x1, y2, x2]`, see [`BBox::from_yxyx`] and [`BBox::to_yxyx`].
///
/// Note: the constructor does NOT enforce `min < max`. Geometric augmentation
/// can collapse a box, and callers decide what to do with it through
/// [`BBox::is_degenerate`].
pub struct BBox<TSpace> {
    pub min: Coord<TSpace>,
    pub max: Coord<TSpace>,
}

impl<TSpace> BBox<TSpace> {
    /// Creates a new bounding box from min and max coordinates.
    #[inline]
    pub fn new(min: Coord<TSpace>, max: Coord<TSpace>) -> Self {
        Self { min, max }
    }

    /// Creates a new bounding box from explicit corners in y-x order.
    #[inline]
    pub fn from_yxyx(y1: f64, x1: f64, y2: f64, x2: f64) -> Self {
        Self {
            min: Coord::new(y1, x1),
            max: Coord::new(y2, x2),
        }
    }

    /// Creates a box from its top-left corner and its height/width.
    #[inline]
    pub fn from_origin_size(y: f64, x: f64, height: f64, width: f64) -> Self {
        Self::from_yxyx(y, x, y + height, x + width)
    }

    /// Returns the smallest box containing every given point.
    ///
    /// An empty iterator yields the zero box.
    pub fn enclosing(points: impl IntoIterator<Item = Coord<TSpace>>) -> Self {
        let mut points = points.into_iter();
        let Some(first) = points.next() else {
            return Self::default();
        };
        let mut bbox = Self::new(first, first);
        for point in points {
            bbox.min.y = bbox.min.y.min(point.y);
            bbox.min.x = bbox.min.x.min(point.x);
            bbox.max.y = bbox.max.y.max(point.y);
            bbox.max.x = bbox.max.x.max(point.x);
        }
        bbox
    }

    #[inline]
    pub fn ymin(&self) -> f64 {
        self.min.y
    }

    #[inline]
    pub fn xmin(&self) -> f64 {
        self.min.x
    }

    #[inline]
    pub fn ymax(&self) -> f64 {
        self.max.y
    }

    #[inline]
    pub fn xmax(&self) -> f64 {
        self.max.x
    }

    /// Returns the width of the bounding box.
    ///
    /// May be negative if the box is malformed (xmax < xmin).
    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Returns the height of the bounding box.
    ///
    /// May be negative if the box is malformed (ymax < ymin).
    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Returns the area of the bounding box.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Returns true if all coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Returns true if the box has zero or negative extent on either axis.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    /// The four corners, clockwise from the top-left.
    pub fn corners(&self) -> [Coord<TSpace>; 4] {
        [
            self.min,
            Coord::new(self.min.y, self.max.x),
            self.max,
            Coord::new(self.max.y, self.min.x),
        ]
    }

    /// Flat `[y1, x1, y2, x2]` representation.
    #[inline]
    pub fn to_yxyx(&self) -> [f64; 4] {
        [self.min.y, self.min.x, self.max.y, self.max.x]
    }

    /// Grows each side by `margin` times the extent of its axis.
    pub fn expanded(&self, margin: f64) -> Self {
        let dy = self.height() * margin;
        let dx = self.width() * margin;
        Self::from_yxyx(
            self.min.y - dy,
            self.min.x - dx,
            self.max.y + dy,
            self.max.x + dx,
        )
    }
}

impl<TSpace> Clone for BBox<TSpace> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<TSpace> Copy for BBox<TSpace> {}

impl<TSpace> PartialEq for BBox<TSpace> {
    fn eq(&self, other: &Self) -> bool {
        self.min == other.min && self.max == other.max
    }
}

impl<TSpace> std::fmt::Debug for BBox<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBox")
            .field("ymin", &self.min.y)
            .field("xmin", &self.min.x)
            .field("ymax", &self.max.y)
            .field("xmax", &self.max.x)
            .finish()
    }
}

impl<TSpace> Default for BBox<TSpace> {
    fn default() -> Self {
        Self::from_yxyx(0.0, 0.0, 0.0, 0.0)
    }
}

impl BBox<Pixel> {
    /// Intersects the box with an image canvas of the given size.
    ///
    /// A box lying fully outside the canvas comes back degenerate.
    pub fn clipped(&self, height: f64, width: f64) -> Self {
        Self::from_yxyx(
            self.min.y.clamp(0.0, height),
            self.min.x.clamp(0.0, width),
            self.max.y.clamp(0.0, height),
            self.max.x.clamp(0.0, width),
        )
    }

    /// Converts pixel coordinates to fractions of the image size.
    pub fn to_normalized(&self, image_height: f64, image_width: f64) -> BBox<Normalized> {
        BBox::from_yxyx(
            self.min.y / image_height,
            self.min.x / image_width,
            self.max.y / image_height,
            self.max.x / image_width,
        )
    }
}

impl BBox<Normalized> {
    /// Converts fractions of the image size to pixel coordinates.
    pub fn to_pixel(&self, image_height: f64, image_width: f64) -> BBox<Pixel> {
        BBox::from_yxyx(
            self.min.y * image_height,
            self.min.x * image_width,
            self.max.y * image_height,
            self.max.x * image_width,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_from_yxyx() {
        let bbox: BBox<Pixel> = BBox::from_yxyx(20.0, 10.0, 80.0, 100.0);
        assert_eq!(bbox.ymin(), 20.0);
        assert_eq!(bbox.xmin(), 10.0);
        assert_eq!(bbox.ymax(), 80.0);
        assert_eq!(bbox.xmax(), 100.0);
        assert_eq!(bbox.to_yxyx(), [20.0, 10.0, 80.0, 100.0]);
    }

    #[test]
    fn test_bbox_dimensions() {
        let bbox: BBox<Pixel> = BBox::from_origin_size(20.0, 10.0, 60.0, 90.0);
        assert_eq!(bbox.width(), 90.0);
        assert_eq!(bbox.height(), 60.0);
        assert_eq!(bbox.area(), 5400.0);
    }

    #[test]
    fn test_bbox_degenerate() {
        let ok: BBox<Pixel> = BBox::from_yxyx(0.0, 0.0, 1.0, 1.0);
        assert!(!ok.is_degenerate());

        let flat: BBox<Pixel> = BBox::from_yxyx(5.0, 0.0, 5.0, 10.0);
        assert!(flat.is_degenerate());

        let inverted: BBox<Pixel> = BBox::from_yxyx(0.0, 10.0, 5.0, 2.0);
        assert!(inverted.is_degenerate());

        let nan: BBox<Pixel> = BBox::from_yxyx(f64::NAN, 0.0, 5.0, 2.0);
        assert!(nan.is_degenerate());
    }

    #[test]
    fn test_enclosing_rotated_corners() {
        let points = [
            Coord::<Pixel>::new(5.0, 0.0),
            Coord::new(0.0, 5.0),
            Coord::new(5.0, 10.0),
            Coord::new(10.0, 5.0),
        ];
        let bbox = BBox::enclosing(points);
        assert_eq!(bbox.to_yxyx(), [0.0, 0.0, 10.0, 10.0]);
    }

    #[test]
    fn test_copy_does_not_need_copyable_space() {
        // A space marker with no derives at all.
        struct Scratch;

        let bbox: BBox<Scratch> = BBox::from_yxyx(1.0, 2.0, 3.0, 4.0);
        let copy = bbox;
        assert_eq!(bbox, copy);
        assert_eq!(bbox.corners()[2], copy.max);
        let grown = BBox::enclosing(copy.corners());
        assert_eq!(grown.to_yxyx(), [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_clipped_outside_is_degenerate() {
        let bbox: BBox<Pixel> = BBox::from_yxyx(-20.0, -20.0, -5.0, -5.0);
        assert!(bbox.clipped(100.0, 100.0).is_degenerate());

        let partial: BBox<Pixel> = BBox::from_yxyx(-5.0, 90.0, 10.0, 120.0);
        assert_eq!(partial.clipped(100.0, 100.0).to_yxyx(), [0.0, 90.0, 10.0, 100.0]);
    }

    #[test]
    fn test_expanded_margin() {
        let bbox: BBox<Pixel> = BBox::from_yxyx(10.0, 20.0, 30.0, 60.0);
        assert_eq!(bbox.expanded(0.1).to_yxyx(), [8.0, 16.0, 32.0, 64.0]);
    }

    #[test]
    fn test_normalized_roundtrip() {
        let bbox: BBox<Normalized> = BBox::from_yxyx(0.1, 0.2, 0.5, 0.6);
        let px = bbox.to_pixel(100.0, 200.0);
        assert_eq!(px.to_yxyx(), [10.0, 40.0, 50.0, 120.0]);
        let back = px.to_normalized(100.0, 200.0);
        assert!((back.xmax() - 0.6).abs() < 1e-12);
    }
}
