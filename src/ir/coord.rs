//! Typed coordinate values using PhantomData for compile-time safety.

use std::marker::PhantomData;

/// A 2D point with a type-level marker for the coordinate space.
///
/// Fields are named `y` and `x` and constructors take them in that order,
/// matching the y-x convention used by every normalized record.
pub struct Coord<TSpace> {
    pub y: f64,
    pub x: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> Coord<TSpace> {
    /// Creates a new coordinate from its row (`y`) and column (`x`).
    #[inline]
    pub fn new(y: f64, x: f64) -> Self {
        Self {
            y,
            x,
            _space: PhantomData,
        }
    }

    /// Returns true if both coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Multiplies each axis by its own factor.
    #[inline]
    pub fn scaled(&self, sy: f64, sx: f64) -> Self {
        Self::new(self.y * sy, self.x * sx)
    }

    /// Shifts the point by the given offsets.
    #[inline]
    pub fn translated(&self, oy: f64, ox: f64) -> Self {
        Self::new(self.y + oy, self.x + ox)
    }
}

impl<TSpace> Clone for Coord<TSpace> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<TSpace> Copy for Coord<TSpace> {}

impl<TSpace> PartialEq for Coord<TSpace> {
    fn eq(&self, other: &Self) -> bool {
        self.y == other.y && self.x == other.x
    }
}

impl<TSpace> std::fmt::Debug for Coord<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coord")
            .field("y", &self.y)
            .field("x", &self.x)
            .finish()
    }
}

impl<TSpace> Default for Coord<TSpace> {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Pixel;

    #[test]
    fn test_coord_creation() {
        let coord: Coord<Pixel> = Coord::new(20.0, 10.0);
        assert_eq!(coord.y, 20.0);
        assert_eq!(coord.x, 10.0);
    }

    #[test]
    fn test_coord_is_finite() {
        let finite: Coord<Pixel> = Coord::new(10.0, 20.0);
        assert!(finite.is_finite());

        let nan: Coord<Pixel> = Coord::new(f64::NAN, 20.0);
        assert!(!nan.is_finite());
    }

    #[test]
    fn test_scale_then_translate() {
        let coord: Coord<Pixel> = Coord::new(10.0, 4.0);
        let moved = coord.scaled(2.0, 0.5).translated(1.0, 3.0);
        assert_eq!(moved.y, 21.0);
        assert_eq!(moved.x, 5.0);
    }
}
