use float_cmp::{ApproxEq, F64Margin};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, PartialOrd, Serialize, Default)]
#[repr(C)]
pub struct Coordinate2D {
    pub x: f64,
    pub y: f64,
}

impl Coordinate2D {
    /// Creates a new coordinate
    ///
    /// # Examples
    ///
    /// ```
    /// use hexstats_datatypes::primitives::Coordinate2D;
    ///
    /// let c = Coordinate2D::new(1.0, 0.0);
    ///
    /// assert_eq!(c.x, 1.0);
    /// assert_eq!(c.y, 0.0);
    /// ```
    ///
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn min_elements(&self, other: Self) -> Self {
        Coordinate2D {
            x: self.x.min(other.x),
            y: self.y.min(other.y),
        }
    }

    #[must_use]
    pub fn max_elements(&self, other: Self) -> Self {
        Coordinate2D {
            x: self.x.max(other.x),
            y: self.y.max(other.y),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl fmt::Display for Coordinate2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(f64, f64)> for Coordinate2D {
    fn from(tuple: (f64, f64)) -> Self {
        let (x, y) = tuple;
        Self { x, y }
    }
}

impl From<[f64; 2]> for Coordinate2D {
    fn from(array: [f64; 2]) -> Self {
        let [x, y] = array;
        Self { x, y }
    }
}

impl From<Coordinate2D> for (f64, f64) {
    fn from(coordinate: Coordinate2D) -> (f64, f64) {
        (coordinate.x, coordinate.y)
    }
}

impl From<geo::Coord<f64>> for Coordinate2D {
    fn from(coordinate: geo::Coord<f64>) -> Self {
        Self {
            x: coordinate.x,
            y: coordinate.y,
        }
    }
}

impl From<Coordinate2D> for geo::Coord<f64> {
    fn from(coordinate: Coordinate2D) -> geo::Coord<f64> {
        geo::Coord {
            x: coordinate.x,
            y: coordinate.y,
        }
    }
}

impl ApproxEq for Coordinate2D {
    type Margin = F64Margin;

    fn approx_eq<M: Into<Self::Margin>>(self, other: Self, margin: M) -> bool {
        let m = margin.into();
        self.x.approx_eq(other.x, m) && self.y.approx_eq(other.y, m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn min_max_elements() {
        let a = Coordinate2D::new(1.0, 4.0);
        let b = Coordinate2D::new(3.0, 2.0);

        assert_eq!(a.min_elements(b), (1.0, 2.0).into());
        assert_eq!(a.max_elements(b), (3.0, 4.0).into());
    }

    #[test]
    fn geo_round_trip() {
        let c = Coordinate2D::new(-145.91, 60.66);
        let geo_coord: geo::Coord<f64> = c.into();

        assert!(approx_eq!(Coordinate2D, geo_coord.into(), c));
    }
}
