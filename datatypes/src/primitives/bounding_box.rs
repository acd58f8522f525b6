use super::Coordinate2D;
use crate::error;
use crate::util::Result;
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;

#[derive(Copy, Clone, Serialize, Deserialize, PartialEq, Debug)]
#[repr(C)]
/// The bounding box of a geometry.
/// Note: may degenerate to a point!
pub struct BoundingBox2D {
    lower_left_coordinate: Coordinate2D,
    upper_right_coordinate: Coordinate2D,
}

impl BoundingBox2D {
    /// Creates a new bounding box
    ///
    /// # Examples
    ///
    /// ```
    /// use hexstats_datatypes::primitives::{Coordinate2D, BoundingBox2D};
    ///
    /// let ll = Coordinate2D::new(1.0, 1.0);
    /// let ur = Coordinate2D::new(2.0, 2.0);
    /// let bbox = BoundingBox2D::new(ll, ur).unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// This constructor fails if the coordinate's values are not in order
    ///
    pub fn new(
        lower_left_coordinate: Coordinate2D,
        upper_right_coordinate: Coordinate2D,
    ) -> Result<Self> {
        ensure!(
            lower_left_coordinate.x <= upper_right_coordinate.x
                && lower_left_coordinate.y <= upper_right_coordinate.y,
            error::InvalidBoundingBox {
                lower_left_coordinate,
                upper_right_coordinate
            }
        );
        Ok(Self {
            lower_left_coordinate,
            upper_right_coordinate,
        })
    }

    pub fn new_unchecked(
        lower_left_coordinate: Coordinate2D,
        upper_right_coordinate: Coordinate2D,
    ) -> Self {
        Self {
            lower_left_coordinate,
            upper_right_coordinate,
        }
    }

    /// Creates a bounding box from `(west, south, east, north)` edges, the order used by
    /// catalog searches.
    ///
    /// # Examples
    ///
    /// ```
    /// use hexstats_datatypes::primitives::BoundingBox2D;
    ///
    /// let bbox = BoundingBox2D::from_edges(4.0, 51.8, 5.0, 52.2).unwrap();
    /// assert_eq!(bbox.edges(), (4.0, 51.8, 5.0, 52.2));
    /// ```
    ///
    pub fn from_edges(west: f64, south: f64, east: f64, north: f64) -> Result<Self> {
        Self::new((west, south).into(), (east, north).into())
    }

    /// Returns the `Coordnate2D` representing the lower left edge of the bounding box
    pub fn lower_left(&self) -> Coordinate2D {
        self.lower_left_coordinate
    }

    /// Returns the `Coordnate2D` representing the upper right edge of the bounding box
    pub fn upper_right(&self) -> Coordinate2D {
        self.upper_right_coordinate
    }

    pub fn upper_left(&self) -> Coordinate2D {
        (self.lower_left_coordinate.x, self.upper_right_coordinate.y).into()
    }

    pub fn lower_right(&self) -> Coordinate2D {
        (self.upper_right_coordinate.x, self.lower_left_coordinate.y).into()
    }

    pub fn west(&self) -> f64 {
        self.lower_left_coordinate.x
    }

    pub fn south(&self) -> f64 {
        self.lower_left_coordinate.y
    }

    pub fn east(&self) -> f64 {
        self.upper_right_coordinate.x
    }

    pub fn north(&self) -> f64 {
        self.upper_right_coordinate.y
    }

    /// The edges as `(west, south, east, north)`
    pub fn edges(&self) -> (f64, f64, f64, f64) {
        (self.west(), self.south(), self.east(), self.north())
    }

    pub fn size_x(&self) -> f64 {
        self.east() - self.west()
    }

    pub fn size_y(&self) -> f64 {
        self.north() - self.south()
    }

    /// Returns the smallest bounding box that contains `self` and `other`
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            lower_left_coordinate: self
                .lower_left_coordinate
                .min_elements(other.lower_left_coordinate),
            upper_right_coordinate: self
                .upper_right_coordinate
                .max_elements(other.upper_right_coordinate),
        }
    }

    /// Creates the bounding box of a set of coordinates, `None` if there are none
    pub fn from_coord_iter<I>(coordinates: I) -> Option<Self>
    where
        I: IntoIterator<Item = Coordinate2D>,
    {
        let mut iter = coordinates.into_iter();
        let first = iter.next()?;

        let (lower_left, upper_right) = iter.fold((first, first), |(ll, ur), c| {
            (ll.min_elements(c), ur.max_elements(c))
        });

        Some(Self::new_unchecked(lower_left, upper_right))
    }

    /// Checks if a coordinate lies within the bounding box (edges inclusive)
    pub fn contains_coordinate(&self, coordinate: &Coordinate2D) -> bool {
        coordinate.x >= self.west()
            && coordinate.y >= self.south()
            && coordinate.x <= self.east()
            && coordinate.y <= self.north()
    }

    /// Checks if `other` lies completely within the bounding box
    pub fn contains_bbox(&self, other: &Self) -> bool {
        self.contains_coordinate(&other.lower_left_coordinate)
            && self.contains_coordinate(&other.upper_right_coordinate)
    }

    /// Checks if the two boxes share at least one point
    pub fn intersects_bbox(&self, other: &Self) -> bool {
        self.west() <= other.east()
            && other.west() <= self.east()
            && self.south() <= other.north()
            && other.south() <= self.north()
    }
}

impl fmt::Display for BoundingBox2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BoundingBox2D(west: {}, south: {}, east: {}, north: {})",
            self.west(),
            self.south(),
            self.east(),
            self.north()
        )
    }
}

impl From<geo::Rect<f64>> for BoundingBox2D {
    fn from(rect: geo::Rect<f64>) -> Self {
        Self::new_unchecked(rect.min().into(), rect.max().into())
    }
}

impl From<BoundingBox2D> for geo::Rect<f64> {
    fn from(bbox: BoundingBox2D) -> geo::Rect<f64> {
        geo::Rect::new(bbox.lower_left_coordinate, bbox.upper_right_coordinate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_new() {
        let ll = Coordinate2D::new(1.0, 1.0);
        let ur = Coordinate2D::new(2.0, 2.0);
        BoundingBox2D::new(ll, ur).unwrap();
    }

    #[test]
    fn bounding_box_new_illegal() {
        let ll = Coordinate2D::new(1.0, 1.0);
        let ur = Coordinate2D::new(2.0, 2.0);
        assert!(BoundingBox2D::new(ur, ll).is_err());
    }

    #[test]
    fn union() {
        let a = BoundingBox2D::from_edges(0.0, 0.0, 1.0, 1.0).unwrap();
        let b = BoundingBox2D::from_edges(-1.0, 0.5, 0.5, 3.0).unwrap();

        let union = a.union(&b);

        assert_eq!(union.edges(), (-1.0, 0.0, 1.0, 3.0));
        assert!(union.contains_bbox(&a));
        assert!(union.contains_bbox(&b));
    }

    #[test]
    fn from_coord_iter() {
        let bbox = BoundingBox2D::from_coord_iter([
            Coordinate2D::new(2.0, 1.0),
            Coordinate2D::new(-1.0, 4.0),
            Coordinate2D::new(0.0, -3.0),
        ])
        .unwrap();

        assert_eq!(bbox.edges(), (-1.0, -3.0, 2.0, 4.0));
        assert!(BoundingBox2D::from_coord_iter(std::iter::empty()).is_none());
    }

    #[test]
    fn intersects() {
        let a = BoundingBox2D::from_edges(0.0, 0.0, 1.0, 1.0).unwrap();
        let touching = BoundingBox2D::from_edges(1.0, 0.0, 2.0, 1.0).unwrap();
        let apart = BoundingBox2D::from_edges(1.5, 1.5, 2.0, 2.0).unwrap();

        assert!(a.intersects_bbox(&touching));
        assert!(!a.intersects_bbox(&apart));
    }
}
