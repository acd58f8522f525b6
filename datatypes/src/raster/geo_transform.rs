use crate::error;
use crate::primitives::{BoundingBox2D, Coordinate2D};
use crate::util::Result;
use serde::{Deserialize, Serialize};
use snafu::ensure;

use super::{GridIdx2D, PixelWindow};

/// This is a typedef for the `GDAL GeoTransform`. It represents an affine transformation matrix.
pub type GdalGeoTransform = [f64; 6];

/// The `GeoTransform` is a more user friendly representation of the `GDAL GeoTransform` affine transformation matrix.
///
/// Rotation terms are not supported; rasters are north-up (or south-up) grids.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_coordinate: Coordinate2D,
    pub x_pixel_size: f64,
    pub y_pixel_size: f64,
}

impl GeoTransform {
    /// Generates a new `GeoTransform`
    ///
    /// # Examples
    ///
    /// ```
    /// use hexstats_datatypes::raster::GeoTransform;
    ///
    /// let geo_transform = GeoTransform::new((0.0, 0.0).into(), 1.0, -1.0);
    /// ```
    ///
    pub fn new(origin_coordinate: Coordinate2D, x_pixel_size: f64, y_pixel_size: f64) -> Self {
        Self {
            origin_coordinate,
            x_pixel_size,
            y_pixel_size,
        }
    }

    /// Generates a new `GeoTransform` with explicit x, y values of the upper left edge
    pub fn new_with_coordinate_x_y(
        origin_coordinate_x: f64,
        x_pixel_size: f64,
        origin_coordinate_y: f64,
        y_pixel_size: f64,
    ) -> Self {
        Self {
            origin_coordinate: (origin_coordinate_x, origin_coordinate_y).into(),
            x_pixel_size,
            y_pixel_size,
        }
    }

    /// Checks that both pixel sizes are finite and non-zero
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.x_pixel_size.is_finite()
                && self.y_pixel_size.is_finite()
                && self.x_pixel_size != 0.0
                && self.y_pixel_size != 0.0,
            error::InvalidGeoTransform {
                reason: "pixel sizes must be finite and non-zero"
            }
        );
        ensure!(
            self.origin_coordinate.is_finite(),
            error::InvalidGeoTransform {
                reason: "origin must be finite"
            }
        );
        Ok(())
    }

    /// Transforms a grid coordinate `[row, column]` into the SRS coordinate (x,y) of the pixel's upper left edge
    ///
    /// # Examples
    ///
    /// ```
    /// use hexstats_datatypes::raster::GeoTransform;
    ///
    /// let geo_transform = GeoTransform::new_with_coordinate_x_y(0.0, 1.0, 0.0, -1.0);
    /// assert_eq!(geo_transform.grid_idx_to_coordinate_2d([0, 0]), (0.0, 0.0).into())
    /// ```
    ///
    pub fn grid_idx_to_coordinate_2d(&self, grid_index: GridIdx2D) -> Coordinate2D {
        let [row, column] = grid_index;
        let coord_x = self.origin_coordinate.x + (column as f64) * self.x_pixel_size;
        let coord_y = self.origin_coordinate.y + (row as f64) * self.y_pixel_size;
        Coordinate2D::new(coord_x, coord_y)
    }

    /// The SRS coordinate of the pixel's center
    pub fn pixel_center(&self, grid_index: GridIdx2D) -> Coordinate2D {
        let [row, column] = grid_index;
        let coord_x = self.origin_coordinate.x + (column as f64 + 0.5) * self.x_pixel_size;
        let coord_y = self.origin_coordinate.y + (row as f64 + 0.5) * self.y_pixel_size;
        Coordinate2D::new(coord_x, coord_y)
    }

    /// The footprint of a pixel in SRS coordinates
    pub fn pixel_bounds(&self, grid_index: GridIdx2D) -> BoundingBox2D {
        let [row, column] = grid_index;
        let a = self.grid_idx_to_coordinate_2d(grid_index);
        let b = self.grid_idx_to_coordinate_2d([row + 1, column + 1]);
        BoundingBox2D::new_unchecked(a.min_elements(b), a.max_elements(b))
    }

    /// Transforms an SRS coordinate (x,y) into a fractional `(row, column)` position
    pub fn coordinate_to_fractional_grid_idx(&self, coord: Coordinate2D) -> (f64, f64) {
        let column = (coord.x - self.origin_coordinate.x) / self.x_pixel_size;
        let row = (coord.y - self.origin_coordinate.y) / self.y_pixel_size;
        (row, column)
    }

    /// The footprint of a `rows` × `columns` grid in SRS coordinates
    pub fn grid_bounds(&self, rows: usize, columns: usize) -> BoundingBox2D {
        let a = self.origin_coordinate;
        let b = self.grid_idx_to_coordinate_2d([rows, columns]);
        BoundingBox2D::new_unchecked(a.min_elements(b), a.max_elements(b))
    }

    /// All pixels of a `rows` × `columns` grid whose footprint intersects `bounding_box`.
    ///
    /// Returns `None` if the box lies completely outside the grid.
    pub fn pixel_window(
        &self,
        bounding_box: BoundingBox2D,
        rows: usize,
        columns: usize,
    ) -> Option<PixelWindow> {
        if rows == 0 || columns == 0 || !self.grid_bounds(rows, columns).intersects_bbox(&bounding_box) {
            return None;
        }

        let (row_a, column_a) = self.coordinate_to_fractional_grid_idx(bounding_box.upper_left());
        let (row_b, column_b) = self.coordinate_to_fractional_grid_idx(bounding_box.lower_right());

        let clamp = |value: f64, max: usize| -> usize { value.max(0.0).min(max as f64) as usize };

        let row_start = clamp(row_a.min(row_b).floor(), rows);
        let row_end = clamp(row_a.max(row_b).floor() + 1.0, rows);
        let column_start = clamp(column_a.min(column_b).floor(), columns);
        let column_end = clamp(column_a.max(column_b).floor() + 1.0, columns);

        if row_start >= row_end || column_start >= column_end {
            return None;
        }

        Some(PixelWindow {
            row_start,
            row_end,
            column_start,
            column_end,
        })
    }

    /// The mean edge length of a pixel in SRS units
    pub fn mean_pixel_size(&self) -> f64 {
        (self.x_pixel_size.abs() + self.y_pixel_size.abs()) / 2.0
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        GeoTransform::new_with_coordinate_x_y(0.0, 1.0, 0.0, -1.0)
    }
}

impl From<GdalGeoTransform> for GeoTransform {
    fn from(gdal_geo_transform: GdalGeoTransform) -> Self {
        Self::new_with_coordinate_x_y(
            gdal_geo_transform[0],
            gdal_geo_transform[1],
            // gdal_geo_transform[2],
            gdal_geo_transform[3],
            // gdal_geo_transform[4],
            gdal_geo_transform[5],
        )
    }
}

impl From<GeoTransform> for GdalGeoTransform {
    fn from(geo_transform: GeoTransform) -> GdalGeoTransform {
        [
            geo_transform.origin_coordinate.x,
            geo_transform.x_pixel_size,
            0.0, // self.x_rotation,
            geo_transform.origin_coordinate.y,
            0.0, // self.y_rotation,
            geo_transform.y_pixel_size,
        ]
    }
}
