use crate::error::{self, Error};
use crate::primitives::BoundingBox2D;
use crate::spatial_reference::SpatialReference;
use crate::util::Result;
use ndarray::{Array2, Array3, ArrayView2, Axis};
use snafu::ensure;

use super::{GeoTransform, GridIdx2D, PixelWindow};

/// An in-memory raster with a time axis.
///
/// Pixels are stored as `f64` in a `slices × rows × columns` array. All slices share
/// one affine transform and one spatial reference. A pixel is nodata if it equals
/// the no-data value or is `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterField {
    data: Array3<f64>,
    geo_transform: GeoTransform,
    spatial_reference: SpatialReference,
    no_data_value: Option<f64>,
}

impl RasterField {
    /// Creates a new raster field from a three dimensional array
    ///
    /// # Errors
    ///
    /// This constructor fails if the geo transform has zero or non-finite pixel sizes
    ///
    pub fn new(
        data: Array3<f64>,
        geo_transform: GeoTransform,
        spatial_reference: SpatialReference,
        no_data_value: Option<f64>,
    ) -> Result<Self> {
        geo_transform.validate()?;

        Ok(Self {
            data,
            geo_transform,
            spatial_reference,
            no_data_value,
        })
    }

    /// Creates a raster field with a single time slice
    pub fn from_slice(
        data: Array2<f64>,
        geo_transform: GeoTransform,
        spatial_reference: SpatialReference,
        no_data_value: Option<f64>,
    ) -> Result<Self> {
        Self::new(
            data.insert_axis(Axis(0)),
            geo_transform,
            spatial_reference,
            no_data_value,
        )
    }

    /// Creates a raster field from a flat, row-major vector of `slices × rows × columns` values
    ///
    /// # Examples
    ///
    /// ```
    /// use hexstats_datatypes::raster::{GeoTransform, RasterField};
    /// use hexstats_datatypes::spatial_reference::SpatialReference;
    ///
    /// let field = RasterField::from_vec(
    ///     [1, 2, 3],
    ///     vec![1., 2., 3., 4., 5., 6.],
    ///     GeoTransform::default(),
    ///     SpatialReference::epsg_4326(),
    ///     None,
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(field.get(0, [1, 2]), Some(6.));
    /// ```
    ///
    /// # Errors
    ///
    /// This constructor fails if the data's length does not match the shape
    ///
    pub fn from_vec(
        shape: [usize; 3],
        data: Vec<f64>,
        geo_transform: GeoTransform,
        spatial_reference: SpatialReference,
        no_data_value: Option<f64>,
    ) -> Result<Self> {
        let [slices, rows, columns] = shape;
        let expected = slices * rows * columns;
        ensure!(
            data.len() == expected,
            error::DimensionCapacityDoesNotMatchDataCapacity {
                expected,
                found: data.len(),
            }
        );

        let data = Array3::from_shape_vec((slices, rows, columns), data).map_err(|_| {
            Error::DimensionCapacityDoesNotMatchDataCapacity {
                expected,
                found: expected,
            }
        })?;

        Self::new(data, geo_transform, spatial_reference, no_data_value)
    }

    pub fn slices(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn rows(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn columns(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    pub fn geo_transform(&self) -> &GeoTransform {
        &self.geo_transform
    }

    pub fn spatial_reference(&self) -> SpatialReference {
        self.spatial_reference
    }

    pub fn no_data_value(&self) -> Option<f64> {
        self.no_data_value
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    /// The pixel value at `[row, column]` of slice `slice`, `None` if out of bounds
    pub fn get(&self, slice: usize, grid_index: GridIdx2D) -> Option<f64> {
        let [row, column] = grid_index;
        self.data.get((slice, row, column)).copied()
    }

    #[allow(clippy::float_cmp)]
    pub fn is_no_data(&self, value: f64) -> bool {
        value.is_nan() || self.no_data_value.is_some_and(|no_data| value == no_data)
    }

    /// A view on one time slice
    pub fn slice(&self, slice: usize) -> Result<ArrayView2<'_, f64>> {
        ensure!(
            slice < self.slices(),
            error::SliceOutOfBounds {
                slice,
                slices: self.slices(),
            }
        );
        Ok(self.data.index_axis(Axis(0), slice))
    }

    /// The spatial extent in the raster's spatial reference
    pub fn bounds(&self) -> BoundingBox2D {
        self.geo_transform.grid_bounds(self.rows(), self.columns())
    }

    /// All pixels whose footprint intersects `bounding_box`, `None` if it lies outside the raster
    pub fn pixel_window(&self, bounding_box: BoundingBox2D) -> Option<PixelWindow> {
        self.geo_transform
            .pixel_window(bounding_box, self.rows(), self.columns())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn field() -> RasterField {
        RasterField::from_slice(
            array![[1., 2., -1.], [f64::NAN, 5., 6.]],
            GeoTransform::new_with_coordinate_x_y(10.0, 0.5, 20.0, -0.5),
            SpatialReference::epsg_4326(),
            Some(-1.),
        )
        .unwrap()
    }

    #[test]
    fn shape() {
        let field = field();

        assert_eq!(field.slices(), 1);
        assert_eq!(field.rows(), 2);
        assert_eq!(field.columns(), 3);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn get() {
        let field = field();

        assert_eq!(field.get(0, [1, 1]), Some(5.));
        assert_eq!(field.get(0, [2, 0]), None);
        assert_eq!(field.get(1, [0, 0]), None);
    }

    #[test]
    fn no_data() {
        let field = field();

        assert!(field.is_no_data(-1.));
        assert!(field.is_no_data(f64::NAN));
        assert!(!field.is_no_data(0.));
    }

    #[test]
    fn bounds() {
        assert_eq!(field().bounds().edges(), (10.0, 19.0, 11.5, 20.0));
    }

    #[test]
    fn slice_out_of_bounds() {
        let field = field();

        assert!(field.slice(0).is_ok());
        assert!(field.slice(1).is_err());
    }

    #[test]
    fn from_vec_checks_capacity() {
        let result = RasterField::from_vec(
            [2, 2, 2],
            vec![0.; 7],
            GeoTransform::default(),
            SpatialReference::epsg_4326(),
            None,
        );

        assert!(result.is_err());
    }

    #[test]
    fn invalid_geo_transform() {
        let result = RasterField::from_slice(
            array![[1.]],
            GeoTransform::new_with_coordinate_x_y(0.0, 0.0, 0.0, -1.0),
            SpatialReference::epsg_4326(),
            None,
        );

        assert!(result.is_err());
    }
}
