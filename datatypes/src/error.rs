use crate::primitives::Coordinate2D;
use crate::spatial_reference::SpatialReference;
use chrono::NaiveDate;
use snafu::Snafu;
use std::convert::Infallible;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), context(suffix(false)))]
pub enum Error {
    #[snafu(display("Invalid H3 cell identifier `{}`: {}", cell, source))]
    InvalidCell {
        cell: String,
        source: h3o::error::InvalidCellIndex,
    },

    #[snafu(display("No H3 cell at resolution {} contains {}", resolution, coordinate))]
    InvalidCellLocation {
        coordinate: Coordinate2D,
        resolution: u8,
    },

    #[snafu(display("A cell batch must contain at least one cell"))]
    EmptyCellBatch,

    #[snafu(display(
        "Cells of a batch must share one resolution: expected {}, found {} for cell `{}`",
        expected,
        found,
        cell
    ))]
    MixedResolution {
        expected: u8,
        found: u8,
        cell: String,
    },

    #[snafu(display(
        "The conditions ll.x <= ur.x && ll.y <= ur.y are not met by ll:{} ur:{}",
        lower_left_coordinate,
        upper_right_coordinate
    ))]
    InvalidBoundingBox {
        lower_left_coordinate: Coordinate2D,
        upper_right_coordinate: Coordinate2D,
    },

    #[snafu(display("Start `{}` must be before end `{}`", start, end))]
    TimeWindowEndBeforeStart { start: NaiveDate, end: NaiveDate },

    #[snafu(display("Cannot parse date `{}`: {}", value, source))]
    ParseDate {
        value: String,
        source: chrono::ParseError,
    },

    #[snafu(display(
        "Invalid date range `{}`, expected `YYYY-MM-DD/YYYY-MM-DD` or `YYYY-MM`",
        range
    ))]
    InvalidDateRange { range: String },

    #[snafu(display("A time step must be greater than zero"))]
    InvalidTimeStep,

    #[snafu(display("Date `{}` cannot be shifted by {} months", date, months))]
    DateOutOfRange { date: NaiveDate, months: u32 },

    #[snafu(display(
        "Raster data does not match its dimensions: expected {} elements, found {}",
        expected,
        found
    ))]
    DimensionCapacityDoesNotMatchDataCapacity { expected: usize, found: usize },

    #[snafu(display("Invalid GeoTransform. Reason: \"{}\".", reason))]
    InvalidGeoTransform { reason: &'static str },

    #[snafu(display("Raster slice {} is out of bounds for {} slices", slice, slices))]
    SliceOutOfBounds { slice: usize, slices: usize },

    #[snafu(display("InvalidSpatialReferenceString: {}", spatial_reference_string))]
    InvalidSpatialReferenceString { spatial_reference_string: String },

    #[snafu(display("ParseU32: {}", source))]
    ParseU32 {
        source: <u32 as std::str::FromStr>::Err,
    },

    #[snafu(display("No projection definition known for {}", spatial_reference))]
    UnknownSpatialReference { spatial_reference: SpatialReference },

    #[snafu(display("Could not create a projector from {} to {}: {}", from, to, reason))]
    NoCoordinateProjector {
        from: SpatialReference,
        to: SpatialReference,
        reason: String,
    },

    #[snafu(display("Could not project coordinate {}: {}", coordinate, reason))]
    CoordinateProjection {
        coordinate: Coordinate2D,
        reason: String,
    },
}

impl From<Infallible> for Error {
    fn from(_: Infallible) -> Self {
        unreachable!("This function cannot be called on a non-failing type")
    }
}
