mod bounding_box;
mod coordinate;
mod time_step;
mod time_window;

pub use bounding_box::BoundingBox2D;
pub use coordinate::Coordinate2D;
pub use time_step::{TimeGranularity, TimeStep};
pub use time_window::{DateRange, TimeWindow};
