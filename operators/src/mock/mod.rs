mod mock_raster_source;

pub use mock_raster_source::{MockRasterSource, MockResponse};
