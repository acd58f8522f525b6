mod raster_source;
mod source_config;

pub use raster_source::RasterSource;
pub use source_config::{BandConfig, ColumnNaming, SourceConfig};
