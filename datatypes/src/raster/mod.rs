mod geo_transform;
mod pixel_window;
mod raster_field;

pub use self::geo_transform::{GdalGeoTransform, GeoTransform};
pub use self::pixel_window::{GridIdx2D, PixelWindow};
pub use self::raster_field::RasterField;
