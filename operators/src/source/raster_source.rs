use async_trait::async_trait;
use hexstats_datatypes::primitives::{BoundingBox2D, TimeWindow};
use hexstats_datatypes::raster::RasterField;

use crate::util::Result;

/// Searches a catalog and loads the matching raster data.
///
/// Implementations wrap remote catalogs and tile loaders; the engine only sees the
/// loaded field.
#[async_trait]
pub trait RasterSource: Send + Sync {
    /// Loads the raster covering `bounds` (WGS84) for the window, or the static
    /// raster if `window` is `None`.
    ///
    /// Returns `Ok(None)` if no source item covers the area or window.
    async fn search_and_load(
        &self,
        bounds: BoundingBox2D,
        window: Option<&TimeWindow>,
    ) -> Result<Option<RasterField>>;

    /// Loads one variable of a multi-band source, e.g. `precip` of a weather source.
    ///
    /// Single-band sources ignore the band name.
    async fn search_and_load_band(
        &self,
        _band: &str,
        bounds: BoundingBox2D,
        window: Option<&TimeWindow>,
    ) -> Result<Option<RasterField>> {
        self.search_and_load(bounds, window).await
    }
}
