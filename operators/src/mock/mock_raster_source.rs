use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hexstats_datatypes::primitives::{BoundingBox2D, TimeWindow};
use hexstats_datatypes::raster::RasterField;

use crate::error::Error;
use crate::source::RasterSource;
use crate::util::Result;

/// What the mock answers for one window
#[derive(Debug, Clone)]
pub enum MockResponse {
    Field(RasterField),
    /// no source items cover the window
    Empty,
    /// every fetch of the window fails
    Fail,
}

/// An in-memory raster source with scripted answers per window label.
///
/// Windows without a scripted answer, and the static `None` window, are served the
/// default field, or the field of the requested band.
#[derive(Debug, Default)]
pub struct MockRasterSource {
    default: Option<RasterField>,
    bands: HashMap<String, RasterField>,
    responses: HashMap<String, MockResponse>,
    failures: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockRasterSource {
    pub fn new(default: RasterField) -> Self {
        Self {
            default: Some(default),
            ..Default::default()
        }
    }

    /// A source that covers nothing unless windows are scripted
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_response(mut self, window_label: impl Into<String>, response: MockResponse) -> Self {
        self.responses.insert(window_label.into(), response);
        self
    }

    /// Serves `field` for the band `band` of a multi-band source
    #[must_use]
    pub fn with_band(mut self, band: impl Into<String>, field: RasterField) -> Self {
        self.bands.insert(band.into(), field);
        self
    }

    /// The first `failures` fetches of the window fail before it answers normally
    #[must_use]
    pub fn with_failures(self, window_label: impl Into<String>, failures: usize) -> Self {
        if let Ok(mut scripted) = self.failures.lock() {
            scripted.insert(window_label.into(), failures);
        }
        self
    }

    /// Every fetch sleeps for `delay` before answering
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// The number of fetches, including failed ones
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn scripted_failure(&self, label: &str) -> bool {
        let Ok(mut scripted) = self.failures.lock() else {
            return false;
        };

        match scripted.get_mut(label) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    async fn load(
        &self,
        band: Option<&str>,
        window: Option<&TimeWindow>,
    ) -> Result<Option<RasterField>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let label = window.map_or("static", TimeWindow::label);

        if self.scripted_failure(label) {
            return Err(Error::SourceFetch {
                window: window.cloned(),
                reason: "scripted failure".to_string(),
            });
        }

        match self.responses.get(label) {
            Some(MockResponse::Field(field)) => Ok(Some(field.clone())),
            Some(MockResponse::Empty) => Ok(None),
            Some(MockResponse::Fail) => Err(Error::SourceFetch {
                window: window.cloned(),
                reason: "source unavailable".to_string(),
            }),
            None => Ok(band
                .and_then(|band| self.bands.get(band))
                .or(self.default.as_ref())
                .cloned()),
        }
    }
}

#[async_trait]
impl RasterSource for MockRasterSource {
    async fn search_and_load(
        &self,
        _bounds: BoundingBox2D,
        window: Option<&TimeWindow>,
    ) -> Result<Option<RasterField>> {
        self.load(None, window).await
    }

    async fn search_and_load_band(
        &self,
        band: &str,
        _bounds: BoundingBox2D,
        window: Option<&TimeWindow>,
    ) -> Result<Option<RasterField>> {
        self.load(Some(band), window).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexstats_datatypes::raster::GeoTransform;
    use hexstats_datatypes::spatial_reference::SpatialReference;
    use ndarray::Array2;

    fn field() -> RasterField {
        RasterField::from_slice(
            Array2::from_elem((2, 2), 1.),
            GeoTransform::new_with_coordinate_x_y(0., 1., 2., -1.),
            SpatialReference::epsg_4326(),
            None,
        )
        .unwrap()
    }

    fn bounds() -> BoundingBox2D {
        BoundingBox2D::new((0., 0.).into(), (2., 2.).into()).unwrap()
    }

    #[tokio::test]
    async fn scripted_windows() {
        let source = MockRasterSource::new(field())
            .with_response("2020-08", MockResponse::Empty)
            .with_response("2020-09", MockResponse::Fail)
            .with_failures("2020-07", 1);

        let july = TimeWindow::month(2020, 7).unwrap();
        let august = TimeWindow::month(2020, 8).unwrap();
        let september = TimeWindow::month(2020, 9).unwrap();

        assert!(source.search_and_load(bounds(), Some(&july)).await.is_err());
        assert!(
            source
                .search_and_load(bounds(), Some(&july))
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            source
                .search_and_load(bounds(), Some(&august))
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            source
                .search_and_load(bounds(), Some(&september))
                .await
                .is_err()
        );
        assert!(
            source
                .search_and_load(bounds(), None)
                .await
                .unwrap()
                .is_some()
        );

        assert_eq!(source.calls(), 5);
    }

    #[tokio::test]
    async fn bands() {
        let precip = RasterField::from_slice(
            Array2::from_elem((2, 2), 7.),
            GeoTransform::new_with_coordinate_x_y(0., 1., 2., -1.),
            SpatialReference::epsg_4326(),
            None,
        )
        .unwrap();
        let source = MockRasterSource::empty()
            .with_band("air", field())
            .with_band("precip", precip.clone());

        let loaded = source
            .search_and_load_band("precip", bounds(), None)
            .await
            .unwrap();
        assert_eq!(loaded, Some(precip));

        assert!(
            source
                .search_and_load_band("wind", bounds(), None)
                .await
                .unwrap()
                .is_none()
        );
        assert!(source.search_and_load(bounds(), None).await.unwrap().is_none());
        assert_eq!(source.calls(), 3);
    }
}
