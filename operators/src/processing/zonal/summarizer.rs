use std::borrow::Cow;
use std::collections::HashMap;

use geo::Polygon;
use hexstats_datatypes::cell::{CellBatch, CellGeometry, SpatialCell};
use hexstats_datatypes::primitives::TimeWindow;
use hexstats_datatypes::raster::{GridIdx2D, RasterField};
use hexstats_datatypes::spatial_reference::SpatialReference;
use hexstats_datatypes::util::ProjCoordinateProjector;
use rayon::prelude::*;
use tracing::debug;

use crate::error::Error;
use crate::source::SourceConfig;
use crate::util::Result;

use super::pixel_cover::{geographic_pixel_cover, pixel_cover, project_polygon};
use super::rasterization::RasterizationMode;
use super::stat_spec::{CategoricalSpec, SliceReduction, StatSpec};
use super::statistics::{ClassCounts, ClassSummary, continuous_statistics, mean_of_statistics};

/// The statistics of one group of slices
#[derive(Debug, Clone, PartialEq)]
pub enum Statistics {
    /// values in the order of the requested statistics
    Continuous(Vec<f64>),
    Categorical(ClassSummary),
}

/// The statistics of one cell, optionally for one time window.
///
/// Rows only exist for cells with at least one valid pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub cell: SpatialCell,
    pub window: Option<TimeWindow>,
    /// One entry for averaged or pooled slices, one entry per slice otherwise.
    /// Slices without valid pixels are `None`.
    pub groups: Vec<Option<Statistics>>,
}

/// Summarizes the pixels of one raster per cell
pub struct ZonalSummarizer<'a> {
    raster: &'a RasterField,
    source: &'a SourceConfig,
    mode: RasterizationMode,
    projector: Option<ProjCoordinateProjector>,
}

impl<'a> ZonalSummarizer<'a> {
    /// Creates a summarizer; cell polygons are reprojected if the raster is not in WGS84
    pub fn new(
        raster: &'a RasterField,
        source: &'a SourceConfig,
        mode: RasterizationMode,
    ) -> Result<Self> {
        let projector = if raster.spatial_reference() == SpatialReference::epsg_4326() {
            None
        } else {
            Some(ProjCoordinateProjector::from_known_srs(
                SpatialReference::epsg_4326(),
                raster.spatial_reference(),
            )?)
        };

        Ok(Self {
            raster,
            source,
            mode,
            projector,
        })
    }

    pub fn mode(&self) -> RasterizationMode {
        self.mode
    }

    fn polygon<'g>(&self, geometry: &'g CellGeometry) -> Result<Cow<'g, Polygon<f64>>> {
        Ok(match &self.projector {
            Some(projector) => Cow::Owned(project_polygon(&geometry.polygon, projector)?),
            None => Cow::Borrowed(&geometry.polygon),
        })
    }

    /// Summarizes one cell.
    ///
    /// Returns `Ok(None)` if the cell covers no valid pixel.
    ///
    /// # Errors
    ///
    /// Fails with `NoCoverage` if the cell does not intersect the raster extent
    ///
    pub fn summarize(
        &self,
        geometry: &CellGeometry,
        window: Option<&TimeWindow>,
    ) -> Result<Option<ResultRow>> {
        let polygon = self.polygon(geometry)?;
        self.cell_job().summarize(geometry.cell, &polygon, window)
    }

    /// Summarizes all cells of a batch in parallel on the current rayon pool.
    ///
    /// Cells without coverage or without valid pixels are skipped, the remaining
    /// rows keep the batch order.
    pub fn summarize_batch(
        &self,
        batch: &CellBatch,
        window: Option<&TimeWindow>,
    ) -> Result<Vec<ResultRow>> {
        // projection happens up front, the projector stays on this thread
        let polygons = batch
            .geometries()
            .iter()
            .map(|geometry| self.polygon(geometry))
            .collect::<Result<Vec<_>>>()?;

        let job = self.cell_job();

        let rows = batch
            .geometries()
            .par_iter()
            .zip(polygons.par_iter())
            .map(|(geometry, polygon)| {
                match job.summarize(geometry.cell, polygon, window) {
                    Err(Error::NoCoverage { cell }) => {
                        debug!(%cell, "cell does not intersect the raster");
                        Ok(None)
                    }
                    result => result,
                }
            })
            .collect::<Result<Vec<Option<ResultRow>>>>()?;

        Ok(rows.into_iter().flatten().collect())
    }

    fn cell_job(&self) -> CellJob<'_> {
        CellJob {
            raster: self.raster,
            source: self.source,
            mode: self.mode,
            geographic: self.projector.is_none(),
        }
    }
}

/// The thread-safe part of a summarizer
#[derive(Clone, Copy)]
struct CellJob<'a> {
    raster: &'a RasterField,
    source: &'a SourceConfig,
    mode: RasterizationMode,
    /// polygons are in WGS84 and may be unwrapped past the antimeridian
    geographic: bool,
}

impl CellJob<'_> {
    fn summarize(
        &self,
        cell: SpatialCell,
        polygon: &Polygon<f64>,
        window: Option<&TimeWindow>,
    ) -> Result<Option<ResultRow>> {
        let label = cell.to_string();
        let pixels = if self.geographic {
            geographic_pixel_cover(self.raster, polygon, self.mode, &label)?
        } else {
            pixel_cover(self.raster, polygon, self.mode, &label)?
        };

        let slices: Vec<Vec<f64>> = (0..self.raster.slices())
            .map(|slice| self.valid_values(slice, &pixels))
            .collect();

        let mut groups = self.statistics(&cell, slices);
        groups.resize(self.source.groups_per_band(), None);

        if groups.iter().all(Option::is_none) {
            return Ok(None);
        }

        Ok(Some(ResultRow {
            cell,
            window: window.cloned(),
            groups,
        }))
    }

    fn valid_values(&self, slice: usize, pixels: &[GridIdx2D]) -> Vec<f64> {
        pixels
            .iter()
            .filter_map(|&idx| self.raster.get(slice, idx))
            .filter(|&value| !self.raster.is_no_data(value) && !self.source.is_no_data(value))
            .collect()
    }

    fn statistics(&self, cell: &SpatialCell, slices: Vec<Vec<f64>>) -> Vec<Option<Statistics>> {
        let class_attributes = self.source.class_attributes.as_ref();
        let summarize_classes = |counts: ClassCounts, spec: &CategoricalSpec| {
            if counts.rejected() > 0 {
                debug!(%cell, rejected = counts.rejected(), "ignoring non-integer class values");
            }
            ClassSummary::new(&counts, spec, class_attributes).map(Statistics::Categorical)
        };

        match (&self.source.stat_spec, self.source.slice_reduction) {
            (StatSpec::Continuous { statistics }, SliceReduction::Mean) => {
                let per_slice: Vec<Vec<f64>> = slices
                    .into_iter()
                    .filter_map(|values| continuous_statistics(values, statistics))
                    .collect();

                vec![mean_of_statistics(&per_slice).map(Statistics::Continuous)]
            }
            (StatSpec::Continuous { statistics }, SliceReduction::PerSlice) => slices
                .into_iter()
                .map(|values| continuous_statistics(values, statistics).map(Statistics::Continuous))
                .collect(),
            (StatSpec::Categorical(spec), SliceReduction::Mean) => {
                vec![summarize_classes(slices.into_iter().flatten().collect(), spec)]
            }
            (StatSpec::Categorical(spec), SliceReduction::PerSlice) => slices
                .into_iter()
                .map(|values| summarize_classes(values.into_iter().collect(), spec))
                .collect(),
        }
    }
}

/// Joins the rows of every band of one window into one row per cell, in batch order.
///
/// A band without a row for a cell contributes `groups_per_band` empty groups, cells
/// without a row in any band are left out.
pub fn merge_band_rows(
    batch: &CellBatch,
    window: Option<&TimeWindow>,
    mut per_band: Vec<Vec<ResultRow>>,
    groups_per_band: usize,
) -> Vec<ResultRow> {
    if per_band.len() == 1 {
        return per_band.pop().unwrap_or_default();
    }

    let per_band: Vec<HashMap<SpatialCell, Vec<Option<Statistics>>>> = per_band
        .into_iter()
        .map(|rows| rows.into_iter().map(|row| (row.cell, row.groups)).collect())
        .collect();

    batch
        .geometries()
        .iter()
        .filter(|geometry| per_band.iter().any(|rows| rows.contains_key(&geometry.cell)))
        .map(|geometry| ResultRow {
            cell: geometry.cell,
            window: window.cloned(),
            groups: per_band
                .iter()
                .flat_map(|rows| match rows.get(&geometry.cell) {
                    Some(groups) => groups.clone(),
                    None => vec![None; groups_per_band],
                })
                .collect(),
        })
        .collect()
}

/// Summarizes one cell of `raster` under `mode`, see [`ZonalSummarizer::summarize`]
pub fn summarize(
    raster: &RasterField,
    geometry: &CellGeometry,
    mode: RasterizationMode,
    source: &SourceConfig,
    window: Option<&TimeWindow>,
) -> Result<Option<ResultRow>> {
    ZonalSummarizer::new(raster, source, mode)?.summarize(geometry, window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::{CategoricalSpec, ContinuousStatistic};
    use float_cmp::approx_eq;
    use hexstats_datatypes::primitives::{BoundingBox2D, Coordinate2D};
    use geo::polygon;
    use hexstats_datatypes::raster::GeoTransform;
    use hexstats_datatypes::spatial_reference::SpatialReferenceAuthority;

    const MARBURG: Coordinate2D = Coordinate2D { x: 8.77, y: 50.81 };

    fn continuous_source(
        statistics: &[ContinuousStatistic],
        slice_reduction: SliceReduction,
    ) -> SourceConfig {
        SourceConfig {
            name: "test".to_string(),
            reference_resolution: 9,
            nodata: Some(-999.0),
            column_prefix: "value".to_string(),
            stat_spec: StatSpec::continuous(statistics),
            temporal: None,
            slice_reduction,
            class_attributes: None,
            slices: None,
            bands: Vec::new(),
            column_naming: Default::default(),
        }
    }

    fn categorical_source() -> SourceConfig {
        SourceConfig {
            name: "test".to_string(),
            reference_resolution: 9,
            nodata: None,
            column_prefix: "class".to_string(),
            stat_spec: StatSpec::Categorical(CategoricalSpec {
                majority: true,
                unique: true,
                histogram: true,
                classes: None,
            }),
            temporal: None,
            slice_reduction: SliceReduction::Mean,
            class_attributes: None,
            slices: None,
            bands: Vec::new(),
            column_naming: Default::default(),
        }
    }

    /// a raster covering `bounds` with `pixels × pixels` pixels per slice
    fn raster_over(
        bounds: BoundingBox2D,
        pixels: usize,
        slices: &[Vec<f64>],
        no_data_value: Option<f64>,
    ) -> RasterField {
        let geo_transform = GeoTransform::new(
            bounds.upper_left(),
            bounds.size_x() / pixels as f64,
            -bounds.size_y() / pixels as f64,
        );

        RasterField::from_vec(
            [slices.len(), pixels, pixels],
            slices.concat(),
            geo_transform,
            SpatialReference::epsg_4326(),
            no_data_value,
        )
        .unwrap()
    }

    fn geometry() -> CellGeometry {
        SpatialCell::containing(MARBURG, 9).unwrap().into()
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn constant_raster() {
        let geometry = geometry();
        let raster = raster_over(geometry.bounds, 20, &[vec![5.0; 400]], None);
        let source = continuous_source(
            &[ContinuousStatistic::Median, ContinuousStatistic::Range],
            SliceReduction::Mean,
        );

        let row = summarize(&raster, &geometry, RasterizationMode::Exact, &source, None)
            .unwrap()
            .unwrap();

        assert_eq!(row.cell, geometry.cell);
        assert_eq!(row.window, None);
        assert_eq!(row.groups, vec![Some(Statistics::Continuous(vec![5.0, 0.0]))]);
    }

    #[test]
    fn all_no_data_yields_no_row() {
        let geometry = geometry();
        let source = continuous_source(&[ContinuousStatistic::Mean], SliceReduction::Mean);

        let sentinel = raster_over(geometry.bounds, 10, &[vec![-1.0; 100]], Some(-1.0));
        let configured = raster_over(geometry.bounds, 10, &[vec![-999.0; 100]], None);
        let nan = raster_over(geometry.bounds, 10, &[vec![f64::NAN; 100]], None);

        for raster in [sentinel, configured, nan] {
            let row = summarize(&raster, &geometry, RasterizationMode::Exact, &source, None)
                .unwrap();
            assert_eq!(row, None);
        }
    }

    #[test]
    fn outside_raster_is_no_coverage() {
        let geometry = geometry();
        let far_away = BoundingBox2D::from_edges(100.0, 10.0, 101.0, 11.0).unwrap();
        let raster = raster_over(far_away, 10, &[vec![1.0; 100]], None);
        let source = continuous_source(&[ContinuousStatistic::Mean], SliceReduction::Mean);

        let result = summarize(&raster, &geometry, RasterizationMode::Exact, &source, None);

        assert!(matches!(result, Err(Error::NoCoverage { .. })));
    }

    #[test]
    fn slices_are_averaged() {
        let geometry = geometry();
        let raster = raster_over(
            geometry.bounds,
            10,
            &[vec![2.0; 100], vec![4.0; 100], vec![f64::NAN; 100]],
            None,
        );
        let source = continuous_source(&[ContinuousStatistic::Mean], SliceReduction::Mean);

        let row = summarize(&raster, &geometry, RasterizationMode::Exact, &source, None)
            .unwrap()
            .unwrap();

        let Some(Statistics::Continuous(values)) = &row.groups[0] else {
            panic!("expected continuous statistics");
        };
        assert!(approx_eq!(f64, values[0], 3.0));
    }

    #[test]
    fn slices_per_column_group() {
        let geometry = geometry();
        let raster = raster_over(
            geometry.bounds,
            10,
            &[vec![2.0; 100], vec![f64::NAN; 100], vec![4.0; 100]],
            None,
        );
        let mut source = continuous_source(&[ContinuousStatistic::Max], SliceReduction::PerSlice);
        source.slices = Some(4);

        let row = summarize(&raster, &geometry, RasterizationMode::Exact, &source, None)
            .unwrap()
            .unwrap();

        assert_eq!(
            row.groups,
            vec![
                Some(Statistics::Continuous(vec![2.0])),
                None,
                Some(Statistics::Continuous(vec![4.0])),
                None,
            ]
        );

        // slices beyond the declared count are dropped
        source.slices = Some(2);
        let row = summarize(&raster, &geometry, RasterizationMode::Exact, &source, None)
            .unwrap()
            .unwrap();
        assert_eq!(
            row.groups,
            vec![Some(Statistics::Continuous(vec![2.0])), None]
        );
    }

    #[test]
    fn bands_are_joined_per_cell() {
        let center = SpatialCell::containing(MARBURG, 9).unwrap();
        let batch = CellBatch::new(center.disk(1)).unwrap();
        let [first, second, third] = [0, 1, 2].map(|i| batch.geometries()[i].cell);
        let row = |cell, value| ResultRow {
            cell,
            window: None,
            groups: vec![Some(Statistics::Continuous(vec![value])), None],
        };

        let rows = merge_band_rows(
            &batch,
            None,
            vec![vec![row(first, 1.0)], vec![row(third, 3.0), row(first, 2.0)]],
            2,
        );

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cell, first);
        assert_eq!(
            rows[0].groups,
            vec![
                Some(Statistics::Continuous(vec![1.0])),
                None,
                Some(Statistics::Continuous(vec![2.0])),
                None,
            ]
        );
        assert_eq!(rows[1].cell, third);
        assert!(rows[1].groups[..2].iter().all(Option::is_none));
        assert!(rows.iter().all(|row| row.cell != second));
    }

    #[test]
    fn categorical() {
        let geometry = geometry();
        // the left 30 % of the columns carry class 2, the rest class 1
        let values: Vec<f64> = (0..100)
            .map(|i| if i % 10 < 3 { 2.0 } else { 1.0 })
            .collect();
        let raster = raster_over(geometry.bounds, 10, &[values], None);

        let row = summarize(
            &raster,
            &geometry,
            RasterizationMode::AllTouched,
            &categorical_source(),
            None,
        )
        .unwrap()
        .unwrap();

        let Some(Statistics::Categorical(summary)) = &row.groups[0] else {
            panic!("expected categorical statistics");
        };
        assert_eq!(summary.majority, 1);
        assert_eq!(summary.unique, 2);

        let sum: f64 = summary.fractions.values().sum();
        assert!(approx_eq!(f64, sum, 1.0, ulps = 4));
    }

    #[test]
    fn summarize_is_idempotent() {
        let geometry = geometry();
        let values: Vec<f64> = (0..400).map(|i| f64::from(i % 17) * 0.37).collect();
        let raster = raster_over(geometry.bounds, 20, &[values], None);
        let source = continuous_source(
            &[
                ContinuousStatistic::Mean,
                ContinuousStatistic::Percentile(10),
                ContinuousStatistic::Percentile(90),
            ],
            SliceReduction::Mean,
        );

        let first = summarize(&raster, &geometry, RasterizationMode::Exact, &source, None)
            .unwrap()
            .unwrap();
        let second = summarize(&raster, &geometry, RasterizationMode::Exact, &source, None)
            .unwrap()
            .unwrap();

        let (Some(Statistics::Continuous(a)), Some(Statistics::Continuous(b))) =
            (&first.groups[0], &second.groups[0])
        else {
            panic!("expected continuous statistics");
        };
        assert_eq!(
            a.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            b.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn batch_skips_uncovered_cells() {
        let center = SpatialCell::containing(MARBURG, 9).unwrap();
        let mut cells = center.disk(1);
        let far_away = SpatialCell::containing(Coordinate2D::new(-70.0, -30.0), 9).unwrap();
        cells.push(far_away);

        let batch = CellBatch::new(cells).unwrap();
        let raster = raster_over(
            hexstats_datatypes::cell::union_bounds(&center.disk(1)).unwrap(),
            60,
            &[vec![1.0; 3600]],
            None,
        );
        let source = continuous_source(&[ContinuousStatistic::Count], SliceReduction::Mean);
        let summarizer = ZonalSummarizer::new(&raster, &source, RasterizationMode::Exact).unwrap();

        let rows = summarizer.summarize_batch(&batch, None).unwrap();

        assert_eq!(rows.len(), 7);
        assert!(rows.iter().all(|row| row.cell != far_away));
        assert_eq!(
            rows.iter().map(|row| row.cell).collect::<Vec<_>>(),
            batch.geometries()[..7]
                .iter()
                .map(|geometry| geometry.cell)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn antimeridian_cells_reach_western_pixels() {
        let cell = SpatialCell::containing(Coordinate2D::new(179.9, 0.0), 9).unwrap();
        let polygon = geo::polygon![
            (x: 179.5, y: -0.6),
            (x: 180.5, y: -0.6),
            (x: 180.5, y: 0.6),
            (x: 179.5, y: 0.6),
        ];
        let geometry = CellGeometry {
            cell,
            bounds: geo::BoundingRect::bounding_rect(&polygon).unwrap().into(),
            polygon,
        };
        let west = BoundingBox2D::from_edges(-180.0, -1.0, -179.0, 1.0).unwrap();
        let raster = raster_over(west, 10, &[vec![4.0; 100]], None);
        let source = continuous_source(&[ContinuousStatistic::Count], SliceReduction::Mean);

        let row = summarize(&raster, &geometry, RasterizationMode::Exact, &source, None)
            .unwrap()
            .unwrap();

        // five columns of the 0.5° strip east of -180, six rows around the equator
        assert_eq!(row.groups, vec![Some(Statistics::Continuous(vec![30.0]))]);
    }

    #[test]
    fn reprojects_cells_into_the_raster_crs() {
        let geometry = geometry();
        let web_mercator = SpatialReference::new(SpatialReferenceAuthority::Epsg, 3857);
        let projector =
            ProjCoordinateProjector::from_known_srs(SpatialReference::epsg_4326(), web_mercator)
                .unwrap();
        let projected = project_polygon(&geometry.polygon, &projector).unwrap();
        let bounds: BoundingBox2D = geo::BoundingRect::bounding_rect(&projected)
            .unwrap()
            .into();

        let geo_transform = GeoTransform::new(
            bounds.upper_left(),
            bounds.size_x() / 10.0,
            -bounds.size_y() / 10.0,
        );
        let raster = RasterField::from_vec(
            [1, 10, 10],
            vec![3.0; 100],
            geo_transform,
            web_mercator,
            None,
        )
        .unwrap();
        let source = continuous_source(&[ContinuousStatistic::Min], SliceReduction::Mean);

        let row = summarize(&raster, &geometry, RasterizationMode::Exact, &source, None)
            .unwrap()
            .unwrap();

        assert_eq!(row.groups, vec![Some(Statistics::Continuous(vec![3.0]))]);
    }
}
