use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use hexstats_datatypes::cell::CellBatch;
use hexstats_datatypes::primitives::{DateRange, TimeWindow};
use snafu::ensure;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error;
use crate::processing::TemporalWindowAggregator;
use crate::source::{RasterSource, SourceConfig};
use crate::util::Result;

use super::execution_context::{EngineOptions, ExecutionContext};

/// Summarizes batches of H3 cells against any configured raster source.
///
/// The engine owns the worker pool, so it should be created once and shared
/// between jobs.
#[derive(Debug, Clone)]
pub struct ZonalEngine {
    context: ExecutionContext,
}

impl ZonalEngine {
    pub fn new(options: EngineOptions) -> Result<Self> {
        Ok(Self {
            context: ExecutionContext::new(options)?,
        })
    }

    pub fn options(&self) -> &EngineOptions {
        self.context.options()
    }

    /// The windows a source is summarized over.
    ///
    /// Static sources have a single `None` window, temporal sources partition `range`
    /// by their time step.
    pub fn windows_for(
        source: &SourceConfig,
        range: Option<DateRange>,
    ) -> Result<Vec<Option<TimeWindow>>> {
        let Some(step) = source.temporal else {
            return Ok(vec![None]);
        };

        let range = range.ok_or_else(|| error::Error::MissingTimeWindows {
            source_name: source.name.clone(),
        })?;

        Ok(step.windows(range)?.into_iter().map(Some).collect())
    }

    /// Summarizes `cells` over the windows of `range`
    pub async fn summarize(
        &self,
        cells: Arc<CellBatch>,
        source: Arc<SourceConfig>,
        raster_source: Arc<dyn RasterSource>,
        range: Option<DateRange>,
        cancellation: CancellationToken,
    ) -> Result<RecordBatch> {
        source.validate()?;

        let windows = Self::windows_for(&source, range)?;

        self.run(cells, source, raster_source, windows, cancellation)
            .await
    }

    /// Summarizes `cells` over explicitly given windows, e.g. a list of months
    pub async fn summarize_windows(
        &self,
        cells: Arc<CellBatch>,
        source: Arc<SourceConfig>,
        raster_source: Arc<dyn RasterSource>,
        windows: Vec<TimeWindow>,
        cancellation: CancellationToken,
    ) -> Result<RecordBatch> {
        source.validate()?;

        ensure!(
            source.is_temporal() && !windows.is_empty(),
            error::MissingTimeWindows {
                source_name: source.name.clone(),
            }
        );
        TimeWindow::validate_sequence(&windows)?;

        let windows = windows.into_iter().map(Some).collect();

        self.run(cells, source, raster_source, windows, cancellation)
            .await
    }

    async fn run(
        &self,
        cells: Arc<CellBatch>,
        source: Arc<SourceConfig>,
        raster_source: Arc<dyn RasterSource>,
        windows: Vec<Option<TimeWindow>>,
        cancellation: CancellationToken,
    ) -> Result<RecordBatch> {
        debug!(source = %source.name, windows = windows.len(), "starting summarization job");

        let options = self.context.options();
        let aggregator = TemporalWindowAggregator::new(
            raster_source,
            source,
            self.context.thread_pool().clone(),
            options.window_concurrency,
            options.fetch,
            cancellation,
        );

        aggregator.summarize_over_windows(cells, windows).await
    }
}
