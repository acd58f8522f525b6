use std::sync::Arc;
use std::time::Duration;

use arrow::record_batch::RecordBatch;
use futures::{StreamExt, stream};
use hexstats_datatypes::cell::CellBatch;
use hexstats_datatypes::primitives::{BoundingBox2D, TimeWindow};
use hexstats_datatypes::raster::RasterField;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::error::Error;
use crate::source::{RasterSource, SourceConfig};
use crate::util::Result;
use crate::util::async_util::spawn_blocking_with_thread_pool;
use crate::util::retry::{RetryOptions, retry};

use super::result_table::{ResultSchema, assemble};
use super::zonal::{
    RasterizationMode, ResultRow, ZonalSummarizer, merge_band_rows, resolve_mode,
};

/// Timeout and retries of one raster fetch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FetchOptions {
    pub timeout_seconds: u64,
    pub retry: RetryOptions,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 120,
            retry: RetryOptions::default(),
        }
    }
}

/// Fetches and summarizes a raster per time window and band.
///
/// Windows run concurrently up to `window_concurrency`, the cells of one window run
/// on the rayon `thread_pool`. A window without source items, or one that fails for
/// any reason other than cancellation, is skipped and does not affect the others.
pub struct TemporalWindowAggregator {
    raster_source: Arc<dyn RasterSource>,
    source: Arc<SourceConfig>,
    thread_pool: Arc<ThreadPool>,
    window_concurrency: usize,
    fetch_options: FetchOptions,
    cancellation: CancellationToken,
}

impl TemporalWindowAggregator {
    pub fn new(
        raster_source: Arc<dyn RasterSource>,
        source: Arc<SourceConfig>,
        thread_pool: Arc<ThreadPool>,
        window_concurrency: usize,
        fetch_options: FetchOptions,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            raster_source,
            source,
            thread_pool,
            window_concurrency: window_concurrency.max(1),
            fetch_options,
            cancellation,
        }
    }

    /// Summarizes the cells for every window and assembles the rows into one table,
    /// window by window in the given order.
    ///
    /// A `None` window stands for the whole static raster.
    pub async fn summarize_over_windows(
        &self,
        batch: Arc<CellBatch>,
        windows: Vec<Option<TimeWindow>>,
    ) -> Result<RecordBatch> {
        let rows = self.collect_rows(batch, windows).await?;
        let schema = ResultSchema::new(&self.source, &rows);

        assemble(&rows, &schema)
    }

    /// Summarizes the cells for every window, the rows are ordered by window first
    pub async fn collect_rows(
        &self,
        batch: Arc<CellBatch>,
        windows: Vec<Option<TimeWindow>>,
    ) -> Result<Vec<ResultRow>> {
        let mode = resolve_mode(batch.resolution(), self.source.reference_resolution);
        let number_of_windows = windows.len();

        info!(
            source = %self.source.name,
            cells = batch.len(),
            windows = number_of_windows,
            resolution = batch.resolution(),
            reference_resolution = self.source.reference_resolution,
            %mode,
            "summarizing cells"
        );

        let results: Vec<Result<Vec<ResultRow>>> = stream::iter(windows)
            .map(|window| {
                let label = window
                    .as_ref()
                    .map_or_else(|| "static".to_string(), |w| w.label().to_string());

                self.process_window(batch.clone(), window, mode)
                    .instrument(info_span!("window", window = %label))
            })
            .buffered(self.window_concurrency)
            .collect()
            .await;

        if self.cancellation.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut rows = Vec::new();
        for result in results {
            rows.extend(result?);
        }

        if rows.is_empty() {
            info!(source = %self.source.name, "no cell produced a row");
        } else {
            info!(
                source = %self.source.name,
                rows = rows.len(),
                cells = batch.len(),
                windows = number_of_windows,
                "summarization finished"
            );
        }

        Ok(rows)
    }

    async fn process_window(
        &self,
        batch: Arc<CellBatch>,
        window: Option<TimeWindow>,
        mode: RasterizationMode,
    ) -> Result<Vec<ResultRow>> {
        match self.summarize_window(batch, window, mode).await {
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(error) => {
                warn!(%error, "summarizing the window failed, skipping it");
                Ok(Vec::new())
            }
            Ok(rows) => Ok(rows),
        }
    }

    async fn summarize_window(
        &self,
        batch: Arc<CellBatch>,
        window: Option<TimeWindow>,
        mode: RasterizationMode,
    ) -> Result<Vec<ResultRow>> {
        let band_names = self.source.band_names();
        let mut per_band = Vec::with_capacity(band_names.len());
        let mut covered = false;

        for band in band_names {
            let fetched = tokio::select! {
                biased;
                () = self.cancellation.cancelled() => return Err(Error::Cancelled),
                fetched = self.fetch(band, batch.bounds(), window.as_ref()) => fetched?,
            };

            let Some(raster) = fetched else {
                debug!(band, "no source items cover the band");
                per_band.push(Vec::new());
                continue;
            };
            covered = true;

            let source = self.source.clone();
            let cells = batch.clone();
            let band_window = window.clone();
            let rows = spawn_blocking_with_thread_pool(self.thread_pool.clone(), move || {
                ZonalSummarizer::new(&raster, &source, mode)?
                    .summarize_batch(&cells, band_window.as_ref())
            })
            .await??;

            per_band.push(rows);
        }

        if !covered {
            info!("no source items cover the window, skipping it");
            return Ok(Vec::new());
        }

        let rows = merge_band_rows(
            &batch,
            window.as_ref(),
            per_band,
            self.source.groups_per_band(),
        );

        debug!(rows = rows.len(), "window summarized");

        Ok(rows)
    }

    async fn fetch(
        &self,
        band: Option<&str>,
        bounds: BoundingBox2D,
        window: Option<&TimeWindow>,
    ) -> Result<Option<RasterField>> {
        let seconds = self.fetch_options.timeout_seconds;
        let timeout = Duration::from_secs(seconds);

        retry(self.fetch_options.retry, || async move {
            let load = async {
                match band {
                    Some(band) => {
                        self.raster_source
                            .search_and_load_band(band, bounds, window)
                            .await
                    }
                    None => self.raster_source.search_and_load(bounds, window).await,
                }
            };

            tokio::time::timeout(timeout, load)
                .await
                .unwrap_or_else(|_| {
                    Err(Error::SourceTimeout {
                        window: window.cloned(),
                        seconds,
                    })
                })
        })
        .await
    }
}
