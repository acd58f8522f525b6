use std::collections::HashMap;
use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use hexstats_datatypes::cell::CellBatch;
use hexstats_datatypes::primitives::{DateRange, TimeWindow};
use hexstats_operators::engine::{EngineOptions, ZonalEngine};
use hexstats_operators::source::{RasterSource, SourceConfig};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span};

use crate::config::{Engine, Settings, Sources};
use crate::error::{Error, Result};
use crate::sink::ResultSink;

/// Which dates a job covers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JobPeriod {
    /// static sources
    #[default]
    None,
    /// a date range partitioned by the source's time step
    Range(DateRange),
    /// explicit windows, e.g. a list of months
    Windows(Vec<TimeWindow>),
}

/// One summarization request
#[derive(Debug, Clone)]
pub struct SummarizationJob {
    pub source: String,
    pub cells: Vec<String>,
    pub period: JobPeriod,
}

struct RegisteredSource {
    config: Arc<SourceConfig>,
    raster_source: Arc<dyn RasterSource>,
}

/// Runs summarization jobs against registered sources
pub struct SummarizationService {
    engine: ZonalEngine,
    sources: HashMap<String, RegisteredSource>,
    presets: Sources,
}

impl SummarizationService {
    pub fn new(options: EngineOptions, presets: Sources) -> Result<Self> {
        Ok(Self {
            engine: ZonalEngine::new(options)?,
            sources: HashMap::new(),
            presets,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let engine: Engine = settings.get_element()?;
        let presets: Sources = settings.get_element()?;

        Self::new(engine.into(), presets)
    }

    /// Registers the adapter for the configured preset `name`
    pub fn register_preset(
        &mut self,
        name: &str,
        raster_source: Arc<dyn RasterSource>,
    ) -> Result<()> {
        let config = self.presets.get(name)?;
        self.register(config, raster_source)
    }

    /// Registers a source under its own name, replacing an earlier registration
    pub fn register(
        &mut self,
        config: SourceConfig,
        raster_source: Arc<dyn RasterSource>,
    ) -> Result<()> {
        config.validate()?;

        self.sources.insert(
            config.name.clone(),
            RegisteredSource {
                config: Arc::new(config),
                raster_source,
            },
        );

        Ok(())
    }

    pub async fn run(
        &self,
        job: SummarizationJob,
        cancellation: CancellationToken,
    ) -> Result<RecordBatch> {
        let registered = self
            .sources
            .get(&job.source)
            .ok_or_else(|| Error::MissingRasterSource {
                name: job.source.clone(),
            })?;

        let cells = Arc::new(CellBatch::parse(&job.cells)?);
        let config = registered.config.clone();
        let raster_source = registered.raster_source.clone();

        let span = info_span!("job", source = %job.source, cells = cells.len());

        let table = async {
            match job.period {
                JobPeriod::None => {
                    self.engine
                        .summarize(cells, config, raster_source, None, cancellation)
                        .await
                }
                JobPeriod::Range(range) => {
                    self.engine
                        .summarize(cells, config, raster_source, Some(range), cancellation)
                        .await
                }
                JobPeriod::Windows(windows) => {
                    self.engine
                        .summarize_windows(cells, config, raster_source, windows, cancellation)
                        .await
                }
            }
        }
        .instrument(span)
        .await?;

        Ok(table)
    }

    /// Runs the job and upserts its table into `target`, returns the number of rows written
    pub async fn run_into(
        &self,
        job: SummarizationJob,
        sink: &dyn ResultSink,
        target: &str,
        cancellation: CancellationToken,
    ) -> Result<usize> {
        let table = self.run(job, cancellation).await?;
        let written = sink.upsert(target, &table).await?;

        info!(target_table = target, rows = written, "stored summary");

        Ok(written)
    }
}
