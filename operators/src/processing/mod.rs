mod result_table;
mod temporal_aggregation;
pub mod zonal;

pub use result_table::{
    CELL_COLUMN, END_TIME_COLUMN, ResultSchema, START_TIME_COLUMN, StatColumn, assemble,
};
pub use temporal_aggregation::{FetchOptions, TemporalWindowAggregator};
pub use zonal::{
    CategoricalSpec, ClassAttributeTable, ClassSummary, ContinuousStatistic, RasterizationMode,
    ResultRow, SliceReduction, StatSpec, Statistics, ZonalSummarizer, resolve_mode,
};
