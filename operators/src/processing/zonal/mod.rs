mod pixel_cover;
mod rasterization;
mod stat_spec;
mod statistics;
mod summarizer;

pub use pixel_cover::{
    PointInPolygonTester, geographic_pixel_cover, pixel_cover, project_polygon,
};
pub use rasterization::{RasterizationMode, resolve_mode};
pub use stat_spec::{
    CategoricalSpec, ClassAttributeTable, ContinuousStatistic, SliceReduction, StatSpec,
};
pub use statistics::{ClassCounts, ClassSummary, SortedSample};
pub use summarizer::{ResultRow, Statistics, ZonalSummarizer, merge_band_rows, summarize};
