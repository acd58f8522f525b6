use hexstats_datatypes::primitives::TimeWindow;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), context(suffix(false)))]
pub enum Error {
    #[snafu(display("DataTypeError: {}", source))]
    DataType {
        source: hexstats_datatypes::error::Error,
    },

    #[snafu(display("Cell `{}` does not intersect the raster extent", cell))]
    NoCoverage { cell: String },

    #[snafu(display("Fetching raster data{} failed: {}", window_suffix(window.as_ref()), reason))]
    SourceFetch {
        window: Option<TimeWindow>,
        reason: String,
    },

    #[snafu(display(
        "Fetching raster data{} timed out after {} seconds",
        window_suffix(window.as_ref()),
        seconds
    ))]
    SourceTimeout {
        window: Option<TimeWindow>,
        seconds: u64,
    },

    #[snafu(display("The summarization job was cancelled"))]
    Cancelled,

    #[snafu(display(
        "Invalid statistic `{}`, expected one of min, max, mean, median, range, count or p0..p100",
        statistic
    ))]
    InvalidStatistic { statistic: String },

    #[snafu(display("A continuous source must request at least one statistic"))]
    EmptyStatistics,

    #[snafu(display(
        "Class attribute row for class {} has {} values, expected {}",
        class,
        found,
        expected
    ))]
    InvalidClassAttributes {
        class: i64,
        expected: usize,
        found: usize,
    },

    #[snafu(display(
        "Invalid reference resolution {} for source `{}`, H3 resolutions range from 0 to 15",
        resolution,
        source_name
    ))]
    InvalidReferenceResolution { source_name: String, resolution: u8 },

    #[snafu(display(
        "Source `{}` reduces slices individually and must declare its slice count",
        source_name
    ))]
    MissingSliceCount { source_name: String },

    #[snafu(display("Every band of source `{}` needs a column prefix", source_name))]
    MissingColumnPrefix { source_name: String },

    #[snafu(display(
        "Source `{}` names columns by prefix only, which needs exactly one continuous statistic",
        source_name
    ))]
    InvalidColumnNaming { source_name: String },

    #[snafu(display(
        "Source `{}` has several bands, class attributes need a single band",
        source_name
    ))]
    ClassAttributesWithBands { source_name: String },

    #[snafu(display("Source `{}` is temporal and needs a date range or windows", source_name))]
    MissingTimeWindows { source_name: String },

    #[snafu(display("Arrow internal error: {}", source))]
    Arrow { source: arrow::error::ArrowError },

    #[snafu(display("Could not build the worker thread pool: {}", source))]
    ThreadPoolBuild {
        source: rayon::ThreadPoolBuildError,
    },

    #[snafu(display("TokioJoin: {}", source))]
    TokioJoin { source: tokio::task::JoinError },
}

fn window_suffix(window: Option<&TimeWindow>) -> String {
    window.map_or_else(String::new, |window| format!(" for window {}", window.label()))
}

impl From<hexstats_datatypes::error::Error> for Error {
    fn from(datatype_error: hexstats_datatypes::error::Error) -> Self {
        Self::DataType {
            source: datatype_error,
        }
    }
}

impl From<arrow::error::ArrowError> for Error {
    fn from(source: arrow::error::ArrowError) -> Self {
        Self::Arrow { source }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(source: tokio::task::JoinError) -> Self {
        Self::TokioJoin { source }
    }
}
