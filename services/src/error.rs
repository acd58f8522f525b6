use snafu::Snafu;
use strum::IntoStaticStr;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu, IntoStaticStr)]
#[snafu(visibility(pub(crate)), context(suffix(false)))]
pub enum Error {
    DataType {
        source: hexstats_datatypes::error::Error,
    },
    Operator {
        source: hexstats_operators::error::Error,
    },

    #[snafu(display("Arrow internal error: {}", source))]
    Arrow {
        source: arrow::error::ArrowError,
    },

    Config {
        source: config::ConfigError,
    },

    MissingWorkingDirectory {
        source: std::io::Error,
    },

    MissingSettingsDirectory,

    #[snafu(display("Invalid log spec `{}`: {}", log_spec, source))]
    InvalidLogSpec {
        log_spec: String,
        source: tracing_subscriber::filter::ParseError,
    },

    #[snafu(display("Could not install the global log subscriber: {}", source))]
    LoggingInit {
        source: tracing_subscriber::util::TryInitError,
    },

    #[snafu(display("Unknown source `{}`", name))]
    UnknownSource {
        name: String,
    },

    #[snafu(display("No raster source is registered for `{}`", name))]
    MissingRasterSource {
        name: String,
    },

    #[snafu(display("The result table has no `{}` column", column))]
    MissingColumn {
        column: String,
    },
}

impl From<hexstats_datatypes::error::Error> for Error {
    fn from(e: hexstats_datatypes::error::Error) -> Self {
        Self::DataType { source: e }
    }
}

impl From<hexstats_operators::error::Error> for Error {
    fn from(e: hexstats_operators::error::Error) -> Self {
        Self::Operator { source: e }
    }
}

impl From<arrow::error::ArrowError> for Error {
    fn from(source: arrow::error::ArrowError) -> Self {
        Self::Arrow { source }
    }
}

impl From<config::ConfigError> for Error {
    fn from(source: config::ConfigError) -> Self {
        Self::Config { source }
    }
}
