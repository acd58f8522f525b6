use snafu::ResultExt;
use tracing::Subscriber;
use tracing_subscriber::layer::Filter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::Logging;
use crate::error::{self, Result};

/// Installs the global log subscriber, writing to the console with the configured `log_spec`
pub fn init_logging(logging_config: &Logging) -> Result<()> {
    let console_filter = console_filter(logging_config)?;

    tracing_subscriber::Registry::default()
        .with(console_layer_with_filter(console_filter))
        .try_init()
        .context(error::LoggingInit)
}

fn console_filter(logging_config: &Logging) -> Result<EnvFilter> {
    EnvFilter::try_new(&logging_config.log_spec).context(error::InvalidLogSpec {
        log_spec: logging_config.log_spec.clone(),
    })
}

fn console_layer_with_filter<S, F: Filter<S> + 'static>(filter: F) -> impl Layer<S>
where
    S: Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_file(false)
        .with_target(true)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_log_specs() {
        let logging = Logging {
            log_spec: "hexstats=verbose".to_string(),
        };

        assert!(console_filter(&logging).is_err());
    }

    #[test]
    fn accepts_module_directives() {
        let logging = Logging {
            log_spec: "info,hexstats_operators=debug".to_string(),
        };

        assert!(console_filter(&logging).is_ok());
    }

    #[test]
    fn installs_the_subscriber_once() {
        let logging = Logging {
            log_spec: "debug".to_string(),
        };

        assert!(init_logging(&logging).is_ok());
        assert!(matches!(
            init_logging(&logging),
            Err(crate::error::Error::LoggingInit { .. })
        ));
    }
}
