use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use hexstats_operators::engine::EngineOptions;
use hexstats_operators::processing::FetchOptions;
use hexstats_operators::source::SourceConfig;
use hexstats_operators::util::retry::RetryOptions;
use serde::Deserialize;
use snafu::ResultExt;

use crate::error::{self, Error, Result};

const DEFAULT_SETTINGS_FILE: &str = "Settings-default.toml";
const SETTINGS_FILE: &str = "Settings.toml";

/// Layered settings: `Settings-default.toml`, then an optional `Settings.toml`,
/// then `HEXSTATS__*` environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    config: Config,
}

impl Settings {
    /// Loads the settings from the working directory, or its parent when running
    /// inside a workspace member
    pub fn load() -> Result<Self> {
        Self::load_from(&retrieve_settings_dir()?)
    }

    pub fn load_from(dir: &Path) -> Result<Self> {
        let files: Vec<File<_, _>> = [DEFAULT_SETTINGS_FILE, SETTINGS_FILE]
            .iter()
            .map(|f| dir.join(f))
            .filter(|p| p.exists())
            .map(File::from)
            .collect();

        // Override config with environment variables that start with `HEXSTATS__`,
        // e.g. `HEXSTATS__ENGINE__WINDOW_CONCURRENCY=8`
        // Note: Since keys contain underscores, groups are separated by double underscores `__`
        let config = Config::builder()
            .add_source(files)
            .add_source(Environment::with_prefix("hexstats").separator("__"))
            .build()
            .context(error::Config)?;

        Ok(Self { config })
    }

    /// Replaces the value at `key`, e.g. with a command line flag
    pub fn with_override<T>(self, key: &str, value: T) -> Result<Self>
    where
        T: Into<config::Value>,
    {
        let config = Config::builder()
            .add_source(self.config)
            .set_override(key, value)
            .context(error::Config)?
            .build()
            .context(error::Config)?;

        Ok(Self { config })
    }

    pub fn get<'a, T>(&self, key: &str) -> Result<T>
    where
        T: Deserialize<'a>,
    {
        self.config.get::<T>(key).context(error::Config)
    }

    pub fn get_element<'a, T>(&self) -> Result<T>
    where
        T: ConfigElement + Deserialize<'a>,
    {
        self.get(T::KEY)
    }
}

fn retrieve_settings_dir() -> Result<PathBuf> {
    const MAX_PARENT_DIRS: usize = 1;

    let mut settings_dir = std::env::current_dir().context(error::MissingWorkingDirectory)?;

    for _ in 0..=MAX_PARENT_DIRS {
        if settings_dir.join(DEFAULT_SETTINGS_FILE).exists() {
            return Ok(settings_dir);
        }

        // go to parent directory
        if !settings_dir.pop() {
            break;
        }
    }

    Err(Error::MissingSettingsDirectory)
}

pub trait ConfigElement {
    const KEY: &'static str;
}

#[derive(Debug, Clone, Deserialize)]
pub struct Logging {
    pub log_spec: String,
}

impl ConfigElement for Logging {
    const KEY: &'static str = "logging";
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Engine {
    pub cell_parallelism: usize,
    pub window_concurrency: usize,
    pub fetch_timeout_seconds: u64,
    pub fetch_max_attempts: usize,
    pub fetch_initial_delay_ms: u64,
    pub fetch_backoff_factor: f64,
}

impl ConfigElement for Engine {
    const KEY: &'static str = "engine";
}

impl From<Engine> for EngineOptions {
    fn from(engine: Engine) -> Self {
        Self {
            cell_parallelism: engine.cell_parallelism,
            window_concurrency: engine.window_concurrency,
            fetch: FetchOptions {
                timeout_seconds: engine.fetch_timeout_seconds,
                retry: RetryOptions {
                    max_attempts: engine.fetch_max_attempts,
                    initial_delay_ms: engine.fetch_initial_delay_ms,
                    exponential_backoff_factor: engine.fetch_backoff_factor,
                },
            },
        }
    }
}

/// The configured source presets by name
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Sources(BTreeMap<String, SourceConfig>);

impl ConfigElement for Sources {
    const KEY: &'static str = "sources";
}

impl Sources {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// The preset `name`, named after its key unless it sets a name itself
    pub fn get(&self, name: &str) -> Result<SourceConfig> {
        let mut source = self
            .0
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownSource {
                name: name.to_string(),
            })?;

        if source.name.is_empty() {
            source.name = name.to_string();
        }

        Ok(source)
    }

    pub fn insert(&mut self, name: impl Into<String>, source: SourceConfig) {
        self.0.insert(name.into(), source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexstats_datatypes::primitives::TimeGranularity;
    use hexstats_operators::processing::{ContinuousStatistic, SliceReduction, StatSpec};
    use hexstats_operators::source::ColumnNaming;

    fn workspace_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("..")
    }

    fn default_settings() -> Settings {
        Settings::load_from(&workspace_dir()).unwrap()
    }

    #[test]
    fn engine_defaults() {
        let engine: Engine = default_settings().get_element().unwrap();
        let options = EngineOptions::from(engine);

        assert_eq!(options.window_concurrency, 4);
        assert_eq!(options.fetch.timeout_seconds, 120);
        assert_eq!(options.fetch.retry.max_attempts, 3);
    }

    #[test]
    fn shipped_presets() {
        let sources: Sources = default_settings().get_element().unwrap();

        assert_eq!(
            sources.names().collect::<Vec<_>>(),
            ["elevation", "indices", "landcover", "population", "soils", "weather"]
        );

        let elevation = sources.get("elevation").unwrap();
        assert_eq!(elevation.name, "elevation");
        assert_eq!(elevation.reference_resolution, 11);
        assert_eq!(elevation.nodata, Some(-999.0));
        assert_eq!(
            elevation.stat_spec,
            StatSpec::continuous([ContinuousStatistic::Median, ContinuousStatistic::Range])
        );

        let indices = sources.get("indices").unwrap();
        assert_eq!(
            indices.temporal.map(|step| step.granularity),
            Some(TimeGranularity::Months)
        );
        assert_eq!(indices.slice_reduction, SliceReduction::Mean);

        let weather = sources.get("weather").unwrap();
        assert_eq!(weather.slice_reduction, SliceReduction::PerSlice);
        assert!(weather.temporal.is_none());
        assert_eq!(weather.slices, Some(12));
        assert_eq!(weather.column_naming, ColumnNaming::Prefix);
        assert_eq!(weather.band_names(), [Some("air"), Some("precip")]);
        assert_eq!(weather.column_prefixes(), ["air", "precip"]);

        let landcover = sources.get("landcover").unwrap();
        assert!(landcover.stat_spec.is_categorical());

        for name in sources.names() {
            assert!(sources.get(name).unwrap().validate().is_ok(), "{name}");
        }
    }

    #[test]
    fn unknown_preset() {
        let sources: Sources = default_settings().get_element().unwrap();

        assert!(matches!(
            sources.get("bathymetry"),
            Err(Error::UnknownSource { .. })
        ));
    }

    #[test]
    fn overrides() {
        let settings = default_settings()
            .with_override("engine.window_concurrency", 8)
            .unwrap()
            .with_override("logging.log_spec", "debug")
            .unwrap();

        let engine: Engine = settings.get_element().unwrap();
        let logging: Logging = settings.get_element().unwrap();

        assert_eq!(engine.window_concurrency, 8);
        assert_eq!(logging.log_spec, "debug");
    }

    #[test]
    fn local_settings_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::copy(
            workspace_dir().join(DEFAULT_SETTINGS_FILE),
            dir.path().join(DEFAULT_SETTINGS_FILE),
        )
        .unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            "[sources.elevation]\nreference_resolution = 10\n",
        )
        .unwrap();

        let sources: Sources = Settings::load_from(dir.path())
            .unwrap()
            .get_element()
            .unwrap();
        let elevation = sources.get("elevation").unwrap();

        assert_eq!(elevation.reference_resolution, 10);
        assert_eq!(elevation.column_prefix, "elevation");
    }
}
