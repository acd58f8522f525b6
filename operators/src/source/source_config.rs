use hexstats_datatypes::primitives::TimeStep;
use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::error;
use crate::processing::{ClassAttributeTable, SliceReduction, StatSpec};
use crate::util::Result;

const MAX_H3_RESOLUTION: u8 = 15;

/// Everything the engine needs to know about one raster source.
///
/// A source is summarized at its `reference_resolution`: cells of this or a coarser
/// resolution use exact pixel-center membership, finer cells take all touched pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub name: String,
    pub reference_resolution: u8,
    /// An additional nodata value, on top of the one the raster itself declares
    #[serde(default)]
    pub nodata: Option<f64>,
    /// The column prefix of a single-band source
    #[serde(default)]
    pub column_prefix: String,
    pub stat_spec: StatSpec,
    /// Window granularity for multi-date sources, `None` for static sources
    #[serde(default)]
    pub temporal: Option<TimeStep>,
    #[serde(default)]
    pub slice_reduction: SliceReduction,
    /// The number of slices a per-slice source declares, e.g. 12 monthly normals.
    ///
    /// The column groups follow from this count alone, slices beyond it are dropped
    /// and missing slices become nulls.
    #[serde(default)]
    pub slices: Option<usize>,
    /// Variables that are loaded separately per window, each with its own columns.
    /// Empty for single-band sources, which use `column_prefix`.
    #[serde(default)]
    pub bands: Vec<BandConfig>,
    #[serde(default)]
    pub column_naming: ColumnNaming,
    #[serde(default)]
    pub class_attributes: Option<ClassAttributeTable>,
}

/// One variable of a multi-variable source, e.g. air temperature or precipitation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandConfig {
    /// the name the raster source knows the variable by
    pub name: String,
    pub column_prefix: String,
}

/// How statistic columns are named
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnNaming {
    /// `{prefix}_{statistic}`, e.g. `elevation_median` or `air_mean_3`
    #[default]
    Statistic,
    /// `{prefix}` only, e.g. `air_3`. Requires exactly one continuous statistic.
    Prefix,
}

impl SourceConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.reference_resolution <= MAX_H3_RESOLUTION,
            error::InvalidReferenceResolution {
                source_name: self.name.clone(),
                resolution: self.reference_resolution,
            }
        );

        ensure!(
            self.slice_reduction != SliceReduction::PerSlice
                || self.slices.is_some_and(|slices| slices > 0),
            error::MissingSliceCount {
                source_name: self.name.clone(),
            }
        );

        ensure!(
            !self.column_prefixes().iter().any(|prefix| prefix.is_empty()),
            error::MissingColumnPrefix {
                source_name: self.name.clone(),
            }
        );

        ensure!(
            self.bands.len() <= 1 || self.class_attributes.is_none(),
            error::ClassAttributesWithBands {
                source_name: self.name.clone(),
            }
        );

        if self.column_naming == ColumnNaming::Prefix {
            let single_statistic = matches!(
                &self.stat_spec,
                StatSpec::Continuous { statistics } if statistics.len() == 1
            );
            ensure!(
                single_statistic,
                error::InvalidColumnNaming {
                    source_name: self.name.clone(),
                }
            );
        }

        self.stat_spec.validate()
    }

    pub fn is_temporal(&self) -> bool {
        self.temporal.is_some()
    }

    #[allow(clippy::float_cmp)]
    pub fn is_no_data(&self, value: f64) -> bool {
        self.nodata.is_some_and(|nodata| value == nodata)
    }

    /// The band names to fetch per window, `None` stands for the only raster of a
    /// single-band source
    pub fn band_names(&self) -> Vec<Option<&str>> {
        if self.bands.is_empty() {
            vec![None]
        } else {
            self.bands.iter().map(|band| Some(band.name.as_str())).collect()
        }
    }

    /// The column prefix of every band, in band order
    pub fn column_prefixes(&self) -> Vec<&str> {
        if self.bands.is_empty() {
            vec![self.column_prefix.as_str()]
        } else {
            self.bands
                .iter()
                .map(|band| band.column_prefix.as_str())
                .collect()
        }
    }

    /// The number of column groups per band: one, or one per declared slice
    pub fn groups_per_band(&self) -> usize {
        match self.slice_reduction {
            SliceReduction::Mean => 1,
            SliceReduction::PerSlice => self.slices.unwrap_or(1).max(1),
        }
    }
}
