use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::error::{self, Error};
use crate::util::Result;

/// A statistic over the valid pixels of a continuous field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ContinuousStatistic {
    Min,
    Max,
    Mean,
    Median,
    /// `max - min`
    Range,
    /// number of valid pixels
    Count,
    /// percentile in `0..=100`, linearly interpolated between the closest ranks
    Percentile(u8),
}

impl fmt::Display for ContinuousStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContinuousStatistic::Min => f.write_str("min"),
            ContinuousStatistic::Max => f.write_str("max"),
            ContinuousStatistic::Mean => f.write_str("mean"),
            ContinuousStatistic::Median => f.write_str("median"),
            ContinuousStatistic::Range => f.write_str("range"),
            ContinuousStatistic::Count => f.write_str("count"),
            ContinuousStatistic::Percentile(p) => write!(f, "p{p}"),
        }
    }
}

impl FromStr for ContinuousStatistic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidStatistic {
            statistic: s.to_string(),
        };

        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "min" => ContinuousStatistic::Min,
            "max" => ContinuousStatistic::Max,
            "mean" => ContinuousStatistic::Mean,
            "median" => ContinuousStatistic::Median,
            "range" => ContinuousStatistic::Range,
            "count" => ContinuousStatistic::Count,
            other => {
                let percentile = other
                    .strip_prefix('p')
                    .and_then(|p| p.parse::<u8>().ok())
                    .ok_or_else(invalid)?;
                ensure!(
                    percentile <= 100,
                    error::InvalidStatistic { statistic: s }
                );
                ContinuousStatistic::Percentile(percentile)
            }
        })
    }
}

impl TryFrom<String> for ContinuousStatistic {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContinuousStatistic> for String {
    fn from(statistic: ContinuousStatistic) -> Self {
        statistic.to_string()
    }
}

/// The categorical outputs of a class-valued field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalSpec {
    /// the most frequent class, ties go to the lowest class code
    #[serde(default = "default_true")]
    pub majority: bool,
    /// the number of distinct classes
    #[serde(default)]
    pub unique: bool,
    /// the fractional share of every class
    #[serde(default)]
    pub histogram: bool,
    /// A fixed class list for the histogram. Classes of the list that are absent
    /// from a cell get a share of `0.0` instead of being omitted.
    #[serde(default)]
    pub classes: Option<Vec<i64>>,
}

fn default_true() -> bool {
    true
}

impl Default for CategoricalSpec {
    fn default() -> Self {
        Self {
            majority: true,
            unique: false,
            histogram: false,
            classes: None,
        }
    }
}

/// Which statistics are computed for a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StatSpec {
    Continuous {
        statistics: Vec<ContinuousStatistic>,
    },
    Categorical(CategoricalSpec),
}

impl StatSpec {
    pub fn continuous(statistics: impl Into<Vec<ContinuousStatistic>>) -> Self {
        StatSpec::Continuous {
            statistics: statistics.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let StatSpec::Continuous { statistics } = self {
            ensure!(!statistics.is_empty(), error::EmptyStatistics);
        }
        Ok(())
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, StatSpec::Categorical(_))
    }
}

/// How the time slices of one window are combined
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum SliceReduction {
    /// Continuous statistics are computed per slice and averaged, slices without
    /// valid pixels are ignored. Categorical statistics pool the pixels of all slices.
    #[default]
    Mean,
    /// Every declared slice gets its own group of columns, suffixed with `_1`, `_2`, ...
    PerSlice,
}

/// Named numeric attributes per class code, e.g. soil properties per mapping unit.
///
/// The attributes of a cell's majority class are appended to its row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ClassAttributeTableDef", into = "ClassAttributeTableDef")]
pub struct ClassAttributeTable {
    attributes: Vec<String>,
    values: BTreeMap<i64, Vec<f64>>,
}

impl ClassAttributeTable {
    pub fn new(attributes: Vec<String>, rows: Vec<(i64, Vec<f64>)>) -> Result<Self> {
        let expected = attributes.len();
        let mut values = BTreeMap::new();

        for (class, row) in rows {
            ensure!(
                row.len() == expected,
                error::InvalidClassAttributes {
                    class,
                    expected,
                    found: row.len(),
                }
            );
            values.insert(class, row);
        }

        Ok(Self { attributes, values })
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn lookup(&self, class: i64) -> Option<&[f64]> {
        self.values.get(&class).map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClassAttributeTableDef {
    attributes: Vec<String>,
    classes: Vec<ClassAttributeRowDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClassAttributeRowDef {
    class: i64,
    values: Vec<f64>,
}

impl TryFrom<ClassAttributeTableDef> for ClassAttributeTable {
    type Error = Error;

    fn try_from(def: ClassAttributeTableDef) -> Result<Self, Self::Error> {
        Self::new(
            def.attributes,
            def.classes
                .into_iter()
                .map(|row| (row.class, row.values))
                .collect(),
        )
    }
}

impl From<ClassAttributeTable> for ClassAttributeTableDef {
    fn from(table: ClassAttributeTable) -> Self {
        Self {
            attributes: table.attributes,
            classes: table
                .values
                .into_iter()
                .map(|(class, values)| ClassAttributeRowDef { class, values })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_statistics() {
        assert_eq!(
            "median".parse::<ContinuousStatistic>().unwrap(),
            ContinuousStatistic::Median
        );
        assert_eq!(
            "P10".parse::<ContinuousStatistic>().unwrap(),
            ContinuousStatistic::Percentile(10)
        );
        assert!("p101".parse::<ContinuousStatistic>().is_err());
        assert!("average".parse::<ContinuousStatistic>().is_err());
        assert!("p".parse::<ContinuousStatistic>().is_err());
    }

    #[test]
    fn statistic_names() {
        assert_eq!(ContinuousStatistic::Percentile(90).to_string(), "p90");
        assert_eq!(ContinuousStatistic::Range.to_string(), "range");
    }

    #[test]
    fn deserialize_continuous() {
        let spec: StatSpec = serde_json::from_str(
            r#"{"type": "continuous", "statistics": ["min", "p10", "p50", "p90", "max"]}"#,
        )
        .unwrap();

        assert_eq!(
            spec,
            StatSpec::continuous([
                ContinuousStatistic::Min,
                ContinuousStatistic::Percentile(10),
                ContinuousStatistic::Percentile(50),
                ContinuousStatistic::Percentile(90),
                ContinuousStatistic::Max,
            ])
        );
    }

    #[test]
    fn deserialize_categorical() {
        let spec: StatSpec =
            serde_json::from_str(r#"{"type": "categorical", "unique": true, "histogram": true}"#)
                .unwrap();

        assert_eq!(
            spec,
            StatSpec::Categorical(CategoricalSpec {
                majority: true,
                unique: true,
                histogram: true,
                classes: None,
            })
        );
    }

    #[test]
    fn empty_statistics_are_invalid() {
        assert!(StatSpec::continuous([]).validate().is_err());
        assert!(StatSpec::Categorical(CategoricalSpec::default())
            .validate()
            .is_ok());
    }

    #[test]
    fn slice_reduction_serde() {
        let reduction: SliceReduction = serde_json::from_str(r#""perSlice""#).unwrap();
        assert_eq!(reduction, SliceReduction::PerSlice);
        assert_eq!(reduction.to_string(), "perSlice");
    }

    #[test]
    fn class_attributes() {
        let table: ClassAttributeTable = serde_json::from_str(
            r#"{
                "attributes": ["sand", "clay"],
                "classes": [
                    {"class": 11000, "values": [40.0, 22.0]},
                    {"class": 11001, "values": [65.0, 10.0]}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(table.attributes(), ["sand", "clay"]);
        assert_eq!(table.lookup(11001), Some([65.0, 10.0].as_slice()));
        assert_eq!(table.lookup(1), None);
    }

    #[test]
    fn class_attributes_must_match_width() {
        let result = ClassAttributeTable::new(vec!["sand".into()], vec![(1, vec![1.0, 2.0])]);
        assert!(result.is_err());
    }
}
