use std::collections::BTreeMap;

use super::stat_spec::{CategoricalSpec, ClassAttributeTable, ContinuousStatistic};

/// The sorted valid values of one clip
#[derive(Debug, Clone, PartialEq)]
pub struct SortedSample {
    values: Vec<f64>,
}

impl SortedSample {
    /// Sorts the values, `None` if there are none
    pub fn new(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        values.sort_unstable_by(f64::total_cmp);

        Some(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn min(&self) -> f64 {
        self.values[0]
    }

    pub fn max(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    pub fn mean(&self) -> f64 {
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// The `percentile` (`0..=100`), linearly interpolated between the two closest ranks
    pub fn percentile(&self, percentile: u8) -> f64 {
        let rank = f64::from(percentile.min(100)) / 100.0 * (self.values.len() - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = rank.ceil() as usize;

        let lower_value = self.values[lower];
        let upper_value = self.values[upper];

        lower_value + (upper_value - lower_value) * (rank - lower as f64)
    }

    pub fn statistic(&self, statistic: ContinuousStatistic) -> f64 {
        match statistic {
            ContinuousStatistic::Min => self.min(),
            ContinuousStatistic::Max => self.max(),
            ContinuousStatistic::Mean => self.mean(),
            ContinuousStatistic::Median => self.percentile(50),
            ContinuousStatistic::Range => self.max() - self.min(),
            ContinuousStatistic::Count => self.len() as f64,
            ContinuousStatistic::Percentile(p) => self.percentile(p),
        }
    }
}

/// Computes `statistics` in the requested order, `None` if there are no values
pub fn continuous_statistics(
    values: Vec<f64>,
    statistics: &[ContinuousStatistic],
) -> Option<Vec<f64>> {
    let sample = SortedSample::new(values)?;

    Some(
        statistics
            .iter()
            .map(|&statistic| sample.statistic(statistic))
            .collect(),
    )
}

/// Averages per-slice statistics element-wise, `None` if no slice had values
pub fn mean_of_statistics(per_slice: &[Vec<f64>]) -> Option<Vec<f64>> {
    let first = per_slice.first()?;
    let mut sums = vec![0.0; first.len()];

    for statistics in per_slice {
        for (sum, value) in sums.iter_mut().zip(statistics) {
            *sum += value;
        }
    }

    let slices = per_slice.len() as f64;
    Some(sums.into_iter().map(|sum| sum / slices).collect())
}

/// Pixel counts per class code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassCounts {
    counts: BTreeMap<i64, u64>,
    total: u64,
    rejected: u64,
}

impl ClassCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pixel value as its class code.
    ///
    /// Class codes pass through unchanged. Values that are not integral, or that do
    /// not fit an `i64`, are not a class code: they are counted as rejected and take
    /// no part in the statistics.
    pub fn add(&mut self, value: f64) {
        match class_code(value) {
            Some(class) => {
                *self.counts.entry(class).or_insert(0) += 1;
                self.total += 1;
            }
            None => self.rejected += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// The number of values that were not a valid class code
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// The most frequent class, ties go to the lowest class code
    pub fn majority(&self) -> Option<i64> {
        let mut majority: Option<(i64, u64)> = None;

        for (&class, &count) in &self.counts {
            if majority.is_none_or(|(_, majority_count)| count > majority_count) {
                majority = Some((class, count));
            }
        }

        majority.map(|(class, _)| class)
    }

    pub fn unique(&self) -> usize {
        self.counts.len()
    }

    /// The share of every present class, summing to `1.0`
    pub fn fractions(&self) -> BTreeMap<i64, f64> {
        let total = self.total as f64;

        self.counts
            .iter()
            .map(|(&class, &count)| (class, count as f64 / total))
            .collect()
    }
}

#[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
fn class_code(value: f64) -> Option<i64> {
    // `i64::MAX as f64` rounds up to 2^63, which does not fit
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;

    (in_range && value.trunc() == value).then_some(value as i64)
}

impl FromIterator<f64> for ClassCounts {
    fn from_iter<T: IntoIterator<Item = f64>>(iter: T) -> Self {
        let mut counts = ClassCounts::new();
        for value in iter {
            counts.add(value);
        }
        counts
    }
}

/// The categorical statistics of one clip
#[derive(Debug, Clone, PartialEq)]
pub struct ClassSummary {
    pub majority: i64,
    pub unique: usize,
    /// present classes only, dense class lists are applied when building the table
    pub fractions: BTreeMap<i64, f64>,
    /// the attributes of the majority class, if there is a lookup table entry
    pub attributes: Option<Vec<f64>>,
}

impl ClassSummary {
    /// Summarizes the counts, `None` if no pixel was counted
    pub fn new(
        counts: &ClassCounts,
        spec: &CategoricalSpec,
        class_attributes: Option<&ClassAttributeTable>,
    ) -> Option<Self> {
        let majority = counts.majority()?;

        Some(Self {
            majority,
            unique: counts.unique(),
            fractions: if spec.histogram {
                counts.fractions()
            } else {
                BTreeMap::new()
            },
            attributes: class_attributes
                .and_then(|table| table.lookup(majority))
                .map(<[f64]>::to_vec),
        })
    }
}
