use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::error::{self, Error};
use crate::primitives::{DateRange, TimeWindow};
use crate::util::Result;

/// A time granularity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeGranularity {
    Days,
    Months,
    Years,
}

/// A step in time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeStep {
    pub granularity: TimeGranularity,
    #[serde(default = "default_step")]
    pub step: u32,
}

fn default_step() -> u32 {
    1
}

impl TimeStep {
    pub fn months(step: u32) -> Self {
        Self {
            granularity: TimeGranularity::Months,
            step,
        }
    }

    pub fn years(step: u32) -> Self {
        Self {
            granularity: TimeGranularity::Years,
            step,
        }
    }

    /// Snaps a date to the start of the calendar unit it lies in,
    /// e.g. the first day of its month for monthly steps.
    pub fn snap(self, date: NaiveDate) -> NaiveDate {
        match self.granularity {
            TimeGranularity::Days => date,
            TimeGranularity::Months => date.with_day(1).unwrap_or(date),
            TimeGranularity::Years => date.with_ordinal(1).unwrap_or(date),
        }
    }

    /// Adds `self` to `date`
    pub fn add_to(self, date: NaiveDate) -> Result<NaiveDate> {
        let shifted = match self.granularity {
            TimeGranularity::Days => date.checked_add_days(Days::new(u64::from(self.step))),
            TimeGranularity::Months => date.checked_add_months(Months::new(self.step)),
            TimeGranularity::Years => self
                .step
                .checked_mul(12)
                .and_then(|months| date.checked_add_months(Months::new(months))),
        };

        shifted.ok_or(Error::DateOutOfRange {
            date,
            months: self.step,
        })
    }

    fn label(self, start: NaiveDate) -> String {
        match self.granularity {
            TimeGranularity::Days => start.format("%Y-%m-%d").to_string(),
            TimeGranularity::Months => start.format("%Y-%m").to_string(),
            TimeGranularity::Years => start.format("%Y").to_string(),
        }
    }

    /// Partitions a date range into calendar-aligned, non-overlapping windows.
    ///
    /// The first window starts at the calendar unit containing the range start, and
    /// every window is clipped to the range, so the windows cover the range exactly.
    ///
    /// # Examples
    ///
    /// ```
    /// use hexstats_datatypes::primitives::{DateRange, TimeStep};
    ///
    /// let range: DateRange = "2020-01-15/2020-03-31".parse().unwrap();
    /// let windows = TimeStep::months(1).windows(range).unwrap();
    ///
    /// let labels: Vec<&str> = windows.iter().map(|w| w.label()).collect();
    /// assert_eq!(labels, ["2020-01", "2020-02", "2020-03"]);
    /// ```
    ///
    pub fn windows(self, range: DateRange) -> Result<Vec<TimeWindow>> {
        ensure!(self.step > 0, error::InvalidTimeStep);

        let mut windows = Vec::new();
        let mut unit_start = self.snap(range.start());

        while unit_start < range.end() {
            let unit_end = self.add_to(unit_start)?;

            let start = unit_start.max(range.start());
            let end = unit_end.min(range.end());

            windows.push(TimeWindow::new(start, end, self.label(unit_start))?);

            unit_start = unit_end;
        }

        Ok(windows)
    }
}
