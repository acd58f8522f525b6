use crate::error::{self, Error};
use crate::util::Result;
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, ensure};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A half-open date interval `[start, end)` with a label.
///
/// Windows partition a multi-date raster source; every window triggers one fetch
/// and yields at most one row per cell.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    start: NaiveDate,
    end: NaiveDate,
    label: String,
}

impl TimeWindow {
    /// Creates a new window
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use hexstats_datatypes::primitives::TimeWindow;
    ///
    /// let start = NaiveDate::from_ymd_opt(2020, 7, 1).unwrap();
    /// let end = NaiveDate::from_ymd_opt(2020, 8, 1).unwrap();
    ///
    /// let window = TimeWindow::new(start, end, "2020-07").unwrap();
    /// assert!(window.contains(start));
    /// assert!(!window.contains(end));
    /// ```
    ///
    /// # Errors
    ///
    /// This constructor fails if `start` is not before `end`
    ///
    pub fn new(start: NaiveDate, end: NaiveDate, label: impl Into<String>) -> Result<Self> {
        ensure!(start < end, error::TimeWindowEndBeforeStart { start, end });

        Ok(Self {
            start,
            end,
            label: label.into(),
        })
    }

    /// The calendar month `year`-`month`, labelled `YYYY-MM`
    pub fn month(year: i32, month: u32) -> Result<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            Error::InvalidDateRange {
                range: format!("{year:04}-{month:02}"),
            }
        })?;
        let end = start
            .checked_add_months(Months::new(1))
            .ok_or(Error::DateOutOfRange {
                date: start,
                months: 1,
            })?;

        Self::new(start, end, format!("{year:04}-{month:02}"))
    }

    /// The calendar year `year`, labelled `YYYY`
    pub fn year(year: i32) -> Result<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| Error::InvalidDateRange {
            range: format!("{year:04}"),
        })?;
        let end = NaiveDate::from_ymd_opt(year + 1, 1, 1).ok_or(Error::DateOutOfRange {
            date: start,
            months: 12,
        })?;

        Self::new(start, end, format!("{year:04}"))
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// The exclusive end of the window
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// The last day that still belongs to the window
    pub fn last_day(&self) -> NaiveDate {
        self.end.pred_opt().unwrap_or(self.start)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// The window as a catalog datetime query, e.g. `2020-07-01/2020-07-31`
    pub fn to_datetime_query(&self) -> String {
        format!(
            "{}/{}",
            self.start.format(DATE_FORMAT),
            self.last_day().format(DATE_FORMAT)
        )
    }

    /// Checks that the windows are ordered by start and do not overlap
    pub fn validate_sequence(windows: &[TimeWindow]) -> Result<()> {
        for pair in windows.windows(2) {
            let (previous, next) = (&pair[0], &pair[1]);
            ensure!(
                previous.end <= next.start,
                error::InvalidDateRange {
                    range: format!("{previous} overlaps or precedes {next}"),
                }
            );
        }
        Ok(())
    }
}

impl PartialOrd for TimeWindow {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeWindow {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start
            .cmp(&other.start)
            .then(self.end.cmp(&other.end))
            .then_with(|| self.label.cmp(&other.label))
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}, {})",
            self.label,
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

impl FromStr for TimeWindow {
    type Err = Error;

    /// Parses `YYYY`, `YYYY-MM` or an inclusive range `YYYY-MM-DD/YYYY-MM-DD`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.contains('/') {
            let range = DateRange::from_str(s)?;
            return Self::new(range.start(), range.end(), s);
        }

        match s.len() {
            4 => {
                let year = s.parse::<i32>().map_err(|_| Error::InvalidDateRange {
                    range: s.to_string(),
                })?;
                Self::year(year)
            }
            7 => {
                let date = parse_date(&format!("{s}-01"))?;
                Self::month(date.year(), date.month())
            }
            _ => Err(Error::InvalidDateRange {
                range: s.to_string(),
            }),
        }
    }
}

/// A half-open date range `[start, end)` as requested by a caller.
///
/// Textual ranges use the catalog convention of an inclusive end date,
/// i.e. `2020-01-01/2020-12-31` covers the whole year 2020.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        ensure!(start < end, error::TimeWindowEndBeforeStart { start, end });
        Ok(Self { start, end })
    }

    /// Creates a range from an inclusive last day
    pub fn new_inclusive(start: NaiveDate, last_day: NaiveDate) -> Result<Self> {
        let end = last_day
            .checked_add_days(Days::new(1))
            .ok_or(Error::DateOutOfRange {
                date: last_day,
                months: 0,
            })?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

impl FromStr for DateRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, last_day) = s.trim().split_once('/').ok_or_else(|| Error::InvalidDateRange {
            range: s.to_string(),
        })?;

        Self::new_inclusive(parse_date(start)?, parse_date(last_day)?)
    }
}

impl From<&TimeWindow> for DateRange {
    fn from(window: &TimeWindow) -> Self {
        Self {
            start: window.start,
            end: window.end,
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, DATE_FORMAT).context(error::ParseDate { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn new_rejects_empty_window() {
        assert!(TimeWindow::new(date(2020, 1, 1), date(2020, 1, 1), "x").is_err());
        assert!(TimeWindow::new(date(2020, 2, 1), date(2020, 1, 1), "x").is_err());
    }

    #[test]
    fn month_window() {
        let window = TimeWindow::month(2020, 12).unwrap();

        assert_eq!(window.start(), date(2020, 12, 1));
        assert_eq!(window.end(), date(2021, 1, 1));
        assert_eq!(window.last_day(), date(2020, 12, 31));
        assert_eq!(window.label(), "2020-12");
        assert_eq!(window.duration_days(), 31);
    }

    #[test]
    fn parse_month_identifier() {
        let window: TimeWindow = "2020-07".parse().unwrap();

        assert_eq!(window, TimeWindow::month(2020, 7).unwrap());
        assert_eq!(window.to_datetime_query(), "2020-07-01/2020-07-31");
    }

    #[test]
    fn parse_year_identifier() {
        let window: TimeWindow = "2023".parse().unwrap();

        assert_eq!(window.start(), date(2023, 1, 1));
        assert_eq!(window.end(), date(2024, 1, 1));
    }

    #[test]
    fn parse_inclusive_range() {
        let window: TimeWindow = "2020-01-01/2023-12-31".parse().unwrap();

        assert_eq!(window.start(), date(2020, 1, 1));
        assert_eq!(window.end(), date(2024, 1, 1));
        assert_eq!(window.label(), "2020-01-01/2023-12-31");
    }

    #[test]
    fn parse_garbage() {
        assert!("2020-13".parse::<TimeWindow>().is_err());
        assert!("yesterday".parse::<TimeWindow>().is_err());
        assert!("2020-01-01/".parse::<DateRange>().is_err());
    }

    #[test]
    fn sequence_validation() {
        let ordered = vec![
            TimeWindow::month(2020, 7).unwrap(),
            TimeWindow::month(2020, 8).unwrap(),
        ];
        assert!(TimeWindow::validate_sequence(&ordered).is_ok());

        let overlapping = vec![
            TimeWindow::year(2020).unwrap(),
            TimeWindow::month(2020, 8).unwrap(),
        ];
        assert!(TimeWindow::validate_sequence(&overlapping).is_err());
    }
}
