//! Date windows for fetching events and the range already loaded.

use std::fmt;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Club-local date window for a fetch. `None` means unbounded in that direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        DateRange { from, to }
    }

    /// Everything from `from` onward.
    pub fn starting(from: NaiveDate) -> Self {
        DateRange {
            from: Some(from),
            to: None,
        }
    }

    /// Parse CLI arguments.
    /// - `from`: "start" for unbounded, or YYYY-MM-DD (defaults to `today`)
    /// - `to`: YYYY-MM-DD, unbounded if not specified
    pub fn from_args(from: Option<&str>, to: Option<&str>, today: NaiveDate) -> Result<Self, String> {
        let from = match from {
            Some("start") => None,
            Some(s) => Some(parse_date(s)?),
            None => Some(today),
        };
        let to = to.map(parse_date).transpose()?;
        if let (Some(from), Some(to)) = (from, to) {
            if to < from {
                return Err(format!("End date {to} is before start date {from}"));
            }
        }
        Ok(DateRange { from, to })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }

    /// Whether an instant falls in the window, judged by its club-local date.
    pub fn contains_instant(&self, instant: DateTime<Utc>, tz: &Tz) -> bool {
        self.contains(instant.with_timezone(tz).date_naive())
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.from, self.to) {
            (Some(from), Some(to)) => write!(f, "{from}..={to}"),
            (Some(from), None) => write!(f, "{from}.."),
            (None, Some(to)) => write!(f, "..={to}"),
            (None, None) => f.write_str(".."),
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date format '{}'. Expected YYYY-MM-DD", s))
}

/// Dates whose events are in the store. Extended by backfills, never shrunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedRange {
    pub earliest: NaiveDate,
    /// `None` when everything after `earliest` is loaded
    pub latest: Option<NaiveDate>,
}

impl LoadedRange {
    pub fn from_window(window: &DateRange, today: NaiveDate) -> Self {
        LoadedRange {
            earliest: window.from.unwrap_or(today),
            latest: window.to,
        }
    }

    pub fn as_window(&self) -> DateRange {
        DateRange::new(Some(self.earliest), self.latest)
    }

    /// Grow to cover `window`; never shrinks.
    pub fn extend(&mut self, window: &DateRange) {
        if let Some(from) = window.from {
            self.earliest = self.earliest.min(from);
        }
        self.latest = match (self.latest, window.to) {
            (Some(latest), Some(to)) => Some(latest.max(to)),
            _ => None,
        };
    }
}

/// First day of `date`'s month.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// `date` moved back by whole months, clamped to the month's length.
pub fn months_before(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months)).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_from_args_defaults_to_today_onward() {
        let range = DateRange::from_args(None, None, d(2025, 3, 19)).unwrap();
        assert_eq!(range, DateRange::starting(d(2025, 3, 19)));
    }

    #[test]
    fn test_from_args_start_is_unbounded() {
        let range = DateRange::from_args(Some("start"), Some("2025-04-30"), d(2025, 3, 19)).unwrap();
        assert_eq!(range.from, None);
        assert_eq!(range.to, Some(d(2025, 4, 30)));
    }

    #[test]
    fn test_from_args_rejects_bad_input() {
        assert!(DateRange::from_args(Some("03/19/2025"), None, d(2025, 3, 19)).is_err());
        assert!(DateRange::from_args(Some("2025-04-01"), Some("2025-03-01"), d(2025, 3, 19)).is_err());
    }

    #[test]
    fn test_contains() {
        let range = DateRange::new(Some(d(2025, 3, 1)), Some(d(2025, 3, 31)));
        assert!(range.contains(d(2025, 3, 1)));
        assert!(range.contains(d(2025, 3, 31)));
        assert!(!range.contains(d(2025, 4, 1)));
        assert!(DateRange::default().contains(d(1999, 1, 1)));
    }

    #[test]
    fn test_loaded_range_never_shrinks() {
        let mut loaded = LoadedRange {
            earliest: d(2025, 3, 1),
            latest: Some(d(2025, 6, 30)),
        };
        loaded.extend(&DateRange::new(Some(d(2025, 4, 1)), Some(d(2025, 5, 1))));
        assert_eq!(loaded.earliest, d(2025, 3, 1));
        assert_eq!(loaded.latest, Some(d(2025, 6, 30)));

        loaded.extend(&DateRange::new(Some(d(2025, 1, 1)), Some(d(2025, 2, 28))));
        assert_eq!(loaded.earliest, d(2025, 1, 1));

        loaded.extend(&DateRange::starting(d(2025, 1, 1)));
        assert_eq!(loaded.latest, None);
    }

    #[test]
    fn test_month_helpers() {
        assert_eq!(first_of_month(d(2025, 3, 19)), d(2025, 3, 1));
        assert_eq!(months_before(d(2025, 3, 31), 1), d(2025, 2, 28));
        assert_eq!(months_before(d(2025, 1, 15), 2), d(2024, 11, 15));
    }

    #[test]
    fn test_display() {
        assert_eq!(DateRange::starting(d(2025, 3, 1)).to_string(), "2025-03-01..");
        assert_eq!(DateRange::default().to_string(), "..");
    }
}
