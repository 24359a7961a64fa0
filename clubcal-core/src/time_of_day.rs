//! Time-of-day and after-hours classification of event start times.
//!
//! All functions classify the wall-clock time of the `DateTime` they are given,
//! so callers localize to the club's timezone first (see `Event::local_start`).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::constants::{AFTERNOON_START_HOUR, EVENING_START_HOUR};
use crate::error::ClubCalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeOfDay {
    type Err = ClubCalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        // Accept the widget's derived tag spelling too ("time:morning")
        match name.strip_prefix("time:").unwrap_or(&name) {
            "morning" => Ok(TimeOfDay::Morning),
            "afternoon" => Ok(TimeOfDay::Afternoon),
            "evening" => Ok(TimeOfDay::Evening),
            _ => Err(ClubCalError::invalid_filter("time-of-day", s)),
        }
    }
}

/// Bucket a start time: morning before 12:00, afternoon until 17:00, evening from 17:00 on.
pub fn time_of_day<Z: TimeZone>(start: &DateTime<Z>) -> TimeOfDay {
    let hour = start.hour();
    if hour < AFTERNOON_START_HOUR {
        TimeOfDay::Morning
    } else if hour < EVENING_START_HOUR {
        TimeOfDay::Afternoon
    } else {
        TimeOfDay::Evening
    }
}

pub fn is_weekend<Z: TimeZone>(start: &DateTime<Z>) -> bool {
    matches!(start.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Weekend at any hour, or a weekday from 17:00 on.
///
/// Not the same as `time_of_day(..) == Evening`: a Saturday-morning event is
/// after-hours but not evening.
pub fn is_after_hours<Z: TimeZone>(start: &DateTime<Z>) -> bool {
    is_weekend(start) || start.hour() >= EVENING_START_HOUR
}

/// Local midnight of the day containing `now`.
///
/// Past-event cutoffs compare against this rather than `now`, so events that
/// started earlier today stay visible.
pub fn start_of_day<Z: TimeZone>(now: &DateTime<Z>) -> DateTime<Z> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    match now.timezone().from_local_datetime(&midnight).earliest() {
        Some(dt) => dt,
        // Midnight skipped by a DST jump; fall back to elapsed-seconds arithmetic
        None => now.clone() - Duration::seconds(i64::from(now.num_seconds_from_midnight())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use chrono_tz::America::Los_Angeles;

    fn la(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<chrono_tz::Tz> {
        Los_Angeles.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_time_of_day_buckets() {
        assert_eq!(time_of_day(&la(2025, 3, 18, 9, 0)), TimeOfDay::Morning);
        assert_eq!(time_of_day(&la(2025, 3, 18, 11, 59)), TimeOfDay::Morning);
        assert_eq!(time_of_day(&la(2025, 3, 18, 12, 0)), TimeOfDay::Afternoon);
        assert_eq!(time_of_day(&la(2025, 3, 18, 16, 59)), TimeOfDay::Afternoon);
        assert_eq!(time_of_day(&la(2025, 3, 18, 20, 0)), TimeOfDay::Evening);
    }

    #[test]
    fn test_five_pm_is_evening() {
        assert_eq!(time_of_day(&la(2025, 3, 18, 17, 0)), TimeOfDay::Evening);
    }

    #[test]
    fn test_classification_uses_local_wall_clock() {
        // 01:30 UTC on a Wednesday is 18:30 Tuesday in Los Angeles (PDT)
        let utc = Utc.with_ymd_and_hms(2025, 6, 11, 1, 30, 0).unwrap();
        let local = utc.with_timezone(&Los_Angeles);
        assert_eq!(time_of_day(&utc), TimeOfDay::Morning);
        assert_eq!(time_of_day(&local), TimeOfDay::Evening);
        assert_eq!(local.weekday(), Weekday::Tue);
    }

    #[test]
    fn test_saturday_morning_is_after_hours_but_not_evening() {
        let saturday = la(2025, 3, 22, 10, 0);
        assert!(is_weekend(&saturday));
        assert!(is_after_hours(&saturday));
        assert_ne!(time_of_day(&saturday), TimeOfDay::Evening);
    }

    #[test]
    fn test_weekday_after_hours() {
        // Tuesday 18:00 yes, Wednesday 14:00 no, Friday 17:00 yes
        assert!(is_after_hours(&la(2025, 3, 18, 18, 0)));
        assert!(!is_after_hours(&la(2025, 3, 19, 14, 0)));
        assert!(is_after_hours(&la(2025, 3, 21, 17, 0)));
        assert!(!is_after_hours(&la(2025, 3, 21, 16, 59)));
    }

    #[test]
    fn test_sunday_is_weekend() {
        assert!(is_weekend(&la(2025, 3, 23, 8, 0)));
        assert!(!is_weekend(&la(2025, 3, 24, 8, 0)));
    }

    #[test]
    fn test_start_of_day_is_local_midnight() {
        let now = la(2025, 12, 30, 14, 30);
        let midnight = start_of_day(&now);
        assert_eq!(midnight, la(2025, 12, 30, 0, 0));

        let morning_event = la(2025, 12, 30, 9, 0);
        assert!(morning_event < now);
        assert!(morning_event >= midnight);
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!("Evening".parse::<TimeOfDay>().unwrap(), TimeOfDay::Evening);
        assert_eq!("time:morning".parse::<TimeOfDay>().unwrap(), TimeOfDay::Morning);
        assert!("allday".parse::<TimeOfDay>().is_err());
    }
}
