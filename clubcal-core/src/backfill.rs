//! Backfill of earlier months when the calendar navigates before the loaded range.

use std::collections::HashSet;

use chrono::{Datelike, Days, NaiveDate};

use crate::date_range::{DateRange, LoadedRange, first_of_month};
use crate::event::Event;

/// What to fetch to cover a navigation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillPlan {
    pub months_needed: u32,
    /// From the first day of the target month up to the day before the loaded range
    pub window: DateRange,
}

/// Whole months from `view_start`'s month through `earliest`'s month, inclusive.
pub fn months_needed(view_start: NaiveDate, earliest: NaiveDate) -> u32 {
    let months = (earliest.year() - view_start.year()) * 12
        + (earliest.month() as i32 - view_start.month() as i32)
        + 1;
    u32::try_from(months).unwrap_or(0)
}

/// A plan when `view_start` precedes the loaded range, `None` otherwise.
pub fn plan(view_start: NaiveDate, loaded: &LoadedRange) -> Option<BackfillPlan> {
    if view_start >= loaded.earliest {
        return None;
    }
    let months_needed = months_needed(view_start, loaded.earliest);
    let to = loaded.earliest.checked_sub_days(Days::new(1));
    Some(BackfillPlan {
        months_needed,
        window: DateRange::new(Some(first_of_month(view_start)), to),
    })
}

/// Add events not already present, by id. Existing records win and keep their order.
pub fn merge(existing: &mut Vec<Event>, incoming: Vec<Event>) -> usize {
    let mut seen: HashSet<_> = existing.iter().map(|e| e.id.clone()).collect();
    let before = existing.len();
    for event in incoming {
        if seen.insert(event.id.clone()) {
            existing.push(event);
        }
    }
    existing.len() - before
}
