//! User-selected filter criteria.
//!
//! Fields are private: callers change one axis at a time through the setters
//! or `apply`, so updating one axis can never clear another.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ClubCalError;
use crate::quick_filter::QuickFilter;
use crate::time_of_day::TimeOfDay;
use crate::visibility::MemberAvailability;

/// Price ceilings. `under*` bands include everything cheaper, free events too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostBucket {
    Free,
    Under25,
    Under50,
    Under100,
    Over100,
}

impl CostBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostBucket::Free => "free",
            CostBucket::Under25 => "under25",
            CostBucket::Under50 => "under50",
            CostBucket::Under100 => "under100",
            CostBucket::Over100 => "over100",
        }
    }

    pub fn matches(&self, price: f64) -> bool {
        match self {
            CostBucket::Free => price <= 0.0,
            CostBucket::Under25 => price < 25.0,
            CostBucket::Under50 => price < 50.0,
            CostBucket::Under100 => price < 100.0,
            CostBucket::Over100 => price >= 100.0,
        }
    }
}

impl fmt::Display for CostBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CostBucket {
    type Err = ClubCalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase().replace('-', "");
        // Accept the derived tag spelling too ("cost:under-25")
        match name.strip_prefix("cost:").unwrap_or(&name) {
            "free" => Ok(CostBucket::Free),
            "under25" => Ok(CostBucket::Under25),
            "under50" => Ok(CostBucket::Under50),
            "under100" => Ok(CostBucket::Under100),
            "over100" => Ok(CostBucket::Over100),
            _ => Err(ClubCalError::invalid_filter("cost", s)),
        }
    }
}

/// A partial change to a `FilterState`. `None` leaves the axis untouched;
/// for nullable axes `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterUpdate {
    pub interest: Option<Option<String>>,
    pub quick_filters: Option<BTreeSet<QuickFilter>>,
    pub time_of_day: Option<BTreeSet<TimeOfDay>>,
    pub member_availability: Option<BTreeSet<MemberAvailability>>,
    pub cost: Option<Option<CostBucket>>,
    pub committee: Option<Option<String>>,
    pub event_type: Option<Option<String>>,
    pub recurring: Option<Option<String>>,
    pub venue: Option<Option<String>>,
    pub search: Option<String>,
    pub upcoming_only: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    interest: Option<String>,
    quick_filters: BTreeSet<QuickFilter>,
    time_of_day: BTreeSet<TimeOfDay>,
    member_availability: BTreeSet<MemberAvailability>,
    cost: Option<CostBucket>,
    committee: Option<String>,
    event_type: Option<String>,
    recurring: Option<String>,
    venue: Option<String>,
    search: String,
    upcoming_only: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        FilterState {
            interest: None,
            quick_filters: BTreeSet::new(),
            time_of_day: BTreeSet::new(),
            member_availability: BTreeSet::new(),
            cost: None,
            committee: None,
            event_type: None,
            recurring: None,
            venue: None,
            search: String::new(),
            upcoming_only: true,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Lowercased tag value with an optional `prefix:` removed, so "Workshop"
/// and "type:workshop" select the same thing.
fn tag_value(value: Option<&str>, prefix: &str) -> Option<String> {
    let value = non_blank(value)?.to_lowercase();
    let value = value.strip_prefix(prefix).unwrap_or(&value).trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a partial update; axes the update leaves as `None` keep their values.
    pub fn apply(&mut self, update: FilterUpdate) {
        if let Some(interest) = update.interest {
            self.set_interest(interest.as_deref());
        }
        if let Some(quick_filters) = update.quick_filters {
            self.quick_filters = quick_filters;
        }
        if let Some(time_of_day) = update.time_of_day {
            self.time_of_day = time_of_day;
        }
        if let Some(member_availability) = update.member_availability {
            self.member_availability = member_availability;
        }
        if let Some(cost) = update.cost {
            self.cost = cost;
        }
        if let Some(committee) = update.committee {
            self.set_committee(committee.as_deref());
        }
        if let Some(event_type) = update.event_type {
            self.set_event_type(event_type.as_deref());
        }
        if let Some(recurring) = update.recurring {
            self.set_recurring(recurring.as_deref());
        }
        if let Some(venue) = update.venue {
            self.set_venue(venue.as_deref());
        }
        if let Some(search) = update.search {
            self.search = search;
        }
        if let Some(upcoming_only) = update.upcoming_only {
            self.upcoming_only = upcoming_only;
        }
    }

    pub fn set_interest(&mut self, interest: Option<&str>) {
        self.interest = non_blank(interest).map(|i| i.to_lowercase());
    }

    pub fn set_committee(&mut self, committee: Option<&str>) {
        self.committee = non_blank(committee);
    }

    /// Event format, matched against `type:` tags.
    pub fn set_event_type(&mut self, event_type: Option<&str>) {
        self.event_type = tag_value(event_type, "type:");
    }

    pub fn set_recurring(&mut self, recurring: Option<&str>) {
        self.recurring = tag_value(recurring, "recurring:");
    }

    pub fn set_venue(&mut self, venue: Option<&str>) {
        self.venue = tag_value(venue, "venue:");
    }

    pub fn set_cost(&mut self, cost: Option<CostBucket>) {
        self.cost = cost;
    }

    pub fn set_search(&mut self, search: &str) {
        self.search = search.to_string();
    }

    pub fn set_upcoming_only(&mut self, upcoming_only: bool) {
        self.upcoming_only = upcoming_only;
    }

    /// Turn a quick filter on or off; returns whether it is now active.
    pub fn toggle_quick_filter(&mut self, filter: QuickFilter) -> bool {
        if self.quick_filters.remove(&filter) {
            false
        } else {
            self.quick_filters.insert(filter);
            true
        }
    }

    pub fn toggle_time_of_day(&mut self, bucket: TimeOfDay) -> bool {
        if self.time_of_day.remove(&bucket) {
            false
        } else {
            self.time_of_day.insert(bucket);
            true
        }
    }

    pub fn toggle_member_availability(&mut self, status: MemberAvailability) -> bool {
        if self.member_availability.remove(&status) {
            false
        } else {
            self.member_availability.insert(status);
            true
        }
    }

    /// Reset every axis.
    pub fn clear(&mut self) {
        *self = FilterState::default();
    }

    pub fn interest(&self) -> Option<&str> {
        self.interest.as_deref()
    }

    pub fn quick_filters(&self) -> &BTreeSet<QuickFilter> {
        &self.quick_filters
    }

    pub fn time_of_day(&self) -> &BTreeSet<TimeOfDay> {
        &self.time_of_day
    }

    pub fn member_availability(&self) -> &BTreeSet<MemberAvailability> {
        &self.member_availability
    }

    pub fn cost(&self) -> Option<CostBucket> {
        self.cost
    }

    pub fn committee(&self) -> Option<&str> {
        self.committee.as_deref()
    }

    pub fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref()
    }

    pub fn recurring(&self) -> Option<&str> {
        self.recurring.as_deref()
    }

    pub fn venue(&self) -> Option<&str> {
        self.venue.as_deref()
    }

    /// The derived tags an event must carry, one per selected format axis.
    pub fn required_tags(&self) -> Vec<String> {
        [
            ("type", &self.event_type),
            ("recurring", &self.recurring),
            ("venue", &self.venue),
        ]
        .into_iter()
        .filter_map(|(axis, value)| value.as_ref().map(|v| format!("{axis}:{v}")))
        .collect()
    }

    /// Raw search text as typed.
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Trimmed, lowercased search term; `None` when blank.
    pub fn search_term(&self) -> Option<String> {
        let term = self.search.trim();
        (!term.is_empty()).then(|| term.to_lowercase())
    }

    pub fn upcoming_only(&self) -> bool {
        self.upcoming_only
    }
}
