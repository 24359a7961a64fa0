//! Normalized club events.
//!
//! Feeds are converted into these types once, at ingestion (see `ingest`), and
//! every other module works exclusively with them. An `Event` is never mutated
//! during a filter pass; refreshes replace the whole collection.

use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{GENERAL_COMMITTEE, PUBLIC_TAGS};
use crate::tags::TagSet;

/// Stable event identifier. Feeds use numeric ids, but string ids are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventId {
    Number(i64),
    Text(String),
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventId::Number(n) => write!(f, "{}", n),
            EventId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EventId {
    fn from(n: i64) -> Self {
        EventId::Number(n)
    }
}

impl From<i32> for EventId {
    fn from(n: i32) -> Self {
        EventId::Number(i64::from(n))
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        EventId::Text(s.to_string())
    }
}

/// Coarse registration capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityStatus {
    /// No registration limit
    Unlimited,
    Available,
    Low,
    Full,
}

impl CapacityStatus {
    pub fn has_openings(&self) -> bool {
        !matches!(self, CapacityStatus::Full)
    }
}

/// A single bookable occurrence (or a parent container of sessions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub tags: TagSet,

    // Registration
    /// Open to guests regardless of tags
    pub has_guest_tickets: bool,
    /// Lowercased registration-type names, e.g. "alumni ticket"
    pub ticket_types: Vec<String>,
    pub registration_open: Option<DateTime<Utc>>,
    pub registration_close: Option<DateTime<Utc>>,
    /// Remaining spots; `None` means no limit
    pub spots_remaining: Option<i64>,
    /// Lowest registration price; `None` means free
    pub min_price: Option<f64>,
    pub registration_url: Option<String>,

    // Grouping
    pub committee: String,
    /// Set on sessions of a recurring parent event
    pub parent_event_id: Option<EventId>,
}

impl Event {
    /// A one-hour, member-only, free, unlimited event. Use the `with_*`
    /// builders to fill in the rest.
    pub fn new(id: impl Into<EventId>, name: &str, start: DateTime<Utc>) -> Self {
        Event {
            id: id.into(),
            name: name.to_string(),
            description: None,
            location: None,
            start,
            end: start + Duration::hours(1),
            tags: TagSet::new(),
            has_guest_tickets: false,
            ticket_types: Vec::new(),
            registration_open: None,
            registration_close: None,
            spots_remaining: None,
            min_price: None,
            registration_url: None,
            committee: GENERAL_COMMITTEE.to_string(),
            parent_event_id: None,
        }
    }

    pub fn with_tags<S: AsRef<str>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        for tag in tags {
            self.tags.insert(tag.as_ref());
        }
        self
    }

    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = end;
        self
    }

    pub fn with_guest_tickets(mut self, has_guest_tickets: bool) -> Self {
        self.has_guest_tickets = has_guest_tickets;
        self
    }

    pub fn with_ticket_type(mut self, name: &str) -> Self {
        self.ticket_types.push(name.trim().to_lowercase());
        self
    }

    pub fn with_spots_remaining(mut self, spots: i64) -> Self {
        self.spots_remaining = Some(spots);
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.min_price = Some(price);
        self
    }

    pub fn with_registration_open(mut self, open: DateTime<Utc>) -> Self {
        self.registration_open = Some(open);
        self
    }

    pub fn with_parent(mut self, parent: impl Into<EventId>) -> Self {
        self.parent_event_id = Some(parent.into());
        self
    }

    pub fn with_committee(mut self, committee: &str) -> Self {
        self.committee = committee.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }

    /// Start time on the club's wall clock.
    pub fn local_start<Z: TimeZone>(&self, tz: &Z) -> DateTime<Z> {
        self.start.with_timezone(tz)
    }

    /// Guest-visible: tagged public, or registerable by guests.
    pub fn is_public(&self) -> bool {
        self.has_guest_tickets || PUBLIC_TAGS.iter().any(|t| self.tags.contains(t))
    }

    /// True if a registration type names this membership tier as whole
    /// words: "Alumni Ticket" names "alumni", "Non-Alumni Member" does not.
    pub fn has_ticket_for(&self, tier: &str) -> bool {
        let tier = words(tier);
        !tier.is_empty()
            && self
                .ticket_types
                .iter()
                .any(|t| words(t).windows(tier.len()).any(|w| w == tier.as_slice()))
    }

    pub fn capacity_status(&self, low_threshold: u32) -> CapacityStatus {
        match self.spots_remaining {
            None => CapacityStatus::Unlimited,
            Some(n) if n <= 0 => CapacityStatus::Full,
            Some(n) if n <= i64::from(low_threshold) => CapacityStatus::Low,
            Some(_) => CapacityStatus::Available,
        }
    }

    /// Price used by cost filters; absent means free.
    pub fn price(&self) -> f64 {
        self.min_price.unwrap_or(0.0)
    }

    pub fn is_free(&self) -> bool {
        self.price() <= 0.0
    }

    pub fn is_multi_day(&self) -> bool {
        self.end - self.start > Duration::days(1)
    }
}

/// Lowercased words; hyphens stay inside a word.
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}
