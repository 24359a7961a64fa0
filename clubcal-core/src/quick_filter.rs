//! Named one-click quick filters.
//!
//! Each filter is an independent predicate over one event and the current
//! time. Active filters combine with OR: an event matching any of them passes.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::constants::NEWBIE_TAG_MARKERS;
use crate::error::ClubCalError;
use crate::event::{CapacityStatus, Event};
use crate::time_of_day::{is_after_hours, is_weekend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuickFilter {
    #[serde(rename = "openings")]
    Openings,
    #[serde(rename = "just-opened", alias = "justopened")]
    JustOpened,
    #[serde(rename = "opening-soon", alias = "openingsoon")]
    OpeningSoon,
    #[serde(rename = "few-spots-left", alias = "fewspots")]
    FewSpotsLeft,
    #[serde(rename = "weekend")]
    Weekend,
    #[serde(rename = "afterhours", alias = "after-hours")]
    AfterHours,
    #[serde(rename = "free")]
    Free,
    #[serde(rename = "under25")]
    Under25,
    #[serde(rename = "under50")]
    Under50,
    #[serde(rename = "public")]
    Public,
    #[serde(rename = "newbie-friendly", alias = "newbie")]
    NewbieFriendly,
}

impl QuickFilter {
    pub const ALL: [QuickFilter; 11] = [
        QuickFilter::Openings,
        QuickFilter::JustOpened,
        QuickFilter::OpeningSoon,
        QuickFilter::FewSpotsLeft,
        QuickFilter::Weekend,
        QuickFilter::AfterHours,
        QuickFilter::Free,
        QuickFilter::Under25,
        QuickFilter::Under50,
        QuickFilter::Public,
        QuickFilter::NewbieFriendly,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            QuickFilter::Openings => "openings",
            QuickFilter::JustOpened => "just-opened",
            QuickFilter::OpeningSoon => "opening-soon",
            QuickFilter::FewSpotsLeft => "few-spots-left",
            QuickFilter::Weekend => "weekend",
            QuickFilter::AfterHours => "afterhours",
            QuickFilter::Free => "free",
            QuickFilter::Under25 => "under25",
            QuickFilter::Under50 => "under50",
            QuickFilter::Public => "public",
            QuickFilter::NewbieFriendly => "newbie-friendly",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuickFilter::Openings => "Openings for Any Member",
            QuickFilter::JustOpened => "Just Opened",
            QuickFilter::OpeningSoon => "Opening Soon",
            QuickFilter::FewSpotsLeft => "Few Spots Left",
            QuickFilter::Weekend => "Weekend",
            QuickFilter::AfterHours => "After Hours",
            QuickFilter::Free => "Free",
            QuickFilter::Under25 => "Under $25",
            QuickFilter::Under50 => "Under $50",
            QuickFilter::Public => "Open to Public",
            QuickFilter::NewbieFriendly => "Newbie Friendly",
        }
    }

    /// Evaluate this filter. Missing optional data never matches.
    pub fn matches(&self, event: &Event, now: DateTime<Utc>, config: &EngineConfig) -> bool {
        let capacity = || event.capacity_status(config.low_capacity_threshold);
        let local = || event.local_start(&config.timezone);
        match self {
            QuickFilter::Openings => capacity().has_openings(),
            QuickFilter::FewSpotsLeft => capacity() == CapacityStatus::Low,
            QuickFilter::JustOpened => {
                just_opened(event.registration_open, now, config.just_opened_days)
            }
            QuickFilter::OpeningSoon => {
                opening_soon(event.registration_open, now, config.opening_soon_days)
            }
            QuickFilter::Weekend => is_weekend(&local()),
            QuickFilter::AfterHours => is_after_hours(&local()),
            QuickFilter::Free => event.is_free(),
            QuickFilter::Under25 => event.price() < 25.0,
            QuickFilter::Under50 => event.price() < 50.0,
            QuickFilter::Public => event.is_public(),
            QuickFilter::NewbieFriendly => NEWBIE_TAG_MARKERS
                .iter()
                .any(|marker| event.tags.any_contains(marker)),
        }
    }
}

/// `days` as a duration, or `None` if it does not fit.
fn window(days: u32) -> Option<Duration> {
    Duration::try_days(i64::from(days))
}

/// Registration opened within the last `days`: `now - days <= open <= now`.
/// A window reaching past the representable range has no lower bound.
pub fn just_opened(open: Option<DateTime<Utc>>, now: DateTime<Utc>, days: u32) -> bool {
    let earliest = window(days).and_then(|w| now.checked_sub_signed(w));
    open.is_some_and(|open| earliest.is_none_or(|earliest| open >= earliest) && open <= now)
}

/// Registration opens within the next `days`: `now < open <= now + days`.
/// A window reaching past the representable range has no upper bound.
pub fn opening_soon(open: Option<DateTime<Utc>>, now: DateTime<Utc>, days: u32) -> bool {
    let latest = window(days).and_then(|w| now.checked_add_signed(w));
    open.is_some_and(|open| open > now && latest.is_none_or(|latest| open <= latest))
}

/// True if `event` matches any active filter. An empty set passes everything.
pub fn passes(
    active: &BTreeSet<QuickFilter>,
    event: &Event,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> bool {
    active.is_empty() || active.iter().any(|filter| filter.matches(event, now, config))
}

impl fmt::Display for QuickFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for QuickFilter {
    type Err = ClubCalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        let filter = match name.as_str() {
            "openings" => QuickFilter::Openings,
            "just-opened" | "justopened" => QuickFilter::JustOpened,
            "opening-soon" | "openingsoon" => QuickFilter::OpeningSoon,
            "few-spots-left" | "fewspots" => QuickFilter::FewSpotsLeft,
            "weekend" => QuickFilter::Weekend,
            "afterhours" | "after-hours" => QuickFilter::AfterHours,
            "free" => QuickFilter::Free,
            "under25" => QuickFilter::Under25,
            "under50" => QuickFilter::Under50,
            "public" => QuickFilter::Public,
            "newbie-friendly" | "newbie" => QuickFilter::NewbieFriendly,
            _ => return Err(ClubCalError::invalid_filter("quick", s)),
        };
        Ok(filter)
    }
}
