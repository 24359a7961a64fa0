//! The seam between the engine and wherever events come from.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::date_range::DateRange;
use crate::error::ClubCalResult;
use crate::event::Event;

/// Why a fetch was started. At most one fetch per purpose is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchPurpose {
    Initial,
    Refresh,
    Backfill,
}

impl FetchPurpose {
    /// Whether a successful result replaces the window's events rather than merging.
    pub fn replaces(&self) -> bool {
        matches!(self, FetchPurpose::Initial | FetchPurpose::Refresh)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FetchPurpose::Initial => "initial",
            FetchPurpose::Refresh => "refresh",
            FetchPurpose::Backfill => "backfill",
        }
    }
}

impl fmt::Display for FetchPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produces events for a date window. Implemented by the HTTP and file feeds.
pub trait EventSource {
    fn fetch(&self, window: DateRange) -> impl Future<Output = ClubCalResult<Vec<Event>>> + Send;

    /// Short description for logs, e.g. the feed URL.
    fn describe(&self) -> String;
}
