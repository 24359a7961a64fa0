//! The owned state container.
//!
//! `EventStore` holds everything that outlives one filter pass: the event
//! collection, the filter selection, when data was last refreshed, which
//! dates are loaded, and the bookkeeping that sequences fetches. Fetches are
//! two-phase: `begin_fetch` hands out a sequenced ticket (or refuses while a
//! fetch of the same purpose is in flight) and `complete_fetch` applies the
//! result unless a newer replacement has already landed. A fetch that never
//! completes must hand its ticket to `abandon` instead.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::backfill;
use crate::date_range::{DateRange, LoadedRange};
use crate::error::{ClubCalError, ClubCalResult};
use crate::event::Event;
use crate::filter_state::{FilterState, FilterUpdate};
use crate::source::FetchPurpose;

/// When event data was last refreshed successfully.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshState {
    pub last_refresh: Option<DateTime<Utc>>,
}

impl RefreshState {
    pub fn since_refresh(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.last_refresh.map(|last| now - last)
    }
}

/// Permission to run one fetch. Hand it back to `complete_fetch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub purpose: FetchPurpose,
    pub seq: u64,
    pub window: DateRange,
}

#[derive(Debug)]
pub enum FetchOutcome {
    /// The result was applied; `added` counts events new to the store
    Applied { purpose: FetchPurpose, added: usize },
    /// A newer replacement landed first; the result was discarded
    Superseded,
    /// The fetch failed; store state is unchanged
    Failed(ClubCalError),
}

impl FetchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, FetchOutcome::Applied { .. })
    }
}

#[derive(Debug, Clone)]
pub struct EventStore {
    timezone: Tz,
    events: Vec<Event>,
    filters: FilterState,
    refresh: RefreshState,
    loaded: Option<LoadedRange>,
    in_flight: HashMap<FetchPurpose, u64>,
    next_seq: u64,
    /// Sequence number of the newest applied replacement
    replaced_seq: u64,
}

impl EventStore {
    pub fn new(timezone: Tz) -> Self {
        EventStore {
            timezone,
            events: Vec::new(),
            filters: FilterState::default(),
            refresh: RefreshState::default(),
            loaded: None,
            in_flight: HashMap::new(),
            next_seq: 1,
            replaced_seq: 0,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut FilterState {
        &mut self.filters
    }

    pub fn update_filters(&mut self, update: FilterUpdate) {
        self.filters.apply(update);
    }

    pub fn refresh_state(&self) -> RefreshState {
        self.refresh
    }

    pub fn loaded_range(&self) -> Option<LoadedRange> {
        self.loaded
    }

    pub fn is_in_flight(&self, purpose: FetchPurpose) -> bool {
        self.in_flight.contains_key(&purpose)
    }

    /// Start a fetch, or `None` if one with the same purpose is already running.
    pub fn begin_fetch(&mut self, purpose: FetchPurpose, window: DateRange) -> Option<FetchTicket> {
        if self.in_flight.contains_key(&purpose) {
            tracing::debug!(%purpose, "fetch already in flight");
            return None;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight.insert(purpose, seq);
        Some(FetchTicket {
            purpose,
            seq,
            window,
        })
    }

    /// Release a ticket whose fetch was dropped before it finished. Nothing
    /// else changes.
    pub fn abandon(&mut self, ticket: FetchTicket) {
        if self.in_flight.get(&ticket.purpose) == Some(&ticket.seq) {
            self.in_flight.remove(&ticket.purpose);
            tracing::debug!(purpose = %ticket.purpose, seq = ticket.seq, "fetch abandoned");
        }
    }

    /// Apply a finished fetch.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: ClubCalResult<Vec<Event>>,
        now: DateTime<Utc>,
    ) -> FetchOutcome {
        if self.in_flight.get(&ticket.purpose) == Some(&ticket.seq) {
            self.in_flight.remove(&ticket.purpose);
        }

        let incoming = match result {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(purpose = %ticket.purpose, seq = ticket.seq, error = %e, "fetch failed");
                return FetchOutcome::Failed(e);
            }
        };

        if ticket.seq < self.replaced_seq {
            tracing::debug!(
                purpose = %ticket.purpose,
                seq = ticket.seq,
                newer = self.replaced_seq,
                "discarding superseded fetch"
            );
            return FetchOutcome::Superseded;
        }

        let added = if ticket.purpose.replaces() {
            self.replaced_seq = ticket.seq;
            self.refresh.last_refresh = Some(now);
            self.replace_window(&ticket.window, incoming)
        } else {
            backfill::merge(&mut self.events, incoming)
        };
        self.events.sort_by_key(|e| e.start);

        let loaded = match (self.loaded, ticket.purpose) {
            (Some(mut loaded), FetchPurpose::Refresh | FetchPurpose::Backfill) => {
                loaded.extend(&ticket.window);
                loaded
            }
            _ => LoadedRange::from_window(&ticket.window, self.today(now)),
        };
        self.loaded = Some(loaded);

        FetchOutcome::Applied {
            purpose: ticket.purpose,
            added,
        }
    }

    /// Replace events inside `window` with `incoming`; events outside it stay.
    fn replace_window(&mut self, window: &DateRange, incoming: Vec<Event>) -> usize {
        let before: HashSet<_> = self.events.iter().map(|e| e.id.clone()).collect();
        let incoming_ids: HashSet<_> = incoming.iter().map(|e| e.id.clone()).collect();
        let tz = self.timezone;
        self.events
            .retain(|e| !window.contains_instant(e.start, &tz) && !incoming_ids.contains(&e.id));
        let added = incoming_ids.difference(&before).count();
        let kept = std::mem::replace(&mut self.events, incoming);
        backfill::merge(&mut self.events, kept);
        added
    }

    /// Today's date on the club's wall clock.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }
}
