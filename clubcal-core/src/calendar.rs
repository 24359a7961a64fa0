//! `ClubCalendar`: drives an `EventSource` through the store and the pipeline.
//!
//! The store sits behind a mutex that is only held between awaits, never
//! across one, so a slow fetch never blocks filtering or a second fetch of a
//! different purpose. A fetch future dropped mid-await releases its ticket.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::time::timeout;

use crate::backfill;
use crate::config::EngineConfig;
use crate::constants::FETCH_TIMEOUT_SECS;
use crate::date_range::{DateRange, LoadedRange};
use crate::error::{ClubCalError, ClubCalResult};
use crate::event::Event;
use crate::filter_state::{FilterState, FilterUpdate};
use crate::pipeline::{Pipeline, Stage, VisibleEvent, filter_events};
use crate::refresh::{RefreshDecision, VisibilitySignal, decide};
use crate::source::{EventSource, FetchPurpose};
use crate::store::{EventStore, FetchOutcome, FetchTicket, RefreshState};
use crate::visibility::ViewerContext;

const FETCH_TIMEOUT: Duration = Duration::from_secs(FETCH_TIMEOUT_SECS);

/// A begun fetch. Dropping it before `complete` abandons the ticket so the
/// purpose can be fetched again.
struct PendingFetch<'a> {
    store: &'a Mutex<EventStore>,
    ticket: Option<FetchTicket>,
}

impl PendingFetch<'_> {
    fn lock(&self) -> MutexGuard<'_, EventStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn complete(mut self, result: ClubCalResult<Vec<Event>>, now: DateTime<Utc>) -> FetchOutcome {
        match self.ticket.take() {
            Some(ticket) => self.lock().complete_fetch(ticket, result, now),
            None => FetchOutcome::Superseded,
        }
    }
}

impl Drop for PendingFetch<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.lock().abandon(ticket);
        }
    }
}

pub struct ClubCalendar<S> {
    source: S,
    config: EngineConfig,
    viewer: ViewerContext,
    store: Mutex<EventStore>,
}

impl<S: EventSource> ClubCalendar<S> {
    pub fn new(source: S, config: EngineConfig, viewer: ViewerContext) -> Self {
        let store = Mutex::new(EventStore::new(config.timezone));
        ClubCalendar {
            source,
            config,
            viewer,
            store,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn viewer(&self) -> &ViewerContext {
        &self.viewer
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn store(&self) -> MutexGuard<'_, EventStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load everything from today onward. Returns `None` if a load is already running.
    pub async fn load_initial(&self, now: DateTime<Utc>) -> Option<FetchOutcome> {
        let today = self.store().today(now);
        self.fetch(FetchPurpose::Initial, DateRange::starting(today), now)
            .await
    }

    /// Refetch the loaded range regardless of age.
    pub async fn refresh(&self, now: DateTime<Utc>) -> Option<FetchOutcome> {
        let window = {
            let store = self.store();
            store
                .loaded_range()
                .unwrap_or_else(|| LoadedRange::from_window(&DateRange::default(), store.today(now)))
                .as_window()
        };
        self.fetch(FetchPurpose::Refresh, window, now).await
    }

    /// React to a visibility change: refetch only if visible and stale.
    pub async fn refresh_if_stale(
        &self,
        signal: VisibilitySignal,
        now: DateTime<Utc>,
    ) -> (RefreshDecision, Option<FetchOutcome>) {
        let decision = {
            let store = self.store();
            decide(
                signal,
                store.refresh_state().last_refresh,
                now,
                self.config.refresh_debounce_chrono(),
                store.is_in_flight(FetchPurpose::Refresh),
            )
        };
        if !decision.should_refresh() {
            return (decision, None);
        }
        (decision, self.refresh(now).await)
    }

    /// The calendar moved to a view starting at `view_start`; backfill if needed.
    pub async fn navigate(&self, view_start: NaiveDate, now: DateTime<Utc>) -> Option<FetchOutcome> {
        let plan = {
            let store = self.store();
            let loaded = store
                .loaded_range()
                .unwrap_or_else(|| LoadedRange::from_window(&DateRange::default(), store.today(now)));
            backfill::plan(view_start, &loaded)?
        };
        tracing::info!(
            months_needed = plan.months_needed,
            window = %plan.window,
            "backfilling earlier months"
        );
        self.fetch(FetchPurpose::Backfill, plan.window, now).await
    }

    async fn fetch(
        &self,
        purpose: FetchPurpose,
        window: DateRange,
        now: DateTime<Utc>,
    ) -> Option<FetchOutcome> {
        let ticket = self.store().begin_fetch(purpose, window)?;
        let pending = PendingFetch {
            store: &self.store,
            ticket: Some(ticket),
        };
        tracing::debug!(%purpose, seq = ticket.seq, %window, source = %self.source.describe(), "fetching events");

        let result = match timeout(FETCH_TIMEOUT, self.source.fetch(window)).await {
            Ok(result) => result,
            Err(_) => Err(ClubCalError::Fetch(format!(
                "timed out after {}s",
                FETCH_TIMEOUT.as_secs()
            ))),
        };

        let outcome = pending.complete(result, now);
        if let FetchOutcome::Applied { added, .. } = &outcome {
            tracing::info!(%purpose, seq = ticket.seq, added, "events updated");
        }
        Some(outcome)
    }

    /// The events the viewer sees right now, in display order.
    pub fn visible(&self, now: DateTime<Utc>) -> Vec<VisibleEvent> {
        let store = self.store();
        filter_events(store.events(), store.filters(), &self.viewer, now, &self.config)
    }

    /// How many loaded events each stage drops, in stage order. Stages that
    /// drop nothing are left out.
    pub fn hidden_by_stage(&self, now: DateTime<Utc>) -> Vec<(Stage, usize)> {
        let store = self.store();
        let events = store.events();
        let pipeline = Pipeline::new(events, store.filters(), &self.viewer, now, &self.config);
        let rejected: Vec<_> = events.iter().filter_map(|e| pipeline.rejected_by(e)).collect();
        Stage::ORDER
            .into_iter()
            .map(|stage| (stage, rejected.iter().filter(|s| **s == stage).count()))
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    pub fn update_filters(&self, update: FilterUpdate) {
        self.store().update_filters(update);
    }

    /// Change the filters through a closure, atomically with respect to `visible`.
    pub fn with_filters<R>(&self, change: impl FnOnce(&mut FilterState) -> R) -> R {
        change(self.store().filters_mut())
    }

    pub fn filters(&self) -> FilterState {
        self.store().filters().clone()
    }

    pub fn refresh_state(&self) -> RefreshState {
        self.store().refresh_state()
    }

    pub fn loaded_range(&self) -> Option<LoadedRange> {
        self.store().loaded_range()
    }

    pub fn event_count(&self) -> usize {
        self.store().events().len()
    }
}
