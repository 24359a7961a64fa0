//! The filter pipeline.
//!
//! Every stage is a pure gate on one event. An event survives only if it
//! passes every stage, in `Stage::ORDER`, and survivors keep their input
//! order. The visibility gate is always first and cannot be switched off.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::event::{Event, EventId};
use crate::filter_state::FilterState;
use crate::quick_filter;
use crate::tags::committee_tag;
use crate::time_of_day::{start_of_day, time_of_day};
use crate::visibility::{MemberAvailability, ViewerContext, resolve};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Visibility,
    ParentCollapse,
    Upcoming,
    Interest,
    QuickFilters,
    TimeOfDay,
    MemberAvailability,
    Cost,
    Committee,
    Format,
    Search,
}

impl Stage {
    pub const ORDER: [Stage; 11] = [
        Stage::Visibility,
        Stage::ParentCollapse,
        Stage::Upcoming,
        Stage::Interest,
        Stage::QuickFilters,
        Stage::TimeOfDay,
        Stage::MemberAvailability,
        Stage::Cost,
        Stage::Committee,
        Stage::Format,
        Stage::Search,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Visibility => "visibility",
            Stage::ParentCollapse => "parent-collapse",
            Stage::Upcoming => "upcoming",
            Stage::Interest => "interest",
            Stage::QuickFilters => "quick-filters",
            Stage::TimeOfDay => "time-of-day",
            Stage::MemberAvailability => "member-availability",
            Stage::Cost => "cost",
            Stage::Committee => "committee",
            Stage::Format => "format",
            Stage::Search => "search",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event that survived the pipeline, with the status the viewer sees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleEvent {
    pub event: Event,
    pub availability: MemberAvailability,
}

/// One filter pass over a fixed event collection.
pub struct Pipeline<'a> {
    filters: &'a FilterState,
    viewer: &'a ViewerContext,
    config: &'a EngineConfig,
    now: DateTime<Utc>,
    cutoff: DateTime<Utc>,
    search: Option<String>,
    /// `type:`, `recurring:` and `venue:` tags every survivor must carry
    required_tags: Vec<String>,
    /// Ids referenced as a parent by some event in the full input
    parents: HashSet<&'a EventId>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        events: &'a [Event],
        filters: &'a FilterState,
        viewer: &'a ViewerContext,
        now: DateTime<Utc>,
        config: &'a EngineConfig,
    ) -> Self {
        let parents = events
            .iter()
            .filter_map(|e| e.parent_event_id.as_ref())
            .collect();
        let cutoff = start_of_day(&now.with_timezone(&config.timezone)).with_timezone(&Utc);
        Pipeline {
            filters,
            viewer,
            config,
            now,
            cutoff,
            search: filters.search_term(),
            required_tags: filters.required_tags(),
            parents,
        }
    }

    /// The first stage that drops `event`, or `None` if it survives.
    pub fn rejected_by(&self, event: &Event) -> Option<Stage> {
        let availability = resolve(event, self.viewer, self.config);
        Stage::ORDER
            .into_iter()
            .find(|stage| !self.passes(*stage, event, availability))
    }

    fn passes(&self, stage: Stage, event: &Event, availability: MemberAvailability) -> bool {
        let filters = self.filters;
        match stage {
            Stage::Visibility => availability != MemberAvailability::Unavailable,
            Stage::ParentCollapse => {
                event.parent_event_id.is_some() || !self.parents.contains(&event.id)
            }
            Stage::Upcoming => !filters.upcoming_only() || event.start >= self.cutoff,
            Stage::Interest => filters
                .interest()
                .is_none_or(|interest| self.matches_interest(event, interest)),
            Stage::QuickFilters => {
                quick_filter::passes(filters.quick_filters(), event, self.now, self.config)
            }
            Stage::TimeOfDay => {
                filters.time_of_day().is_empty()
                    || filters
                        .time_of_day()
                        .contains(&time_of_day(&event.local_start(&self.config.timezone)))
            }
            Stage::MemberAvailability => {
                filters.member_availability().is_empty()
                    || filters.member_availability().contains(&availability)
            }
            Stage::Cost => filters.cost().is_none_or(|cost| cost.matches(event.price())),
            Stage::Committee => filters
                .committee()
                .is_none_or(|committee| matches_committee(event, committee)),
            Stage::Format => self.required_tags.iter().all(|tag| event.tags.contains(tag)),
            Stage::Search => self
                .search
                .as_deref()
                .is_none_or(|term| matches_search(event, term)),
        }
    }

    fn matches_interest(&self, event: &Event, interest: &str) -> bool {
        if event.tags.contains(interest) || slug::slugify(&event.committee) == interest {
            return true;
        }
        let name = event.name.to_lowercase();
        self.config
            .interest(interest)
            .is_some_and(|keywords| keywords.iter().any(|k| name.contains(&k.to_lowercase())))
    }

    /// Run the pass, keeping input order.
    pub fn run(&self, events: &[Event]) -> Vec<VisibleEvent> {
        events
            .iter()
            .filter_map(|event| {
                let availability = resolve(event, self.viewer, self.config);
                Stage::ORDER
                    .into_iter()
                    .all(|stage| self.passes(stage, event, availability))
                    .then(|| VisibleEvent {
                        event: event.clone(),
                        availability,
                    })
            })
            .collect()
    }
}

fn matches_committee(event: &Event, committee: &str) -> bool {
    event.committee.eq_ignore_ascii_case(committee) || event.tags.contains(&committee_tag(committee))
}

fn matches_search(event: &Event, term: &str) -> bool {
    let hit = |text: Option<&str>| text.is_some_and(|t| t.to_lowercase().contains(term));
    hit(Some(&event.name))
        || hit(event.description.as_deref())
        || hit(event.location.as_deref())
        || event.tags.any_contains(term)
}

/// Filter `events` for `viewer`. Deterministic and order-preserving.
pub fn filter_events(
    events: &[Event],
    filters: &FilterState,
    viewer: &ViewerContext,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Vec<VisibleEvent> {
    let visible = Pipeline::new(events, filters, viewer, now, config).run(events);
    tracing::debug!(
        total = events.len(),
        visible = visible.len(),
        logged_in = viewer.is_logged_in(),
        "filtered events"
    );
    visible
}
