//! Core engine for the ClubCalendar event widget.
//!
//! This crate decides which club events a viewer sees and how each one is
//! labelled:
//! - `visibility` resolves per-viewer availability and enforces the
//!   members-only gate before any capacity logic
//! - `pipeline` runs the ordered filter stages over the event collection
//! - `store` and `calendar` own the fetched data and drive refresh and
//!   backfill through an `EventSource`
//!
//! No network I/O happens here; feeds live in the CLI.

pub mod backfill;
pub mod calendar;
pub mod config;
pub mod constants;
pub mod date_range;
pub mod error;
pub mod event;
pub mod filter_state;
pub mod ics;
pub mod ingest;
pub mod pipeline;
pub mod quick_filter;
pub mod refresh;
pub mod source;
pub mod store;
pub mod tags;
pub mod time_of_day;
pub mod visibility;

pub use calendar::ClubCalendar;
pub use config::EngineConfig;
pub use date_range::{DateRange, LoadedRange};
pub use error::{ClubCalError, ClubCalResult};
pub use event::{CapacityStatus, Event, EventId};
pub use filter_state::{CostBucket, FilterState, FilterUpdate};
pub use pipeline::{Stage, VisibleEvent, filter_events};
pub use quick_filter::QuickFilter;
pub use refresh::{RefreshDecision, VisibilitySignal};
pub use source::{EventSource, FetchPurpose};
pub use store::{EventStore, FetchOutcome};
pub use time_of_day::TimeOfDay;
pub use visibility::{MemberAvailability, ViewerContext};
