pub mod config;
pub mod events;
pub mod export;
pub mod watch;

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use clubcal_core::calendar::ClubCalendar;
use clubcal_core::date_range::DateRange;
use clubcal_core::filter_state::{CostBucket, FilterUpdate};
use clubcal_core::quick_filter::QuickFilter;
use clubcal_core::source::EventSource;
use clubcal_core::store::FetchOutcome;
use clubcal_core::time_of_day::TimeOfDay;
use clubcal_core::visibility::MemberAvailability;

use crate::config::Settings;
use crate::feed::Feed;

/// Where events come from and who is looking. Shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Config file (defaults to ~/.config/clubcal/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Feed URL or JSON file, overriding the config
    #[arg(long, global = true, value_name = "URL_OR_FILE")]
    pub feed: Option<String>,

    /// View as a member of this level, e.g. "NewcomerMember"
    #[arg(long = "as", global = true, value_name = "LEVEL")]
    pub level: Option<String>,

    /// View as a visitor who is not logged in
    #[arg(long, global = true, conflicts_with = "level")]
    pub anonymous: bool,
}

impl SourceArgs {
    pub fn settings(&self) -> Result<Settings> {
        Settings::load(self.config.as_deref())
    }

    /// Build the calendar driver for these arguments.
    pub fn calendar(&self) -> Result<ClubCalendar<Feed>> {
        let settings = self.settings()?;
        let location = settings.feed(self.feed.as_deref())?;
        let viewer = settings.viewer(self.level.as_deref(), self.anonymous);
        let feed = Feed::open(location, &settings.engine);
        Ok(ClubCalendar::new(feed, settings.engine, viewer))
    }
}

/// Filter selection from the command line. Repeated flags OR together
/// within their group.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Quick filter: openings, just-opened, opening-soon, few-spots-left,
    /// weekend, afterhours, free, under25, under50, public, newbie-friendly
    #[arg(short, long = "quick", value_name = "FILTER")]
    pub quick: Vec<QuickFilter>,

    /// Time of day: morning, afternoon, evening
    #[arg(short, long = "time", value_name = "BUCKET")]
    pub time: Vec<TimeOfDay>,

    /// Availability: available, limited, waitlist, public
    #[arg(long = "availability", value_name = "STATUS")]
    pub availability: Vec<MemberAvailability>,

    /// Price band: free, under25, under50, under100, over100
    #[arg(long)]
    pub cost: Option<CostBucket>,

    /// Interest, e.g. wine, outdoors, food
    #[arg(short, long)]
    pub interest: Option<String>,

    /// Committee name, e.g. "Happy Hikers"
    #[arg(long)]
    pub committee: Option<String>,

    /// Event format, e.g. workshop, tasting, hike, lecture
    #[arg(long = "type", value_name = "TYPE")]
    pub event_type: Option<String>,

    /// Series cadence: weekly, monthly, daily
    #[arg(long)]
    pub recurring: Option<String>,

    /// Venue kind, e.g. outdoor
    #[arg(long)]
    pub venue: Option<String>,

    /// Text to find in name, description, location or tags
    #[arg(short, long)]
    pub search: Option<String>,
}

impl FilterArgs {
    pub fn to_update(&self) -> FilterUpdate {
        FilterUpdate {
            interest: self.interest.clone().map(Some),
            quick_filters: selection(&self.quick),
            time_of_day: selection(&self.time),
            member_availability: selection(&self.availability),
            cost: self.cost.map(Some),
            committee: self.committee.clone().map(Some),
            event_type: self.event_type.clone().map(Some),
            recurring: self.recurring.clone().map(Some),
            venue: self.venue.clone().map(Some),
            search: self.search.clone(),
            upcoming_only: None,
        }
    }
}

/// `None` for an empty list so the axis keeps its current selection.
fn selection<T: Copy + Ord>(values: &[T]) -> Option<BTreeSet<T>> {
    (!values.is_empty()).then(|| values.iter().copied().collect())
}

/// `--from` / `--to`. Defaults to today onward.
#[derive(Args, Debug, Clone, Default)]
pub struct RangeArgs {
    /// Show events from this date (YYYY-MM-DD, or "start" for everything loaded)
    #[arg(long)]
    pub from: Option<String>,

    /// Show events until this date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,
}

/// Load today onward, backfill to the start of `range`, and apply `filters`.
/// A failed initial load is an error here: there is no previous view to fall back on.
pub async fn prepare(
    cal: &ClubCalendar<Feed>,
    range: &RangeArgs,
    filters: &FilterArgs,
    now: DateTime<Utc>,
) -> Result<DateRange> {
    let today = now.with_timezone(&cal.config().timezone).date_naive();
    let window = DateRange::from_args(range.from.as_deref(), range.to.as_deref(), today)
        .map_err(|e| anyhow::anyhow!(e))?;

    if let Some(FetchOutcome::Failed(e)) = cal.load_initial(now).await {
        return Err(e)
            .with_context(|| format!("Could not load events from {}", cal.source().describe()));
    }

    if let Some(from) = window.from.filter(|from| *from < today) {
        if let Some(FetchOutcome::Failed(e)) = cal.navigate(from, now).await {
            tracing::warn!(error = %e, %from, "backfill failed, showing what is loaded");
        }
    }

    let mut update = filters.to_update();
    update.upcoming_only = Some(window.from.is_some_and(|from| from >= today));
    cal.update_filters(update);

    Ok(window)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_flags_leave_filters_untouched() {
        assert_eq!(FilterArgs::default().to_update(), FilterUpdate::default());
    }

    #[test]
    fn test_flags_map_to_update() {
        let args = FilterArgs {
            quick: vec![QuickFilter::Weekend, QuickFilter::AfterHours],
            cost: Some(CostBucket::Free),
            search: Some("hike".to_string()),
            ..FilterArgs::default()
        };
        let update = args.to_update();
        assert_eq!(
            update.quick_filters,
            Some(BTreeSet::from([QuickFilter::Weekend, QuickFilter::AfterHours]))
        );
        assert_eq!(update.cost, Some(Some(CostBucket::Free)));
        assert_eq!(update.search.as_deref(), Some("hike"));
        assert_eq!(update.time_of_day, None);
        assert_eq!(update.interest, None);
    }
}
