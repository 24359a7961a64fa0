//! The stale-data refresh gate.
//!
//! Only a visible signal can trigger a refetch, and only when the data is at
//! least `refresh_debounce` old and no refresh is already running.

use chrono::{DateTime, Duration, Utc};

/// Page visibility transitions reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilitySignal {
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Hidden,
    Fresh,
    InFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshDecision {
    /// `since_refresh` is `None` when nothing was ever loaded
    Refresh { since_refresh: Option<Duration> },
    Skip(SkipReason),
}

impl RefreshDecision {
    pub fn should_refresh(&self) -> bool {
        matches!(self, RefreshDecision::Refresh { .. })
    }
}

pub fn decide(
    signal: VisibilitySignal,
    last_refresh: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    debounce: Duration,
    in_flight: bool,
) -> RefreshDecision {
    if signal == VisibilitySignal::Hidden {
        return RefreshDecision::Skip(SkipReason::Hidden);
    }
    if in_flight {
        return RefreshDecision::Skip(SkipReason::InFlight);
    }

    let since_refresh = last_refresh.map(|last| now - last);
    match since_refresh {
        Some(elapsed) if elapsed < debounce => {
            tracing::debug!(
                seconds_since_refresh = elapsed.num_seconds(),
                threshold = debounce.num_seconds(),
                "data still fresh"
            );
            RefreshDecision::Skip(SkipReason::Fresh)
        }
        _ => {
            tracing::info!(
                seconds_since_refresh = since_refresh.map(|e| e.num_seconds()),
                threshold = debounce.num_seconds(),
                "data stale, refreshing"
            );
            RefreshDecision::Refresh { since_refresh }
        }
    }
}
