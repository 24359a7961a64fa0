//! Visibility and availability resolution.
//!
//! `resolve` is the single place that decides whether a viewer may see an
//! event. It fails closed: an event without public tags or guest tickets is
//! member-only, and an anonymous viewer never gets `Available` for it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, TierAccess};
use crate::error::ClubCalError;
use crate::event::{CapacityStatus, Event};

/// The current visitor, as reported by the host platform's login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerContext {
    membership_level: Option<String>,
}

impl ViewerContext {
    pub fn anonymous() -> Self {
        ViewerContext::default()
    }

    pub fn member(level: &str) -> Self {
        ViewerContext::new(Some(level))
    }

    /// A blank level is treated as anonymous.
    pub fn new(level: Option<&str>) -> Self {
        let membership_level = level
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);
        ViewerContext { membership_level }
    }

    pub fn membership_level(&self) -> Option<&str> {
        self.membership_level.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.membership_level.is_some()
    }
}

/// Per-event, per-viewer registration status. Derived on every pass, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberAvailability {
    Available,
    Limited,
    Waitlist,
    Public,
    Unavailable,
}

impl MemberAvailability {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberAvailability::Available => "available",
            MemberAvailability::Limited => "limited",
            MemberAvailability::Waitlist => "waitlist",
            MemberAvailability::Public => "public",
            MemberAvailability::Unavailable => "unavailable",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MemberAvailability::Available => "Available",
            MemberAvailability::Limited => "Limited spots",
            MemberAvailability::Waitlist => "Waitlist",
            MemberAvailability::Public => "Public event",
            MemberAvailability::Unavailable => "Members only",
        }
    }

    /// Label tailored to the viewer's tier, e.g. "No alumni tickets".
    pub fn label_for(&self, viewer: &ViewerContext, config: &EngineConfig) -> String {
        let Some(tier) = viewer.membership_level() else {
            return self.label().to_string();
        };
        match (self, config.access_for(tier)) {
            (MemberAvailability::Unavailable, TierAccess::PublicOnly) => {
                format!("No {} tickets", tier.to_lowercase())
            }
            (MemberAvailability::Public, TierAccess::GuestTicketsOnly) => {
                "Guest tickets available".to_string()
            }
            _ => self.label().to_string(),
        }
    }
}

impl fmt::Display for MemberAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberAvailability {
    type Err = ClubCalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "available" => Ok(MemberAvailability::Available),
            "limited" => Ok(MemberAvailability::Limited),
            "waitlist" => Ok(MemberAvailability::Waitlist),
            "public" => Ok(MemberAvailability::Public),
            "unavailable" => Ok(MemberAvailability::Unavailable),
            _ => Err(ClubCalError::invalid_filter("availability", s)),
        }
    }
}

/// Capacity overrides the default status: full rosters waitlist, low ones are limited.
fn capacity_override(capacity: CapacityStatus) -> Option<MemberAvailability> {
    match capacity {
        CapacityStatus::Full => Some(MemberAvailability::Waitlist),
        CapacityStatus::Low => Some(MemberAvailability::Limited),
        CapacityStatus::Available | CapacityStatus::Unlimited => None,
    }
}

/// Resolve what `viewer` sees for `event`.
///
/// Visibility is decided before capacity, so a full member-only event is
/// `Unavailable` to anonymous viewers rather than `Waitlist`.
pub fn resolve(event: &Event, viewer: &ViewerContext, config: &EngineConfig) -> MemberAvailability {
    let public = event.is_public();
    let capacity = event.capacity_status(config.low_capacity_threshold);

    let Some(tier) = viewer.membership_level() else {
        if !public {
            return MemberAvailability::Unavailable;
        }
        return capacity_override(capacity).unwrap_or(MemberAvailability::Public);
    };

    let (permitted, default) = match config.access_for(tier) {
        TierAccess::Full => (true, MemberAvailability::Available),
        TierAccess::PublicOnly => (
            public || event.has_ticket_for(tier),
            MemberAvailability::Available,
        ),
        TierAccess::GuestTicketsOnly => (event.has_guest_tickets, MemberAvailability::Public),
    };

    if !permitted {
        return MemberAvailability::Unavailable;
    }
    capacity_override(capacity).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 12, 17, 0, 0).unwrap()
    }

    fn member_only() -> Event {
        Event::new(1, "Happy Hikers: Ridge Trail", start()).with_tags(["hiking"])
    }

    fn public_event() -> Event {
        Event::new(2, "Open House", start()).with_tags(["public event", "hiking"])
    }

    #[test]
    fn test_anonymous_member_only_is_unavailable() {
        let config = EngineConfig::default();
        let viewer = ViewerContext::anonymous();
        assert_eq!(resolve(&member_only(), &viewer, &config), MemberAvailability::Unavailable);
    }

    #[test]
    fn test_anonymous_untagged_event_fails_closed() {
        let config = EngineConfig::default();
        let event = Event::new(3, "Mystery", start());
        assert_eq!(
            resolve(&event, &ViewerContext::anonymous(), &config),
            MemberAvailability::Unavailable
        );
    }

    #[test]
    fn test_anonymous_full_member_only_is_not_waitlist() {
        let config = EngineConfig::default();
        let event = member_only().with_spots_remaining(0);
        assert_eq!(
            resolve(&event, &ViewerContext::anonymous(), &config),
            MemberAvailability::Unavailable
        );
    }

    #[test]
    fn test_anonymous_public_event() {
        let config = EngineConfig::default();
        let viewer = ViewerContext::anonymous();
        assert_eq!(resolve(&public_event(), &viewer, &config), MemberAvailability::Public);
        let guest = Event::new(4, "Mixer", start()).with_guest_tickets(true);
        assert_eq!(resolve(&guest, &viewer, &config), MemberAvailability::Public);
    }

    #[test]
    fn test_anonymous_public_event_capacity_overrides() {
        let config = EngineConfig::default();
        let viewer = ViewerContext::anonymous();
        let full = public_event().with_spots_remaining(0);
        let low = public_event().with_spots_remaining(2);
        assert_eq!(resolve(&full, &viewer, &config), MemberAvailability::Waitlist);
        assert_eq!(resolve(&low, &viewer, &config), MemberAvailability::Limited);
    }

    #[test]
    fn test_member_capacity_statuses() {
        let config = EngineConfig::default();
        let viewer = ViewerContext::member("NewcomerMember");
        assert_eq!(resolve(&member_only(), &viewer, &config), MemberAvailability::Available);
        assert_eq!(
            resolve(&member_only().with_spots_remaining(3), &viewer, &config),
            MemberAvailability::Limited
        );
        assert_eq!(
            resolve(&member_only().with_spots_remaining(0), &viewer, &config),
            MemberAvailability::Waitlist
        );
        assert_eq!(
            resolve(&member_only().with_spots_remaining(10), &viewer, &config),
            MemberAvailability::Available
        );
    }

    #[test]
    fn test_member_sees_public_event_as_available() {
        let config = EngineConfig::default();
        let viewer = ViewerContext::member("Newbie");
        assert_eq!(resolve(&public_event(), &viewer, &config), MemberAvailability::Available);
    }

    #[test]
    fn test_alumni_restricted_to_public_or_alumni_tickets() {
        let config = EngineConfig::default();
        let viewer = ViewerContext::member("Alumni");
        assert_eq!(resolve(&member_only(), &viewer, &config), MemberAvailability::Unavailable);
        assert_eq!(resolve(&public_event(), &viewer, &config), MemberAvailability::Available);

        let alumni_ticket = member_only().with_ticket_type("Alumni");
        assert_eq!(resolve(&alumni_ticket, &viewer, &config), MemberAvailability::Available);
    }

    #[test]
    fn test_guest_tier_needs_guest_tickets() {
        let config = EngineConfig::default();
        let viewer = ViewerContext::member("Guest");
        // Tagged public is not enough for the guest tier
        assert_eq!(resolve(&public_event(), &viewer, &config), MemberAvailability::Unavailable);
        let guest = public_event().with_guest_tickets(true);
        assert_eq!(resolve(&guest, &viewer, &config), MemberAvailability::Public);
        assert_eq!(
            resolve(&guest.with_spots_remaining(1), &viewer, &config),
            MemberAvailability::Limited
        );
    }

    #[test]
    fn test_configured_threshold() {
        let config = EngineConfig {
            low_capacity_threshold: 5,
            ..EngineConfig::default()
        };
        let viewer = ViewerContext::member("Newbie");
        let event = member_only().with_spots_remaining(5);
        assert_eq!(resolve(&event, &viewer, &config), MemberAvailability::Limited);
    }

    #[test]
    fn test_blank_level_is_anonymous() {
        let viewer = ViewerContext::new(Some("   "));
        assert!(!viewer.is_logged_in());
        assert_eq!(
            resolve(&member_only(), &viewer, &EngineConfig::default()),
            MemberAvailability::Unavailable
        );
    }

    #[test]
    fn test_labels() {
        let config = EngineConfig::default();
        let alumni = ViewerContext::member("Alumni");
        let guest = ViewerContext::member("Guest");
        let anonymous = ViewerContext::anonymous();
        assert_eq!(MemberAvailability::Unavailable.label_for(&anonymous, &config), "Members only");
        assert_eq!(MemberAvailability::Unavailable.label_for(&alumni, &config), "No alumni tickets");
        assert_eq!(
            MemberAvailability::Public.label_for(&guest, &config),
            "Guest tickets available"
        );
        assert_eq!(MemberAvailability::Limited.label(), "Limited spots");
    }

    #[test]
    fn test_parse_availability() {
        assert_eq!("Waitlist".parse::<MemberAvailability>().unwrap(), MemberAvailability::Waitlist);
        assert!("sold-out".parse::<MemberAvailability>().is_err());
    }
}
