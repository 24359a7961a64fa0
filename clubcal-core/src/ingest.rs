//! Feed ingestion: JSON documents into normalized `Event`s.
//!
//! Two record shapes are accepted, the club's own snake_case feed and the
//! host platform's PascalCase API objects, either as a bare array or wrapped
//! in `{ "events": [...] }`. A record that cannot be understood is logged and
//! skipped; only a document that is not JSON at all fails the whole feed.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::constants::{CANCELLED_MARKER, GENERAL_COMMITTEE};
use crate::error::{ClubCalError, ClubCalResult};
use crate::event::{Event, EventId};
use crate::tags::{
    TagSet, apply_auto_tags, committee_tag, derive_event_type, derive_recurring, derive_venue,
    extract_committee,
};

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedDocument {
    Wrapped { events: Vec<Value> },
    Bare(Vec<Value>),
}

/// Tags arrive as an array, a JSON-encoded array string or a comma list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTags {
    List(Vec<String>),
    Text(String),
}

impl RawTags {
    fn normalize(tags: Option<RawTags>) -> TagSet {
        match tags {
            Some(RawTags::List(list)) => list.into_iter().collect(),
            Some(RawTags::Text(text)) => TagSet::parse(&text),
            None => TagSet::new(),
        }
    }
}

/// The club's static JSON feed.
#[derive(Debug, Deserialize)]
struct ClubRecord {
    id: EventId,
    name: String,
    start_date: String,
    end_date: Option<String>,
    location: Option<String>,
    description: Option<String>,
    tags: Option<RawTags>,
    spots_available: Option<i64>,
    is_full: Option<bool>,
    cost_category: Option<String>,
    is_public: Option<bool>,
    registration_open_date: Option<String>,
    parent_event_id: Option<EventId>,
    committee: Option<String>,
    registration_url: Option<String>,
}

/// The host platform's event API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HostRecord {
    id: EventId,
    name: String,
    start_date: String,
    end_date: Option<String>,
    location: Option<String>,
    tags: Option<RawTags>,
    access_level: Option<String>,
    registration_enabled: Option<bool>,
    registrations_limit: Option<i64>,
    confirmed_registrations_count: Option<i64>,
    registration_types: Option<Vec<HostRegistrationType>>,
    details: Option<HostDetails>,
    parent_event_id: Option<EventId>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HostDetails {
    description_html: Option<String>,
    registration_types: Option<Vec<HostRegistrationType>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HostRegistrationType {
    name: Option<String>,
    base_price: Option<f64>,
    price: Option<f64>,
    current_price: Option<f64>,
    available_from: Option<String>,
    available_through: Option<String>,
}

impl HostRegistrationType {
    fn effective_price(&self) -> f64 {
        self.base_price
            .or(self.price)
            .or(self.current_price)
            .unwrap_or(0.0)
    }
}

/// Representative price for a club feed cost category.
pub fn cost_category_price(category: &str) -> Option<f64> {
    match category.trim() {
        "Free" => Some(0.0),
        "Under $25" => Some(12.0),
        "$25-50" => Some(37.0),
        "$50-100" => Some(75.0),
        "Over $100" => Some(150.0),
        _ => None,
    }
}

/// Parse a feed timestamp. Offsets are honoured; naive values are club-local.
pub fn parse_instant(raw: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Turns decoded records into events, applying the club's tagging rules.
pub struct Ingestor<'a> {
    config: &'a EngineConfig,
}

impl<'a> Ingestor<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Ingestor { config }
    }

    /// Parse a whole feed document.
    pub fn parse(&self, body: &str) -> ClubCalResult<Vec<Event>> {
        let document: FeedDocument = serde_json::from_str(body).map_err(|e| {
            ClubCalError::Feed(format!("expected an event array or {{\"events\": [...]}}: {e}"))
        })?;
        let records = match document {
            FeedDocument::Wrapped { events } => events,
            FeedDocument::Bare(events) => events,
        };

        let total = records.len();
        let events: Vec<Event> = records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match self.record(record) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(index, error = %e, "skipping malformed event record");
                    None
                }
            })
            .collect();

        tracing::debug!(total, kept = events.len(), "ingested feed");
        Ok(events)
    }

    /// One record. `Ok(None)` means the record was deliberately dropped.
    fn record(&self, record: Value) -> ClubCalResult<Option<Event>> {
        let event = if record.get("Id").is_some() {
            self.host_record(serde_json::from_value(record)?)?
        } else {
            self.club_record(serde_json::from_value(record)?)?
        };

        if event.name.contains(CANCELLED_MARKER) {
            tracing::debug!(id = %event.id, "dropping cancelled event");
            return Ok(None);
        }
        Ok(Some(self.enrich(event)))
    }

    fn start_and_end(
        &self,
        id: &EventId,
        start: &str,
        end: Option<&str>,
    ) -> ClubCalResult<(DateTime<Utc>, DateTime<Utc>)> {
        let tz = &self.config.timezone;
        let start = parse_instant(start, tz)
            .ok_or_else(|| ClubCalError::Feed(format!("event {id}: unreadable start '{start}'")))?;
        // End never precedes start
        let end = end
            .and_then(|raw| parse_instant(raw, tz))
            .filter(|end| *end >= start)
            .unwrap_or(start);
        Ok((start, end))
    }

    fn club_record(&self, record: ClubRecord) -> ClubCalResult<Event> {
        let (start, end) =
            self.start_and_end(&record.id, &record.start_date, record.end_date.as_deref())?;

        let spots_remaining = if record.is_full == Some(true) {
            Some(0)
        } else {
            record.spots_available
        };

        Ok(Event {
            id: record.id,
            name: record.name.trim().to_string(),
            description: non_blank(record.description),
            location: non_blank(record.location),
            start,
            end,
            tags: RawTags::normalize(record.tags),
            has_guest_tickets: record.is_public.unwrap_or(false),
            ticket_types: Vec::new(),
            registration_open: record
                .registration_open_date
                .as_deref()
                .and_then(|raw| parse_instant(raw, &self.config.timezone)),
            registration_close: None,
            spots_remaining,
            min_price: record.cost_category.as_deref().and_then(cost_category_price),
            registration_url: non_blank(record.registration_url),
            committee: non_blank(record.committee).unwrap_or_default(),
            parent_event_id: record.parent_event_id,
        })
    }

    fn host_record(&self, record: HostRecord) -> ClubCalResult<Event> {
        let (start, end) =
            self.start_and_end(&record.id, &record.start_date, record.end_date.as_deref())?;
        let tz = &self.config.timezone;

        let (description, detail_types) = match record.details {
            Some(details) => (details.description_html, details.registration_types),
            None => (None, None),
        };
        let registration_types = record
            .registration_types
            .or(detail_types)
            .unwrap_or_default();

        // No registration types means free
        let min_price = registration_types
            .iter()
            .map(HostRegistrationType::effective_price)
            .reduce(f64::min)
            .unwrap_or(0.0);

        let spots_remaining = record
            .registrations_limit
            .filter(|limit| *limit > 0)
            .map(|limit| limit - record.confirmed_registrations_count.unwrap_or(0));

        let registration_open = registration_types
            .iter()
            .filter_map(|t| t.available_from.as_deref())
            .filter_map(|raw| parse_instant(raw, tz))
            .min();
        let registration_close = registration_types
            .iter()
            .filter_map(|t| t.available_through.as_deref())
            .filter_map(|raw| parse_instant(raw, tz))
            .max();

        let registration_url = record
            .url
            .filter(|_| record.registration_enabled != Some(false));

        Ok(Event {
            id: record.id,
            name: record.name.trim().to_string(),
            description: non_blank(description),
            location: non_blank(record.location),
            start,
            end,
            tags: RawTags::normalize(record.tags),
            has_guest_tickets: record
                .access_level
                .is_some_and(|level| level.eq_ignore_ascii_case("public")),
            ticket_types: registration_types
                .iter()
                .filter_map(|t| t.name.as_deref())
                .map(|name| name.trim().to_lowercase())
                .filter(|name| !name.is_empty())
                .collect(),
            registration_open,
            registration_close,
            spots_remaining,
            min_price: Some(min_price),
            registration_url,
            committee: String::new(),
            parent_event_id: record.parent_event_id,
        })
    }

    /// Auto-tags, derived format tags, committee and committee tag.
    fn enrich(&self, mut event: Event) -> Event {
        for tag in apply_auto_tags(&event.name, &self.config.auto_tag_rules) {
            event.tags.insert(tag);
        }
        if let Some(tag) = derive_event_type(&event.name, &self.config.event_type_keywords) {
            event.tags.insert(tag);
        }
        if let Some(tag) = derive_recurring(&event.name) {
            event.tags.insert(&tag);
        }
        let outdoor = &self.config.outdoor_keywords;
        if let Some(tag) = derive_venue(&event.name, event.location.as_deref(), outdoor) {
            event.tags.insert(tag);
        }
        if event.committee.is_empty() {
            event.committee = extract_committee(&event.name, &self.config.committee_prefixes);
        }
        if event.committee != GENERAL_COMMITTEE {
            event.tags.insert(&committee_tag(&event.committee));
        }
        event
    }
}

/// Parse a feed document with `config`'s timezone and tagging rules.
pub fn parse_feed(body: &str, config: &EngineConfig) -> ClubCalResult<Vec<Event>> {
    Ingestor::new(config).parse(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::{AutoTagKind, AutoTagRule};
    use chrono_tz::America::Los_Angeles;

    const CLUB_FEED: &str = r#"{
        "events": [
            {
                "id": 101,
                "name": "Happy Hikers: Ridge Trail",
                "start_date": "2025-03-22T09:00:00",
                "end_date": "2025-03-22T12:00:00",
                "location": "Trailhead",
                "description": "Moderate hike",
                "tags": ["Hiking", " Public Event "],
                "spots_available": 2,
                "confirmed_count": 18,
                "cost_category": "Under $25",
                "is_public": false,
                "registration_open_date": "2025-03-15T08:00:00-07:00",
                "parent_event_id": null,
                "committee": null
            },
            {
                "id": 102,
                "name": "Wine Appreciation: Tasting",
                "start_date": "2025-03-21T18:00:00-07:00",
                "tags": "wine, social",
                "spots_available": null,
                "is_full": true,
                "cost_category": "$25-50",
                "is_public": true,
                "committee": "Wine Appreciation"
            },
            {
                "id": 103,
                "name": "CANCELLED - Golf: Scramble",
                "start_date": "2025-03-23T08:00:00"
            },
            {
                "id": 104,
                "name": "Broken",
                "start_date": "not a date"
            }
        ]
    }"#;

    const HOST_FEED: &str = r#"[
        {
            "Id": 9001,
            "Name": "Games!: Bridge",
            "StartDate": "2025-04-02T13:00:00-07:00",
            "EndDate": "2025-04-02T16:00:00-07:00",
            "Location": "Clubhouse",
            "Tags": ["games"],
            "AccessLevel": "Public",
            "RegistrationEnabled": true,
            "RegistrationsLimit": 12,
            "ConfirmedRegistrationsCount": 10,
            "RegistrationTypes": [
                { "Name": "Member", "BasePrice": 15.0, "AvailableFrom": "2025-03-20T08:00:00-07:00" },
                { "Name": "Alumni Ticket", "Price": 20.0, "AvailableFrom": "2025-03-25T08:00:00-07:00" }
            ],
            "Details": { "DescriptionHtml": "<p>Duplicate bridge</p>" },
            "ParentEventId": 9000
        },
        {
            "Id": 9002,
            "Name": "Orientation",
            "StartDate": "2025-04-03T10:00:00",
            "AccessLevel": "AdminOnly"
        }
    ]"#;

    fn la(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Los_Angeles
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_club_feed() {
        let events = parse_feed(CLUB_FEED, &EngineConfig::default()).unwrap();
        assert_eq!(events.len(), 2);

        let hike = &events[0];
        assert_eq!(hike.id, EventId::Number(101));
        assert_eq!(hike.start, la(2025, 3, 22, 9));
        assert_eq!(hike.end, la(2025, 3, 22, 12));
        assert!(hike.tags.contains("public event"));
        assert!(hike.tags.contains("hiking"));
        assert!(hike.tags.contains("committee:happy-hikers"));
        assert_eq!(hike.committee, "Happy Hikers");
        assert_eq!(hike.spots_remaining, Some(2));
        assert_eq!(hike.min_price, Some(12.0));
        assert!(!hike.has_guest_tickets);
        assert_eq!(hike.registration_open, Some(la(2025, 3, 15, 8)));

        let wine = &events[1];
        assert_eq!(wine.spots_remaining, Some(0));
        assert_eq!(wine.min_price, Some(37.0));
        assert!(wine.has_guest_tickets);
        assert!(wine.tags.contains("social"));
        assert_eq!(wine.end, wine.start);
        assert_eq!(wine.committee, "Wine Appreciation");
    }

    #[test]
    fn test_host_feed() {
        let events = parse_feed(HOST_FEED, &EngineConfig::default()).unwrap();
        assert_eq!(events.len(), 2);

        let bridge = &events[0];
        assert_eq!(bridge.committee, "Games!");
        assert!(bridge.tags.contains("committee:games"));
        assert!(bridge.has_guest_tickets);
        assert_eq!(bridge.spots_remaining, Some(2));
        assert_eq!(bridge.min_price, Some(15.0));
        assert!(bridge.has_ticket_for("Alumni"));
        assert_eq!(bridge.registration_open, Some(la(2025, 3, 20, 8)));
        assert_eq!(bridge.description.as_deref(), Some("<p>Duplicate bridge</p>"));
        assert_eq!(bridge.parent_event_id, Some(EventId::Number(9000)));

        let orientation = &events[1];
        assert!(!orientation.has_guest_tickets);
        assert!(orientation.is_free());
        assert_eq!(orientation.spots_remaining, None);
        assert_eq!(orientation.start, la(2025, 4, 3, 10));
    }

    #[test]
    fn test_not_json_is_a_feed_error() {
        let err = parse_feed("<html>", &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, ClubCalError::Feed(_)));
        assert!(parse_feed(r#"{"data": []}"#, &EngineConfig::default()).is_err());
    }

    #[test]
    fn test_json_string_tags() {
        let body = r#"[{"id": "a1", "name": "Potluck", "start_date": "2025-05-01", "tags": "[\"Food\", \"newbie\"]"}]"#;
        let events = parse_feed(body, &EngineConfig::default()).unwrap();
        assert_eq!(events[0].id, EventId::Text("a1".into()));
        assert!(events[0].tags.contains("food"));
        assert!(events[0].tags.contains("newbie"));
        assert_eq!(events[0].start, la(2025, 5, 1, 0));
    }

    #[test]
    fn test_auto_tag_rules_apply() {
        let config = EngineConfig {
            auto_tag_rules: vec![AutoTagRule::new(AutoTagKind::NameContains, "trail", "trail")],
            ..EngineConfig::default()
        };
        let events = parse_feed(CLUB_FEED, &config).unwrap();
        assert!(events[0].tags.contains("trail"));
        assert!(!events[1].tags.contains("trail"));
    }

    #[test]
    fn test_format_tags_are_derived() {
        let body = r#"[
            {"id": 1, "name": "Arts: Watercolor Workshop", "start_date": "2025-05-01T10:00:00"},
            {"id": 2, "name": "Weekly Walk", "start_date": "2025-05-02T08:00:00", "location": "Shoreline Park"},
            {"id": 3, "name": "Games!: Monthly Bunco", "start_date": "2025-05-03T13:00:00", "location": "Clubhouse"}
        ]"#;
        let events = parse_feed(body, &EngineConfig::default()).unwrap();

        assert!(events[0].tags.contains("type:workshop"));
        assert!(!events[0].tags.contains("venue:outdoor"));

        assert!(events[1].tags.contains("type:walk"));
        assert!(events[1].tags.contains("recurring:weekly"));
        assert!(events[1].tags.contains("venue:outdoor"));

        assert!(events[2].tags.contains("recurring:monthly"));
        assert!(!events[2].tags.iter().any(|t| t.starts_with("type:")));
    }

    #[test]
    fn test_general_committee_gets_no_tag() {
        let body = r#"[{"id": 1, "name": "Board Meeting", "start_date": "2025-05-01T19:00:00"}]"#;
        let events = parse_feed(body, &EngineConfig::default()).unwrap();
        assert_eq!(events[0].committee, "General");
        assert!(events[0].tags.is_empty());
    }

    #[test]
    fn test_parse_instant_formats() {
        let tz = Los_Angeles;
        assert_eq!(parse_instant("2025-03-22T09:00:00Z", &tz), Some(Utc.with_ymd_and_hms(2025, 3, 22, 9, 0, 0).unwrap()));
        assert_eq!(parse_instant("2025-03-22 09:00:00", &tz), Some(la(2025, 3, 22, 9)));
        assert_eq!(parse_instant("2025-03-22T09:00", &tz), Some(la(2025, 3, 22, 9)));
        assert_eq!(parse_instant("", &tz), None);
        assert_eq!(parse_instant("soon", &tz), None);
    }

    #[test]
    fn test_cost_category_prices() {
        assert_eq!(cost_category_price("Free"), Some(0.0));
        assert_eq!(cost_category_price("Over $100"), Some(150.0));
        assert_eq!(cost_category_price("Donation"), None);
    }
}
