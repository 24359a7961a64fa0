//! ICS export of the visible events.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use icalendar::{Calendar, Component, EventLike, Property};

use crate::error::{ClubCalError, ClubCalResult};
use crate::pipeline::VisibleEvent;

const PRODID: &str = "PRODID:CLUBCAL";

/// Build a VCALENDAR with one VEVENT per visible event, times in the club timezone.
pub fn export(events: &[VisibleEvent], tz: &Tz) -> ClubCalResult<String> {
    let mut cal = Calendar::new();

    for visible in events {
        let event = &visible.event;
        if event.end < event.start {
            return Err(ClubCalError::Ics(format!(
                "event {} ends before it starts",
                event.id
            )));
        }

        let mut ics_event = icalendar::Event::new();
        ics_event.uid(&format!("clubcal-{}", event.id));
        ics_event.summary(&event.name);
        add_zoned_property(&mut ics_event, "DTSTART", event.start, tz);
        add_zoned_property(&mut ics_event, "DTEND", event.end, tz);

        if let Some(ref loc) = event.location {
            ics_event.location(loc);
        }
        if let Some(ref desc) = event.description {
            ics_event.description(desc);
        }
        if let Some(ref url) = event.registration_url {
            ics_event.add_property("URL", url);
        }
        if !event.tags.is_empty() {
            let categories: Vec<_> = event.tags.iter().collect();
            ics_event.add_property("CATEGORIES", categories.join(","));
        }
        ics_event.add_property("X-CLUBCAL-AVAILABILITY", visible.availability.as_str());

        cal.push(ics_event.done());
    }

    let cal = cal.done();
    Ok(normalize(&cal.to_string()))
}

fn add_zoned_property(ics_event: &mut icalendar::Event, name: &str, instant: DateTime<Utc>, tz: &Tz) {
    let local = instant.with_timezone(tz);
    let mut prop = Property::new(name, local.format("%Y%m%dT%H%M%S").to_string());
    prop.add_parameter("TZID", tz.name());
    ics_event.append_property(prop);
}

/// Stamp our PRODID and drop the redundant CALSCALE line.
fn normalize(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());
    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str(PRODID);
            result.push_str("\r\n");
            continue;
        }
        if line == "CALSCALE:GREGORIAN" {
            continue;
        }
        result.push_str(line);
        result.push_str("\r\n");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::visibility::MemberAvailability;
    use chrono::TimeZone;

    fn visible(event: Event, availability: MemberAvailability) -> VisibleEvent {
        VisibleEvent { event, availability }
    }

    #[test]
    fn test_export_uses_club_timezone() {
        let start = Utc.with_ymd_and_hms(2025, 3, 21, 2, 0, 0).unwrap();
        let event = Event::new(42, "Wine Tasting", start)
            .with_location("Bistro")
            .with_tags(["wine", "public"]);
        let ics = export(
            &[visible(event, MemberAvailability::Public)],
            &chrono_tz::America::Los_Angeles,
        )
        .unwrap();

        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(ics.contains("PRODID:CLUBCAL\r\n"));
        assert!(!ics.contains("CALSCALE"));
        assert!(ics.contains("UID:clubcal-42"));
        assert!(ics.contains("SUMMARY:Wine Tasting"));
        assert!(ics.contains("DTSTART;TZID=America/Los_Angeles:20250320T190000"));
        assert!(ics.contains("DTEND;TZID=America/Los_Angeles:20250320T200000"));
        assert!(ics.contains("LOCATION:Bistro"));
        assert!(ics.contains("X-CLUBCAL-AVAILABILITY:public"));
    }

    #[test]
    fn test_export_one_vevent_per_event() {
        let start = Utc.with_ymd_and_hms(2025, 3, 21, 2, 0, 0).unwrap();
        let events = vec![
            visible(Event::new(1, "One", start), MemberAvailability::Available),
            visible(Event::new(2, "Two", start), MemberAvailability::Limited),
        ];
        let ics = export(&events, &chrono_tz::America::Los_Angeles).unwrap();
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 2);
    }

    #[test]
    fn test_export_rejects_inverted_times() {
        let start = Utc.with_ymd_and_hms(2025, 3, 21, 2, 0, 0).unwrap();
        let event = Event::new(7, "Backwards", start).with_end(start - chrono::Duration::hours(1));
        let err = export(
            &[visible(event, MemberAvailability::Available)],
            &chrono_tz::America::Los_Angeles,
        )
        .unwrap_err();
        assert!(matches!(err, ClubCalError::Ics(_)));
    }
}
