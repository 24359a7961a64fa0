//! Colored terminal rendering for engine types.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use clubcal_core::pipeline::VisibleEvent;
use clubcal_core::visibility::MemberAvailability;
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for MemberAvailability {
    fn render(&self) -> String {
        let label = self.label();
        match self {
            MemberAvailability::Available => label.green().to_string(),
            MemberAvailability::Limited => label.yellow().to_string(),
            MemberAvailability::Waitlist => label.red().to_string(),
            MemberAvailability::Public => label.cyan().to_string(),
            MemberAvailability::Unavailable => label.dimmed().to_string(),
        }
    }
}

/// "Today", "Tomorrow", or e.g. "Sat Mar 22".
pub fn date_label(date: NaiveDate, today: NaiveDate) -> String {
    match (date - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        _ => date.format("%a %b %-d").to_string(),
    }
}

/// One line per event, grouped under a bold date header.
pub fn render_agenda(
    events: &[VisibleEvent],
    tz: &Tz,
    now: DateTime<Utc>,
    label: impl Fn(&VisibleEvent) -> String,
) -> String {
    let today = now.with_timezone(tz).date_naive();
    let mut lines = Vec::new();
    let mut current: Option<NaiveDate> = None;

    for visible in events {
        let start = visible.event.local_start(tz);
        let date = start.date_naive();
        if current != Some(date) {
            if current.is_some() {
                lines.push(String::new());
            }
            lines.push(date_label(date, today).bold().to_string());
            current = Some(date);
        }

        let mut line = format!("  {:>5} {}", start.format("%H:%M"), visible.event.name);
        if let Some(price) = visible.event.min_price.filter(|p| *p > 0.0) {
            line.push_str(&format!(" {}", format!("${price:.0}").dimmed()));
        }
        line.push_str(&format!("  {}", label(visible)));
        lines.push(line);
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clubcal_core::event::Event;
    use chrono::TimeZone;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    #[test]
    fn test_date_label() {
        assert_eq!(date_label(d(3, 19), d(3, 19)), "Today");
        assert_eq!(date_label(d(3, 20), d(3, 19)), "Tomorrow");
        assert_eq!(date_label(d(3, 22), d(3, 19)), "Sat Mar 22");
    }

    #[test]
    fn test_agenda_groups_by_local_day() {
        let tz = chrono_tz::America::Los_Angeles;
        let now = Utc.with_ymd_and_hms(2025, 3, 19, 17, 0, 0).unwrap();
        // 18:00 and 19:30 local on Mar 20, then Mar 22
        let events = vec![
            VisibleEvent {
                event: Event::new(1, "Wine Tasting", Utc.with_ymd_and_hms(2025, 3, 21, 1, 0, 0).unwrap())
                    .with_price(40.0),
                availability: MemberAvailability::Limited,
            },
            VisibleEvent {
                event: Event::new(2, "Trivia", Utc.with_ymd_and_hms(2025, 3, 21, 2, 30, 0).unwrap()),
                availability: MemberAvailability::Available,
            },
            VisibleEvent {
                event: Event::new(3, "Hike", Utc.with_ymd_and_hms(2025, 3, 22, 17, 0, 0).unwrap()),
                availability: MemberAvailability::Public,
            },
        ];

        let out = render_agenda(&events, &tz, now, |v| v.availability.as_str().to_string());
        let plain: Vec<_> = out.lines().collect();
        assert_eq!(plain.len(), 6);
        assert!(plain[0].contains("Tomorrow"));
        assert!(plain[1].contains("18:00 Wine Tasting"));
        assert!(plain[1].contains("$40"));
        assert!(plain[1].ends_with("limited"));
        assert!(plain[2].contains("19:30 Trivia"));
        assert_eq!(plain[3], "");
        assert!(plain[4].contains("Sat Mar 22"));
        assert!(plain[5].contains("10:00 Hike"));
    }
}
