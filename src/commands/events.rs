use anyhow::Result;
use chrono::Utc;
use owo_colors::OwoColorize;

use crate::commands::{FilterArgs, RangeArgs, SourceArgs, prepare};
use crate::render::{Render, render_agenda};

pub async fn run(
    source: &SourceArgs,
    range: RangeArgs,
    filters: FilterArgs,
    json: bool,
    explain: bool,
) -> Result<()> {
    let cal = source.calendar()?;
    let now = Utc::now();
    let window = prepare(&cal, &range, &filters, now).await?;

    let tz = cal.config().timezone;
    let visible: Vec<_> = cal
        .visible(now)
        .into_iter()
        .filter(|v| window.contains(v.event.local_start(&tz).date_naive()))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&visible)?);
        return Ok(());
    }

    let viewer = match cal.viewer().membership_level() {
        Some(level) => format!("as {level}"),
        None => "as a visitor".to_string(),
    };

    if visible.is_empty() {
        println!("{}", format!("No events {viewer}").dimmed());
    } else {
        let config = cal.config();
        let summary = format!("{} events {viewer}, {window}", visible.len());
        println!("{}\n", summary.dimmed());
        println!(
            "{}",
            render_agenda(&visible, &tz, now, |v| {
                let label = v.availability.label_for(cal.viewer(), config);
                if label == v.availability.label() {
                    v.availability.render()
                } else {
                    label
                }
            })
        );
    }

    if explain {
        let hidden = cal.hidden_by_stage(now);
        if !hidden.is_empty() {
            println!();
            println!("{}", "Hidden".bold());
            for (stage, count) in hidden {
                println!("  {count:>4} by {stage}");
            }
        }
    }

    Ok(())
}
