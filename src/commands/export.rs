use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clubcal_core::ics;

use crate::commands::{FilterArgs, RangeArgs, SourceArgs, prepare};

/// Write the events the viewer would see as an .ics file, or to stdout.
pub async fn run(
    source: &SourceArgs,
    range: RangeArgs,
    filters: FilterArgs,
    output: Option<PathBuf>,
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

    let content = ics::export(&visible, &tz)?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, content)
                .await
                .with_context(|| format!("Could not write {}", path.display()))?;
            eprintln!("Wrote {} events to {}", visible.len(), path.display());
        }
        None => print!("{content}"),
    }

    Ok(())
}
