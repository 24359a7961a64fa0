use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clubcal_core::refresh::{RefreshDecision, VisibilitySignal};
use clubcal_core::source::EventSource;
use clubcal_core::store::FetchOutcome;
use owo_colors::OwoColorize;

use crate::commands::{FilterArgs, RangeArgs, SourceArgs, prepare};

/// Poll as if the page kept becoming visible. The engine's debounce decides
/// whether each poll actually refetches.
pub async fn run(source: &SourceArgs, filters: FilterArgs, every: Duration) -> Result<()> {
    let cal = source.calendar()?;
    prepare(&cal, &RangeArgs::default(), &filters, Utc::now()).await?;
    let mut shown = cal.visible(Utc::now()).len();
    println!("{}", format!("Watching {} ({shown} events)", cal.source().describe()).dimmed());

    let mut ticker = tokio::time::interval(every);
    // The first tick fires immediately; the initial load already happened
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }

        let now = Utc::now();
        let (decision, outcome) = cal.refresh_if_stale(VisibilitySignal::Visible, now).await;
        match (decision, outcome) {
            (RefreshDecision::Skip(reason), _) => {
                tracing::debug!(?reason, "refresh skipped");
            }
            (_, Some(FetchOutcome::Applied { .. })) => {
                let count = cal.visible(now).len();
                if count != shown {
                    println!("{} {shown} -> {count} events", now.format("%H:%M:%S").dimmed());
                    shown = count;
                }
            }
            (_, Some(FetchOutcome::Failed(e))) => {
                eprintln!("{} {e}", "refresh failed, keeping previous events:".yellow());
            }
            (_, Some(FetchOutcome::Superseded) | None) => {}
        }
    }
}
