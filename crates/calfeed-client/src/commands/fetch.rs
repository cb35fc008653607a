//! `calfeed fetch`: download the feed and save its events.

use std::path::{Path, PathBuf};

use tracing::info;

use calfeed_providers::{CalendarSource, FetchResult, IcsFeedSource};

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::store;

/// Fetches events from `source` and writes them to `output`.
pub async fn fetch_to(source: &dyn CalendarSource, output: &Path) -> ClientResult<FetchResult> {
    let result = source.fetch_events().await?;
    store::save_json(output, &result.events)?;

    info!(
        source = source.name(),
        events = result.events.len(),
        path = %output.display(),
        "Saved calendar events"
    );
    Ok(result)
}

pub async fn run(
    config: &ClientConfig,
    url: Option<&str>,
    output: Option<PathBuf>,
) -> ClientResult<()> {
    let source = IcsFeedSource::new(config.feed.to_feed_config(url)?)?;
    let output = output.unwrap_or_else(|| config.paths.calendar.clone());

    let result = fetch_to(&source, &output).await?;

    println!(
        "Saved {} events ({} recurring) to {}",
        result.events.len(),
        result.recurring_count(),
        output.display()
    );
    if result.skipped > 0 {
        println!("Ignored {} feed entries", result.skipped);
    }
    Ok(())
}
