//! `calfeed sync`: fetch the feed and expand it in one go.

use std::path::PathBuf;

use tracing::info;

use calfeed_core::{MalformedPolicy, expand};
use calfeed_providers::{CalendarSource, IcsFeedSource};

use crate::cli::SyncArgs;
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::store;

/// Resolved output locations and policy for a sync.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub calendar: PathBuf,
    pub expanded: PathBuf,
    pub policy: MalformedPolicy,
}

impl SyncOptions {
    /// Applies command-line overrides on top of the configuration.
    pub fn resolve(config: &ClientConfig, args: &SyncArgs) -> Self {
        Self {
            calendar: args
                .calendar
                .clone()
                .unwrap_or_else(|| config.paths.calendar.clone()),
            expanded: args
                .output
                .clone()
                .unwrap_or_else(|| config.paths.expanded.clone()),
            policy: args.on_malformed.unwrap_or(config.expand.on_malformed),
        }
    }
}

/// What a sync did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Events received from the source.
    pub fetched: usize,
    /// Recurring events among them.
    pub recurring: usize,
    /// Occurrences written.
    pub occurrences: usize,
    /// UIDs of malformed events dropped by the skip policy.
    pub skipped: Vec<String>,
}

/// Fetches from `source`, saves the events, expands them and saves the
/// occurrences.
///
/// The events file is written before expansion, so it is kept even when
/// expansion fails under the fail policy.
pub async fn sync_once(
    source: &dyn CalendarSource,
    options: &SyncOptions,
) -> ClientResult<SyncReport> {
    let fetched = source.fetch_events().await?;
    store::save_json(&options.calendar, &fetched.events)?;

    let expansion = expand(&fetched.events, options.policy)?;
    store::save_json(&options.expanded, &expansion.events)?;

    let report = SyncReport {
        fetched: fetched.events.len(),
        recurring: expansion.recurring,
        occurrences: expansion.events.len(),
        skipped: expansion.skipped,
    };
    info!(
        source = source.name(),
        fetched = report.fetched,
        occurrences = report.occurrences,
        skipped = report.skipped.len(),
        "Sync completed"
    );
    Ok(report)
}

pub async fn run(config: &ClientConfig, args: &SyncArgs) -> ClientResult<()> {
    let source = IcsFeedSource::new(config.feed.to_feed_config(args.url.as_deref())?)?;
    let options = SyncOptions::resolve(config, args);

    let report = sync_once(&source, &options).await?;

    println!(
        "Fetched {} events ({} recurring) into {}",
        report.fetched,
        report.recurring,
        options.calendar.display()
    );
    println!(
        "Saved {} occurrences to {}",
        report.occurrences,
        options.expanded.display()
    );
    if !report.skipped.is_empty() {
        println!(
            "Skipped {} malformed events: {}",
            report.skipped.len(),
            report.skipped.join(", ")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calfeed_core::{CalendarEvent, RecurrenceRule};
    use calfeed_providers::StaticSource;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::path::Path;

    fn options(dir: &Path, policy: MalformedPolicy) -> SyncOptions {
        SyncOptions {
            calendar: dir.join("calendar.json"),
            expanded: dir.join("expanded-calendar.json"),
            policy,
        }
    }

    fn feed_events() -> Vec<CalendarEvent> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        vec![
            CalendarEvent::new("single", start, end),
            CalendarEvent::new("weekly", start, end).with_recurrence(RecurrenceRule::new(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 14).unwrap(),
                [1],
            )),
            CalendarEvent::new("open-ended", start, end).with_recurrence(RecurrenceRule {
                anchor_date: NaiveDate::from_ymd_opt(2024, 1, 1),
                until_date: None,
                weekdays: Some(vec![2]),
            }),
        ]
    }

    #[test]
    fn options_prefer_command_line() {
        let config = ClientConfig::default();
        let args = SyncArgs {
            output: Some(PathBuf::from("public/expanded.json")),
            on_malformed: Some(MalformedPolicy::Skip),
            ..Default::default()
        };

        let options = SyncOptions::resolve(&config, &args);
        assert_eq!(options.calendar, PathBuf::from("calendar.json"));
        assert_eq!(options.expanded, PathBuf::from("public/expanded.json"));
        assert_eq!(options.policy, MalformedPolicy::Skip);
    }

    #[tokio::test]
    async fn sync_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path(), MalformedPolicy::Skip);
        let source = StaticSource::new("fixture", feed_events());

        let report = sync_once(&source, &options).await.unwrap();

        assert_eq!(
            report,
            SyncReport {
                fetched: 3,
                recurring: 2,
                occurrences: 3,
                skipped: vec!["open-ended".to_string()],
            }
        );
        assert_eq!(store::load_events(&options.calendar).unwrap().len(), 3);
        let expanded = store::load_events(&options.expanded).unwrap();
        let uids: Vec<&str> = expanded.iter().map(|e| e.uid.as_str()).collect();
        assert_eq!(uids, ["single", "weekly", "weekly"]);
    }

    #[tokio::test]
    async fn fail_policy_keeps_fetched_events() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path(), MalformedPolicy::Fail);
        let source = StaticSource::new("fixture", feed_events());

        let err = sync_once(&source, &options).await.unwrap_err();

        assert!(err.to_string().contains("open-ended"));
        assert!(options.calendar.exists());
        assert!(!options.expanded.exists());
    }
}
