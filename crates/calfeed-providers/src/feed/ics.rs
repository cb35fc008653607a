//! ICS/iCalendar parsing.
//!
//! This module parses iCalendar (RFC 5545) data into [`CalendarEvent`]s.
//! Times are normalized to UTC and `RRULE`s are converted into the
//! weekday recurrences the expander understands.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{
    Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, Event, EventLike,
};
use tracing::{debug, warn};

use calfeed_core::CalendarEvent;

use super::rrule::{RuleContext, recurrence_from_rrule};
use crate::error::{ProviderError, ProviderResult};

/// Options that control how feed content is interpreted.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Zone for floating times, date-only values and unknown TZIDs.
    pub default_timezone: Tz,
    /// Days after the anchor used as the end of rules without UNTIL.
    pub horizon_days: Option<u32>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            default_timezone: Tz::UTC,
            horizon_days: None,
        }
    }
}

/// The result of parsing a feed.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    /// Events in document order.
    pub events: Vec<CalendarEvent>,
    /// Number of VEVENTs that were ignored.
    pub skipped: usize,
}

/// Parses ICS content and extracts events.
///
/// Cancelled events and `RECURRENCE-ID` overrides are ignored, as are
/// events without a UID or start.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidContent`] if the content is not an
/// iCalendar document.
pub fn parse_ics_content(ics: &str, options: &ParseOptions) -> ProviderResult<ParsedFeed> {
    if !ics.contains("BEGIN:VCALENDAR") {
        return Err(ProviderError::InvalidContent(
            "not an iCalendar document".to_string(),
        ));
    }

    let calendar = ics.parse::<Calendar>().map_err(|e| {
        ProviderError::InvalidContent(format!("failed to parse ICS content: {}", e))
    })?;

    let mut parsed = ParsedFeed::default();
    for component in calendar.iter() {
        let CalendarComponent::Event(event) = component else {
            continue;
        };
        match parse_event(event, options) {
            Some(ev) => parsed.events.push(ev),
            None => parsed.skipped += 1,
        }
    }

    debug!(
        events = parsed.events.len(),
        skipped = parsed.skipped,
        "Parsed ICS content"
    );
    Ok(parsed)
}

/// Parses a single VEVENT component.
fn parse_event(event: &Event, options: &ParseOptions) -> Option<CalendarEvent> {
    let Some(uid) = event.get_uid() else {
        warn!(summary = ?event.get_summary(), "Skipping event without UID");
        return None;
    };

    if event
        .property_value("STATUS")
        .is_some_and(|s| s.eq_ignore_ascii_case("CANCELLED"))
    {
        debug!(uid = %uid, "Skipping cancelled event");
        return None;
    }

    if event.property_value("RECURRENCE-ID").is_some() {
        debug!(uid = %uid, "Skipping recurrence override");
        return None;
    }

    let Some(start_value) = event.get_start() else {
        warn!(uid = %uid, "Skipping event without DTSTART");
        return None;
    };
    let (start, tz) = to_utc(start_value, options.default_timezone);
    let end = event
        .get_end()
        .map(|v| to_utc(v, options.default_timezone).0)
        .unwrap_or(start);

    let mut parsed = CalendarEvent::new(uid, start, end);

    if let Some(summary) = event.get_summary() {
        parsed = parsed.with_summary(summary);
    }
    if let Some(location) = event.get_location() {
        parsed = parsed.with_location(location);
    }
    if let Some(description) = event.get_description() {
        parsed = parsed.with_description(description);
    }

    if let Some(rrule) = event.property_value("RRULE") {
        let ctx = RuleContext {
            uid,
            start,
            tz,
            horizon_days: options.horizon_days,
        };
        parsed = parsed.with_recurrence(recurrence_from_rrule(rrule, &ctx));
    }

    debug!(
        uid = %parsed.uid,
        summary = ?parsed.summary,
        start = %parsed.start,
        recurring = parsed.is_recurring(),
        "Parsed event from ICS"
    );

    Some(parsed)
}

/// Converts an iCalendar date or date-time to UTC.
///
/// Also returns the zone the value was written in, which is the default
/// zone for floating and date-only values.
fn to_utc(value: DatePerhapsTime, default_tz: Tz) -> (DateTime<Utc>, Tz) {
    match value {
        DatePerhapsTime::Date(date) => (local_midnight(date, default_tz), default_tz),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => (dt, Tz::UTC),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => {
            (resolve_local(&naive, default_tz), default_tz)
        }
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            let tz = match tzid.parse::<Tz>() {
                Ok(tz) => tz,
                Err(_) => {
                    warn!(tzid = %tzid, fallback = %default_tz, "Unknown TZID, using default timezone");
                    default_tz
                }
            };
            (resolve_local(&date_time, tz), tz)
        }
    }
}

fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    resolve_local(&date.and_time(NaiveTime::MIN), tz)
}

/// Resolves a wall-clock time in `tz`. Ambiguous times take the earlier
/// instant and times in a DST gap are moved forward by an hour.
fn resolve_local(naive: &NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    tz.from_local_datetime(naive)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(*naive + TimeDelta::hours(1)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}
