//! Expansion of recurring events into concrete occurrences.
//!
//! [`expand`] turns the events read from the feed into the flat list the
//! front end renders: single events pass through, recurring events are
//! replaced in place by one [`ExpandedEvent`] per matching date.
//!
//! All arithmetic is done in UTC. An occurrence takes its date from the
//! recurrence and its time-of-day from the template event's UTC `start` and
//! `end`. When the end time-of-day is earlier than the start time-of-day the
//! event runs past midnight, and the occurrence's end moves to the next day.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::event::{CalendarEvent, ExpandedEvent};
use crate::recurrence::{RecurrenceError, RecurrenceSpec};

/// What to do with a recurring event whose rule cannot be validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Abort the whole expansion.
    #[default]
    Fail,
    /// Drop the event and log a warning.
    Skip,
}

impl MalformedPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for MalformedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MalformedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "skip" => Ok(Self::Skip),
            other => Err(format!("unknown malformed policy '{}' (expected fail or skip)", other)),
        }
    }
}

/// Error returned by [`expand`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    /// A recurring event had an invalid rule under [`MalformedPolicy::Fail`].
    #[error("event '{uid}' has a malformed recurrence: {source}")]
    Malformed {
        uid: String,
        #[source]
        source: RecurrenceError,
    },
}

/// The result of a successful expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    /// The occurrences, in input order.
    pub events: Vec<ExpandedEvent>,
    /// How many input events were recurring.
    pub recurring: usize,
    /// UIDs of malformed events dropped under [`MalformedPolicy::Skip`].
    pub skipped: Vec<String>,
}

/// Expands every event in `events`.
///
/// Non-recurring events are emitted unchanged. Each recurring event is
/// replaced, at its position, by its occurrences in ascending date order.
///
/// # Errors
///
/// Under [`MalformedPolicy::Fail`], returns [`ExpandError::Malformed`] for the
/// first recurring event whose rule does not validate.
pub fn expand(events: &[CalendarEvent], policy: MalformedPolicy) -> Result<Expansion, ExpandError> {
    let mut expansion = Expansion::default();

    for event in events {
        if event.is_recurring() {
            expansion.recurring += 1;
        }

        match expand_event(event) {
            Ok(occurrences) => expansion.events.extend(occurrences),
            Err(source) => match policy {
                MalformedPolicy::Fail => {
                    return Err(ExpandError::Malformed {
                        uid: event.uid.clone(),
                        source,
                    });
                }
                MalformedPolicy::Skip => {
                    warn!(uid = %event.uid, reason = %source, "Skipping event with malformed recurrence");
                    expansion.skipped.push(event.uid.clone());
                }
            },
        }
    }

    debug!(
        input = events.len(),
        output = expansion.events.len(),
        recurring = expansion.recurring,
        skipped = expansion.skipped.len(),
        "Expanded events"
    );

    Ok(expansion)
}

/// Expands a single event.
///
/// # Errors
///
/// Returns the validation error of the event's recurrence rule.
pub fn expand_event(event: &CalendarEvent) -> Result<Vec<ExpandedEvent>, RecurrenceError> {
    let Some(rule) = &event.recurrence else {
        return Ok(vec![event.occurrence(event.start, event.end)]);
    };

    let spec = rule.validate()?;
    Ok(occurrences(&spec, event.start, event.end)
        .map(|(start, end)| event.occurrence(start, end))
        .collect())
}

/// Returns the `(start, end)` pair of every occurrence of `spec`, with the
/// time-of-day taken from `template_start` and `template_end`.
pub fn occurrences(
    spec: &RecurrenceSpec,
    template_start: DateTime<Utc>,
    template_end: DateTime<Utc>,
) -> impl Iterator<Item = (DateTime<Utc>, DateTime<Utc>)> + use<> {
    let start_time = time_of_day(template_start);
    let end_time = time_of_day(template_end);

    spec.occurrence_dates()
        .map(move |date| occurrence_bounds(date, start_time, end_time))
}

/// Places `start_time` and `end_time` on `date`, moving the end to the next
/// day when it would precede the start.
pub fn occurrence_bounds(
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(start_time).and_utc();
    let end = date.and_time(end_time).and_utc();

    if end < start {
        // Only NaiveDate::MAX has no successor.
        let next = end.checked_add_days(Days::new(1)).unwrap_or(end);
        (start, next)
    } else {
        (start, end)
    }
}

/// UTC hour, minute and second of `dt`; sub-second precision is dropped.
fn time_of_day(dt: DateTime<Utc>) -> NaiveTime {
    let time = dt.time();
    time.with_nanosecond(0).unwrap_or(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::RecurrenceRule;
    use chrono::{Datelike, TimeZone};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn single(uid: &str, day: u32) -> CalendarEvent {
        CalendarEvent::new(uid, utc(2024, 3, day, 18, 0, 0), utc(2024, 3, day, 19, 30, 0))
            .with_summary(format!("Single {}", uid))
    }

    fn weekly(
        uid: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        rule: RecurrenceRule,
    ) -> CalendarEvent {
        CalendarEvent::new(uid, start, end)
            .with_summary("Practice")
            .with_location("Gym")
            .with_description("Weekly practice")
            .with_recurrence(rule)
    }

    #[test]
    fn non_recurring_events_pass_through_in_order() {
        let events = vec![single("a", 3), single("b", 1), single("c", 2)];
        let expansion = expand(&events, MalformedPolicy::Fail).unwrap();

        let back: Vec<CalendarEvent> = expansion.events.into_iter().map(Into::into).collect();
        assert_eq!(back, events);
        assert_eq!(expansion.recurring, 0);
        assert!(expansion.skipped.is_empty());
    }

    #[test]
    fn mondays_in_first_two_weeks_of_january() {
        let event = weekly(
            "mon",
            utc(2024, 1, 1, 9, 0, 0),
            utc(2024, 1, 1, 10, 0, 0),
            RecurrenceRule::new(date(2024, 1, 1), date(2024, 1, 14), [1]),
        );

        let expansion = expand(&[event], MalformedPolicy::Fail).unwrap();
        let bounds: Vec<_> = expansion.events.iter().map(|e| (e.start, e.end)).collect();

        assert_eq!(
            bounds,
            vec![
                (utc(2024, 1, 1, 9, 0, 0), utc(2024, 1, 1, 10, 0, 0)),
                (utc(2024, 1, 8, 9, 0, 0), utc(2024, 1, 8, 10, 0, 0)),
            ]
        );
        assert!(expansion.events.iter().all(|e| e.location.as_deref() == Some("Gym")));
        assert_eq!(expansion.recurring, 1);
    }

    #[test]
    fn overnight_event_ends_next_day() {
        // 2024-01-05 is a Friday.
        let event = weekly(
            "late",
            utc(2024, 1, 5, 23, 0, 0),
            utc(2024, 1, 6, 1, 0, 0),
            RecurrenceRule::new(date(2024, 1, 1), date(2024, 1, 31), [5]),
        );

        let occurrences = expand_event(&event).unwrap();
        assert_eq!(occurrences.len(), 4);
        for occ in &occurrences {
            assert_eq!(occ.start.weekday(), chrono::Weekday::Fri);
            assert_eq!(occ.start.time(), NaiveTime::from_hms_opt(23, 0, 0).unwrap());
            assert_eq!(occ.end.time(), NaiveTime::from_hms_opt(1, 0, 0).unwrap());
            assert_eq!(occ.end.date_naive(), occ.start.date_naive().succ_opt().unwrap());
        }
    }

    #[test]
    fn equal_start_and_end_time_is_not_overnight() {
        let (start, end) = occurrence_bounds(
            date(2024, 1, 1),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        );
        assert_eq!(start, end);
    }

    #[test]
    fn template_date_does_not_shift_occurrences() {
        // The template spans two days, but only its time-of-day matters.
        let event = weekly(
            "long",
            utc(2023, 6, 1, 8, 0, 0),
            utc(2023, 6, 3, 17, 0, 0),
            RecurrenceRule::new(date(2024, 1, 1), date(2024, 1, 1), [1]),
        );

        let occurrences = expand_event(&event).unwrap();
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].start, utc(2024, 1, 1, 8, 0, 0));
        assert_eq!(occurrences[0].end, utc(2024, 1, 1, 17, 0, 0));
    }

    #[test]
    fn anchor_after_until_yields_nothing() {
        let event = weekly(
            "none",
            utc(2024, 1, 1, 9, 0, 0),
            utc(2024, 1, 1, 10, 0, 0),
            RecurrenceRule::new(date(2024, 1, 15), date(2024, 1, 14), [0, 1, 2, 3, 4, 5, 6]),
        );

        let expansion = expand(&[event], MalformedPolicy::Fail).unwrap();
        assert!(expansion.events.is_empty());
    }

    #[test]
    fn weekday_never_reached_yields_nothing() {
        // Monday 2024-01-01 to Wednesday 2024-01-03, asking for Saturdays.
        let event = weekly(
            "sat",
            utc(2024, 1, 1, 9, 0, 0),
            utc(2024, 1, 1, 10, 0, 0),
            RecurrenceRule::new(date(2024, 1, 1), date(2024, 1, 3), [6]),
        );
        assert!(expand_event(&event).unwrap().is_empty());
    }

    #[test]
    fn empty_weekdays_yield_nothing() {
        let event = weekly(
            "empty",
            utc(2024, 1, 1, 9, 0, 0),
            utc(2024, 1, 1, 10, 0, 0),
            RecurrenceRule::new(date(2024, 1, 1), date(2024, 12, 31), []),
        );
        assert!(expand_event(&event).unwrap().is_empty());
    }

    #[test]
    fn occurrences_stay_in_range_and_on_listed_weekdays() {
        let rule = RecurrenceRule::new(date(2024, 2, 10), date(2024, 4, 20), [0, 3, 6]);
        let spec = rule.validate().unwrap();
        let event = weekly(
            "range",
            utc(2024, 2, 10, 7, 15, 30),
            utc(2024, 2, 10, 8, 45, 0),
            rule,
        );

        let occurrences = expand_event(&event).unwrap();
        assert!(!occurrences.is_empty());
        for occ in &occurrences {
            let day = occ.start.date_naive();
            assert!(day >= spec.anchor_date && day <= spec.until_date);
            assert!(spec.weekdays.contains(day.weekday()));
            assert_eq!(occ.start.time(), NaiveTime::from_hms_opt(7, 15, 30).unwrap());
            assert_eq!(occ.end.time(), NaiveTime::from_hms_opt(8, 45, 0).unwrap());
        }
        assert!(occurrences.windows(2).all(|w| w[0].start < w[1].start));
    }

    #[test]
    fn sub_second_precision_is_dropped() {
        let start = utc(2024, 1, 1, 9, 0, 0) + chrono::Duration::milliseconds(250);
        let event = weekly(
            "ms",
            start,
            utc(2024, 1, 1, 10, 0, 0),
            RecurrenceRule::new(date(2024, 1, 8), date(2024, 1, 8), [1]),
        );
        let occurrences = expand_event(&event).unwrap();
        assert_eq!(occurrences[0].start, utc(2024, 1, 8, 9, 0, 0));
    }

    #[test]
    fn recurring_expansion_is_spliced_at_its_position() {
        let events = vec![
            single("first", 1),
            weekly(
                "mid",
                utc(2024, 1, 1, 9, 0, 0),
                utc(2024, 1, 1, 10, 0, 0),
                RecurrenceRule::new(date(2024, 1, 1), date(2024, 1, 14), [1]),
            ),
            single("last", 2),
        ];

        let expansion = expand(&events, MalformedPolicy::Fail).unwrap();
        let uids: Vec<_> = expansion.events.iter().map(|e| e.uid.as_str()).collect();
        assert_eq!(uids, vec!["first", "mid", "mid", "last"]);
    }

    #[test]
    fn fail_policy_reports_first_malformed_event() {
        let mut broken = RecurrenceRule::new(date(2024, 1, 1), date(2024, 1, 14), [1]);
        broken.weekdays = None;
        let events = vec![
            single("ok", 1),
            weekly("bad", utc(2024, 1, 1, 9, 0, 0), utc(2024, 1, 1, 10, 0, 0), broken),
        ];

        let err = expand(&events, MalformedPolicy::Fail).unwrap_err();
        assert_eq!(
            err,
            ExpandError::Malformed {
                uid: "bad".to_string(),
                source: RecurrenceError::MissingWeekdays,
            }
        );
        assert!(err.to_string().contains("'bad'"));
    }

    #[test]
    fn skip_policy_drops_only_malformed_events() {
        let broken = RecurrenceRule {
            anchor_date: Some(date(2024, 1, 1)),
            ..Default::default()
        };
        let events = vec![
            single("a", 1),
            weekly("bad", utc(2024, 1, 1, 9, 0, 0), utc(2024, 1, 1, 10, 0, 0), broken),
            single("b", 2),
        ];

        let expansion = expand(&events, MalformedPolicy::Skip).unwrap();
        let uids: Vec<_> = expansion.events.iter().map(|e| e.uid.as_str()).collect();
        assert_eq!(uids, vec!["a", "b"]);
        assert_eq!(expansion.skipped, vec!["bad".to_string()]);
        assert_eq!(expansion.recurring, 1);
    }

    #[test]
    fn expanding_expanded_output_is_identity() {
        let events = vec![
            weekly(
                "mon",
                utc(2024, 1, 1, 23, 30, 0),
                utc(2024, 1, 1, 0, 30, 0),
                RecurrenceRule::new(date(2024, 1, 1), date(2024, 1, 31), [1]),
            ),
            single("one-off", 4),
        ];

        let first = expand(&events, MalformedPolicy::Fail).unwrap().events;
        let reloaded: Vec<CalendarEvent> = first.iter().cloned().map(Into::into).collect();
        let second = expand(&reloaded, MalformedPolicy::Fail).unwrap().events;

        assert_eq!(first, second);
    }

    #[test]
    fn policy_parses_from_str() {
        assert_eq!("fail".parse::<MalformedPolicy>(), Ok(MalformedPolicy::Fail));
        assert_eq!("SKIP".parse::<MalformedPolicy>(), Ok(MalformedPolicy::Skip));
        assert!("ignore".parse::<MalformedPolicy>().is_err());
        assert_eq!(MalformedPolicy::default().to_string(), "fail");
    }
}
