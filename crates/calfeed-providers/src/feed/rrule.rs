//! Conversion of iCalendar `RRULE` values into [`RecurrenceRule`]s.
//!
//! The rule is parsed with the `rrule` crate, anchored at the event's
//! DTSTART in its own zone. The expander only models every-day and
//! every-week rules with a weekday list, so:
//!
//! - weekdays come from `BYDAY` (or DTSTART for weekly rules without one);
//! - the until date is the UTC date of the rule's last occurrence, which
//!   covers both `UNTIL` and `COUNT`;
//! - open-ended rules end `horizon_days` after the anchor, if configured.
//!
//! Anything else produces a rule with the unsupported part left empty, so
//! the expander's malformed policy decides what happens to the event.
//!
//! `BYDAY` is local to the event's zone while the expander works on UTC
//! dates. When the event's local date and UTC date differ, the weekdays are
//! shifted by the same number of days.

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use rrule::{Frequency, NWeekday, RRule, RRuleSet};
use tracing::{debug, warn};

use calfeed_core::RecurrenceRule;

/// Occurrences computed when looking for the last one of a bounded rule.
const MAX_OCCURRENCES: u16 = u16::MAX;

/// Context for converting one event's rule.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// The event UID, for log messages.
    pub uid: &'a str,
    /// The event start in UTC.
    pub start: DateTime<Utc>,
    /// The zone the rule is written in.
    pub tz: Tz,
    /// Days after the anchor used when the rule has no UNTIL or COUNT.
    pub horizon_days: Option<u32>,
}

impl RuleContext<'_> {
    /// Days between the local start date and the UTC start date.
    fn day_shift(&self) -> i64 {
        (self.start.date_naive() - self.local_start_date()).num_days()
    }

    fn local_start_date(&self) -> NaiveDate {
        self.start.with_timezone(&self.tz).date_naive()
    }

    /// The DTSTART line the rule is parsed against.
    fn dtstart_line(&self) -> String {
        if self.tz == Tz::UTC {
            format!("DTSTART:{}", self.start.format("%Y%m%dT%H%M%SZ"))
        } else {
            format!(
                "DTSTART;TZID={}:{}",
                self.tz.name(),
                self.start.with_timezone(&self.tz).format("%Y%m%dT%H%M%S")
            )
        }
    }
}

/// Builds the recurrence for an event from its RRULE value.
pub fn recurrence_from_rrule(value: &str, ctx: &RuleContext<'_>) -> RecurrenceRule {
    let anchor_date = ctx.start.date_naive();
    let mut recurrence = RecurrenceRule {
        anchor_date: Some(anchor_date),
        until_date: None,
        weekdays: None,
    };

    // Property names and values are case-insensitive; the parser is not.
    let rule = date_only_until_to_utc(&value.trim().to_ascii_uppercase(), ctx);
    let text = format!("{}\nRRULE:{}", ctx.dtstart_line(), rule);
    let set = match text.parse::<RRuleSet>() {
        Ok(set) => set,
        Err(e) => {
            warn!(uid = %ctx.uid, rrule = %value, error = %e, "Unparseable RRULE");
            return recurrence;
        }
    };

    let (bounded, until) = {
        let Some(rule) = set.get_rrule().first() else {
            warn!(uid = %ctx.uid, rrule = %value, "RRULE produced no rule");
            return recurrence;
        };
        recurrence.weekdays = weekdays_for(rule, ctx);
        (
            rule.get_count().is_some() || rule.get_until().is_some(),
            rule.get_until().map(|until| until.with_timezone(&Utc).date_naive()),
        )
    };

    recurrence.until_date = if bounded {
        last_occurrence_date(set, anchor_date, until, ctx)
    } else {
        match ctx.horizon_days {
            Some(days) => anchor_date.checked_add_days(Days::new(u64::from(days))),
            None => {
                warn!(uid = %ctx.uid, "RRULE has no UNTIL or COUNT and no horizon is configured");
                None
            }
        }
    };

    recurrence
}

/// Rewrites a date-only `UNTIL` as that date at the event's local start
/// time, in UTC. Read as midnight it would drop the last day's occurrence.
fn date_only_until_to_utc(rule: &str, ctx: &RuleContext<'_>) -> String {
    let local_time = ctx.start.with_timezone(&ctx.tz).time();
    rule.split(';')
        .map(|part| {
            let until = part
                .strip_prefix("UNTIL=")
                .filter(|value| value.len() == 8)
                .and_then(|value| NaiveDate::parse_from_str(value, "%Y%m%d").ok())
                .and_then(|date| ctx.tz.from_local_datetime(&date.and_time(local_time)).earliest());
            match until {
                Some(until) => format!("UNTIL={}", until.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ")),
                None => part.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Returns the UTC weekday numbers for the rule, or `None` if the rule
/// cannot be represented as a weekday list.
fn weekdays_for(rule: &RRule, ctx: &RuleContext<'_>) -> Option<Vec<u8>> {
    let freq = rule.get_freq();
    if !matches!(freq, Frequency::Daily | Frequency::Weekly) {
        warn!(uid = %ctx.uid, freq = ?freq, "Unsupported RRULE frequency");
        return None;
    }
    if rule.get_interval() != 1 {
        warn!(uid = %ctx.uid, interval = rule.get_interval(), "Unsupported RRULE interval");
        return None;
    }

    let by_day = rule.get_by_weekday();
    let local_days: Vec<Weekday> = if by_day.is_empty() {
        match freq {
            Frequency::Daily => return Some((0..7).collect()),
            _ => vec![ctx.local_start_date().weekday()],
        }
    } else {
        let mut days = Vec::with_capacity(by_day.len());
        for day in by_day {
            match day {
                NWeekday::Every(day) => days.push(*day),
                NWeekday::Nth(n, day) => {
                    warn!(uid = %ctx.uid, nth = n, day = %day, "Ordinal RRULE BYDAY is not supported");
                    return None;
                }
            }
        }
        days
    };

    let shift = ctx.day_shift();
    let mut numbers: Vec<u8> = local_days
        .into_iter()
        .map(|day| shift_weekday(day, shift).num_days_from_sunday() as u8)
        .collect();
    numbers.sort_unstable();
    numbers.dedup();
    Some(numbers)
}

fn shift_weekday(day: Weekday, shift: i64) -> Weekday {
    match shift.signum() {
        1 => day.succ(),
        -1 => day.pred(),
        _ => day,
    }
}

/// Returns the UTC date of the last occurrence of a bounded rule.
///
/// A rule with no occurrence at all gets an until date before its anchor,
/// so it expands to nothing.
fn last_occurrence_date(
    set: RRuleSet,
    anchor_date: NaiveDate,
    until: Option<NaiveDate>,
    ctx: &RuleContext<'_>,
) -> Option<NaiveDate> {
    let result = set.all(MAX_OCCURRENCES);

    if result.limited {
        if until.is_none() {
            warn!(uid = %ctx.uid, "RRULE COUNT exceeds the occurrence limit");
        }
        return until;
    }

    match result.dates.last() {
        Some(last) => {
            debug!(uid = %ctx.uid, occurrences = result.dates.len(), "Bounded RRULE");
            Some(last.with_timezone(&Utc).date_naive())
        }
        None => {
            debug!(uid = %ctx.uid, "RRULE has no occurrences");
            anchor_date.pred_opt()
        }
    }
}
