//! Event types for the calendar feed.
//!
//! - [`CalendarEvent`]: an event as read from the feed, possibly recurring
//! - [`ExpandedEvent`]: a single concrete occurrence, as written for the front end
//!
//! Both serialize to the same JSON shape apart from the `recurrence` field, so
//! an expanded file can be read back as a list of non-recurring
//! [`CalendarEvent`]s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::recurrence::RecurrenceRule;

/// A calendar event as ingested from the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// The iCalendar UID.
    pub uid: String,

    /// The event title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// The event location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// The event description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// When the event starts. For recurring events only the UTC time-of-day
    /// is used as a template.
    pub start: DateTime<Utc>,

    /// When the event ends. Same template semantics as `start`.
    pub end: DateTime<Utc>,

    /// The recurrence rule, present only for recurring events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceRule>,
}

impl CalendarEvent {
    /// Creates a single-occurrence event.
    pub fn new(uid: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            uid: uid.into(),
            summary: None,
            location: None,
            description: None,
            start,
            end,
            recurrence: None,
        }
    }

    /// Builder method to set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to attach a recurrence rule.
    pub fn with_recurrence(mut self, recurrence: RecurrenceRule) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    /// Returns true if this event carries a recurrence rule.
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// Builds an occurrence of this event with the given times.
    ///
    /// The recurrence rule is not part of [`ExpandedEvent`], so it is left
    /// behind.
    pub fn occurrence(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> ExpandedEvent {
        ExpandedEvent {
            uid: self.uid.clone(),
            summary: self.summary.clone(),
            location: self.location.clone(),
            description: self.description.clone(),
            start,
            end,
        }
    }
}

/// A single concrete occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedEvent {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl From<ExpandedEvent> for CalendarEvent {
    fn from(event: ExpandedEvent) -> Self {
        Self {
            uid: event.uid,
            summary: event.summary,
            location: event.location,
            description: event.description,
            start: event.start,
            end: event.end,
            recurrence: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn builder_sets_optional_fields() {
        let event = CalendarEvent::new("evt-1", utc(2024, 1, 1, 9, 0), utc(2024, 1, 1, 10, 0))
            .with_summary("Practice")
            .with_location("Gym")
            .with_description("Bring shoes");

        assert_eq!(event.summary.as_deref(), Some("Practice"));
        assert_eq!(event.location.as_deref(), Some("Gym"));
        assert_eq!(event.description.as_deref(), Some("Bring shoes"));
        assert!(!event.is_recurring());
    }

    #[test]
    fn occurrence_copies_fields_and_drops_recurrence() {
        let event = CalendarEvent::new("evt-1", utc(2024, 1, 1, 9, 0), utc(2024, 1, 1, 10, 0))
            .with_summary("Practice")
            .with_recurrence(RecurrenceRule::new(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                [1],
            ));

        let occ = event.occurrence(utc(2024, 1, 8, 9, 0), utc(2024, 1, 8, 10, 0));
        assert_eq!(occ.uid, "evt-1");
        assert_eq!(occ.summary.as_deref(), Some("Practice"));
        assert_eq!(occ.start, utc(2024, 1, 8, 9, 0));

        let json = serde_json::to_value(&occ).unwrap();
        assert!(json.get("recurrence").is_none());
    }

    #[test]
    fn json_omits_absent_fields() {
        let event = CalendarEvent::new("evt-1", utc(2024, 1, 1, 9, 0), utc(2024, 1, 1, 10, 0));
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["uid"], "evt-1");
        assert_eq!(json["start"], "2024-01-01T09:00:00Z");
        assert!(json.get("summary").is_none());
        assert!(json.get("recurrence").is_none());
    }

    #[test]
    fn expanded_json_reads_back_as_calendar_event() {
        let occ = CalendarEvent::new("evt-1", utc(2024, 1, 1, 9, 0), utc(2024, 1, 1, 10, 0))
            .with_location("Gym")
            .occurrence(utc(2024, 1, 1, 9, 0), utc(2024, 1, 1, 10, 0));

        let json = serde_json::to_string(&occ).unwrap();
        let back: CalendarEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(back, CalendarEvent::from(occ));
        assert!(back.recurrence.is_none());
    }
}
