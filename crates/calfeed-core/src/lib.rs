//! Core types: calendar events, recurrence specs, the occurrence expander

pub mod event;
pub mod expand;
pub mod recurrence;
pub mod tracing;

pub use event::{CalendarEvent, ExpandedEvent};
pub use expand::{
    ExpandError, Expansion, MalformedPolicy, expand, expand_event, occurrence_bounds, occurrences,
};
pub use recurrence::{RecurrenceError, RecurrenceRule, RecurrenceSpec, WeekdaySet};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
