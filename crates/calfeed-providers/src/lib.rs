//! Calendar sources for calfeed.
//!
//! - [`CalendarSource`] - The trait every event source implements
//! - [`feed`] - The iCalendar feed source
//! - [`ProviderError`] - Why a feed could not be fetched or parsed
//!
//! ```text
//! ┌─────────────────┐
//! │  .ics feed URL  │
//! └────────┬────────┘
//!          │ FeedClient (reqwest)
//!          ▼
//! ┌───────────────────┐
//! │ parse_ics_content │  RRULE -> RecurrenceRule
//! └────────┬──────────┘
//!          │ CalendarSource
//!          ▼
//!   Vec<CalendarEvent>
//! ```

pub mod error;
pub mod feed;
pub mod source;

pub use error::{ProviderError, ProviderResult};
pub use feed::{FeedConfig, IcsFeedSource, ParseOptions, ParsedFeed, parse_ics_content};
pub use source::{BoxFuture, CalendarSource, FetchResult};
#[cfg(any(test, feature = "test-util"))]
pub use source::{ErrorSource, StaticSource};
