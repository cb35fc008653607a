//! iCalendar feed source.
//!
//! Downloads a published `.ics` feed over HTTP(S) and converts its VEVENTs
//! into template [`CalendarEvent`](calfeed_core::CalendarEvent)s.
//!
//! # Example
//!
//! ```ignore
//! use calfeed_providers::feed::{FeedConfig, IcsFeedSource};
//!
//! let config = FeedConfig::new("webcal://calendar.example.com/team.ics")?
//!     .with_timezone_name("Asia/Tokyo")?;
//! let source = IcsFeedSource::new(config)?;
//! let result = source.fetch_events().await?;
//! ```

mod client;
mod config;
mod ics;
mod rrule;
mod source;

pub use client::FeedClient;
pub use config::FeedConfig;
pub use ics::{ParseOptions, ParsedFeed, parse_ics_content};
pub use rrule::{RuleContext, recurrence_from_rrule};
pub use source::IcsFeedSource;
