//! CalendarSource trait definition.
//!
//! A [`CalendarSource`] produces the template events that the expander
//! turns into occurrences. The only network-backed implementation is the
//! iCalendar feed source in [`crate::feed`]; `StaticSource` and
//! `ErrorSource` are available with the `test-util` feature.

use std::future::Future;
use std::pin::Pin;

use calfeed_core::CalendarEvent;

use crate::error::ProviderResult;
#[cfg(any(test, feature = "test-util"))]
use crate::error::ProviderError;

/// Result of fetching events from a source.
#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    /// Template events in source order.
    pub events: Vec<CalendarEvent>,
    /// Number of source entries that could not be turned into events.
    pub skipped: usize,
}

impl FetchResult {
    pub fn with_events(events: Vec<CalendarEvent>) -> Self {
        Self { events, skipped: 0 }
    }

    pub fn with_skipped(mut self, skipped: usize) -> Self {
        self.skipped = skipped;
        self
    }

    /// Number of events carrying a recurrence.
    pub fn recurring_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_recurring()).count()
    }
}

/// A boxed future type for async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A source of calendar events.
pub trait CalendarSource: Send + Sync {
    /// Returns the source name, used in error messages and logs.
    fn name(&self) -> &str;

    /// Fetches the current set of template events.
    fn fetch_events(&self) -> BoxFuture<'_, ProviderResult<FetchResult>>;
}

/// A source that always returns the same events.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    events: Vec<CalendarEvent>,
}

#[cfg(any(test, feature = "test-util"))]
impl StaticSource {
    pub fn new(name: impl Into<String>, events: Vec<CalendarEvent>) -> Self {
        Self {
            name: name.into(),
            events,
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
impl CalendarSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_events(&self) -> BoxFuture<'_, ProviderResult<FetchResult>> {
        let events = self.events.clone();
        Box::pin(async move { Ok(FetchResult::with_events(events)) })
    }
}

/// A source whose every fetch fails with an error built by `make_error`.
#[cfg(any(test, feature = "test-util"))]
pub struct ErrorSource {
    name: String,
    make_error: Box<dyn Fn() -> ProviderError + Send + Sync>,
}

#[cfg(any(test, feature = "test-util"))]
impl ErrorSource {
    pub fn new<F>(name: impl Into<String>, make_error: F) -> Self
    where
        F: Fn() -> ProviderError + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            make_error: Box::new(make_error),
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
impl CalendarSource for ErrorSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_events(&self) -> BoxFuture<'_, ProviderResult<FetchResult>> {
        let error = (self.make_error)();
        Box::pin(async move { Err(error) })
    }
}
