//! Command implementations.

pub mod config;
pub mod expand;
pub mod fetch;
pub mod sync;
pub mod watch;
