//! CLI for fetching a calendar feed and expanding its recurring events.
//!
//! This crate provides the `calfeed` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod store;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
