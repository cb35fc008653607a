//! Watch mode support: a periodic refresh scheduler and signal handling.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use calfeed_server::{Scheduler, SchedulerConfig};
//!
//! # async fn example() -> calfeed_server::ServerResult<()> {
//! let scheduler = Scheduler::new(SchedulerConfig::new(Duration::from_secs(900)));
//! scheduler
//!     .run(|| async { Ok::<(), String>(()) })
//!     .await
//! # }
//! ```

mod error;
mod scheduler;
mod signals;

pub use error::{ServerError, ServerResult};
pub use scheduler::{Scheduler, SchedulerCommand, SchedulerConfig, SchedulerHandle, SchedulerState};
pub use signals::{ShutdownSignal, SignalHandler};
