//! Periodic refresh scheduler for watch mode.
//!
//! Runs a refresh job on an interval with:
//! - Jitter so several watchers do not hit the feed at the same instant
//! - Cooldown after a manual refresh
//! - Queued refresh requests collapsed into one run
//! - Exponential backoff on errors
//! - A limit on consecutive failures

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{RwLock, mpsc};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::{ServerError, ServerResult};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Base interval between runs.
    pub interval: Duration,
    /// Maximum jitter added to the interval, as a fraction (0.0-1.0).
    pub jitter_fraction: f64,
    /// Minimum time between two non-forced manual refreshes.
    pub refresh_cooldown: Duration,
    /// Backoff after the first failure.
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
    /// Consecutive failures after which the scheduler gives up.
    pub max_consecutive_failures: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(900),
            jitter_fraction: 0.1,
            refresh_cooldown: Duration::from_secs(30),
            initial_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(300),
            backoff_multiplier: 2.0,
            max_consecutive_failures: 10,
        }
    }
}

impl SchedulerConfig {
    /// Creates a config with the given interval and default backoff.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    pub fn with_jitter(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    pub fn with_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.refresh_cooldown = cooldown;
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration, multiplier: f64) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self.backoff_multiplier = multiplier;
        self
    }

    /// A limit of zero is raised to one.
    pub fn with_max_failures(mut self, max: u32) -> Self {
        self.max_consecutive_failures = max.max(1);
        self
    }

    /// Calculates the next run delay with jitter.
    pub fn next_delay(&self) -> Duration {
        let base = self.interval.as_secs_f64();
        let jitter = rand_jitter(base * self.jitter_fraction);
        Duration::from_secs_f64((base + jitter).max(0.0))
    }

    /// Calculates the backoff delay for the given number of failures.
    pub fn backoff_delay(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(consecutive_failures - 1).unwrap_or(i32::MAX);
        let delay = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(delay.min(self.max_backoff.as_secs_f64()))
    }
}

/// Returns a value in [-range, range] derived from the clock's nanoseconds.
fn rand_jitter(range: f64) -> f64 {
    use std::time::SystemTime;

    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();

    let fraction = f64::from(nanos) / 1_000_000_000.0;
    (fraction * 2.0 - 1.0) * range
}

/// Commands that can be sent to a running scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// Run the job now. Unless forced, ignored during the refresh cooldown.
    RunNow { force: bool },
    Stop,
}

/// Capacity of the command channel.
const COMMAND_QUEUE: usize = 16;

/// Scheduler state.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    pub consecutive_failures: u32,
    /// Number of successful runs.
    pub runs: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Last manual refresh, for the cooldown.
    pub last_refresh: Option<Instant>,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.runs += 1;
        self.last_success = Some(Utc::now());
        self.last_attempt = self.last_success;
        self.last_error = None;
    }

    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.consecutive_failures += 1;
        self.last_attempt = Some(Utc::now());
        self.last_error = Some(error.into());
    }

    pub fn record_refresh(&mut self) {
        self.last_refresh = Some(Instant::now());
    }

    /// Returns true while within `cooldown` of the last manual refresh.
    pub fn in_cooldown(&self, cooldown: Duration) -> bool {
        self.last_refresh
            .is_some_and(|last_refresh| last_refresh.elapsed() < cooldown)
    }
}

/// Scheduler state shared with handles.
type SharedSchedulerState = Arc<RwLock<SchedulerState>>;

fn new_scheduler_state() -> SharedSchedulerState {
    Arc::new(RwLock::new(SchedulerState::new()))
}

/// Runs a refresh job periodically until stopped.
pub struct Scheduler {
    config: SchedulerConfig,
    state: SharedSchedulerState,
    command_tx: mpsc::Sender<SchedulerCommand>,
    command_rx: Option<mpsc::Receiver<SchedulerCommand>>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        Self {
            config,
            state: new_scheduler_state(),
            command_tx,
            command_rx: Some(command_rx),
        }
    }

    /// Returns a handle for sending commands to the scheduler.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            command_tx: self.command_tx.clone(),
            state: self.state.clone(),
        }
    }

    /// Runs the job once immediately, then on every tick until stopped.
    ///
    /// Commands are only read between runs. Refresh requests that queued up
    /// meanwhile are collapsed into a single run, and a queued `Stop` wins
    /// over them.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::TooManyFailures`] once the job has failed
    /// `max_consecutive_failures` times in a row.
    pub async fn run<F, Fut, E>(mut self, job: F) -> ServerResult<()>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<(), E>> + Send,
        E: Display,
    {
        let mut command_rx = self.command_rx.take().ok_or(ServerError::AlreadyRunning)?;

        info!(
            interval_secs = self.config.interval.as_secs(),
            "Scheduler started"
        );

        self.run_job(&job).await;
        self.check_failures().await?;

        loop {
            let delay = self.next_delay().await;
            debug!(delay_secs = delay.as_secs(), "Scheduling next run");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    self.run_job(&job).await;
                }
                cmd = command_rx.recv() => match cmd {
                    Some(SchedulerCommand::RunNow { force }) => {
                        let Some(force) = collapse_refreshes(&mut command_rx, force) else {
                            info!("Scheduler stopping");
                            return Ok(());
                        };
                        debug!(force, "Received RunNow command");
                        let in_cooldown = self
                            .state
                            .read()
                            .await
                            .in_cooldown(self.config.refresh_cooldown);

                        if force || !in_cooldown {
                            self.state.write().await.record_refresh();
                            self.run_job(&job).await;
                        } else {
                            debug!("Skipping refresh due to cooldown");
                        }
                    }
                    Some(SchedulerCommand::Stop) | None => {
                        info!("Scheduler stopping");
                        return Ok(());
                    }
                },
            }

            self.check_failures().await?;
        }
    }

    async fn next_delay(&self) -> Duration {
        let state = self.state.read().await;

        if state.consecutive_failures > 0 {
            let backoff = self.config.backoff_delay(state.consecutive_failures);
            debug!(
                failures = state.consecutive_failures,
                backoff_secs = backoff.as_secs(),
                "Using backoff delay"
            );
            return backoff;
        }

        if let Some(last_refresh) = state.last_refresh
            && state.in_cooldown(self.config.refresh_cooldown)
        {
            let remaining = self
                .config
                .refresh_cooldown
                .saturating_sub(last_refresh.elapsed());
            return remaining.max(self.config.next_delay());
        }

        self.config.next_delay()
    }

    async fn run_job<F, Fut, E>(&self, job: &F)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        debug!("Starting run");
        match job().await.map_err(|e| e.to_string()) {
            Ok(()) => {
                info!("Refresh completed");
                self.state.write().await.record_success();
            }
            Err(message) => {
                warn!(error = %message, "Refresh failed");
                self.state.write().await.record_failure(message);
            }
        }
    }

    async fn check_failures(&self) -> ServerResult<()> {
        let state = self.state.read().await;
        if state.consecutive_failures >= self.config.max_consecutive_failures {
            error!(
                failures = state.consecutive_failures,
                max = self.config.max_consecutive_failures,
                "Max consecutive failures reached"
            );
            return Err(ServerError::too_many_failures(
                state.consecutive_failures,
                state.last_error.clone().unwrap_or_default(),
            ));
        }
        Ok(())
    }
}

/// Drains queued commands after a `RunNow`.
///
/// Returns whether any of the queued refreshes was forced, or `None` if a
/// `Stop` was queued or every sender is gone.
fn collapse_refreshes(
    command_rx: &mut mpsc::Receiver<SchedulerCommand>,
    mut force: bool,
) -> Option<bool> {
    let mut collapsed = 0u32;
    loop {
        match command_rx.try_recv() {
            Ok(SchedulerCommand::RunNow { force: f }) => {
                force |= f;
                collapsed += 1;
            }
            Ok(SchedulerCommand::Stop) => return None,
            Err(mpsc::error::TryRecvError::Empty) => break,
            Err(mpsc::error::TryRecvError::Disconnected) => return None,
        }
    }
    if collapsed > 0 {
        debug!(collapsed, "Collapsed queued refresh requests");
    }
    Some(force)
}

/// Handle for sending commands to a running scheduler.
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    state: SharedSchedulerState,
}

type SendResult = Result<(), mpsc::error::SendError<SchedulerCommand>>;

impl SchedulerHandle {
    /// Requests an immediate run without waiting.
    ///
    /// A full queue already holds a refresh that will cover this one, so
    /// the request is dropped and `Ok(false)` returned.
    pub fn try_run_now(&self, force: bool) -> Result<bool, TrySendError<SchedulerCommand>> {
        match self.command_tx.try_send(SchedulerCommand::RunNow { force }) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Asks the scheduler to stop once the current run is done.
    pub async fn stop(&self) -> SendResult {
        self.command_tx.send(SchedulerCommand::Stop).await
    }

    /// Returns a snapshot of the scheduler state.
    pub async fn state(&self) -> SchedulerState {
        self.state.read().await.clone()
    }
}
