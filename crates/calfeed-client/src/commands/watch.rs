//! `calfeed watch`: sync on an interval until interrupted.
//!
//! SIGINT/SIGTERM stop the loop after the current run. SIGHUP triggers an
//! immediate refresh.

use std::sync::Arc;

use tracing::{debug, info};

use calfeed_providers::{CalendarSource, IcsFeedSource};
use calfeed_server::{Scheduler, SchedulerConfig, SignalHandler};

use super::sync::{SyncOptions, sync_once};
use crate::cli::SyncArgs;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

pub async fn run(config: &ClientConfig, args: &SyncArgs, interval: Option<u64>) -> ClientResult<()> {
    let source = IcsFeedSource::new(config.feed.to_feed_config(args.url.as_deref())?)?;
    let options = SyncOptions::resolve(config, args);
    let signals = SignalHandler::new();
    signals.spawn_listener()?;

    info!(
        url = %source.config().url_str(),
        expanded = %options.expanded.display(),
        "Watching feed"
    );

    watch(
        Arc::new(source),
        options,
        config.watch.to_scheduler_config(interval),
        &signals,
    )
    .await
}

/// Runs syncs from `source` until `signals` requests shutdown or the
/// scheduler gives up.
pub async fn watch(
    source: Arc<dyn CalendarSource>,
    options: SyncOptions,
    scheduler_config: SchedulerConfig,
    signals: &SignalHandler,
) -> ClientResult<()> {
    let scheduler = Scheduler::new(scheduler_config);
    let handle = scheduler.handle();
    let options = Arc::new(options);

    let job = move || {
        let source = source.clone();
        let options = options.clone();
        async move { sync_once(source.as_ref(), &options).await.map(|_| ()) }
    };

    // Commands are sent from this task, so the scheduler must not run on it.
    let mut task = tokio::spawn(scheduler.run(job));
    let shutdown = signals.shutdown().wait();
    tokio::pin!(shutdown);
    let mut stopping = false;

    loop {
        tokio::select! {
            joined = &mut task => {
                let state = handle.state().await;
                info!(runs = state.runs, "Stopped watching");
                return match joined {
                    Ok(result) => result.map_err(Into::into),
                    Err(e) => Err(ClientError::Watch(format!("scheduler task failed: {}", e))),
                };
            }
            _ = &mut shutdown, if !stopping => {
                stopping = true;
                info!("Shutdown requested, stopping after the current run");
                if handle.stop().await.is_err() {
                    debug!("Scheduler already stopped");
                }
            }
            _ = signals.refresh_requested(), if !stopping => {
                match handle.try_run_now(true) {
                    Ok(true) => info!("Refresh requested"),
                    Ok(false) => debug!("Refresh already queued, dropping request"),
                    Err(_) => debug!("Scheduler already stopped"),
                }
            }
        }
    }
}
