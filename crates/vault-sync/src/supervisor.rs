use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use vault_telemetry::MetricsRegistry;

use crate::watcher::{CollectionWatcher, RawEvent};

const CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Restarts the watcher if its thread has died while the process still thinks
/// it should be running. Swallows its own errors and keeps going; the only
/// way it exits is the shutdown token firing.
pub async fn run(
    watcher: Arc<CollectionWatcher>,
    metrics: Arc<MetricsRegistry>,
    rewire: mpsc::Sender<mpsc::Receiver<RawEvent>>,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(CHECK_INTERVAL);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("supervisor stopping");
                return;
            }
            _ = ticker.tick() => {
                if watcher.is_running() && !watcher.observer_alive() {
                    error!("watcher thread appears dead, restarting");
                    match watcher.restart() {
                        Ok(new_rx) => {
                            metrics.watcher_restarts_total.inc();
                            if rewire.send(new_rx).await.is_err() {
                                error!("dispatch loop gone, cannot rewire restarted watcher");
                            }
                        }
                        Err(err) => error!(error = %err, "failed to restart watcher"),
                    }
                }
            }
        }
    }
}
