use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use notify::{Config as NotifyConfig, Event, EventKind, PollWatcher, RecursiveMode, Watcher as _};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{error, warn};

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub poll_interval: Duration,
    pub channel_capacity: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            channel_capacity: 4096,
        }
    }
}

/// A raw filesystem event, coalesced to created/modified/removed on a single path.
/// A move is represented as a remove of the source followed by a create of the
/// destination, matching the original handler's treatment of move events.
#[derive(Debug, Clone)]
pub enum RawEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
}

/// Polling observer over the collections root. Runs `notify::PollWatcher` on
/// its own thread (kernel event channels like inotify are commonly unavailable
/// on the network/container-shared volumes this serves) and hands events off
/// to the async side through a bounded channel.
pub struct CollectionWatcher {
    root: PathBuf,
    config: WatcherConfig,
    inner: Mutex<Option<PollWatcher>>,
    last_event_millis: AtomicU64,
    running: AtomicBool,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

impl CollectionWatcher {
    pub fn new(root: PathBuf, config: WatcherConfig) -> Arc<Self> {
        Arc::new(Self {
            root,
            config,
            inner: Mutex::new(None),
            last_event_millis: AtomicU64::new(now_millis()),
            running: AtomicBool::new(false),
        })
    }

    /// Starts polling, returning the receiving half of the event channel. The
    /// backlog of this channel (its length) is exported as a gauge by the caller.
    pub fn start(self: &Arc<Self>) -> Result<mpsc::Receiver<RawEvent>, notify::Error> {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let watcher_self = self.clone();

        let mut watcher = PollWatcher::new(
            move |result: notify::Result<Event>| {
                watcher_self.last_event_millis.store(now_millis(), Ordering::Relaxed);
                match result {
                    Ok(event) => dispatch(&tx, event),
                    Err(err) => warn!(error = %err, "watcher poll error"),
                }
            },
            NotifyConfig::default().with_poll_interval(self.config.poll_interval),
        )?;
        watcher.watch(&self.root, RecursiveMode::Recursive)?;

        *self.inner.lock() = Some(watcher);
        self.running.store(true, Ordering::SeqCst);
        Ok(rx)
    }

    pub fn stop(&self) {
        *self.inner.lock() = None;
        self.running.store(false, Ordering::SeqCst);
    }

    /// Restart by tearing down and recreating the underlying watcher, reusing
    /// the same channel sender is not possible across a stop/start cycle, so
    /// the supervisor must re-wire the returned receiver into the dispatch loop.
    pub fn restart(self: &Arc<Self>) -> Result<mpsc::Receiver<RawEvent>, notify::Error> {
        self.stop();
        self.start()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Approximates the original's thread-liveness check: `notify` doesn't
    /// expose its internal polling thread, so "alive" means a watcher handle
    /// is currently installed. Staleness (no events for a long time) is a
    /// separate, softer health signal owned by the auditor, not this probe.
    pub fn observer_alive(&self) -> bool {
        self.inner.lock().is_some()
    }

    pub fn last_event_age(&self) -> Duration {
        let last = self.last_event_millis.load(Ordering::Relaxed);
        let now = now_millis();
        Duration::from_millis(now.saturating_sub(last))
    }
}

fn dispatch(tx: &mpsc::Sender<RawEvent>, event: Event) {
    let raw = match event.kind {
        EventKind::Create(_) => event.paths.into_iter().map(RawEvent::Created).collect::<Vec<_>>(),
        EventKind::Modify(_) => event.paths.into_iter().map(RawEvent::Modified).collect(),
        EventKind::Remove(_) => event.paths.into_iter().map(RawEvent::Removed).collect(),
        _ => Vec::new(),
    };
    for item in raw {
        if let Err(err) = tx.try_send(item) {
            match err {
                mpsc::error::TrySendError::Full(_) => {
                    error!("watcher event channel full, dropping event");
                }
                mpsc::error::TrySendError::Closed(_) => {
                    // Consumer shut down; nothing to do from this thread.
                }
            }
        }
    }
}
