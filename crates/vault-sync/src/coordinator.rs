use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub debounce_window: Duration,
    pub processing_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            debounce_window: Duration::from_secs(2),
            processing_timeout: Duration::from_secs(300),
        }
    }
}

struct Maps {
    in_flight: HashMap<PathBuf, Instant>,
    last_event: HashMap<PathBuf, Instant>,
}

/// Gates filesystem events so at most one ingestion/deletion runs per path at
/// a time, and redundant events within the debounce window are dropped.
pub struct PathCoordinator {
    config: CoordinatorConfig,
    maps: Mutex<Maps>,
}

/// Releases a path's in-flight slot on drop, so every exit from a pipeline
/// (success, error via `?`, or an unwinding panic) releases it exactly once.
pub struct InFlightGuard {
    coordinator: Arc<PathCoordinator>,
    path: PathBuf,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.coordinator.maps.lock().in_flight.remove(&self.path);
    }
}

impl PathCoordinator {
    pub fn new(config: CoordinatorConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            maps: Mutex::new(Maps {
                in_flight: HashMap::new(),
                last_event: HashMap::new(),
            }),
        })
    }

    /// Gate a create/modify event. Returns a guard to hold for the duration of
    /// the pipeline if the event should be processed, or `None` if it should
    /// be dropped (already in flight, or inside the debounce window).
    pub fn gate_for_ingest(self: &Arc<Self>, path: &Path) -> Option<InFlightGuard> {
        let now = Instant::now();
        let mut maps = self.maps.lock();

        if let Some(&started) = maps.in_flight.get(path) {
            if now.duration_since(started) < self.config.processing_timeout {
                return None;
            }
            // Stale in-flight entry: evict and proceed.
            maps.in_flight.remove(path);
        }

        if let Some(&last) = maps.last_event.get(path) {
            if now.duration_since(last) < self.config.debounce_window {
                return None;
            }
        }

        maps.last_event.insert(path.to_path_buf(), now);
        maps.in_flight.insert(path.to_path_buf(), now);
        Some(InFlightGuard {
            coordinator: self.clone(),
            path: path.to_path_buf(),
        })
    }

    /// A delete event is suppressed if the path is mid-ingestion (creation
    /// wins) and otherwise subject to the same debounce window as ingests.
    pub fn gate_for_delete(self: &Arc<Self>, path: &Path) -> Option<InFlightGuard> {
        let now = Instant::now();
        let mut maps = self.maps.lock();

        if maps.in_flight.contains_key(path) {
            return None;
        }
        if let Some(&last) = maps.last_event.get(path) {
            if now.duration_since(last) < self.config.debounce_window {
                return None;
            }
        }
        maps.last_event.insert(path.to_path_buf(), now);
        maps.in_flight.insert(path.to_path_buf(), now);
        Some(InFlightGuard {
            coordinator: self.clone(),
            path: path.to_path_buf(),
        })
    }

    pub fn in_flight_count(&self) -> usize {
        self.maps.lock().in_flight.len()
    }

    /// True if any in-flight path lies under `collection_dir`, used by the
    /// sync barrier to decide whether a collection has settled.
    pub fn has_in_flight_under(&self, collection_dir: &Path) -> bool {
        self.maps
            .lock()
            .in_flight
            .keys()
            .any(|p| p.starts_with(collection_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_concurrent_event_for_same_path_is_dropped() {
        let coordinator = PathCoordinator::new(CoordinatorConfig {
            debounce_window: Duration::from_millis(0),
            processing_timeout: Duration::from_secs(60),
        });
        let path = PathBuf::from("/tmp/alpha/a.txt");
        let first = coordinator.gate_for_ingest(&path);
        assert!(first.is_some());
        let second = coordinator.gate_for_ingest(&path);
        assert!(second.is_none());
    }

    #[test]
    fn releasing_the_guard_allows_reentry() {
        let coordinator = PathCoordinator::new(CoordinatorConfig {
            debounce_window: Duration::from_millis(0),
            processing_timeout: Duration::from_secs(60),
        });
        let path = PathBuf::from("/tmp/alpha/a.txt");
        {
            let _guard = coordinator.gate_for_ingest(&path);
        }
        let second = coordinator.gate_for_ingest(&path);
        assert!(second.is_some());
    }

    #[test]
    fn debounce_drops_rapid_repeats_after_release() {
        let coordinator = PathCoordinator::new(CoordinatorConfig {
            debounce_window: Duration::from_secs(5),
            processing_timeout: Duration::from_secs(60),
        });
        let path = PathBuf::from("/tmp/alpha/a.txt");
        {
            let _guard = coordinator.gate_for_ingest(&path);
        }
        // Released, but within the debounce window: still dropped.
        assert!(coordinator.gate_for_ingest(&path).is_none());
    }

    #[test]
    fn delete_suppressed_while_ingest_in_flight() {
        let coordinator = PathCoordinator::new(CoordinatorConfig {
            debounce_window: Duration::from_millis(0),
            processing_timeout: Duration::from_secs(60),
        });
        let path = PathBuf::from("/tmp/alpha/a.txt");
        let _guard = coordinator.gate_for_ingest(&path);
        assert!(coordinator.gate_for_delete(&path).is_none());
    }
}
