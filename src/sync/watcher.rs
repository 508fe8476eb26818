//! Change watcher (the timer path).
//!
//! # Responsibilities
//! - Wake every poll interval (or early on a filesystem event)
//! - Compare whole-second mtimes of both inputs with the last observed pair
//! - Trigger a Reconcile on any difference
//!
//! # Design Decisions
//! - Two edits inside the same second may coalesce into one Reconcile
//! - Filesystem events only shorten the wait; the decision is always the
//!   mtime comparison, so both modes behave the same
//! - Parent directories are watched, not files, because atomic replace
//!   swaps the inode underneath a file watch

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, MissedTickBehavior};

use crate::config::WatchMode;
use crate::sync::engine::{Reconciler, Trigger};

/// Whole-second modification times of the two inputs; 0 means absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mtimes {
    pub discovery: u64,
    pub runtime: u64,
}

/// Remembers the last observed `Mtimes`.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last: Mtimes,
}

impl ChangeDetector {
    /// Record `current`, returning true if it differs from the previous observation.
    pub fn observe(&mut self, current: Mtimes) -> bool {
        if current == self.last {
            return false;
        }
        self.last = current;
        true
    }
}

/// Background loop that reconciles when either input file changes.
pub struct ChangeWatcher {
    engine: Arc<Reconciler>,
    interval: Duration,
    mode: WatchMode,
}

impl ChangeWatcher {
    pub fn new(engine: Arc<Reconciler>, interval: Duration, mode: WatchMode) -> Self {
        Self {
            engine,
            interval,
            mode,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            mode = ?self.mode,
            "Change watcher starting"
        );

        let (wake_tx, mut wake_rx) = mpsc::channel::<()>(1);
        let _fs_watcher = match self.mode {
            WatchMode::Events => self.watch_filesystem(wake_tx.clone()),
            WatchMode::Poll => None,
        };

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut detector = ChangeDetector::default();

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                Some(()) = wake_rx.recv() => {
                    tracing::trace!("Filesystem event, checking inputs early");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Change watcher received shutdown signal, exiting loop");
                    break;
                }
            }
            self.check(&mut detector).await;
        }
        drop(wake_tx);
    }

    async fn check(&self, detector: &mut ChangeDetector) {
        let current = self.mtimes();
        if !detector.observe(current) {
            return;
        }

        tracing::debug!(discovery = current.discovery, runtime = current.runtime, "Input change detected");
        match self
            .engine
            .run_blocking(|engine| engine.reconcile(Trigger::FileChanged))
            .await
        {
            Ok(report) => tracing::info!(
                merged = report.merged_count,
                reload_ok = report.reload.ok,
                reload = %report.reload.detail,
                "Autosync completed"
            ),
            Err(e) => tracing::error!(error = %e, "Autosync failed"),
        }
    }

    fn mtimes(&self) -> Mtimes {
        let [discovery, runtime] = self.engine.watched_paths();
        let store = self.engine.store();
        Mtimes {
            discovery: store.modified_secs(discovery),
            runtime: store.modified_secs(runtime),
        }
    }

    /// Start a `notify` watcher that nudges the loop. Failure falls back to polling.
    fn watch_filesystem(&self, wake: mpsc::Sender<()>) -> Option<RecommendedWatcher> {
        let targets = self.engine.watched_paths();
        let names: Vec<OsString> = targets
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_os_string()))
            .collect();

        let handler = move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let relevant = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().is_some_and(|n| names.iter().any(|t| t == n)));
                if relevant && !event.kind.is_access() {
                    // Full means a wake-up is already pending.
                    let _ = wake.try_send(());
                }
            }
            Err(e) => tracing::warn!(error = %e, "Filesystem watch error"),
        };

        let mut watcher = match RecommendedWatcher::new(handler, Config::default()) {
            Ok(w) => w,
            Err(e) => {
                tracing::warn!(error = %e, "Filesystem watcher unavailable, polling only");
                return None;
            }
        };

        let mut dirs: Vec<PathBuf> = targets
            .iter()
            .filter_map(|p| p.parent().map(|d| d.to_path_buf()))
            .collect();
        dirs.dedup();
        for dir in dirs {
            if let Err(e) = watcher.watch(&dir, RecursiveMode::NonRecursive) {
                tracing::warn!(dir = %dir.display(), error = %e, "Cannot watch directory, polling only for it");
            } else {
                tracing::info!(dir = %dir.display(), "Watching directory for changes");
            }
        }
        Some(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControlConfig;
    use crate::sync::notify::testing::RecordingSignal;
    use crate::sync::notify::SignalOutcome;
    use std::fs;
    use std::path::Path;

    #[test]
    fn test_detector_reports_each_change_once() {
        let mut d = ChangeDetector::default();
        assert!(!d.observe(Mtimes::default()));

        let first = Mtimes { discovery: 10, runtime: 0 };
        assert!(d.observe(first));
        assert!(!d.observe(first));

        assert!(d.observe(Mtimes { discovery: 10, runtime: 11 }));
        // File removed: back to zero is a change too.
        assert!(d.observe(Mtimes { discovery: 0, runtime: 11 }));
    }

    fn engine(dir: &Path) -> Arc<Reconciler> {
        let mut config = ControlConfig::default();
        config.paths.base_dir = dir.to_path_buf();
        Arc::new(Reconciler::new(&config, RecordingSignal::new(SignalOutcome::Sent)))
    }

    async fn wait_for(path: &Path) -> bool {
        for _ in 0..200 {
            if path.exists() {
                return true;
            }
            time::sleep(Duration::from_millis(25)).await;
        }
        false
    }

    async fn watcher_publishes_on_change(mode: WatchMode) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(
            dir.path().join("data/k8s_endpoints.json"),
            r#"{"updated_at": 1, "backends": [{"ip": "10.0.0.11", "port": 9000, "weight": 10}]}"#,
        )
        .unwrap();

        let engine = engine(dir.path());
        let (tx, _) = broadcast::channel(1);
        let watcher = ChangeWatcher::new(engine.clone(), Duration::from_millis(20), mode);
        let handle = tokio::spawn(watcher.run(tx.subscribe()));

        let published = dir.path().join("config/proxy_config.json");
        assert!(wait_for(&published).await, "watcher never published");
        assert_eq!(engine.last_report().unwrap().reason, Trigger::FileChanged);

        tx.send(()).unwrap();
        time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_poll_mode_reconciles_on_change() {
        watcher_publishes_on_change(WatchMode::Poll).await;
    }

    #[tokio::test]
    async fn test_events_mode_reconciles_on_change() {
        watcher_publishes_on_change(WatchMode::Events).await;
    }

    #[tokio::test]
    async fn test_no_inputs_no_reconcile() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        let (tx, _) = broadcast::channel(1);
        let watcher = ChangeWatcher::new(engine.clone(), Duration::from_millis(10), WatchMode::Poll);
        let handle = tokio::spawn(watcher.run(tx.subscribe()));

        time::sleep(Duration::from_millis(100)).await;
        tx.send(()).unwrap();
        handle.await.unwrap();

        assert_eq!(engine.completed(), 0);
    }
}
