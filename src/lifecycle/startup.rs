//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the engine from validated configuration
//! - Publish once before anything else runs
//! - Start the change watcher and the API, then wait for shutdown
//!
//! # Design Decisions
//! - Fail fast: a startup error is fatal
//! - The API starts last (writes only once the first publish is on disk)

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::api;
use crate::config::ControlConfig;
use crate::error::StartupError;
use crate::lifecycle::Shutdown;
use crate::sync::watcher::ChangeWatcher;
use crate::sync::{Reconciler, Trigger};

/// The assembled control-plane process.
pub struct Daemon {
    config: ControlConfig,
    engine: Arc<Reconciler>,
    shutdown: Shutdown,
}

impl Daemon {
    pub fn new(config: ControlConfig) -> Result<Self, StartupError> {
        let engine = Arc::new(Reconciler::from_config(&config)?);
        Ok(Self {
            config,
            engine,
            shutdown: Shutdown::new(),
        })
    }

    pub fn engine(&self) -> Arc<Reconciler> {
        self.engine.clone()
    }

    /// Handle used to stop `run`.
    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Reconcile once, then serve until shutdown is triggered.
    pub async fn run(self, listener: TcpListener) -> Result<(), StartupError> {
        let report = self
            .engine
            .run_blocking(|engine| engine.reconcile(Trigger::Startup))
            .await?;
        tracing::info!(
            merged = report.merged_count,
            path = %report.published_path.display(),
            reload = %report.reload.detail,
            "Initial configuration published"
        );

        let watcher = ChangeWatcher::new(
            self.engine.clone(),
            Duration::from_secs(self.config.sync.poll_interval_secs),
            self.config.sync.watch_mode,
        );
        let watcher_task = tokio::spawn(watcher.run(self.shutdown.subscribe()));

        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "API server starting");

        let app = api::router(self.engine.clone(), &self.config.api);
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(self.shutdown.wait())
            .await;

        // Stop the watcher even if the server exited on its own.
        self.shutdown.trigger();
        if let Err(e) = watcher_task.await {
            tracing::error!(error = %e, "Change watcher task failed");
        }

        served?;
        tracing::info!("API server stopped");
        Ok(())
    }
}
