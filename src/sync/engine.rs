//! Reconcile engine.
//!
//! # Responsibilities
//! - Own the single Reconcile critical section
//! - Apply registry mutations and re-reconcile without releasing the lock
//! - Keep the most recent report for status queries
//!
//! # Design Decisions
//! - Everything here is synchronous; async callers go through `run_blocking`
//! - Registry writes happen under the same lock as the TTL sweep, so a sweep
//!   can never overwrite a registration that landed mid-cycle

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use arc_swap::ArcSwapOption;
use serde::Serialize;

use crate::backend::{Backend, Provenance, RawDocument, Snapshot};
use crate::config::loader::ConfigError;
use crate::config::validation::ValidationError;
use crate::config::ControlConfig;
use crate::error::SyncError;
use crate::store::DocumentStore;
use crate::sync::merge::merge;
use crate::sync::notify::{signal_from_name, NotifyOutcome, ReloadNotifier, ReloadSignal};
use crate::sync::publish::Publisher;
use crate::sync::registry::{apply_registration, apply_weight, Registration, Upsert, WeightUpdate};
use crate::sync::ttl::TtlSweeper;
use crate::sync::unix_now;

/// What caused a Reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trigger {
    #[serde(rename = "startup")]
    Startup,
    #[serde(rename = "autosync:file_changed")]
    FileChanged,
    #[serde(rename = "register")]
    Register,
    #[serde(rename = "set_weight")]
    SetWeight,
    #[serde(rename = "manual")]
    Manual,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Startup => "startup",
            Trigger::FileChanged => "autosync:file_changed",
            Trigger::Register => "register",
            Trigger::SetWeight => "set_weight",
            Trigger::Manual => "manual",
        }
    }
}

/// Outcome of one Reconcile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub ok: bool,
    pub reason: Trigger,
    /// Position of this run in the total order of Reconciles.
    pub sequence: u64,
    pub published_path: PathBuf,
    pub published_at: u64,
    pub merged_count: usize,
    /// Runtime backends disabled by this run's TTL sweep.
    pub expired: Vec<String>,
    pub discovery_updated_at: u64,
    pub runtime_updated_at: u64,
    pub reload: NotifyOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendRef {
    pub ip: String,
    pub port: u16,
}

/// Result of a registration or weight update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationReport {
    pub ok: bool,
    pub action: Upsert,
    pub backend: BackendRef,
    pub weight: u32,
    pub sync: ReconcileReport,
}

/// A merged backend together with the source it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendView {
    #[serde(flatten)]
    pub backend: Backend,
    pub source: Provenance,
}

/// The merged view, as the next Reconcile would publish it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendsView {
    pub updated_at: u64,
    pub discovery_updated_at: u64,
    pub runtime_updated_at: u64,
    pub backends: Vec<BackendView>,
}

/// State owned by the critical section.
#[derive(Debug, Default)]
struct Ledger {
    completed: u64,
}

/// The reconciliation engine.
#[derive(Debug)]
pub struct Reconciler {
    store: DocumentStore,
    discovery_path: PathBuf,
    runtime_path: PathBuf,
    sweeper: TtlSweeper,
    publisher: Publisher,
    notifier: ReloadNotifier,
    default_register_weight: u32,
    gate: Mutex<Ledger>,
    last_report: ArcSwapOption<ReconcileReport>,
}

impl Reconciler {
    /// Build from configuration, resolving the configured reload signal.
    pub fn from_config(config: &ControlConfig) -> Result<Self, ConfigError> {
        let signal = signal_from_name(&config.sync.reload_signal).ok_or_else(|| {
            ConfigError::Validation(vec![ValidationError::new(
                "sync.reload_signal",
                format!("unknown signal {:?}", config.sync.reload_signal),
            )])
        })?;
        Ok(Self::new(config, signal))
    }

    /// Build with an explicit reload capability.
    pub fn new(config: &ControlConfig, signal: Arc<dyn ReloadSignal>) -> Self {
        let paths = &config.paths;
        let store = DocumentStore::new(paths.base_dir.clone());

        Self {
            sweeper: TtlSweeper::new(store.clone(), paths.runtime.clone(), config.sync.runtime_ttl_secs),
            publisher: Publisher::new(store.clone(), paths.published.clone(), config.publish.clone()),
            notifier: ReloadNotifier::new(store.resolve(&paths.pid_file), signal),
            discovery_path: paths.discovery.clone(),
            runtime_path: paths.runtime.clone(),
            default_register_weight: config.sync.default_register_weight,
            gate: Mutex::new(Ledger::default()),
            last_report: ArcSwapOption::empty(),
            store,
        }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Resolved locations of the two inputs the watcher observes.
    pub fn watched_paths(&self) -> [PathBuf; 2] {
        [
            self.store.resolve(&self.discovery_path),
            self.store.resolve(&self.runtime_path),
        ]
    }

    pub fn ttl_secs(&self) -> i64 {
        self.sweeper.ttl_secs()
    }

    pub fn last_report(&self) -> Option<Arc<ReconcileReport>> {
        self.last_report.load_full()
    }

    /// Number of Reconciles that have run to completion.
    pub fn completed(&self) -> u64 {
        self.lock().completed
    }

    /// Load → sweep → merge → publish → notify, exclusively.
    pub fn reconcile(&self, trigger: Trigger) -> Result<ReconcileReport, SyncError> {
        let mut ledger = self.lock();
        self.reconcile_locked(&mut ledger, trigger, unix_now())
    }

    /// Upsert a registration (heartbeat) and reconcile.
    pub fn register(&self, registration: &Registration) -> Result<MutationReport, SyncError> {
        let mut ledger = self.lock();
        let now = unix_now();

        let mut runtime = self.load_runtime();
        let action = apply_registration(&mut runtime, registration, self.default_register_weight, now);
        self.store.store(&self.runtime_path, &runtime)?;

        let weight = registration.weight.unwrap_or(self.default_register_weight);
        metrics::counter!("control_registrations_total", "op" => "register").increment(1);
        tracing::info!(backend = %registration.key, weight, action = ?action, "Backend registered");

        let sync = self.reconcile_locked(&mut ledger, Trigger::Register, now)?;
        Ok(MutationReport {
            ok: true,
            action,
            backend: BackendRef {
                ip: registration.key.host.clone(),
                port: registration.key.port,
            },
            weight,
            sync,
        })
    }

    /// Upsert a weight override and reconcile.
    pub fn set_weight(&self, update: &WeightUpdate) -> Result<MutationReport, SyncError> {
        let mut ledger = self.lock();
        let now = unix_now();

        let mut runtime = self.load_runtime();
        let action = apply_weight(&mut runtime, update, now);
        self.store.store(&self.runtime_path, &runtime)?;

        metrics::counter!("control_registrations_total", "op" => "set_weight").increment(1);
        tracing::info!(backend = %update.key, weight = update.weight, action = ?action, "Backend weight set");

        let sync = self.reconcile_locked(&mut ledger, Trigger::SetWeight, now)?;
        Ok(MutationReport {
            ok: true,
            action,
            backend: BackendRef {
                ip: update.key.host.clone(),
                port: update.key.port,
            },
            weight: update.weight,
            sync,
        })
    }

    /// Current merged view with TTL applied, without publishing.
    pub fn backends(&self) -> Result<BackendsView, SyncError> {
        let _ledger = self.lock();
        let now = unix_now();

        let discovery = self.load_discovery();
        let (runtime, _) = self.sweeper.run(self.load_runtime(), now)?;
        let backends = merge(&discovery.backends, &runtime.backends)
            .into_iter()
            .map(|backend| BackendView {
                source: backend.provenance,
                backend,
            })
            .collect();

        Ok(BackendsView {
            updated_at: now,
            discovery_updated_at: discovery.updated_at,
            runtime_updated_at: runtime.updated_at,
            backends,
        })
    }

    /// Run a blocking engine operation off the async executor.
    pub async fn run_blocking<T, F>(self: &Arc<Self>, op: F) -> Result<T, SyncError>
    where
        T: Send + 'static,
        F: FnOnce(&Reconciler) -> Result<T, SyncError> + Send + 'static,
    {
        let engine = Arc::clone(self);
        tokio::task::spawn_blocking(move || op(&engine))
            .await
            .map_err(|e| SyncError::Task(e.to_string()))?
    }

    fn reconcile_locked(&self, ledger: &mut Ledger, trigger: Trigger, now: u64) -> Result<ReconcileReport, SyncError> {
        let started = Instant::now();

        let discovery = self.load_discovery();
        let (runtime, expired) = self.sweeper.run(self.load_runtime(), now)?;
        let merged = merge(&discovery.backends, &runtime.backends);
        let published = self.publisher.publish(&merged, now)?;
        let reload = self.notifier.notify();

        ledger.completed += 1;
        let report = ReconcileReport {
            ok: true,
            reason: trigger,
            sequence: ledger.completed,
            published_path: self.publisher.path(),
            published_at: published.updated_at,
            merged_count: published.backends.len(),
            expired: expired.iter().map(ToString::to_string).collect(),
            discovery_updated_at: discovery.updated_at,
            runtime_updated_at: runtime.updated_at,
            reload,
        };

        metrics::counter!("control_reconcile_total", "reason" => trigger.as_str()).increment(1);
        metrics::histogram!("control_reconcile_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(
            reason = trigger.as_str(),
            sequence = report.sequence,
            merged = report.merged_count,
            expired = report.expired.len(),
            reload_ok = report.reload.ok,
            "Reconciled"
        );

        self.last_report.store(Some(Arc::new(report.clone())));
        Ok(report)
    }

    fn load_discovery(&self) -> Snapshot {
        self.load(&self.discovery_path, Provenance::Discovery)
    }

    fn load_runtime(&self) -> Snapshot {
        self.load(&self.runtime_path, Provenance::Runtime)
    }

    fn load(&self, path: &Path, provenance: Provenance) -> Snapshot {
        self.store
            .load(path, RawDocument::default())
            .normalize(provenance)
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
