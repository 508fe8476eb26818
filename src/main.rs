//! Proxy control plane daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   discovery actor            backends (register / heartbeat)      operator
//!        │                               │                              │
//!        ▼                               ▼                              ▼
//!  k8s_endpoints.json            ┌───────────────┐              POST /api/sync
//!        │                       │   api (axum)  │──────────────────────┘
//!        │                       └───────┬───────┘
//!        │   mtime poll / fs events      │ direct path
//!        ▼                               ▼
//!  ┌──────────────┐             ┌──────────────────────────────────────────┐
//!  │ sync/watcher │────────────▶│ sync/engine: Reconcile (one at a time)   │
//!  └──────────────┘             │  load → ttl → merge → publish → notify   │
//!                               └───────────┬───────────────────┬──────────┘
//!                                           ▼                   ▼
//!                                 proxy_config.json      SIGHUP → proxy pid
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use proxy_control::config::{load_config, ControlConfig};
use proxy_control::lifecycle::signals::wait_for_termination;
use proxy_control::observability::{logging, metrics};
use proxy_control::{Daemon, Trigger};

#[derive(Parser)]
#[command(name = "proxy-control")]
#[command(about = "Keeps the proxy's backend configuration in sync with discovery and runtime registrations", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `paths.base_dir`.
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Run a single reconcile, print the report and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ControlConfig::default(),
    };
    if let Some(base_dir) = args.base_dir {
        config.paths.base_dir = base_dir;
    }

    logging::init(&config.observability);
    tracing::info!("proxy-control v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        base_dir = %config.paths.base_dir.display(),
        poll_interval_secs = config.sync.poll_interval_secs,
        runtime_ttl_secs = config.sync.runtime_ttl_secs,
        watch_mode = ?config.sync.watch_mode,
        "Configuration loaded"
    );

    let daemon = Daemon::new(config.clone())?;

    if args.once {
        let report = daemon
            .engine()
            .run_blocking(|engine| engine.reconcile(Trigger::Manual))
            .await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let listener = TcpListener::bind(&config.api.bind_address).await?;

    let shutdown = daemon.shutdown();
    tokio::spawn(async move {
        wait_for_termination().await;
        shutdown.trigger();
    });

    daemon.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
