//! Reload notifier.
//!
//! # Responsibilities
//! - Read the routing process's PID file
//! - Deliver the configured reload signal
//! - Report every failure as an outcome, never as an error
//!
//! # Design Decisions
//! - Signal delivery is a narrow capability (`ReloadSignal`) so tests and
//!   non-Unix targets can swap it out
//! - Non-positive PIDs are refused; `kill(0)` / `kill(-1)` would broadcast

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Result of one signal delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalOutcome {
    Sent,
    NotFound,
    Denied,
    Failed(String),
}

/// "Send the reload signal to process `pid`."
pub trait ReloadSignal: Send + Sync + fmt::Debug {
    /// Human-readable signal name for reports.
    fn name(&self) -> &str;

    fn send(&self, pid: i32) -> SignalOutcome;
}

/// Native Unix signal delivery.
#[cfg(unix)]
#[derive(Debug, Clone, Copy)]
pub struct UnixSignal {
    signal: nix::sys::signal::Signal,
}

#[cfg(unix)]
impl UnixSignal {
    /// Accepts `SIGHUP` or `HUP` style names.
    pub fn from_name(name: &str) -> Option<Self> {
        use std::str::FromStr;

        let name = name.trim().to_ascii_uppercase();
        let full = if name.starts_with("SIG") {
            name
        } else {
            format!("SIG{}", name)
        };
        nix::sys::signal::Signal::from_str(&full)
            .ok()
            .map(|signal| Self { signal })
    }
}

#[cfg(unix)]
impl ReloadSignal for UnixSignal {
    fn name(&self) -> &str {
        self.signal.as_str()
    }

    fn send(&self, pid: i32) -> SignalOutcome {
        use nix::errno::Errno;
        use nix::unistd::Pid;

        match nix::sys::signal::kill(Pid::from_raw(pid), self.signal) {
            Ok(()) => SignalOutcome::Sent,
            Err(Errno::ESRCH) => SignalOutcome::NotFound,
            Err(Errno::EPERM) => SignalOutcome::Denied,
            Err(e) => SignalOutcome::Failed(e.to_string()),
        }
    }
}

/// Placeholder for targets without POSIX signals.
#[cfg(not(unix))]
#[derive(Debug, Clone)]
pub struct UnsupportedSignal(String);

#[cfg(not(unix))]
impl ReloadSignal for UnsupportedSignal {
    fn name(&self) -> &str {
        &self.0
    }

    fn send(&self, _pid: i32) -> SignalOutcome {
        SignalOutcome::Failed("reload signals are not supported on this platform".to_string())
    }
}

/// Resolve a configured signal name to the platform capability.
pub fn signal_from_name(name: &str) -> Option<Arc<dyn ReloadSignal>> {
    #[cfg(unix)]
    {
        UnixSignal::from_name(name).map(|s| Arc::new(s) as Arc<dyn ReloadSignal>)
    }
    #[cfg(not(unix))]
    {
        Some(Arc::new(UnsupportedSignal(name.to_string())))
    }
}

/// Notification result attached to every reconcile report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyOutcome {
    pub ok: bool,
    pub detail: String,
}

impl NotifyOutcome {
    fn failed(detail: String) -> Self {
        Self { ok: false, detail }
    }
}

/// Best-effort "re-read your config" notification.
#[derive(Debug, Clone)]
pub struct ReloadNotifier {
    pid_path: PathBuf,
    signal: Arc<dyn ReloadSignal>,
}

impl ReloadNotifier {
    pub fn new(pid_path: PathBuf, signal: Arc<dyn ReloadSignal>) -> Self {
        Self { pid_path, signal }
    }

    pub fn notify(&self) -> NotifyOutcome {
        let outcome = self.try_notify();
        let label = if outcome.ok { "sent" } else { "failed" };
        metrics::counter!("control_reload_notify_total", "outcome" => label).increment(1);
        if outcome.ok {
            tracing::info!(detail = %outcome.detail, "Reload signal delivered");
        } else {
            tracing::warn!(detail = %outcome.detail, "Reload notification failed");
        }
        outcome
    }

    fn try_notify(&self) -> NotifyOutcome {
        let path = self.pid_path.display();
        let raw = match fs::read_to_string(&self.pid_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return NotifyOutcome::failed(format!("pid file not found: {}", path));
            }
            Err(e) => {
                return NotifyOutcome::failed(format!("failed to read pid file {}: {}", path, e));
            }
        };

        let pid = match raw.trim().parse::<i32>() {
            Ok(pid) if pid > 0 => pid,
            _ => {
                return NotifyOutcome::failed(format!("invalid pid {:?} in {}", raw.trim(), path));
            }
        };

        let signal = self.signal.name();
        match self.signal.send(pid) {
            SignalOutcome::Sent => NotifyOutcome {
                ok: true,
                detail: format!("sent {} to pid={}", signal, pid),
            },
            SignalOutcome::NotFound => {
                NotifyOutcome::failed(format!("process not found: pid={} from {}", pid, path))
            }
            SignalOutcome::Denied => NotifyOutcome::failed(format!(
                "permission denied sending {} to pid={}",
                signal, pid
            )),
            SignalOutcome::Failed(e) => NotifyOutcome::failed(format!("reload error: {}", e)),
        }
    }
}
