//! `proxy-control --once` as a subprocess.

use std::fs;
use std::process::Command;

use serde_json::{json, Value};

mod common;
use common::{Fixture, DISCOVERY, PUBLISHED};

#[test]
fn test_once_prints_only_the_report_on_stdout() {
    let fx = Fixture::new();
    fx.write(DISCOVERY, &json!({"backends": [{"ip": "10.0.0.11", "port": 9000}]}));
    let config = fx.path("control.toml");
    fs::write(&config, "[paths]\npid_file = \"run/proxy.pid\"\n\n[observability]\nlog_level = \"debug\"\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_proxy-control"))
        .arg("--config")
        .arg(&config)
        .arg("--base-dir")
        .arg(fx.dir.path())
        .arg("--once")
        .env_remove("RUST_LOG")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["reason"], "manual");
    assert_eq!(report["merged_count"], 1);
    assert_eq!(report["reload"]["ok"], false);
    assert!(!output.stderr.is_empty());
    assert_eq!(fx.read(PUBLISHED)["backends"][0]["ip"], "10.0.0.11");
}
