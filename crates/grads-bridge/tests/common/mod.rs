//! Fake interpreter used by the integration tests.
//!
//! The script mimics the parts of GrADS the bridge relies on: a banner, the
//! `ga-> ` prompt after every command, `gxprint <file>` and `quit`.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use grads_bridge::BridgeConfig;
use tempfile::TempDir;

const FAKE_GRADS: &str = r#"#!/bin/sh
echo "Grid Analysis and Display System (fake)"
echo "args: $*"
printf 'ga-> '
while IFS= read -r line; do
  case "$line" in
    quit) exit 0 ;;
    crash) echo "partial before crash"; exit 3 ;;
    hang) sleep 1 ;;
    trick) printf 'abc ga-> def\n' ;;
    multi) printf 'one\n'; printf 'two\n' ;;
    "gxprint "*) printf 'PNGDATA' > "${line#gxprint }" ;;
    "warn "*) echo "${line#warn }" >&2 ;;
    "run "*) cat "${line#run }" ;;
    "") ;;
    *) echo "echo: $line" ;;
  esac
  printf 'ga-> '
done
"#;

/// Path of the fake interpreter, written once per test binary.
///
/// Every test calls this before spawning anything so the script is never
/// open for writing while another test forks.
pub fn fake_grads() -> PathBuf {
    static DIR: OnceLock<TempDir> = OnceLock::new();
    let dir = DIR.get_or_init(|| {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("fake-grads");
        fs::write(&path, FAKE_GRADS).expect("write fake interpreter");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        dir
    });
    dir.path().join("fake-grads")
}

/// Config pointing at the fake interpreter with test-friendly timings.
pub fn fake_config() -> BridgeConfig {
    let mut config = BridgeConfig::new()
        .with_executable(fake_grads().to_string_lossy().to_string())
        .with_poll_interval(Duration::from_millis(2))
        .with_idle_timeout(Some(Duration::from_secs(10)))
        .with_shutdown_timeout(Duration::from_secs(2));
    config.stderr_settle = Duration::from_millis(50);
    config
}
