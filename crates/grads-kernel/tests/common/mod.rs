//! Fake GrADS and a recording front end for the kernel tests.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use grads_bridge::BridgeConfig;
use grads_kernel::display::DisplayData;
use grads_kernel::frontend::{Frontend, StreamName};
use grads_kernel::{ExecuteReply, GradsKernel};
use tempfile::TempDir;

const FAKE_GRADS: &str = r#"#!/bin/sh
echo "Grid Analysis and Display System (fake)"
printf 'ga-> '
while IFS= read -r line; do
  case "$line" in
    quit) exit 0 ;;
    crash) echo "partial before crash"; exit 3 ;;
    hang) sleep 1 ;;
    "gxprint "*) printf 'PNGDATA' > "${line#gxprint }" ;;
    "warn "*) echo "${line#warn }" >&2 ;;
    "run "*) cat "${line#run }" ;;
    *) echo "echo: $line" ;;
  esac
  printf 'ga-> '
done
"#;

/// Path of the fake interpreter, written once per test binary.
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

/// Something the kernel showed the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Stdout(String),
    Stderr(String),
    Display(DisplayData),
    Reply(ExecuteReply),
}

pub type Events = Arc<Mutex<Vec<Event>>>;

/// Front end that records everything it is given.
pub struct Recorder(pub Events);

impl Frontend for Recorder {
    fn stream(&mut self, name: StreamName, text: &str) {
        let event = match name {
            StreamName::Stdout => Event::Stdout(text.to_string()),
            StreamName::Stderr => Event::Stderr(text.to_string()),
        };
        self.0.lock().unwrap().push(event);
    }

    fn display(&mut self, data: &DisplayData) -> grads_kernel::Result<()> {
        self.0.lock().unwrap().push(Event::Display(data.clone()));
        Ok(())
    }

    fn reply(&mut self, reply: &ExecuteReply) {
        self.0.lock().unwrap().push(Event::Reply(reply.clone()));
    }
}

/// Kernel on the fake interpreter, with its banner suppressed.
pub fn start_kernel() -> (GradsKernel, Events) {
    start_kernel_with(|config| config)
}

/// Like [`start_kernel`], with the bridge config adjusted by `tweak`.
pub fn start_kernel_with(tweak: impl FnOnce(BridgeConfig) -> BridgeConfig) -> (GradsKernel, Events) {
    let mut config = BridgeConfig::new()
        .with_executable(fake_grads().to_string_lossy().to_string())
        .with_echo_banner(false)
        .with_poll_interval(Duration::from_millis(2))
        .with_idle_timeout(Some(Duration::from_secs(10)))
        .with_shutdown_timeout(Duration::from_secs(2));
    config.stderr_settle = Duration::from_millis(50);
    let config = tweak(config);

    let events: Events = Arc::default();
    let frontend = grads_kernel::frontend::shared(Recorder(Arc::clone(&events)));
    let kernel = GradsKernel::start(config, frontend).unwrap();
    (kernel, events)
}

/// Takes the recorded events, leaving the log empty.
pub fn take(events: &Events) -> Vec<Event> {
    std::mem::take(&mut *events.lock().unwrap())
}
