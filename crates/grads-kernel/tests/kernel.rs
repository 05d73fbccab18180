//! End-to-end cell execution against a fake interpreter.

#![cfg(unix)]

mod common;

use std::fs;
use std::time::Duration;

use grads_kernel::cell::{SizeRequest, INVALID_SIZE_MESSAGE};
use grads_kernel::display::DisplaySize;
use grads_bridge::BridgeError;
use grads_kernel::{ExecuteReply, KernelError, ReplyStatus};

use common::{start_kernel, start_kernel_with, take, Event};

fn reply(status: ReplyStatus, execution_count: u64) -> Event {
    Event::Reply(ExecuteReply {
        status,
        execution_count,
    })
}

#[test]
fn test_statements_run_in_order() {
    let (mut kernel, events) = start_kernel();

    let result = kernel.execute_cell("open model.ctl\n\n  q dims  ").unwrap();

    assert_eq!(result.status, ReplyStatus::Ok);
    assert_eq!(
        take(&events),
        vec![
            Event::Stdout("echo: open model.ctl".to_string()),
            Event::Stdout("echo: q dims".to_string()),
            reply(ReplyStatus::Ok, 1),
        ]
    );
}

#[test]
fn test_execution_count_increments_per_cell() {
    let (mut kernel, _events) = start_kernel();

    assert_eq!(kernel.execute_cell("q time").unwrap().execution_count, 1);
    assert_eq!(kernel.execute_cell("").unwrap().execution_count, 2);
    assert_eq!(kernel.execution_count(), 2);
}

#[test]
fn test_draw_shows_figure() {
    let (mut kernel, events) = start_kernel();

    kernel.execute_cell("d t").unwrap();

    let events = take(&events);
    assert_eq!(events[0], Event::Stdout("echo: d t".to_string()));
    match &events[1] {
        Event::Display(data) => {
            assert_eq!(data.png_bytes().unwrap(), b"PNGDATA");
            assert_eq!(data.size, DisplaySize::default());
        }
        other => panic!("expected a figure, got {:?}", other),
    }
    assert_eq!(events[2], reply(ReplyStatus::Ok, 1));
}

#[test]
fn test_display_size_directive() {
    let (mut kernel, events) = start_kernel();

    kernel.execute_cell("*%display_size 800 600\n*%display").unwrap();
    assert_eq!(kernel.display_size(), DisplaySize::new(800, 600));
    let figure = take(&events)
        .into_iter()
        .find_map(|e| match e {
            Event::Display(data) => Some(data),
            _ => None,
        })
        .unwrap();
    assert_eq!(figure.size, DisplaySize::new(800, 600));

    kernel.execute_cell("*%display_size default").unwrap();
    assert_eq!(kernel.display_size(), DisplaySize::default());
}

#[test]
fn test_invalid_display_size_reports_and_continues() {
    let (mut kernel, events) = start_kernel();
    kernel.set_display_size(SizeRequest::Custom(DisplaySize::new(640, 480)));

    let result = kernel.execute_cell("*%display_size wide\nq dims").unwrap();

    assert_eq!(result.status, ReplyStatus::Ok);
    assert_eq!(kernel.display_size(), DisplaySize::new(640, 480));
    assert_eq!(
        take(&events),
        vec![
            Event::Stderr(INVALID_SIZE_MESSAGE.to_string()),
            Event::Stdout("echo: q dims".to_string()),
            reply(ReplyStatus::Ok, 1),
        ]
    );
}

#[test]
fn test_script_is_staged_and_run() {
    let (mut kernel, events) = start_kernel();

    kernel.execute_cell("*%script\n  say 'hello'\n'q dims'").unwrap();

    // The fake interpreter prints the staged file back.
    assert_eq!(
        take(&events),
        vec![
            Event::Stdout("*%script\nsay 'hello'\n'q dims'".to_string()),
            reply(ReplyStatus::Ok, 1),
        ]
    );
}

#[test]
fn test_interpreter_exit_ends_cell_with_error() {
    let (mut kernel, events) = start_kernel();

    let result = kernel.execute_cell("crash\nq dims").unwrap();

    assert_eq!(result.status, ReplyStatus::Error);
    assert!(!kernel.is_alive());
    assert_eq!(
        take(&events),
        vec![
            Event::Stdout("partial before crash".to_string()),
            Event::Stderr("GrADS exited (code 3)".to_string()),
            reply(ReplyStatus::Error, 1),
        ]
    );
}

#[test]
fn test_interpreter_stderr_reaches_frontend() {
    let (mut kernel, events) = start_kernel();

    kernel.execute_cell("warn Data Request Error").unwrap();

    assert!(take(&events).contains(&Event::Stderr("Data Request Error".to_string())));
}

#[test]
fn test_save_figure() {
    let (mut kernel, events) = start_kernel();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fig.png");

    let saved = kernel.save_figure(&path).unwrap();

    assert_eq!(saved, path);
    assert_eq!(fs::read(&path).unwrap(), b"PNGDATA");
    assert!(take(&events).is_empty());
}

#[test]
fn test_shutdown() {
    let (mut kernel, _events) = start_kernel();
    assert_eq!(kernel.shutdown().unwrap(), Some(0));
    assert!(!kernel.is_alive());
}

#[test]
fn test_failed_cell_still_replies() {
    let (mut kernel, events) =
        start_kernel_with(|config| config.with_idle_timeout(Some(Duration::from_millis(200))));

    let result = kernel.execute_cell("hang\nq dims");

    assert!(matches!(
        result,
        Err(KernelError::Bridge(BridgeError::IdleTimeout { .. }))
    ));
    assert_eq!(take(&events).last(), Some(&reply(ReplyStatus::Error, 1)));

    // Once the slow command finishes, the next cell sees only its own output.
    std::thread::sleep(Duration::from_millis(1200));
    kernel.execute_cell("q time").unwrap();
    assert_eq!(
        take(&events),
        vec![
            Event::Stdout("echo: q time".to_string()),
            reply(ReplyStatus::Ok, 2),
        ]
    );
}
