#![cfg(unix)]

use std::process::{Command, Output};

fn run_process(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_run-process"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to launch run-process")
}

#[test]
fn relays_output_and_exit_code() {
    let output = run_process(&[
        "--settle-delay-ms",
        "50",
        "/bin/sh",
        "-c 'echo to-stdout; echo to-stderr >&2; exit 9'",
    ]);

    assert_eq!(output.status.code(), Some(9));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "to-stdout\n");
    assert_eq!(String::from_utf8_lossy(&output.stderr), "to-stderr\n");
}

#[test]
fn launch_failure_exits_127_without_relaying_anything() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing-tool");

    let output = run_process(&[missing.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(127));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("run-process: Failed to spawn"), "{stderr}");
}

#[test]
fn priority_flag_is_accepted() {
    let output = run_process(&["-p", "below_normal", "/bin/sh", "-c 'exit 0'"]);
    assert_eq!(output.status.code(), Some(0));
}
