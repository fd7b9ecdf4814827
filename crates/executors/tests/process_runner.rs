//! End-to-end runs against real child processes.
//!
//! Every child is `/bin/sh -c ...` or `/bin/echo`, so nothing here writes an
//! executable file.
#![cfg(unix)]

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use executors::{LaunchError, LaunchRequest, Priority, ProcessRunner, RunnerConfig, run_process};
use utils::{log_msg::OutputStream, msg_store::MsgStore};

const SH: &str = "/bin/sh";

fn capturing_runner(config: RunnerConfig) -> (ProcessRunner, Arc<MsgStore>) {
    let store = Arc::new(MsgStore::new());
    let runner = ProcessRunner::new(config).with_sinks(
        store.sink(OutputStream::Stdout),
        store.sink(OutputStream::Stderr),
    );
    (runner, store)
}

fn short_delay() -> RunnerConfig {
    RunnerConfig::default().with_settle_delay(Duration::from_millis(100))
}

#[tokio::test]
async fn relays_both_streams_in_order_and_returns_exit_code() {
    let (runner, store) = capturing_runner(short_delay());
    let request = LaunchRequest::new(SH).args(
        "-c 'echo one; echo err1 >&2; echo two; echo err2 >&2; echo three; exit 3'",
    );

    let code = runner.run(&request).await.unwrap();

    assert_eq!(code, 3);
    assert_eq!(store.stdout_lines(), vec!["one", "two", "three"]);
    assert_eq!(store.stderr_lines(), vec!["err1", "err2"]);
}

#[tokio::test]
async fn missing_executable_fails_to_spawn_and_writes_nothing() {
    let (runner, store) = capturing_runner(short_delay());
    let dir = tempfile::tempdir().unwrap();
    let request = LaunchRequest::new(dir.path().join("no-such-program"));

    let err = runner.run(&request).await.unwrap_err();

    assert!(matches!(err, LaunchError::SpawnFailed { .. }), "{err:?}");
    assert!(err.to_string().contains("(requested priority normal)"), "{err}");
    assert!(err.is_fatal());
    assert!(store.is_empty());
}

#[tokio::test]
async fn unterminated_quote_fails_before_spawn() {
    let (runner, store) = capturing_runner(short_delay());
    let request = LaunchRequest::new(SH).args("-c 'echo never");

    let err = runner.run(&request).await.unwrap_err();

    assert!(matches!(err, LaunchError::InvalidArguments(_)), "{err:?}");
    assert!(store.is_empty());
}

#[tokio::test]
async fn child_exiting_during_settle_delay_still_reports_its_code() {
    // Default two second delay; the child is gone long before it ends.
    let (runner, store) = capturing_runner(RunnerConfig::default());
    let request = LaunchRequest::new(SH)
        .args("-c 'echo bye; exit 7'")
        .priority(Priority::BelowNormal);

    let started = Instant::now();
    let code = runner.run(&request).await.unwrap();

    assert_eq!(code, 7);
    assert_eq!(store.stdout_lines(), vec!["bye"]);
    assert!(started.elapsed() < Duration::from_millis(1900));
}

#[tokio::test]
async fn waits_for_a_long_running_child() {
    let (runner, _store) = capturing_runner(RunnerConfig::default());
    let request = LaunchRequest::new(SH).args("-c 'sleep 5; exit 0'");

    let started = Instant::now();
    let code = runner.run(&request).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(code, 0);
    assert!(elapsed >= Duration::from_millis(4900), "returned after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(10), "returned after {elapsed:?}");
}

#[tokio::test]
async fn background_work_left_by_the_child_is_not_waited_for() {
    let (runner, store) = capturing_runner(short_delay());
    let request = LaunchRequest::new(SH)
        .args("-c 'sleep 10 </dev/null >/dev/null 2>&1 & echo started; exit 4'");

    let started = Instant::now();
    let code = runner.run(&request).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(code, 4);
    assert_eq!(store.stdout_lines(), vec!["started"]);
    assert!(elapsed < Duration::from_secs(5), "returned after {elapsed:?}");
}

#[tokio::test]
async fn omitted_priority_behaves_like_normal() {
    let script = "-c 'echo out; echo err >&2; exit 5'";

    let (runner, implicit) = capturing_runner(short_delay());
    let implicit_code = runner
        .run(&LaunchRequest::new(SH).args(script))
        .await
        .unwrap();

    let (runner, explicit) = capturing_runner(short_delay());
    let explicit_code = runner
        .run(&LaunchRequest::new(SH).args(script).priority(Priority::Normal))
        .await
        .unwrap();

    assert_eq!(implicit_code, explicit_code);
    assert_eq!(implicit.stdout_lines(), explicit.stdout_lines());
    assert_eq!(implicit.stderr_lines(), explicit.stderr_lines());
}

#[tokio::test]
async fn repeated_runs_are_identical() {
    let request = LaunchRequest::new(SH).args("-c 'echo a; echo b >&2; echo c; exit 2'");

    let (runner, first) = capturing_runner(short_delay());
    let first_code = runner.run(&request).await.unwrap();
    let (runner, second) = capturing_runner(short_delay());
    let second_code = runner.run(&request).await.unwrap();

    assert_eq!(first_code, 2);
    assert_eq!(first_code, second_code);
    assert_eq!(first.stdout_lines(), second.stdout_lines());
    assert_eq!(first.stderr_lines(), second.stderr_lines());
}

#[tokio::test]
async fn argument_string_is_not_shell_expanded() {
    let (runner, store) = capturing_runner(short_delay());
    let request = LaunchRequest::new("/bin/echo").args(r#"$HOME "a  b" 'c d' *"#);

    let code = runner.run(&request).await.unwrap();

    assert_eq!(code, 0);
    assert_eq!(store.stdout_lines(), vec!["$HOME a  b c d *"]);
}

#[tokio::test]
async fn signal_termination_reports_shell_style_code() {
    let (runner, _store) = capturing_runner(short_delay());
    let request = LaunchRequest::new(SH).args("-c 'kill -9 $$'");

    let code = runner.run(&request).await.unwrap();

    assert_eq!(code, 128 + 9);
}

#[tokio::test]
async fn heavy_output_on_both_streams_is_fully_relayed() {
    let (runner, store) = capturing_runner(short_delay());
    let request = LaunchRequest::new(SH).args(
        r#"-c 'i=0; while [ $i -lt 2000 ]; do echo "out $i"; echo "err $i" >&2; i=$((i+1)); done'"#,
    );

    let code = runner.run(&request).await.unwrap();

    assert_eq!(code, 0);
    let expected_out: Vec<String> = (0..2000).map(|i| format!("out {i}")).collect();
    let expected_err: Vec<String> = (0..2000).map(|i| format!("err {i}")).collect();
    assert_eq!(store.stdout_lines(), expected_out);
    assert_eq!(store.stderr_lines(), expected_err);
}

#[tokio::test]
async fn final_line_without_newline_is_relayed() {
    let (runner, store) = capturing_runner(short_delay());
    let request = LaunchRequest::new(SH).args(r#"-c 'printf "first\nlast"'"#);

    runner.run(&request).await.unwrap();

    assert_eq!(store.stdout_lines(), vec!["first", "last"]);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn idle_priority_is_applied_after_the_settle_delay() {
    let (runner, store) = capturing_runner(short_delay());
    // Field 19 of /proc/<pid>/stat is the nice value.
    let request = LaunchRequest::new(SH)
        .args(r#"-c 'sleep 1; read -r stat < /proc/$$/stat; set -- $stat; echo "${19}"'"#)
        .priority(Priority::Idle);

    let code = runner.run(&request).await.unwrap();

    assert_eq!(code, 0);
    assert_eq!(store.stdout_lines(), vec!["19"]);
}

#[test]
fn blocking_entry_points_report_exit_codes() {
    let (runner, store) = capturing_runner(short_delay());
    let code = runner
        .run_blocking(&LaunchRequest::new(SH).args("-c 'echo sync; exit 4'"))
        .unwrap();
    assert_eq!(code, 4);
    assert_eq!(store.stdout_lines(), vec!["sync"]);

    assert_eq!(run_process(SH, "-c 'exit 6'", Priority::Normal).unwrap(), 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_entry_point_works_inside_a_runtime() {
    let (runner, store) = capturing_runner(short_delay());
    let code = runner
        .run_blocking(&LaunchRequest::new(SH).args("-c 'echo nested'"))
        .unwrap();
    assert_eq!(code, 0);
    assert_eq!(store.stdout_lines(), vec!["nested"]);
}
