//! Exit codes and output of the `batch-publisher` binary.

use std::process::{Command, Output};

fn run(args: &[&str], envs: &[(&str, &str)]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_batch-publisher"))
        .args(args)
        .env_clear()
        .envs(envs.iter().copied())
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .output()
        .expect("binary should start")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_dry_run_success_exits_zero() {
    let out = run(&["--topic", "local", "--dry-run", "-n", "25"], &[]);

    assert_eq!(out.status.code(), Some(0));
    let text = stdout(&out);
    assert!(text.contains("Started process"));
    assert!(text.contains("3 batches: 3 succeeded"));
    assert!(text.contains("Finished process"));
}

#[test]
fn test_missing_topic_exits_two() {
    let out = run(&["--dry-run", "-n", "5"], &[]);

    assert_eq!(out.status.code(), Some(2));
    assert!(!stdout(&out).contains("Started process"));
}

#[test]
fn test_missing_endpoint_exits_two_before_starting() {
    let out = run(&["--topic", "t", "-n", "5"], &[("AWS_REGION", "us-east-1")]);

    assert_eq!(out.status.code(), Some(2));
    assert!(!stdout(&out).contains("Started process"));
    assert!(String::from_utf8_lossy(&out.stderr).contains("no publish endpoint configured"));
}

#[test]
fn test_out_of_range_batch_size_exits_two() {
    let out = run(&["--topic", "t", "--dry-run", "-b", "11"], &[]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn test_failed_batches_exit_one() {
    let out = run(
        &["--topic", "t", "--endpoint", "http://127.0.0.1:1/", "-n", "5"],
        &[("PUBLISH_HTTP_CONNECT_TIMEOUT_SECS", "1")],
    );

    assert_eq!(out.status.code(), Some(1));
    let text = stdout(&out);
    assert!(text.contains("Started process"));
    assert!(text.contains("1 batches: 0 succeeded, 1 failed"));
}
