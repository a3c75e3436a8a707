//! Integration test: the `vdsotest` binary against the shipped suites.
//!
//! Run: cargo test -p vdsotest-harness --test cli_binary_test

use std::process::{Command, Output};

fn vdsotest(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vdsotest"))
        .args(args)
        .env_remove("VDSOTEST_LOG")
        .env_remove("VDSOTEST_MAXFAILS")
        .output()
        .expect("vdsotest should execute")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn help_lists_every_api_and_mode() {
    let out = vdsotest(&["--help"]);
    assert!(out.status.success());
    let text = stdout(&out);
    for name in [
        "clock-monotonic",
        "clock-monotonic-coarse",
        "clock-realtime",
        "clock-realtime-coarse",
        "getcpu",
        "gettimeofday",
        "verify",
        "bench",
        "abi",
    ] {
        assert!(text.contains(name), "help should list {name}:\n{text}");
    }
}

#[test]
fn unknown_mode_exits_one_with_prefixed_message() {
    let out = vdsotest(&["clock-monotonic", "bogus"]);
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(
        stderr(&out),
        "vdsotest: Unknown test function 'bogus' specified\n"
    );
    assert!(stdout(&out).is_empty());
}

#[test]
fn unknown_api_exits_one() {
    let out = vdsotest(&["clock-bogus", "verify"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Unknown test suite 'clock-bogus' specified"));
}

#[test]
fn zero_duration_is_rejected() {
    let out = vdsotest(&["-d", "0", "getcpu", "verify"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).starts_with("vdsotest: invalid configuration:"));
}

#[test]
fn duration_beyond_timer_range_is_rejected_up_front() {
    let out = vdsotest(&["-d", "0x8000000000000000", "getcpu", "bench"]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.starts_with("vdsotest: invalid configuration:"), "{err}");
    assert!(err.contains("at most 2147483647 seconds"), "{err}");
    assert!(out.stdout.is_empty());
}

#[test]
fn missing_arguments_exit_one() {
    let out = vdsotest(&["getcpu"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(!stderr(&out).is_empty());
}

#[test]
fn shipped_abi_suites_pass() {
    for api in ["clock-monotonic", "clock-realtime-coarse", "getcpu", "gettimeofday"] {
        let out = vdsotest(&[api, "abi"]);
        assert!(
            out.status.success(),
            "{api} abi failed: {}{}",
            stdout(&out),
            stderr(&out)
        );
        assert!(stdout(&out).is_empty());
    }
}

#[test]
fn shipped_bench_prints_rates() {
    let out = vdsotest(&["-d", "1", "clock-monotonic", "bench"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2, "{text}");
    assert!(lines[0].starts_with("clock-monotonic system calls per second: "));
    assert!(lines[1].starts_with("clock-monotonic vdso calls per second:   "));
    assert!(lines[1].ends_with("x speedup)"));
}
