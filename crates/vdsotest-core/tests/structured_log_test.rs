//! Integration test: structured JSONL log of a full driver run.
//!
//! Validates that:
//! 1. `--log` output is created, including missing parent directories.
//! 2. Every line passes `validate_log_line`.
//! 3. The event sequence of a failing verify run is
//!    run_start, failure..., threshold_reached, run_end.
//! 4. Bench runs log one `bench_phase` per path.
//!
//! Run: cargo test -p vdsotest-core --test structured_log_test

use std::path::PathBuf;
use std::time::Duration;

use vdsotest_core::structured_log::{LogEntry, validate_log_line};
use vdsotest_core::{
    BenchInterval, Console, Context, ModeRegistry, Outcome, Registries, RunConfig, SuiteRegistry,
    TestSuite, driver,
};

fn scratch_log(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir()
        .join(format!("vdsotest-log-{}-{nanos}", std::process::id()))
        .join(format!("{name}.jsonl"))
}

fn registries() -> Registries {
    let mut suites = SuiteRegistry::new();
    suites.register(TestSuite::new("flaky").with_verify(|ctx| {
        for n in 0..5 {
            ctx.report_failure(format_args!("mismatch {n}"));
        }
        Ok(())
    }));
    suites.register(TestSuite::new("steady").with_bench(|_, bres| {
        bres.sys_interval = BenchInterval::new(100, Duration::from_millis(500));
        bres.vdso_interval = BenchInterval::new(400, Duration::from_millis(500));
        Ok(())
    }));
    Registries::new(suites, ModeRegistry::with_builtin_modes())
}

fn run_logged(api: &str, mode: &str, max_fails: u64) -> (Outcome, Vec<LogEntry>) {
    let path = scratch_log(&format!("{api}-{mode}"));
    let mut cfg = RunConfig::new(api, mode).with_max_fails(max_fails);
    cfg.log_path = Some(path.clone());
    let mut ctx = Context::new(&cfg)
        .expect("context")
        .with_console(Console::capture());
    let verdict = driver::run(&mut ctx, &registries()).expect("driver run");
    drop(ctx);

    let text = std::fs::read_to_string(&path).expect("log file should exist");
    let entries = text
        .lines()
        .enumerate()
        .map(|(i, line)| {
            validate_log_line(line, i + 1).unwrap_or_else(|errs| {
                let msgs: Vec<String> = errs.iter().map(ToString::to_string).collect();
                panic!("invalid log line {}: {}", i + 1, msgs.join("; "))
            })
        })
        .collect();
    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
    (verdict.outcome, entries)
}

#[test]
fn failing_verify_logs_threshold_once() {
    let (outcome, entries) = run_logged("flaky", "verify", 3);
    assert_eq!(outcome, Outcome::Fail);

    let events: Vec<&str> = entries.iter().map(|e| e.event.as_str()).collect();
    assert_eq!(
        events,
        [
            "run_start",
            "failure",
            "failure",
            "failure",
            "threshold_reached",
            "failure",
            "failure",
            "run_end"
        ]
    );

    let end = entries.last().unwrap();
    assert_eq!(end.outcome, Some(Outcome::Fail));
    assert_eq!(end.fails, Some(5));
    assert_eq!(end.exit_code, Some(1));
    assert!(entries.iter().all(|e| e.api.as_deref() == Some("flaky")));
}

#[test]
fn trace_ids_are_sequential_within_a_run() {
    let (_, entries) = run_logged("flaky", "verify", 100);
    let run_id = entries[0].trace_id.split("::").nth(1).unwrap().to_string();
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.trace_id, format!("vdsotest::{run_id}::{:03}", i + 1));
    }
}

#[test]
fn bench_logs_both_phases() {
    let (outcome, entries) = run_logged("steady", "bench", 10);
    assert_eq!(outcome, Outcome::Ok);

    let phases: Vec<&LogEntry> = entries.iter().filter(|e| e.event == "bench_phase").collect();
    assert_eq!(phases.len(), 2);
    assert_eq!(phases[0].details.as_ref().unwrap()["path"], "syscall");
    assert_eq!(phases[0].calls, Some(100));
    assert_eq!(phases[0].calls_per_sec, Some(200.0));
    assert_eq!(phases[0].elapsed_ns, Some(500_000_000));
    assert_eq!(phases[1].details.as_ref().unwrap()["path"], "vdso");
    assert_eq!(phases[1].calls_per_sec, Some(800.0));
    assert!(!entries.iter().any(|e| e.event == "speedup_undefined"));
}
