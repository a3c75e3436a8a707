//! Mode dispatchers: `verify`, `bench` and `abi`.
//!
//! A dispatcher invokes one optional entry point of a suite and turns the
//! run context's failure count into an [`Outcome`].

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::HarnessError;
use crate::registry::ModeRegistry;
use crate::structured_log::LogLevel;
use crate::suite::{BenchInterval, BenchResults, CheckFn, TestSuite};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Entry point completed without failures.
    Ok,
    /// One or more failures/inconsistencies were recorded.
    Fail,
    /// The suite has no entry point for this mode.
    NotImplemented,
}

pub type Dispatcher = fn(&mut Context, &TestSuite) -> Result<Outcome, HarnessError>;

pub const VERIFY: &str = "verify";
pub const BENCH: &str = "bench";
pub const ABI: &str = "abi";

/// Register the three built-in modes.
pub fn register_builtin_modes(modes: &mut ModeRegistry) {
    modes.register(VERIFY, run_verify);
    modes.register(BENCH, run_bench);
    modes.register(ABI, run_abi);
}

fn outcome_of(ctx: &Context) -> Outcome {
    if ctx.fails() > 0 {
        Outcome::Fail
    } else {
        Outcome::Ok
    }
}

fn run_check(ctx: &mut Context, entry: &CheckFn) -> Result<Outcome, HarnessError> {
    entry(ctx)?;
    ctx.cancel_timer()?;
    Ok(outcome_of(ctx))
}

pub fn run_verify(ctx: &mut Context, suite: &TestSuite) -> Result<Outcome, HarnessError> {
    match suite.verify() {
        Some(entry) => run_check(ctx, entry),
        None => Ok(Outcome::NotImplemented),
    }
}

pub fn run_abi(ctx: &mut Context, suite: &TestSuite) -> Result<Outcome, HarnessError> {
    match suite.abi() {
        Some(entry) => run_check(ctx, entry),
        None => Ok(Outcome::NotImplemented),
    }
}

/// Halve the deadline.
///
/// A bench run is two timed phases (system call, then vDSO) and the timer
/// is re-armed between them, so each phase gets half of the requested time.
pub fn split_duration(ctx: &mut Context) {
    let halved = ctx.duration() / 2;
    ctx.set_duration(halved);
}

pub fn run_bench(ctx: &mut Context, suite: &TestSuite) -> Result<Outcome, HarnessError> {
    let Some(entry) = suite.bench() else {
        return Ok(Outcome::NotImplemented);
    };

    split_duration(ctx);
    let mut bres = BenchResults::default();
    entry(ctx, &mut bres)?;
    ctx.cancel_timer()?;

    if ctx.fails() > 0 {
        return Ok(Outcome::Fail);
    }

    log_phase(ctx, "syscall", &bres.sys_interval);
    log_phase(ctx, "vdso", &bres.vdso_interval);
    report_bench(ctx, suite.name(), &bres);
    Ok(Outcome::Ok)
}

fn log_phase(ctx: &mut Context, path: &str, iv: &BenchInterval) {
    let elapsed_ns = u64::try_from(iv.elapsed.as_nanos()).unwrap_or(u64::MAX);
    ctx.log_event(LogLevel::Info, "bench_phase", |e| {
        e.with_phase(iv.calls, iv.calls_per_sec(), elapsed_ns)
            .with_details(serde_json::json!({ "path": path }))
    });
}

fn report_bench(ctx: &mut Context, name: &str, bres: &BenchResults) {
    ctx.verbose(format_args!(
        "{name}: syscalls = {}, vdso calls = {}",
        bres.sys_interval.calls, bres.vdso_interval.calls
    ));

    let sys_rate = bres.sys_interval.calls_per_sec() as u64;
    let vdso_rate = bres.vdso_interval.calls_per_sec() as u64;
    let console = ctx.console().clone();
    console.println(format_args!("{name} system calls per second: {sys_rate}"));

    match bres.speedup() {
        Some(ratio) => console.println(format_args!(
            "{name} vdso calls per second:   {vdso_rate} ({ratio:.2}x speedup)"
        )),
        None => {
            console.println(format_args!(
                "{name} vdso calls per second:   {vdso_rate} (speedup undefined: no system calls completed)"
            ));
            ctx.log_event(LogLevel::Warn, "speedup_undefined", |e| {
                e.with_details(serde_json::json!({ "vdso_calls": bres.vdso_interval.calls }))
            });
        }
    }
}
