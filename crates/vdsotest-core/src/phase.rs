//! Deadline-bounded loops for suite entry points.

use std::time::Instant;

use crate::context::Context;
use crate::error::HarnessError;
use crate::suite::BenchInterval;

/// Arm the deadline and count calls of `call` until the stop flag is set.
///
/// The loop body is the call plus one relaxed load, so both paths of a suite
/// pay the same bookkeeping per iteration.
pub fn run_phase(
    ctx: &mut Context,
    mut call: impl FnMut(),
) -> Result<BenchInterval, HarnessError> {
    ctx.start_timer()?;
    let start = Instant::now();
    let mut calls = 0u64;
    while !ctx.should_stop() {
        call();
        calls += 1;
    }
    Ok(BenchInterval::new(calls, start.elapsed()))
}

/// Arm the deadline and run `body` until the deadline passes or the failure
/// threshold stops the run. Returns the number of iterations.
pub fn run_checks(
    ctx: &mut Context,
    mut body: impl FnMut(&mut Context),
) -> Result<u64, HarnessError> {
    ctx.start_timer()?;
    let mut iterations = 0u64;
    while !ctx.should_stop() {
        body(ctx);
        iterations += 1;
    }
    ctx.debug(format_args!("{iterations} iterations"));
    Ok(iterations)
}
