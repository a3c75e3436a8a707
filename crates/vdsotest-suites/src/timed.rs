//! Bench phases over one [`Path`], keeping track of calls that failed.

use std::hint::black_box;
use std::io;

use vdsotest_core::phase;
use vdsotest_core::{BenchInterval, Context, HarnessError};

use crate::ffi::Path;

/// Time `call(path)` until the deadline.
///
/// Failed calls still count towards the rate, so any failure is reported
/// once after the phase with the number of failed calls and the first error.
pub(crate) fn phase<T>(
    ctx: &mut Context,
    name: &str,
    path: Path,
    mut call: impl FnMut(Path) -> io::Result<T>,
) -> Result<BenchInterval, HarnessError> {
    let mut errors = 0u64;
    let mut first: Option<io::Error> = None;
    let iv = phase::run_phase(ctx, || {
        if let Err(err) = black_box(call(black_box(path))) {
            errors += 1;
            first.get_or_insert(err);
        }
    })?;
    if let Some(err) = first {
        ctx.report_failure(format_args!(
            "{name}: {path} call failed {errors} of {} times while timed: {err}",
            iv.calls
        ));
    }
    Ok(iv)
}
