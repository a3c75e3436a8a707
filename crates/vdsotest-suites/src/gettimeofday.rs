//! `gettimeofday` suite.

use vdsotest_core::phase;
use vdsotest_core::{BenchResults, Context, HarnessError, TestSuite};

use crate::ffi::{self, Path};
use crate::timed;

pub const NAME: &str = "gettimeofday";

pub fn suite() -> TestSuite {
    TestSuite::new(NAME)
        .with_verify(verify)
        .with_bench(bench)
        .with_abi(abi)
}

fn micros(tv: &libc::timeval) -> i128 {
    i128::from(tv.tv_sec) * 1_000_000 + i128::from(tv.tv_usec)
}

fn show(tv: &libc::timeval) -> String {
    format!("{}.{:06}", tv.tv_sec, tv.tv_usec)
}

fn normalized(tv: &libc::timeval) -> bool {
    (0..1_000_000).contains(&tv.tv_usec)
}

fn ordering_violation(
    first: &libc::timeval,
    kernel: &libc::timeval,
    last: &libc::timeval,
) -> Option<String> {
    if micros(first) > micros(kernel) {
        Some(format!(
            "{NAME}: vdso time {} is ahead of subsequent syscall time {}",
            show(first),
            show(kernel)
        ))
    } else if micros(kernel) > micros(last) {
        Some(format!(
            "{NAME}: syscall time {} is ahead of subsequent vdso time {}",
            show(kernel),
            show(last)
        ))
    } else {
        None
    }
}

fn verify(ctx: &mut Context) -> Result<(), HarnessError> {
    phase::run_checks(ctx, check_once)?;
    Ok(())
}

fn check_once(ctx: &mut Context) {
    let mut stamps = Vec::with_capacity(3);
    for path in [Path::Vdso, Path::Syscall, Path::Vdso] {
        match ffi::gettimeofday(path) {
            Ok(tv) if normalized(&tv) => stamps.push(tv),
            Ok(tv) => {
                ctx.report_failure(format_args!(
                    "{NAME}: {path} returned tv_usec {} out of range",
                    tv.tv_usec
                ));
                return;
            }
            Err(err) => {
                ctx.report_failure(format_args!("{NAME}: {path} gettimeofday: {err}"));
                return;
            }
        }
    }
    if let Some(msg) = ordering_violation(&stamps[0], &stamps[1], &stamps[2]) {
        ctx.report_failure(msg);
    }
}

fn bench(ctx: &mut Context, bres: &mut BenchResults) -> Result<(), HarnessError> {
    bres.sys_interval = timed::phase(ctx, NAME, Path::Syscall, ffi::gettimeofday)?;
    bres.vdso_interval = timed::phase(ctx, NAME, Path::Vdso, ffi::gettimeofday)?;
    Ok(())
}

fn abi(ctx: &mut Context) -> Result<(), HarnessError> {
    let null = ffi::gettimeofday_null_syscall();
    ctx.debug(format_args!("gettimeofday(NULL, NULL) = {null}"));
    if !null.is_ok() {
        ctx.report_failure(format_args!(
            "{NAME}: syscall with NULL tv and tz returned {null}"
        ));
    }

    for path in [Path::Vdso, Path::Syscall] {
        if let Err(err) = ffi::gettimeofday(path) {
            ctx.report_failure(format_args!("{NAME}: {path} with NULL tz: {err}"));
        }
    }

    match (
        ffi::gettimeofday_tz(Path::Vdso),
        ffi::gettimeofday_tz(Path::Syscall),
    ) {
        (Ok((_, fast)), Ok((_, slow))) if fast == slow => {}
        (Ok((_, fast)), Ok((_, slow))) => ctx.report_failure(format_args!(
            "{NAME}: timezone disagrees: vdso {fast:?}, syscall {slow:?}"
        )),
        (Err(err), _) | (_, Err(err)) => {
            ctx.report_failure(format_args!("{NAME}: gettimeofday with tz: {err}"));
        }
    }
    Ok(())
}
