//! `clock_gettime` suites, one per clock id.

use std::hint::black_box;

use vdsotest_core::phase;
use vdsotest_core::{BenchResults, Context, HarnessError, SuiteRegistry, TestSuite};

use crate::ffi::{self, Path};
use crate::timed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSpec {
    pub name: &'static str,
    pub id: libc::clockid_t,
    /// Tick-granular clock: readings may trail each other by one tick.
    pub coarse: bool,
}

pub const CLOCKS: [ClockSpec; 4] = [
    ClockSpec {
        name: "clock-monotonic",
        id: libc::CLOCK_MONOTONIC,
        coarse: false,
    },
    ClockSpec {
        name: "clock-monotonic-coarse",
        id: libc::CLOCK_MONOTONIC_COARSE,
        coarse: true,
    },
    ClockSpec {
        name: "clock-realtime",
        id: libc::CLOCK_REALTIME,
        coarse: false,
    },
    ClockSpec {
        name: "clock-realtime-coarse",
        id: libc::CLOCK_REALTIME_COARSE,
        coarse: true,
    },
];

/// Ids past the kernel's static clock table and outside the CPU-clock
/// encoding. Both paths must reject them the same way.
const INVALID_CLOCKS: [libc::clockid_t; 4] = [16, 64, 1 << 20, libc::clockid_t::MAX];

pub fn register(suites: &mut SuiteRegistry) {
    for spec in CLOCKS {
        suites.register(suite(spec));
    }
}

pub fn suite(spec: ClockSpec) -> TestSuite {
    TestSuite::new(spec.name)
        .with_verify(move |ctx| verify(ctx, spec))
        .with_bench(move |ctx, bres| bench(ctx, bres, spec))
        .with_abi(move |ctx| abi(ctx, spec))
}

fn nanos(ts: &libc::timespec) -> i128 {
    i128::from(ts.tv_sec) * 1_000_000_000 + i128::from(ts.tv_nsec)
}

fn show(ts: &libc::timespec) -> String {
    format!("{}.{:09}", ts.tv_sec, ts.tv_nsec)
}

fn normalized(ts: &libc::timespec) -> bool {
    (0..1_000_000_000).contains(&ts.tv_nsec)
}

/// Check `first <= kernel <= last` allowing `slack` nanoseconds of lag.
fn ordering_violation(
    name: &str,
    first: &libc::timespec,
    kernel: &libc::timespec,
    last: &libc::timespec,
    slack: i128,
) -> Option<String> {
    if nanos(first) > nanos(kernel) + slack {
        return Some(format!(
            "{name}: vdso time {} is ahead of subsequent syscall time {}",
            show(first),
            show(kernel)
        ));
    }
    if nanos(kernel) > nanos(last) + slack {
        return Some(format!(
            "{name}: syscall time {} is ahead of subsequent vdso time {}",
            show(kernel),
            show(last)
        ));
    }
    None
}

fn tolerance(ctx: &Context, spec: ClockSpec) -> i128 {
    if !spec.coarse {
        return 0;
    }
    match ffi::clock_getres(Path::Syscall, spec.id) {
        Ok(res) => nanos(&res),
        Err(err) => {
            ctx.debug(format_args!("{}: clock_getres: {err}", spec.name));
            0
        }
    }
}

fn verify(ctx: &mut Context, spec: ClockSpec) -> Result<(), HarnessError> {
    let slack = tolerance(ctx, spec);
    ctx.verbose(format_args!("{}: ordering tolerance {slack}ns", spec.name));
    phase::run_checks(ctx, |ctx| check_once(ctx, spec, slack))?;
    Ok(())
}

fn check_once(ctx: &mut Context, spec: ClockSpec, slack: i128) {
    let reads = [Path::Vdso, Path::Syscall, Path::Vdso]
        .map(|path| (path, ffi::clock_gettime(path, spec.id)));

    let mut stamps = Vec::with_capacity(reads.len());
    for (path, read) in reads {
        match read {
            Ok(ts) => stamps.push(ts),
            Err(err) => {
                ctx.report_failure(format_args!("{}: {path} clock_gettime: {err}", spec.name));
                return;
            }
        }
    }

    for ts in &stamps {
        if !normalized(ts) {
            ctx.report_failure(format_args!(
                "{}: timestamp {}.{} has tv_nsec out of range",
                spec.name, ts.tv_sec, ts.tv_nsec
            ));
            return;
        }
    }

    if let Some(msg) = ordering_violation(spec.name, &stamps[0], &stamps[1], &stamps[2], slack) {
        ctx.report_failure(msg);
    }
}

fn bench(ctx: &mut Context, bres: &mut BenchResults, spec: ClockSpec) -> Result<(), HarnessError> {
    let read = |path| ffi::clock_gettime(path, black_box(spec.id));
    bres.sys_interval = timed::phase(ctx, spec.name, Path::Syscall, read)?;
    bres.vdso_interval = timed::phase(ctx, spec.name, Path::Vdso, read)?;
    Ok(())
}

fn abi(ctx: &mut Context, spec: ClockSpec) -> Result<(), HarnessError> {
    for id in INVALID_CLOCKS {
        let fast = ffi::clock_gettime_raw(Path::Vdso, id);
        let slow = ffi::clock_gettime_raw(Path::Syscall, id);
        ctx.debug(format_args!("clock id {id}: vdso {fast}, syscall {slow}"));
        if fast != slow {
            ctx.report_failure(format_args!(
                "{}: clock id {id}: vdso returned {fast}, syscall returned {slow}",
                spec.name
            ));
        }
    }

    match (
        ffi::clock_getres(Path::Vdso, spec.id),
        ffi::clock_getres(Path::Syscall, spec.id),
    ) {
        (Ok(fast), Ok(slow)) if nanos(&fast) == nanos(&slow) => {}
        (Ok(fast), Ok(slow)) => ctx.report_failure(format_args!(
            "{}: clock_getres disagrees: vdso {}, syscall {}",
            spec.name,
            show(&fast),
            show(&slow)
        )),
        (fast, slow) => ctx.report_failure(format_args!(
            "{}: clock_getres failed: vdso {:?}, syscall {:?}",
            spec.name,
            fast.err(),
            slow.err()
        )),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vdsotest_core::{Console, RunConfig};

    fn ts(sec: i64, nsec: i64) -> libc::timespec {
        libc::timespec {
            tv_sec: sec as libc::time_t,
            tv_nsec: nsec as _,
        }
    }

    fn ctx(api: &str, mode: &str) -> (Context, Console) {
        let console = Console::capture();
        let mut cfg = RunConfig::new(api, mode);
        cfg.duration = Duration::from_millis(50);
        let ctx = Context::new(&cfg).unwrap().with_console(console.clone());
        (ctx, console)
    }

    #[test]
    fn ordering_accepts_equal_and_increasing_reads() {
        let a = ts(5, 100);
        let b = ts(5, 100);
        let c = ts(5, 200);
        assert_eq!(ordering_violation("c", &a, &b, &c, 0), None);
    }

    #[test]
    fn ordering_flags_fast_path_running_ahead() {
        let msg = ordering_violation("clk", &ts(2, 0), &ts(1, 999_999_999), &ts(2, 1), 0).unwrap();
        assert_eq!(
            msg,
            "clk: vdso time 2.000000000 is ahead of subsequent syscall time 1.999999999"
        );
        let msg = ordering_violation("clk", &ts(1, 0), &ts(3, 0), &ts(2, 0), 0).unwrap();
        assert!(msg.contains("syscall time 3.000000000 is ahead"));
    }

    #[test]
    fn coarse_slack_absorbs_one_tick() {
        let tick = 4_000_000;
        assert_eq!(
            ordering_violation("c", &ts(1, 4_000_000), &ts(1, 0), &ts(1, 4_000_000), tick),
            None
        );
        assert!(ordering_violation("c", &ts(1, 8_000_001), &ts(1, 0), &ts(1, 0), tick).is_some());
    }

    #[test]
    fn tv_nsec_range() {
        assert!(normalized(&ts(0, 999_999_999)));
        assert!(!normalized(&ts(0, 1_000_000_000)));
        assert!(!normalized(&ts(0, -1)));
    }

    #[test]
    fn every_clock_verifies_cleanly() {
        for spec in CLOCKS {
            let (mut c, console) = ctx(spec.name, "verify");
            verify(&mut c, spec).unwrap();
            c.cancel_timer().unwrap();
            assert_eq!(c.fails(), 0, "{}: {}", spec.name, console.stderr_text());
        }
    }

    #[test]
    fn bench_fills_both_intervals() {
        let spec = CLOCKS[0];
        let (mut c, _) = ctx(spec.name, "bench");
        let mut bres = BenchResults::default();
        bench(&mut c, &mut bres, spec).unwrap();
        assert!(bres.sys_interval.calls > 0);
        assert!(bres.vdso_interval.calls > 0);
        assert!(bres.speedup().is_some());
    }

    #[test]
    fn abi_agrees_on_invalid_ids() {
        for spec in CLOCKS {
            let (mut c, console) = ctx(spec.name, "abi");
            abi(&mut c, spec).unwrap();
            assert_eq!(c.fails(), 0, "{}: {}", spec.name, console.stderr_text());
        }
    }

    #[test]
    fn registers_all_four_clocks() {
        let mut suites = SuiteRegistry::new();
        register(&mut suites);
        assert_eq!(
            suites.names().collect::<Vec<_>>(),
            [
                "clock-monotonic",
                "clock-monotonic-coarse",
                "clock-realtime",
                "clock-realtime-coarse"
            ]
        );
    }
}
