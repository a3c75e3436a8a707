//! `getcpu` suite: `sched_getcpu` against `SYS_getcpu`.
//!
//! The scheduler may migrate the caller between any two reads, so the paths
//! are only required to agree when the fast path reports the same CPU on
//! both sides of the kernel read.

use vdsotest_core::phase;
use vdsotest_core::{BenchResults, Context, HarnessError, TestSuite};

use crate::ffi::{self, Path};
use crate::timed;

pub const NAME: &str = "getcpu";

pub fn suite() -> TestSuite {
    TestSuite::new(NAME)
        .with_verify(verify)
        .with_bench(bench)
        .with_abi(abi)
}

fn verify(ctx: &mut Context) -> Result<(), HarnessError> {
    let cpus = ctx.cpus_allowed();
    let listed: Vec<String> = cpus.iter().map(|cpu| cpu.to_string()).collect();
    ctx.verbose(format_args!(
        "{NAME}: {} CPUs in affinity set: {}",
        cpus.count(),
        listed.join(",")
    ));
    phase::run_checks(ctx, check_once)?;
    Ok(())
}

fn check_once(ctx: &mut Context) {
    let reads = [Path::Vdso, Path::Syscall, Path::Vdso].map(|path| (path, ffi::getcpu(path)));

    let mut cpus = [0u32; 3];
    for (slot, (path, read)) in cpus.iter_mut().zip(reads) {
        match read {
            Ok(cpu) => *slot = cpu,
            Err(err) => {
                ctx.report_failure(format_args!("{NAME}: {path} getcpu: {err}"));
                return;
            }
        }
    }
    let [before, kernel, after] = cpus;

    for (path, cpu) in [(Path::Vdso, before), (Path::Syscall, kernel), (Path::Vdso, after)] {
        if !ctx.cpus_allowed().contains(cpu as usize) {
            ctx.report_failure(format_args!(
                "{NAME}: {path} reported CPU {cpu}, which is outside the affinity set"
            ));
            return;
        }
    }

    if before == after && kernel != before {
        ctx.report_failure(format_args!(
            "{NAME}: syscall reported CPU {kernel} between two vdso reads of CPU {before}"
        ));
    }
}

fn bench(ctx: &mut Context, bres: &mut BenchResults) -> Result<(), HarnessError> {
    bres.sys_interval = timed::phase(ctx, NAME, Path::Syscall, ffi::getcpu)?;
    bres.vdso_interval = timed::phase(ctx, NAME, Path::Vdso, ffi::getcpu)?;
    Ok(())
}

/// NULL `cpu` and `node` pointers are legal for the kernel; each combination
/// must succeed, and the CPU it reports must match a bracketing fast-path read.
fn abi(ctx: &mut Context) -> Result<(), HarnessError> {
    for (want_cpu, want_node) in [(false, false), (true, false), (false, true), (true, true)] {
        let before = ffi::getcpu(Path::Vdso);
        let (raw, cpu, _) = ffi::getcpu_syscall(want_cpu, want_node);
        let after = ffi::getcpu(Path::Vdso);
        ctx.debug(format_args!("getcpu(cpu={want_cpu}, node={want_node}) = {raw}"));

        if !raw.is_ok() {
            ctx.report_failure(format_args!(
                "{NAME}: syscall with cpu={} node={} returned {raw}",
                ptr_label(want_cpu),
                ptr_label(want_node)
            ));
            continue;
        }
        match (before, cpu, after) {
            (Ok(b), Some(k), Ok(a)) if b == a && b != k => ctx.report_failure(format_args!(
                "{NAME}: syscall reported CPU {k}, vdso reported {b}"
            )),
            (Err(err), _, _) | (_, _, Err(err)) => {
                ctx.report_failure(format_args!("{NAME}: vdso getcpu: {err}"));
            }
            _ => {}
        }
    }
    Ok(())
}

fn ptr_label(wanted: bool) -> &'static str {
    if wanted { "valid" } else { "NULL" }
}
