//! Paired entry points: the libc call (vDSO-backed on Linux) and the raw
//! `syscall(2)` for the same operation.
//!
//! Every function takes a [`Path`] so suites can run one check against both
//! implementations. Failures carry the host `errno`.

use std::ffi::c_int;
use std::fmt;
use std::io;
use std::ptr;

/// Which implementation serves a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Path {
    Vdso,
    Syscall,
}

impl Path {
    pub fn label(self) -> &'static str {
        match self {
            Self::Vdso => "vdso",
            Self::Syscall => "syscall",
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Return value and `errno` of a call, for contract comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReturn {
    pub ret: i64,
    /// 0 when `ret` is not negative.
    pub errno: i32,
}

impl RawReturn {
    fn capture(ret: i64) -> Self {
        let errno = if ret < 0 { last_errno() } else { 0 };
        Self { ret, errno }
    }

    pub fn is_ok(self) -> bool {
        self.ret == 0
    }
}

impl fmt::Display for RawReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ret < 0 {
            write!(
                f,
                "{} ({})",
                self.ret,
                io::Error::from_raw_os_error(self.errno)
            )
        } else {
            write!(f, "{}", self.ret)
        }
    }
}

fn last_errno() -> i32 {
    io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

fn check(raw: RawReturn) -> io::Result<()> {
    if raw.ret < 0 {
        return Err(io::Error::from_raw_os_error(raw.errno));
    }
    Ok(())
}

fn zero_timespec() -> libc::timespec {
    libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    }
}

fn clock_gettime_into(path: Path, clock: libc::clockid_t, ts: &mut libc::timespec) -> RawReturn {
    let ret = match path {
        Path::Vdso => i64::from(unsafe { libc::clock_gettime(clock, ts) }),
        Path::Syscall => i64::from(unsafe {
            libc::syscall(libc::SYS_clock_gettime, clock, ts as *mut libc::timespec)
        }),
    };
    RawReturn::capture(ret)
}

#[inline]
pub fn clock_gettime(path: Path, clock: libc::clockid_t) -> io::Result<libc::timespec> {
    let mut ts = zero_timespec();
    check(clock_gettime_into(path, clock, &mut ts))?;
    Ok(ts)
}

/// `clock_gettime` with a valid buffer, keeping only the return contract.
pub fn clock_gettime_raw(path: Path, clock: libc::clockid_t) -> RawReturn {
    let mut ts = zero_timespec();
    clock_gettime_into(path, clock, &mut ts)
}

pub fn clock_getres(path: Path, clock: libc::clockid_t) -> io::Result<libc::timespec> {
    let mut ts = zero_timespec();
    let ret = match path {
        Path::Vdso => i64::from(unsafe { libc::clock_getres(clock, &mut ts) }),
        Path::Syscall => i64::from(unsafe {
            libc::syscall(libc::SYS_clock_getres, clock, &mut ts as *mut libc::timespec)
        }),
    };
    check(RawReturn::capture(ret))?;
    Ok(ts)
}

/// CPU the caller is running on.
#[inline]
pub fn getcpu(path: Path) -> io::Result<u32> {
    match path {
        Path::Vdso => {
            let cpu = unsafe { libc::sched_getcpu() };
            if cpu < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(cpu as u32)
        }
        Path::Syscall => {
            let (raw, cpu, _) = getcpu_syscall(true, false);
            check(raw)?;
            Ok(cpu.unwrap_or_default())
        }
    }
}

/// `getcpu(cpu, node, NULL)` through `syscall(2)`, passing NULL for each
/// output the caller does not want.
pub fn getcpu_syscall(want_cpu: bool, want_node: bool) -> (RawReturn, Option<u32>, Option<u32>) {
    let mut cpu: u32 = 0;
    let mut node: u32 = 0;
    let cpu_ptr: *mut u32 = if want_cpu { &mut cpu } else { ptr::null_mut() };
    let node_ptr: *mut u32 = if want_node { &mut node } else { ptr::null_mut() };
    let ret = i64::from(unsafe {
        libc::syscall(
            libc::SYS_getcpu,
            cpu_ptr,
            node_ptr,
            ptr::null_mut::<libc::c_void>(),
        )
    });
    let raw = RawReturn::capture(ret);
    let keep = |wanted: bool, value: u32| (wanted && raw.is_ok()).then_some(value);
    (raw, keep(want_cpu, cpu), keep(want_node, node))
}

/// Kernel timezone as filled in by `gettimeofday`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timezone {
    pub minuteswest: c_int,
    pub dsttime: c_int,
}

fn zero_timeval() -> libc::timeval {
    libc::timeval {
        tv_sec: 0,
        tv_usec: 0,
    }
}

fn gettimeofday_into(
    path: Path,
    tv: *mut libc::timeval,
    tz: *mut Timezone,
) -> RawReturn {
    let ret = match path {
        Path::Vdso => i64::from(unsafe { libc::gettimeofday(tv, tz.cast()) }),
        Path::Syscall => i64::from(unsafe { libc::syscall(libc::SYS_gettimeofday, tv, tz) }),
    };
    RawReturn::capture(ret)
}

#[inline]
pub fn gettimeofday(path: Path) -> io::Result<libc::timeval> {
    let mut tv = zero_timeval();
    check(gettimeofday_into(path, &mut tv, ptr::null_mut()))?;
    Ok(tv)
}

/// `gettimeofday` asking for the timezone as well.
pub fn gettimeofday_tz(path: Path) -> io::Result<(libc::timeval, Timezone)> {
    let mut tv = zero_timeval();
    let mut tz = Timezone::default();
    check(gettimeofday_into(path, &mut tv, &mut tz))?;
    Ok((tv, tz))
}

/// `gettimeofday(NULL, NULL)` through `syscall(2)`.
///
/// Only the kernel path is exercised: libc wrappers are not required to
/// accept a NULL `tv`.
pub fn gettimeofday_null_syscall() -> RawReturn {
    gettimeofday_into(Path::Syscall, ptr::null_mut(), ptr::null_mut())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_paths_read_the_monotonic_clock() {
        for path in [Path::Vdso, Path::Syscall] {
            let ts = clock_gettime(path, libc::CLOCK_MONOTONIC).unwrap();
            assert!(ts.tv_sec > 0 || ts.tv_nsec > 0, "{path} returned zero");
        }
    }

    #[test]
    fn invalid_clock_reports_einval() {
        let raw = clock_gettime_raw(Path::Syscall, 1 << 20);
        assert_eq!(raw.ret, -1);
        assert_eq!(raw.errno, libc::EINVAL);
        assert!(clock_gettime(Path::Syscall, 1 << 20).is_err());
        assert!(raw.to_string().starts_with("-1 ("));
    }

    #[test]
    fn getcpu_syscall_honors_null_outputs() {
        let (raw, cpu, node) = getcpu_syscall(false, false);
        assert!(raw.is_ok());
        assert_eq!((cpu, node), (None, None));
        let (raw, cpu, node) = getcpu_syscall(true, true);
        assert!(raw.is_ok());
        assert!(cpu.is_some() && node.is_some());
    }

    #[test]
    fn gettimeofday_paths_and_null_arguments() {
        assert!(gettimeofday(Path::Vdso).unwrap().tv_sec > 0);
        assert!(gettimeofday_tz(Path::Syscall).is_ok());
        assert_eq!(gettimeofday_null_syscall(), RawReturn { ret: 0, errno: 0 });
    }

    #[test]
    fn path_labels() {
        assert_eq!(Path::Vdso.to_string(), "vdso");
        assert_eq!(Path::Syscall.label(), "syscall");
    }
}
