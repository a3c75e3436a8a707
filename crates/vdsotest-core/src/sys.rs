//! Raw Linux interfaces: CPU affinity, the expiry signal handler and POSIX
//! interval timers.
//!
//! This is the only module in the crate that contains `unsafe` code. Callers
//! see `io::Result` values carrying the host `errno`.

use std::ffi::{c_int, c_void};
use std::io;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Real-time signal used for deadline expiry.
#[must_use]
#[allow(unused_unsafe)]
pub fn expiry_signal() -> c_int {
    unsafe { libc::SIGRTMAX() }
}

#[allow(unused_unsafe)]
fn cpu_isset(cpu: usize, set: &libc::cpu_set_t) -> bool {
    unsafe { libc::CPU_ISSET(cpu, set) }
}

/// CPUs the calling process may run on, in ascending order.
pub fn sched_affinity() -> io::Result<Vec<usize>> {
    let mut set = MaybeUninit::<libc::cpu_set_t>::zeroed();
    let rc = unsafe {
        libc::sched_getaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), set.as_mut_ptr())
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    let set = unsafe { set.assume_init() };
    let cpus = (0..libc::CPU_SETSIZE as usize)
        .filter(|&cpu| cpu_isset(cpu, &set))
        .collect();
    Ok(cpus)
}

/// Expiry handler. Exactly one store: no locking, allocation or output.
extern "C" fn on_expiry(_sig: c_int, info: *mut libc::siginfo_t, _uc: *mut c_void) {
    if info.is_null() {
        return;
    }
    let flag = unsafe { (*info).si_value().sival_ptr } as *const AtomicBool;
    if !flag.is_null() {
        unsafe { (*flag).store(true, Ordering::Relaxed) };
    }
}

/// Route the expiry signal to [`on_expiry`]. Safe to call repeatedly.
pub fn install_expiry_handler() -> io::Result<()> {
    let mut sa = unsafe { std::mem::zeroed::<libc::sigaction>() };
    sa.sa_sigaction = on_expiry as extern "C" fn(c_int, *mut libc::siginfo_t, *mut c_void)
        as libc::sighandler_t;
    sa.sa_flags = libc::SA_SIGINFO | libc::SA_RESTART;
    unsafe { libc::sigemptyset(&mut sa.sa_mask) };
    let rc = unsafe { libc::sigaction(expiry_signal(), &sa, std::ptr::null_mut()) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn to_timespec(d: Duration) -> libc::timespec {
    libc::timespec {
        tv_sec: libc::time_t::try_from(d.as_secs()).unwrap_or(libc::time_t::MAX),
        tv_nsec: d.subsec_nanos() as _,
    }
}

/// One-shot `CLOCK_MONOTONIC` timer whose expiry raises [`expiry_signal`]
/// carrying a pointer to a stop flag.
pub struct PosixTimer {
    id: libc::timer_t,
}

impl PosixTimer {
    /// Create a disarmed timer bound to `flag`.
    ///
    /// `flag` must stay valid for as long as a signal from this timer can be
    /// delivered; [`crate::timer::DeadlineTimer`] leaks one `Arc` reference to
    /// guarantee that.
    pub fn create(flag: *const AtomicBool) -> io::Result<Self> {
        let mut sev = unsafe { std::mem::zeroed::<libc::sigevent>() };
        sev.sigev_notify = libc::SIGEV_SIGNAL;
        sev.sigev_signo = expiry_signal();
        sev.sigev_value = libc::sigval {
            sival_ptr: flag as *mut c_void,
        };

        let mut id = MaybeUninit::<libc::timer_t>::uninit();
        let rc = unsafe { libc::timer_create(libc::CLOCK_MONOTONIC, &mut sev, id.as_mut_ptr()) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            id: unsafe { id.assume_init() },
        })
    }

    /// Arm for a single expiry after `delay`, replacing any pending expiry.
    ///
    /// A zero `delay` would disarm the timer, so it is raised to 1ns.
    pub fn arm(&self, delay: Duration) -> io::Result<()> {
        let delay = delay.max(Duration::from_nanos(1));
        self.settime(to_timespec(delay))
    }

    pub fn disarm(&self) -> io::Result<()> {
        self.settime(to_timespec(Duration::ZERO))
    }

    fn settime(&self, value: libc::timespec) -> io::Result<()> {
        let spec = libc::itimerspec {
            it_interval: to_timespec(Duration::ZERO),
            it_value: value,
        };
        let rc = unsafe { libc::timer_settime(self.id, 0, &spec, std::ptr::null_mut()) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for PosixTimer {
    fn drop(&mut self) {
        unsafe { libc::timer_delete(self.id) };
    }
}
