//! Test suites shipped with vdsotest.
//!
//! Each suite pairs a libc entry point, which Linux serves from the vDSO,
//! with the raw system call for the same operation:
//! - `clock-monotonic`, `clock-monotonic-coarse`, `clock-realtime`,
//!   `clock-realtime-coarse`: `clock_gettime`
//! - `getcpu`: `sched_getcpu` / `SYS_getcpu`
//! - `gettimeofday`
//!
//! All raw calls live in [`ffi`]; timed bench phases in `timed`.

#![deny(unsafe_code)]

pub mod clock;
#[allow(unsafe_code)]
pub mod ffi;
pub mod getcpu;
pub mod gettimeofday;
mod timed;

use vdsotest_core::SuiteRegistry;

/// Register every shipped suite.
pub fn register_all(suites: &mut SuiteRegistry) {
    clock::register(suites);
    suites.register(getcpu::suite());
    suites.register(gettimeofday::suite());
}
