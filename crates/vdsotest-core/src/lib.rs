//! Core of the vdsotest harness.
//!
//! Compares the trap-free vDSO implementation of an operating-system service
//! against the kernel-entry implementation of the same operation:
//! - `verify`: do the two paths ever disagree?
//! - `bench`: how much faster is the fast path under sustained load?
//! - `abi`: does the fast path honor the calling contract on edge cases?
//!
//! Suites are opaque to this crate. They are registered through the
//! [`TestSuite`] contract and driven by [`driver::run`] with a deadline
//! enforced by a POSIX timer that sets the run's stop flag.

#![deny(unsafe_code)]

pub mod config;
pub mod console;
pub mod context;
pub mod driver;
pub mod error;
pub mod modes;
pub mod phase;
pub mod registry;
pub mod structured_log;
pub mod suite;
#[allow(unsafe_code)]
mod sys;
pub mod timer;

pub use config::{RunConfig, parse_count};
pub use console::Console;
pub use context::{Context, CpuSet};
pub use driver::Verdict;
pub use error::HarnessError;
pub use modes::{Dispatcher, Outcome};
pub use registry::{ModeRegistry, Registries, SuiteRegistry};
pub use suite::{BenchInterval, BenchResults, TestSuite};
