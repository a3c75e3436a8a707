//! Test-suite contract.
//!
//! A [`TestSuite`] is a named record with up to three optional entry points.
//! A missing entry point means "not implemented" for that mode, which is a
//! normal outcome and not an error.

use std::time::Duration;

use crate::context::Context;
use crate::error::HarnessError;

/// Entry points return `Err` only for fatal conditions (timer setup);
/// mismatches go through [`Context::report_failure`].
pub type CheckFn = Box<dyn Fn(&mut Context) -> Result<(), HarnessError>>;
pub type BenchFn = Box<dyn Fn(&mut Context, &mut BenchResults) -> Result<(), HarnessError>>;

pub struct TestSuite {
    name: String,
    verify: Option<CheckFn>,
    bench: Option<BenchFn>,
    abi: Option<CheckFn>,
}

impl TestSuite {
    /// A suite with no entry points.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            verify: None,
            bench: None,
            abi: None,
        }
    }

    /// Equivalence checks between fast path and kernel path.
    #[must_use]
    pub fn with_verify(
        mut self,
        f: impl Fn(&mut Context) -> Result<(), HarnessError> + 'static,
    ) -> Self {
        self.verify = Some(Box::new(f));
        self
    }

    /// Throughput of both paths. The entry point arms the deadline timer
    /// around each of its two phases.
    #[must_use]
    pub fn with_bench(
        mut self,
        f: impl Fn(&mut Context, &mut BenchResults) -> Result<(), HarnessError> + 'static,
    ) -> Self {
        self.bench = Some(Box::new(f));
        self
    }

    /// Calling-contract checks under edge-case and invalid arguments.
    #[must_use]
    pub fn with_abi(
        mut self,
        f: impl Fn(&mut Context) -> Result<(), HarnessError> + 'static,
    ) -> Self {
        self.abi = Some(Box::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn verify(&self) -> Option<&CheckFn> {
        self.verify.as_ref()
    }

    pub fn bench(&self) -> Option<&BenchFn> {
        self.bench.as_ref()
    }

    pub fn abi(&self) -> Option<&CheckFn> {
        self.abi.as_ref()
    }
}

impl std::fmt::Debug for TestSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestSuite")
            .field("name", &self.name)
            .field("verify", &self.verify.is_some())
            .field("bench", &self.bench.is_some())
            .field("abi", &self.abi.is_some())
            .finish()
    }
}

/// Calls completed during one timed phase.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BenchInterval {
    pub calls: u64,
    /// Wall-clock time the phase actually ran, not the configured deadline.
    pub elapsed: Duration,
}

impl BenchInterval {
    #[must_use]
    pub fn new(calls: u64, elapsed: Duration) -> Self {
        Self { calls, elapsed }
    }

    /// `calls / elapsed_seconds`; 0 when nothing was measured.
    #[must_use]
    pub fn calls_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if self.calls == 0 || secs <= 0.0 {
            return 0.0;
        }
        self.calls as f64 / secs
    }
}

/// Kernel-entry and fast-path phases of one bench run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BenchResults {
    pub sys_interval: BenchInterval,
    pub vdso_interval: BenchInterval,
}

impl BenchResults {
    /// Fast-path rate over kernel-entry rate; `None` if the kernel-entry rate is 0.
    #[must_use]
    pub fn speedup(&self) -> Option<f64> {
        let sys = self.sys_interval.calls_per_sec();
        if sys > 0.0 {
            Some(self.vdso_interval.calls_per_sec() / sys)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_entry_points_stay_distinct() {
        let suite = TestSuite::new("getcpu").with_verify(|_| Ok(()));
        assert_eq!(suite.name(), "getcpu");
        assert!(suite.verify().is_some());
        assert!(suite.bench().is_none());
        assert!(suite.abi().is_none());
        assert_eq!(
            format!("{suite:?}"),
            r#"TestSuite { name: "getcpu", verify: true, bench: false, abi: false }"#
        );
    }

    #[test]
    fn rate_is_calls_over_elapsed_seconds() {
        let iv = BenchInterval::new(1500, Duration::from_millis(750));
        assert!((iv.calls_per_sec() - 2000.0).abs() < 1e-9);
        let iv = BenchInterval::new(7, Duration::from_nanos(3));
        assert!((iv.calls_per_sec() - 7.0 / 3e-9).abs() / iv.calls_per_sec() < 1e-12);
    }

    #[test]
    fn zero_calls_or_zero_elapsed_rate_is_zero() {
        assert_eq!(BenchInterval::new(0, Duration::from_secs(1)).calls_per_sec(), 0.0);
        assert_eq!(BenchInterval::new(10, Duration::ZERO).calls_per_sec(), 0.0);
    }

    #[test]
    fn speedup_is_undefined_without_kernel_calls() {
        let mut res = BenchResults {
            sys_interval: BenchInterval::new(0, Duration::from_secs(1)),
            vdso_interval: BenchInterval::new(5000, Duration::from_secs(1)),
        };
        assert_eq!(res.speedup(), None);
        res.sys_interval.calls = 1000;
        assert!((res.speedup().unwrap() - 5.0).abs() < 1e-12);
    }
}
