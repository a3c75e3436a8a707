//! Deadline timer.
//!
//! A one-shot monotonic timer that, on expiry, sets a stop flag and nothing
//! else. Measured loops poll the flag with a relaxed load per iteration; any
//! heavier synchronization would show up in the rates being compared.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crate::error::HarnessError;
use crate::sys::{self, PosixTimer};

pub struct DeadlineTimer {
    timer: PosixTimer,
}

impl DeadlineTimer {
    /// Install the expiry handler and create a disarmed timer bound to `stop`.
    pub fn new(stop: &Arc<AtomicBool>) -> Result<Self, HarnessError> {
        sys::install_expiry_handler().map_err(|source| HarnessError::Timer {
            op: "sigaction",
            source,
        })?;
        // The kernel may queue one last expiry signal that is delivered after
        // timer_delete, so the handler's reference is never reclaimed.
        let flag = Arc::into_raw(Arc::clone(stop));
        let timer = PosixTimer::create(flag).map_err(|source| HarnessError::Timer {
            op: "timer_create",
            source,
        })?;
        Ok(Self { timer })
    }

    pub fn arm(&self, delay: Duration) -> Result<(), HarnessError> {
        self.timer.arm(delay).map_err(|source| HarnessError::Timer {
            op: "timer_settime",
            source,
        })
    }

    pub fn disarm(&self) -> Result<(), HarnessError> {
        self.timer.disarm().map_err(|source| HarnessError::Timer {
            op: "timer_settime",
            source,
        })
    }
}
