//! Run context and failure accounting.
//!
//! The [`Context`] is the only mutable state of a run. Suites receive it by
//! `&mut`; the deadline timer reaches only its stop flag.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::RunConfig;
use crate::console::Console;
use crate::error::HarnessError;
use crate::structured_log::{LogEmitter, LogEntry, LogLevel};
use crate::sys;
use crate::timer::DeadlineTimer;

/// CPUs a run may be scheduled on. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuSet {
    cpus: Vec<usize>,
}

impl CpuSet {
    /// The affinity inherited by this process.
    pub fn inherited() -> Result<Self, HarnessError> {
        Self::from_cpus(sys::sched_affinity().map_err(HarnessError::Affinity)?)
    }

    pub fn from_cpus(mut cpus: Vec<usize>) -> Result<Self, HarnessError> {
        if cpus.is_empty() {
            return Err(HarnessError::EmptyAffinity);
        }
        cpus.sort_unstable();
        cpus.dedup();
        Ok(Self { cpus })
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.cpus.len()
    }

    #[must_use]
    pub fn contains(&self, cpu: usize) -> bool {
        self.cpus.binary_search(&cpu).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.cpus.iter().copied()
    }
}

pub struct Context {
    api: String,
    mode: String,
    duration: Duration,
    max_fails: u64,
    fails: u64,
    threshold_noticed: bool,
    stop: Arc<AtomicBool>,
    verbose: bool,
    debug: bool,
    cpus_allowed: CpuSet,
    console: Console,
    log: Option<LogEmitter>,
    timer: Option<DeadlineTimer>,
}

impl Context {
    /// Build a context from a resolved configuration.
    ///
    /// Reads the inherited CPU affinity and opens the structured log if one
    /// was configured; either failing is fatal.
    pub fn new(config: &RunConfig) -> Result<Self, HarnessError> {
        config.validate()?;
        let cpus_allowed = CpuSet::inherited()?;
        let log = match &config.log_path {
            Some(path) => Some(LogEmitter::to_file(path, &run_id())?),
            None => None,
        };
        Ok(Self {
            api: config.api.clone(),
            mode: config.mode.clone(),
            duration: config.duration,
            max_fails: config.max_fails,
            fails: 0,
            threshold_noticed: false,
            stop: Arc::new(AtomicBool::new(false)),
            verbose: config.verbose_enabled(),
            debug: config.debug,
            cpus_allowed,
            console: Console::stdio(),
            log,
            timer: None,
        })
    }

    #[must_use]
    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    #[must_use]
    pub fn with_log(mut self, log: LogEmitter) -> Self {
        self.log = Some(log);
        self
    }

    #[must_use]
    pub fn with_cpus(mut self, cpus: CpuSet) -> Self {
        self.cpus_allowed = cpus;
        self
    }

    pub fn api(&self) -> &str {
        &self.api
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Delay applied by the next [`Context::start_timer`].
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub(crate) fn set_duration(&mut self, duration: Duration) {
        self.duration = duration;
    }

    pub fn max_fails(&self) -> u64 {
        self.max_fails
    }

    pub fn fails(&self) -> u64 {
        self.fails
    }

    pub fn cpus_allowed(&self) -> &CpuSet {
        &self.cpus_allowed
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Polled once per loop iteration by suites.
    #[inline]
    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Record a failure. Reaching the threshold sets the stop flag.
    pub fn report_failure(&mut self, message: impl fmt::Display) {
        let message = message.to_string();
        self.console.eprintln(format_args!("{message}"));
        self.fails += 1;
        let fails = self.fails;
        self.log_event(LogLevel::Warn, "failure", |e| {
            e.with_fails(fails)
                .with_details(serde_json::json!({ "message": message }))
        });

        if self.fails >= self.max_fails {
            self.stop.store(true, Ordering::Relaxed);
            if !self.threshold_noticed {
                self.threshold_noticed = true;
                self.console.eprintln(format_args!(
                    "Failure threshold ({}) reached; stopping test.",
                    self.max_fails
                ));
                self.log_event(LogLevel::Warn, "threshold_reached", |e| e.with_fails(fails));
            }
        }
    }

    /// Clear the stop flag and arm the deadline timer for [`Context::duration`].
    pub fn start_timer(&mut self) -> Result<(), HarnessError> {
        self.stop.store(false, Ordering::Relaxed);
        if self.timer.is_none() {
            self.timer = Some(DeadlineTimer::new(&self.stop)?);
        }
        match &self.timer {
            Some(timer) => timer.arm(self.duration),
            None => Ok(()),
        }
    }

    /// Disarm a pending deadline. The stop flag keeps its value.
    pub fn cancel_timer(&mut self) -> Result<(), HarnessError> {
        match &self.timer {
            Some(timer) => timer.disarm(),
            None => Ok(()),
        }
    }

    /// Print when `--verbose` or `--debug` is set.
    pub fn verbose(&self, args: fmt::Arguments<'_>) {
        if self.verbose {
            self.console.println(args);
        }
    }

    /// Print with the caller's `file:line` when `--debug` is set.
    #[track_caller]
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        if self.debug {
            let at = std::panic::Location::caller();
            self.console
                .println(format_args!("{}:{}: {args}", at.file(), at.line()));
        }
    }

    /// Emit a structured log entry tagged with this run's API and mode.
    ///
    /// A write error disables the log for the rest of the run.
    pub fn log_event(
        &mut self,
        level: LogLevel,
        event: &str,
        build: impl FnOnce(LogEntry) -> LogEntry,
    ) {
        let Some(log) = self.log.as_mut() else {
            return;
        };
        let entry = build(log.entry(level, event).with_run(&self.api, &self.mode));
        if let Err(err) = log.emit(&entry) {
            self.console
                .eprintln(format_args!("vdsotest: structured log disabled: {err}"));
            self.log = None;
        }
    }

    pub fn flush_log(&mut self) {
        if let Some(log) = self.log.as_mut() {
            let _ = log.flush();
        }
    }
}

fn run_id() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{}-{secs}", std::process::id())
}
