//! Run configuration.
//!
//! A [`RunConfig`] is resolved from three layers, highest priority first:
//! command-line flags (applied by the harness binary), environment variables,
//! then the built-in defaults below.
//!
//! - `VDSOTEST_LOG`: path of the structured JSONL event log.
//! - `VDSOTEST_MAXFAILS`: failure threshold (decimal or `0x` hex).

use std::path::PathBuf;
use std::time::Duration;

use crate::error::HarnessError;

/// Default per-run deadline before bench halving.
pub const DEFAULT_DURATION: Duration = Duration::from_secs(1);
/// Default number of failures after which a run stops early.
pub const DEFAULT_MAX_FAILS: u64 = 10;
/// Longest deadline a 32-bit `time_t` timer can be armed with.
pub const MAX_DURATION: Duration = Duration::from_secs(i32::MAX as u64);

pub const LOG_ENV: &str = "VDSOTEST_LOG";
pub const MAXFAILS_ENV: &str = "VDSOTEST_MAXFAILS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Registered suite name, e.g. `clock-monotonic`.
    pub api: String,
    /// Registered mode name: `verify`, `bench` or `abi`.
    pub mode: String,
    pub duration: Duration,
    pub max_fails: u64,
    pub verbose: bool,
    /// Implies `verbose`. Adds output on measured paths, so bench rates suffer.
    pub debug: bool,
    pub log_path: Option<PathBuf>,
}

impl RunConfig {
    #[must_use]
    pub fn new(api: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            api: api.into(),
            mode: mode.into(),
            duration: DEFAULT_DURATION,
            max_fails: DEFAULT_MAX_FAILS,
            verbose: false,
            debug: false,
            log_path: None,
        }
    }

    /// Apply `VDSOTEST_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self, HarnessError> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    fn apply_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, HarnessError> {
        if let Some(path) = lookup(LOG_ENV).filter(|v| !v.trim().is_empty()) {
            self.log_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup(MAXFAILS_ENV) {
            self.max_fails = parse_count(&raw)
                .map_err(|err| HarnessError::Config(format!("{MAXFAILS_ENV}: {err}")))?;
        }
        Ok(self)
    }

    #[must_use]
    pub fn with_duration_secs(mut self, secs: u64) -> Self {
        self.duration = Duration::from_secs(secs);
        self
    }

    #[must_use]
    pub fn with_max_fails(mut self, max_fails: u64) -> Self {
        self.max_fails = max_fails;
        self
    }

    #[must_use]
    pub fn verbose_enabled(&self) -> bool {
        self.verbose || self.debug
    }

    /// Reject configurations the deadline timer cannot honor.
    ///
    /// A zero delay would disarm the POSIX timer instead of arming it, leaving
    /// bench loops without an end. Delays past [`MAX_DURATION`] do not fit the
    /// timer's `tv_sec`.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.duration.is_zero() {
            return Err(HarnessError::Config(
                "duration must be at least 1 second".to_string(),
            ));
        }
        if self.duration > MAX_DURATION {
            return Err(HarnessError::Config(format!(
                "duration must be at most {} seconds",
                MAX_DURATION.as_secs()
            )));
        }
        if self.api.is_empty() || self.mode.is_empty() {
            return Err(HarnessError::Config(
                "both API and TEST-TYPE must be given".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse a count given as decimal or `0x`-prefixed hex, `_` separators allowed.
pub fn parse_count(raw: &str) -> Result<u64, HarnessError> {
    let s = raw.trim();
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(&hex.replace('_', ""), 16)
    } else {
        s.replace('_', "").parse::<u64>()
    };
    parsed.map_err(|err| HarnessError::Config(format!("'{raw}' is not a count: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = RunConfig::new("getcpu", "verify");
        assert_eq!(cfg.duration, Duration::from_secs(1));
        assert_eq!(cfg.max_fails, 10);
        assert!(!cfg.verbose_enabled());
        assert!(cfg.log_path.is_none());
    }

    #[test]
    fn debug_implies_verbose() {
        let mut cfg = RunConfig::new("getcpu", "verify");
        cfg.debug = true;
        assert!(cfg.verbose_enabled());
    }

    #[test]
    fn parse_count_accepts_decimal_and_hex() {
        assert_eq!(parse_count("10").unwrap(), 10);
        assert_eq!(parse_count(" 1_000 ").unwrap(), 1000);
        assert_eq!(parse_count("0x10").unwrap(), 16);
        assert_eq!(parse_count("0XdEaD_bEeF").unwrap(), 0xdead_beef);
        assert!(parse_count("ten").is_err());
        assert!(parse_count("-1").is_err());
    }

    #[test]
    fn env_overrides_fill_log_path_and_threshold() {
        let cfg = RunConfig::new("gettimeofday", "bench")
            .apply_env(|key| match key {
                LOG_ENV => Some("/tmp/run.jsonl".to_string()),
                MAXFAILS_ENV => Some("0x20".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(cfg.log_path, Some(PathBuf::from("/tmp/run.jsonl")));
        assert_eq!(cfg.max_fails, 32);
    }

    #[test]
    fn blank_log_env_is_ignored() {
        let cfg = RunConfig::new("getcpu", "abi")
            .apply_env(|key| (key == LOG_ENV).then(|| "  ".to_string()))
            .unwrap();
        assert!(cfg.log_path.is_none());
    }

    #[test]
    fn malformed_threshold_env_is_a_config_error() {
        let err = RunConfig::new("getcpu", "abi")
            .apply_env(|key| (key == MAXFAILS_ENV).then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, HarnessError::Config(msg) if msg.starts_with(MAXFAILS_ENV)));
    }

    #[test]
    fn zero_duration_is_rejected() {
        let cfg = RunConfig::new("getcpu", "bench").with_duration_secs(0);
        assert!(matches!(cfg.validate(), Err(HarnessError::Config(_))));
        assert!(cfg.with_duration_secs(2).validate().is_ok());
    }

    #[test]
    fn duration_past_timer_range_is_rejected() {
        let cfg = RunConfig::new("getcpu", "bench").with_duration_secs(0x8000_0000_0000_0000);
        let Err(HarnessError::Config(msg)) = cfg.validate() else {
            panic!("expected a config error");
        };
        assert_eq!(msg, "duration must be at most 2147483647 seconds");
        assert!(cfg.clone().with_duration_secs(u64::MAX).validate().is_err());
        assert!(cfg.with_duration_secs(MAX_DURATION.as_secs()).validate().is_ok());
    }
}
