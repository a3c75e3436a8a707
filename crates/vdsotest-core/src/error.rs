//! Fatal error tier.
//!
//! Everything here terminates the process with a non-zero status. Counted
//! failures (fast/slow disagreements, ABI violations) never become a
//! `HarnessError`; they go through [`crate::Context::report_failure`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Unknown test suite '{0}' specified")]
    UnknownSuite(String),
    #[error("Unknown test function '{0}' specified")]
    UnknownMode(String),
    #[error("sched_getaffinity: {0}")]
    Affinity(#[source] std::io::Error),
    #[error("inherited CPU affinity set is empty")]
    EmptyAffinity,
    #[error("{op}: {source}")]
    Timer {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("structured log: {0}")]
    Log(#[from] std::io::Error),
}
