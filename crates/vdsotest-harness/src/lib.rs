//! Command-line driver for vdsotest.
//!
//! - [`startup::registries`] builds the suite and mode registries.
//! - [`cli`] parses `vdsotest [OPTIONS] <API> <TEST-TYPE>`, resolves the run
//!   configuration and hands the run to the core driver.

#![forbid(unsafe_code)]

pub mod cli;
pub mod startup;

pub use cli::{Cli, CliError};
