//! Command-line surface: `vdsotest [OPTIONS] <API> <TEST-TYPE>`.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches, Parser};
use thiserror::Error;
use vdsotest_core::{Console, Context, HarnessError, Registries, RunConfig, Verdict, driver};

#[derive(Debug, Parser)]
#[command(name = "vdsotest")]
#[command(about = "Verify and benchmark vDSO fast paths against their system calls")]
pub struct Cli {
    /// Test duration in whole seconds (decimal or 0x hex).
    #[arg(short = 'd', long, value_name = "SEC", value_parser = parse_count_arg)]
    pub duration: Option<u64>,
    /// Stop after this many failures (decimal or 0x hex) [env: VDSOTEST_MAXFAILS].
    #[arg(short = 'f', long, value_name = "NUM", value_parser = parse_count_arg)]
    pub maxfails: Option<u64>,
    /// Print extra information.
    #[arg(short = 'v', long)]
    pub verbose: bool,
    /// Print debug information; implies --verbose and perturbs bench results.
    #[arg(short = 'g', long)]
    pub debug: bool,
    /// Write a structured JSONL event log [env: VDSOTEST_LOG].
    #[arg(long, value_name = "PATH")]
    pub log: Option<PathBuf>,
    /// Interface under test.
    #[arg(value_name = "API")]
    pub api: String,
    /// One of verify, bench or abi.
    #[arg(value_name = "TEST-TYPE")]
    pub test_type: String,
}

fn parse_count_arg(raw: &str) -> Result<u64, String> {
    vdsotest_core::parse_count(raw).map_err(|err| err.to_string())
}

#[derive(Debug, Error)]
pub enum CliError {
    /// Bad arguments, or `--help` / `--version`.
    #[error(transparent)]
    Usage(#[from] clap::Error),
    #[error(transparent)]
    Run(#[from] HarnessError),
}

impl CliError {
    /// Status the process should exit with.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(err) if !err.use_stderr() => 0,
            _ => 1,
        }
    }
}

impl Cli {
    /// Parse `args` (program name first), listing registered names in `--help`.
    pub fn parse_with<I, T>(registries: &Registries, args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command()
            .after_help(registries.usage_doc())
            .try_get_matches_from(args)?;
        Self::from_arg_matches(&matches)
    }

    /// Defaults, then `VDSOTEST_*` environment, then flags.
    pub fn to_config(&self) -> Result<RunConfig, HarnessError> {
        let base = RunConfig::new(&self.api, &self.test_type).with_env_overrides()?;
        Ok(self.apply(base))
    }

    /// Overlay the flags that were given on `config`.
    #[must_use]
    pub fn apply(&self, mut config: RunConfig) -> RunConfig {
        if let Some(secs) = self.duration {
            config = config.with_duration_secs(secs);
        }
        if let Some(max_fails) = self.maxfails {
            config = config.with_max_fails(max_fails);
        }
        if let Some(path) = &self.log {
            config.log_path = Some(path.clone());
        }
        config.verbose |= self.verbose;
        config.debug |= self.debug;
        config
    }
}

/// Resolve configuration, build the run context and drive one run.
pub fn execute(
    registries: &Registries,
    cli: &Cli,
    console: Console,
) -> Result<Verdict, HarnessError> {
    let config = cli.to_config()?;
    let mut ctx = Context::new(&config)?.with_console(console);
    ctx.debug(format_args!("{config:?}"));
    driver::run(&mut ctx, registries)
}

/// Parse `args` and run. Used by the binary.
pub fn run_with_args<I, T>(
    registries: &Registries,
    args: I,
    console: Console,
) -> Result<Verdict, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_with(registries, args)?;
    Ok(execute(registries, &cli, console)?)
}
