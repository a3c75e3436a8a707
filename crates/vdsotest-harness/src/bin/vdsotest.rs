//! CLI entrypoint for vdsotest.

use std::process::ExitCode;

use vdsotest_core::Console;
use vdsotest_harness::{CliError, cli, startup};

fn main() -> ExitCode {
    let registries = startup::registries();
    let status = match cli::run_with_args(&registries, std::env::args_os(), Console::stdio()) {
        Ok(verdict) => verdict.exit_code,
        Err(CliError::Usage(err)) => {
            let _ = err.print();
            CliError::Usage(err).exit_code()
        }
        Err(err) => {
            eprintln!("vdsotest: {err}");
            err.exit_code()
        }
    };
    ExitCode::from(u8::try_from(status).unwrap_or(1))
}
