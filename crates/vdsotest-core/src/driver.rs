//! Resolve API and mode, dispatch, and map the result to an exit status.

use crate::context::Context;
use crate::error::HarnessError;
use crate::modes::Outcome;
use crate::registry::Registries;
use crate::structured_log::LogLevel;

/// Final state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub outcome: Outcome,
    pub fails: u64,
    pub exit_code: i32,
}

/// Run the suite and mode named by `ctx`.
///
/// Unknown names are rejected before any suite code runs.
pub fn run(ctx: &mut Context, registries: &Registries) -> Result<Verdict, HarnessError> {
    let suite = registries
        .suites
        .lookup(ctx.api())
        .ok_or_else(|| HarnessError::UnknownSuite(ctx.api().to_string()))?;
    let dispatch = registries
        .modes
        .lookup(ctx.mode())
        .ok_or_else(|| HarnessError::UnknownMode(ctx.mode().to_string()))?;

    let duration_ns = u64::try_from(ctx.duration().as_nanos()).unwrap_or(u64::MAX);
    let max_fails = ctx.max_fails();
    let cpus = ctx.cpus_allowed().count();
    ctx.log_event(LogLevel::Info, "run_start", |e| {
        e.with_details(serde_json::json!({
            "duration_ns": duration_ns,
            "max_fails": max_fails,
            "cpus_allowed": cpus,
        }))
    });
    ctx.debug(format_args!("{}/{}: dispatching", ctx.api(), ctx.mode()));

    let outcome = dispatch(ctx, suite)?;
    let verdict = conclude(ctx, outcome);

    ctx.log_event(LogLevel::Info, "run_end", |e| {
        e.with_outcome(verdict.outcome)
            .with_fails(verdict.fails)
            .with_exit_code(verdict.exit_code)
    });
    ctx.flush_log();
    Ok(verdict)
}

fn conclude(ctx: &Context, outcome: Outcome) -> Verdict {
    let console = ctx.console();
    let fails = ctx.fails();
    let exit_code = match outcome {
        Outcome::NotImplemented => {
            console.println(format_args!("{}/{}: unimplemented", ctx.api(), ctx.mode()));
            0
        }
        _ if fails > 0 => {
            console.println(format_args!(
                "{}/{}: {fails} failures/inconsistencies encountered",
                ctx.api(),
                ctx.mode()
            ));
            1
        }
        _ => 0,
    };
    Verdict {
        outcome,
        fails,
        exit_code,
    }
}
