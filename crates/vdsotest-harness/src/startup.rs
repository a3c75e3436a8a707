//! Registry construction.

use vdsotest_core::{ModeRegistry, Registries, SuiteRegistry};

/// Every shipped suite and the three built-in modes.
///
/// Called once, before the command line is parsed, so that usage text can
/// list the valid names.
#[must_use]
pub fn registries() -> Registries {
    let mut suites = SuiteRegistry::new();
    vdsotest_suites::register_all(&mut suites);
    Registries::new(suites, ModeRegistry::with_builtin_modes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_names_are_registered() {
        let regs = registries();
        assert_eq!(
            regs.suites.names().collect::<Vec<_>>(),
            [
                "clock-monotonic",
                "clock-monotonic-coarse",
                "clock-realtime",
                "clock-realtime-coarse",
                "getcpu",
                "gettimeofday"
            ]
        );
        assert_eq!(regs.modes.names().collect::<Vec<_>>(), ["abi", "bench", "verify"]);
    }
}
