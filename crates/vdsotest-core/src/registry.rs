//! Suite and mode registries.
//!
//! Both are filled by an explicit start-up routine before the command line
//! is parsed, then only read. Keys are unique: registering a name twice is a
//! bug in the caller and panics.

use std::collections::BTreeMap;

use crate::modes::{self, Dispatcher};
use crate::suite::TestSuite;

#[derive(Debug, Default)]
pub struct SuiteRegistry {
    suites: BTreeMap<String, TestSuite>,
}

impl SuiteRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `suite` under its own name.
    ///
    /// # Panics
    ///
    /// If a suite with the same name is already registered.
    pub fn register(&mut self, suite: TestSuite) {
        let name = suite.name().to_string();
        assert!(
            !self.suites.contains_key(&name),
            "test suite '{name}' registered twice"
        );
        self.suites.insert(name, suite);
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&TestSuite> {
        self.suites.get(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.suites.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.suites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ModeRegistry {
    modes: BTreeMap<&'static str, Dispatcher>,
}

impl ModeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `verify`, `bench` and `abi`.
    #[must_use]
    pub fn with_builtin_modes() -> Self {
        let mut modes = Self::new();
        modes::register_builtin_modes(&mut modes);
        modes
    }

    /// # Panics
    ///
    /// If `name` is already registered.
    pub fn register(&mut self, name: &'static str, dispatcher: Dispatcher) {
        let prev = self.modes.insert(name, dispatcher);
        assert!(prev.is_none(), "test mode '{name}' registered twice");
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Dispatcher> {
        self.modes.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.modes.keys().copied()
    }
}

/// Both registries, frozen for the rest of the process.
#[derive(Debug)]
pub struct Registries {
    pub suites: SuiteRegistry,
    pub modes: ModeRegistry,
}

impl Registries {
    #[must_use]
    pub fn new(suites: SuiteRegistry, modes: ModeRegistry) -> Self {
        Self { suites, modes }
    }

    /// Usage text listing every valid API and test type.
    #[must_use]
    pub fn usage_doc(&self) -> String {
        let mut doc = String::from("where API must be one of:\n");
        for name in self.suites.names() {
            doc.push('\t');
            doc.push_str(name);
            doc.push('\n');
        }
        doc.push_str("and TEST-TYPE must be one of:\n");
        for name in self.modes.names() {
            doc.push('\t');
            doc.push_str(name);
            doc.push('\n');
        }
        doc
    }
}
