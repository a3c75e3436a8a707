//! Human-facing output streams.
//!
//! Dispatchers and suites never call `println!` directly; they go through the
//! context's [`Console`] so integration tests can capture exactly what a run
//! would have printed.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Clone)]
enum Sink {
    Stdout,
    Stderr,
    Buffer(Arc<Mutex<Vec<u8>>>),
}

impl Sink {
    fn write_line(&self, args: fmt::Arguments<'_>) {
        // Output errors (closed pipe) must not turn into counted failures.
        match self {
            Self::Stdout => {
                let _ = writeln!(std::io::stdout().lock(), "{args}");
            }
            Self::Stderr => {
                let _ = writeln!(std::io::stderr().lock(), "{args}");
            }
            Self::Buffer(buf) => {
                let _ = writeln!(buf.lock(), "{args}");
            }
        }
    }

    fn text(&self) -> String {
        match self {
            Self::Buffer(buf) => String::from_utf8_lossy(&buf.lock()).into_owned(),
            Self::Stdout | Self::Stderr => String::new(),
        }
    }
}

/// Standard output / standard error pair.
#[derive(Clone)]
pub struct Console {
    out: Sink,
    err: Sink,
}

impl Console {
    /// Write to the process's real stdout and stderr.
    #[must_use]
    pub fn stdio() -> Self {
        Self {
            out: Sink::Stdout,
            err: Sink::Stderr,
        }
    }

    /// Write into in-memory buffers. Clones share the same buffers.
    #[must_use]
    pub fn capture() -> Self {
        Self {
            out: Sink::Buffer(Arc::new(Mutex::new(Vec::new()))),
            err: Sink::Buffer(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    pub fn println(&self, args: fmt::Arguments<'_>) {
        self.out.write_line(args);
    }

    pub fn eprintln(&self, args: fmt::Arguments<'_>) {
        self.err.write_line(args);
    }

    /// Captured stdout; empty for [`Console::stdio`].
    #[must_use]
    pub fn stdout_text(&self) -> String {
        self.out.text()
    }

    /// Captured stderr; empty for [`Console::stdio`].
    #[must_use]
    pub fn stderr_text(&self) -> String {
        self.err.text()
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::stdio()
    }
}
