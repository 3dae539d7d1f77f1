// src/logging.rs
//
// Logging sinks for the benchmark engine.
// - Logger:        trait consumed by the evaluation engine
// - NoopLogger:    discards all messages
// - ConsoleLogger: prints with nesting indentation
// - MemoryLogger:  captures messages for assertions in tests
//
// Engine behavior must not depend on which sink is installed; swapping in
// NoopLogger changes no results.

use std::cell::Cell;
use std::sync::Mutex;
use std::time::Instant;

/// Abstract message sink with optional scope nesting.
pub trait Logger {
    fn log(&self, message: &str);

    /// Called when a timed scope opens. Sinks that render nesting track
    /// depth here.
    fn enter(&self) {}

    /// Called when a timed scope closes.
    fn exit(&self) {}
}

/// Scoped log-with-timing guard.
///
/// Logs `message` on creation and `message (N.NN seconds)` when dropped,
/// bracketing the work done inside the scope.
pub struct TimedScope<'a> {
    logger: &'a dyn Logger,
    message: String,
    start: Instant,
}

impl<'a> TimedScope<'a> {
    pub fn new(logger: &'a dyn Logger, message: impl Into<String>) -> Self {
        let message = message.into();
        logger.log(&message);
        logger.enter();
        Self {
            logger,
            message,
            start: Instant::now(),
        }
    }
}

impl Drop for TimedScope<'_> {
    fn drop(&mut self) {
        self.logger.exit();
        let elapsed = self.start.elapsed().as_secs_f64();
        self.logger
            .log(&format!("{} ({:.2} seconds)", self.message, elapsed));
    }
}

/// Logger that discards all messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _message: &str) {
        // intentionally no-op
    }
}

/// Logger that prints to stdout, indenting nested scopes.
#[derive(Debug, Default)]
pub struct ConsoleLogger {
    depth: Cell<usize>,
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, message: &str) {
        println!("{}{}", "  ".repeat(self.depth.get()), message);
    }

    fn enter(&self) {
        self.depth.set(self.depth.get() + 1);
    }

    fn exit(&self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

/// Logger that records every message, for test assertions.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    lines: Mutex<Vec<String>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("logger mutex poisoned").clone()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, message: &str) {
        self.lines
            .lock()
            .expect("logger mutex poisoned")
            .push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_logger_captures_in_order() {
        let logger = MemoryLogger::new();
        logger.log("a");
        logger.log("b");
        assert_eq!(logger.lines(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_timed_scope_logs_open_and_close() {
        let logger = MemoryLogger::new();
        {
            let _scope = TimedScope::new(&logger, "working...");
            logger.log("inside");
        }

        let lines = logger.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "working...");
        assert_eq!(lines[1], "inside");
        assert!(lines[2].starts_with("working... ("));
        assert!(lines[2].ends_with("seconds)"));
    }

    #[test]
    fn test_noop_logger_accepts_scopes() {
        let logger = NoopLogger;
        let _scope = TimedScope::new(&logger, "ignored");
        logger.log("also ignored");
    }
}
