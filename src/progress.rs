//! Progress reporting
//!
//! Purely observational: the orchestrator and both search tracks report one unit per
//! stage/trial through this interface, and nothing they do depends on it.

/// Consumer of progress events.
pub trait ProgressReporter: Send {
    /// Label the work unit about to run (phase, stage/model name).
    fn annotate(&mut self, _phase: &str, _name: &str) {}

    /// One unit of work finished.
    fn advance(&mut self) {}
}

/// Reporter that discards everything. The default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressReporter for NullProgress {}

/// Reporter that logs through `tracing`.
#[derive(Debug, Default)]
pub struct LogProgress {
    completed: usize,
    current: String,
}

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressReporter for LogProgress {
    fn annotate(&mut self, phase: &str, name: &str) {
        self.current = format!("{} {}", phase, name);
        tracing::debug!(phase, name, "starting");
    }

    fn advance(&mut self) {
        self.completed += 1;
        tracing::info!(completed = self.completed, current = %self.current, "progress");
    }
}
