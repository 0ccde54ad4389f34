use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct StepTimings {
    /// Time spent applying the step itself.
    pub apply: Duration,
    /// Time spent recording or publishing the result.
    pub publish: Duration,
    pub total: Duration,
}

/// Optional hook interface for capturing step timings.
///
/// Kept free of game-specific State/Input types so the same profiler works for
/// replay runners and live room loops.
pub trait Profiler {
    fn on_step(&mut self, _frame: u64, _timings: StepTimings) {}
}
