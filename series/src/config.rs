//! Per-call tuning knobs for the multiplication engine.

/// Configuration consumed by one multiplication call.
///
/// There is no process-wide state: callers thread a configuration value into
/// every [`multiply`][crate::multiply] call, and the engine reads it once at
/// the start of the call.
#[derive(Clone, Debug)]
pub struct MulConfig {
    /// Upper bound on the number of worker threads. The engine additionally
    /// never uses more workers than the first operand has terms, and always
    /// runs single-threaded when invoked from inside one of its own workers.
    pub max_workers: usize,
    /// Minimum number of term-by-term products per worker; workloads smaller
    /// than this also skip the size-estimation pass.
    pub min_work_per_worker: u64,
    /// Number of randomized trials in the size-estimation pass.
    ///
    /// Like [`estimation_multiplier`][Self::estimation_multiplier], this is a
    /// heuristic knob: it only ever affects how well the result table is
    /// pre-sized, never the result itself.
    pub estimation_trials: usize,
    /// Safety factor applied to the squared mean collision-free run length.
    pub estimation_multiplier: u64,
}

impl Default for MulConfig {
    fn default() -> Self {
        MulConfig {
            max_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            min_work_per_worker: 100_000,
            estimation_trials: 10,
            estimation_multiplier: 4,
        }
    }
}

impl MulConfig {
    /// Returns a configuration that always runs single-threaded.
    pub fn serial() -> Self {
        MulConfig {
            max_workers: 1,
            ..Default::default()
        }
    }
}
