//! Script configuration.

use crate::stack::{RED_ZONE, STACK_PER_RECURSION};

/// Configuration for evaluating a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptConfig {
    /// Number of worker threads for `&` lines and stages (0 = auto-detect).
    pub worker_threads: usize,
    /// Grow the stack when less than this many bytes remain.
    pub stack_red_zone: usize,
    /// Bytes added each time the stack grows.
    pub stack_growth: usize,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        ScriptConfig {
            worker_threads: 0, // auto-detect
            stack_red_zone: RED_ZONE,
            stack_growth: STACK_PER_RECURSION,
        }
    }
}

impl ScriptConfig {
    /// A config whose pool has a single worker.
    pub fn single_threaded() -> Self {
        ScriptConfig {
            worker_threads: 1,
            ..Default::default()
        }
    }

    /// A config with the given worker count.
    pub fn with_threads(worker_threads: usize) -> Self {
        ScriptConfig {
            worker_threads,
            ..Default::default()
        }
    }

    /// Get the effective number of worker threads.
    pub fn effective_threads(&self) -> usize {
        if self.worker_threads == 0 {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        } else {
            self.worker_threads
        }
    }
}
