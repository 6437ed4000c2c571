//! Execution contexts.
//!
//! An [`ExecutionContext`] fixes the worker pool geometry for a series of
//! dispatches. The worker count is part of every kernel's iteration contract
//! (worker `w` takes indices `w, w + count, ...`), so it is validated once
//! here instead of at every dispatch.

use snafu::ensure;

use crate::error::{Result, ZeroWorkersSnafu};

/// Default worker pool width.
pub const DEFAULT_WORKER_COUNT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    worker_count: usize,
}

impl ExecutionContext {
    /// Create a context with an explicit worker count.
    ///
    /// # Errors
    /// Fails on a zero worker count.
    pub fn new(worker_count: usize) -> Result<Self> {
        ensure!(worker_count > 0, ZeroWorkersSnafu);
        Ok(Self { worker_count })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self { worker_count: DEFAULT_WORKER_COUNT }
    }
}
