//! Grid-stride work partitioning.
//!
//! A kernel invocation covers a flat iteration space of `total` work items
//! with a fixed number of workers. Worker `w` handles indices
//! `w, w + worker_count, w + 2 * worker_count, ...` - the grid-stride loop.
//! The union of all workers' index sets is exactly `[0, total)` with no
//! duplicates, which is what makes the partition safe without
//! synchronization for kernels with no cross-item dependencies.

/// One worker's slice of the grid-stride loop. Ephemeral: created per
/// dispatch, consumed by the kernel's apply loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkSpan {
    /// First index handled by this worker (its worker id).
    pub start: usize,
    /// Stride between consecutive indices (the worker count).
    pub step: usize,
    /// Exclusive upper bound of the iteration space.
    pub total: usize,
}

impl WorkSpan {
    /// The indices this span covers, in processing order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        (self.start..self.total).step_by(self.step)
    }
}

/// A full iteration space partitioned across a worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkRange {
    pub total: usize,
    pub worker_count: usize,
}

impl WorkRange {
    /// `worker_count` must be positive; the dispatcher validates this before
    /// constructing a range.
    pub fn new(total: usize, worker_count: usize) -> Self {
        debug_assert!(worker_count > 0);
        Self { total, worker_count }
    }

    /// One span per worker. Workers whose id is at or beyond `total` receive
    /// an empty span and fall straight through their loop.
    pub fn spans(&self) -> impl Iterator<Item = WorkSpan> + '_ {
        let (total, step) = (self.total, self.worker_count);
        (0..self.worker_count).map(move |start| WorkSpan { start, step, total })
    }
}
