//! Partitions an oversized [`AgentTask`] into balanced,
//! disjoint-range subtasks.

use flame_core::FlameResult;

use crate::task::AgentTask;

/// Stateless splitter — all parameters are passed per call, since
/// `min_vector_size`/`max_subtasks` are per-task-kind scheduler config that
/// can change between iterations.
#[derive(Default)]
pub struct TaskSplitter;

impl TaskSplitter {
    pub fn new() -> Self {
        Self
    }

    /// Decide whether `task` should be split, and if so produce its
    /// subtasks.
    ///
    /// - If `N < 2 * min_vector_size` or `max_subtasks <= 1`: returns
    ///   `None` (no split).
    /// - Else `k = min(max_subtasks, N / min_vector_size)`; partitions
    ///   `[0, N)` into `k` contiguous windows of size `N / k`, with the
    ///   first `N % k` windows taking one extra row.
    pub fn maybe_split(
        &self,
        task: &AgentTask,
        max_subtasks: usize,
        min_vector_size: usize,
    ) -> FlameResult<Option<Vec<AgentTask>>> {
        let n = task.population_size()?;
        if min_vector_size == 0 || n < 2 * min_vector_size || max_subtasks <= 1 {
            return Ok(None);
        }
        let k = max_subtasks.min(n / min_vector_size);
        if k <= 1 {
            return Ok(None);
        }

        let base = n / k;
        let extra = n % k;
        let mut subtasks = Vec::with_capacity(k);
        let mut offset = 0;
        for i in 0..k {
            let size = if i < extra { base + 1 } else { base };
            subtasks.push(task.child(offset, size));
            offset += size;
        }
        Ok(Some(subtasks))
    }
}
