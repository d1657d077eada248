//! Wires queues to task kinds and drives one iteration
//! of the dependency graph to completion.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;

use flame_core::{FlameError, FlameResult, QueueId, TaskId};
use flame_mb::MessageBoardManager;

use crate::manager::TaskManager;
use crate::queue::{FifoQueue, SplitConfig, SplittingFifoQueue, TaskDone, TaskQueue};
use crate::task::TaskKind;

/// Flavor of worker pool a queue id names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    Fifo,
    SplittingFifo,
}

/// `CreateQueue`/`AssignType`/splitting-knobs configuration, applied before
/// the first `RunIteration`.
pub struct Scheduler {
    task_manager: Arc<TaskManager>,
    board_manager: Arc<MessageBoardManager>,
    queues: HashMap<QueueId, Arc<dyn TaskQueue>>,
    routing: HashMap<TaskKind, QueueId>,
    split_config: Arc<RwLock<SplitConfig>>,
    done_tx: Sender<TaskDone>,
    done_rx: Receiver<TaskDone>,
    next_queue_id: u32,
}

impl Scheduler {
    pub fn new(task_manager: Arc<TaskManager>, board_manager: Arc<MessageBoardManager>) -> Self {
        let (done_tx, done_rx) = unbounded();
        Self {
            task_manager,
            board_manager,
            queues: HashMap::new(),
            routing: HashMap::new(),
            split_config: Arc::new(RwLock::new(SplitConfig::default())),
            done_tx,
            done_rx,
            next_queue_id: 0,
        }
    }

    /// `CreateQueue(kind, slots)`.
    pub fn create_queue(&mut self, kind: QueueKind, slots: usize) -> QueueId {
        let id = QueueId(self.next_queue_id);
        self.next_queue_id += 1;
        let queue: Arc<dyn TaskQueue> = match kind {
            QueueKind::Fifo => Arc::new(FifoQueue::new(
                slots,
                Arc::clone(&self.task_manager),
                Arc::clone(&self.board_manager),
                self.done_tx.clone(),
            )),
            QueueKind::SplittingFifo => Arc::new(SplittingFifoQueue::new(
                slots,
                Arc::clone(&self.task_manager),
                Arc::clone(&self.board_manager),
                self.done_tx.clone(),
                Arc::clone(&self.split_config),
            )),
        };
        self.queues.insert(id, queue);
        id
    }

    /// `AssignType(queue_id, task_kind)`: route every task of `kind` to
    /// `queue_id`.
    pub fn assign_type(&mut self, queue_id: QueueId, kind: TaskKind) -> FlameResult<()> {
        if !self.queues.contains_key(&queue_id) {
            return Err(FlameError::InvalidArgument(format!("unknown queue {queue_id}")));
        }
        self.routing.insert(kind, queue_id);
        Ok(())
    }

    pub fn set_splittable(&self, kind: TaskKind) {
        self.split_config.write().set_splittable(kind);
    }

    pub fn set_min_vector_size(&self, kind: TaskKind, n: usize) {
        self.split_config.write().set_min_vector_size(kind, n);
    }

    pub fn set_max_tasks_per_split(&self, kind: TaskKind, n: usize) {
        self.split_config.write().set_max_tasks_per_split(kind, n);
    }

    fn queue_for(&self, kind: TaskKind) -> FlameResult<&Arc<dyn TaskQueue>> {
        let queue_id = self
            .routing
            .get(&kind)
            .ok_or_else(|| FlameError::LogicError(format!("no queue assigned to task kind {kind:?}")))?;
        Ok(self.queues.get(queue_id).expect("routed queue id always exists"))
    }

    /// Runs every task in the dependency graph exactly once, releasing each
    /// task to its routed queue as soon as its indegree reaches zero.
    ///
    /// On the first task error: stop releasing new tasks, but drain
    /// `TaskDone` for every task already dispatched before returning the
    /// error (in-flight work runs to completion; the graph is not abandoned
    /// mid-execution).
    pub fn run_iteration(&self) -> FlameResult<()> {
        let n = self.task_manager.len();
        if n == 0 {
            return Ok(());
        }
        tracing::debug!(target: "exe.scheduler", task_count = n, "run_iteration_start");

        let mut indegree: HashMap<TaskId, usize> =
            self.task_manager.all_ids().map(|id| (id, self.task_manager.static_indegree(id))).collect();

        let mut in_flight = 0usize;
        let mut first_error: Option<FlameError> = None;

        for id in self.task_manager.all_ids() {
            if indegree[&id] == 0 {
                self.dispatch(id)?;
                in_flight += 1;
            }
        }

        while in_flight > 0 {
            let done = self.done_rx.recv().map_err(|_| {
                FlameError::InternalConsistency("worker pool disconnected mid-iteration".into())
            })?;
            in_flight -= 1;

            if let Some(error) = done.error {
                tracing::error!(target: "exe.scheduler", task = ?done.task_id, %error, "task_failed");
                if first_error.is_none() {
                    first_error = Some(error);
                }
                // Already-dispatched siblings still finish; don't release
                // their dependents though.
                continue;
            }

            if first_error.is_some() {
                continue;
            }

            for &dependent in self.task_manager.dependents(done.task_id) {
                let remaining = indegree.get_mut(&dependent).expect("dependent id is valid");
                *remaining -= 1;
                if *remaining == 0 {
                    self.dispatch(dependent)?;
                    in_flight += 1;
                }
            }
        }
        debug_assert_eq!(in_flight, 0);
        tracing::debug!(target: "exe.scheduler", failed = first_error.is_some(), "run_iteration_end");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn dispatch(&self, id: TaskId) -> FlameResult<()> {
        let kind = self.task_manager.task(id).kind();
        self.queue_for(kind)?.enqueue(id);
        Ok(())
    }

    /// Sends one terminate signal into every queue; each worker that
    /// receives it re-sends it once before exiting, so the whole pool
    /// behind that queue unblocks from a single send (invariant: shutdown
    /// wakes every worker exactly once).
    pub fn shutdown(&self) {
        tracing::debug!(target: "exe.scheduler", queue_count = self.queues.len(), "shutdown");
        for queue in self.queues.values() {
            queue.terminate();
        }
    }
}
