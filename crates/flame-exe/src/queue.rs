//! Task queues and their worker-thread pools.
//!
//! Both queue flavors share one `worker_loop`; they differ only in what
//! `enqueue` does before a task id reaches the channel — `SplittingFifoQueue`
//! may fan a single id out into several subtask work items that must
//! coalesce back into one completion signal.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;

use flame_core::TaskId;

use crate::manager::TaskManager;
use crate::splitter::TaskSplitter;
use crate::task::{Task, TaskKind};

/// Per-task-kind splitting parameters, shared (and live-mutable) across
/// every `SplittingFifoQueue` that routes that kind.
#[derive(Default)]
pub struct SplitConfig {
    splittable: HashSet<TaskKind>,
    min_vector_size: HashMap<TaskKind, usize>,
    max_subtasks: HashMap<TaskKind, usize>,
}

impl SplitConfig {
    pub fn set_splittable(&mut self, kind: TaskKind) {
        self.splittable.insert(kind);
    }

    pub fn set_min_vector_size(&mut self, kind: TaskKind, n: usize) {
        self.min_vector_size.insert(kind, n);
    }

    pub fn set_max_tasks_per_split(&mut self, kind: TaskKind, n: usize) {
        self.max_subtasks.insert(kind, n);
    }

    pub(crate) fn params(&self, kind: TaskKind) -> Option<(usize, usize)> {
        if !self.splittable.contains(&kind) {
            return None;
        }
        let min_vector_size = *self.min_vector_size.get(&kind).unwrap_or(&1);
        let max_subtasks = *self.max_subtasks.get(&kind).unwrap_or(&1);
        Some((max_subtasks, min_vector_size))
    }
}

/// Result delivered back to the scheduler once a (possibly split) task has
/// fully run, or failed.
pub struct TaskDone {
    pub task_id: TaskId,
    pub error: Option<flame_core::FlameError>,
}

/// One unit of work handed to a worker thread: a task to run, the parent
/// task id it reports completion under, and — if this work item is one of
/// several subtasks — the coalescer that turns N subtask completions into a
/// single `TaskDone`.
struct WorkItem {
    parent: TaskId,
    task: Task,
    coalescer: Option<Arc<SplitCoalescer>>,
}

enum QueueMessage {
    Run(WorkItem),
    Terminate,
}

/// Counts down as subtasks of one split finish; the last one to complete
/// (and only that one) is responsible for sending `TaskDone` for the parent.
struct SplitCoalescer {
    remaining: AtomicUsize,
    first_error: parking_lot::Mutex<Option<flame_core::FlameError>>,
}

impl SplitCoalescer {
    fn new(count: usize) -> Self {
        Self { remaining: AtomicUsize::new(count), first_error: parking_lot::Mutex::new(None) }
    }

    /// Records `result` and returns `true` exactly once — for whichever
    /// subtask happens to finish last.
    fn complete_one(&self, result: Result<(), flame_core::FlameError>) -> bool {
        if let Err(e) = result {
            let mut slot = self.first_error.lock();
            if slot.is_none() {
                *slot = Some(e);
            }
        }
        self.remaining.fetch_sub(1, Ordering::AcqRel) == 1
    }

    fn take_error(&self) -> Option<flame_core::FlameError> {
        self.first_error.lock().take()
    }
}

fn worker_loop(
    work_rx: Receiver<QueueMessage>,
    work_tx: Sender<QueueMessage>,
    done_tx: Sender<TaskDone>,
    board_manager: Arc<flame_mb::MessageBoardManager>,
) {
    loop {
        match work_rx.recv() {
            Ok(QueueMessage::Run(item)) => {
                let result = item.task.run(&board_manager);
                let report = match &item.coalescer {
                    Some(coalescer) => {
                        if coalescer.complete_one(result) {
                            Some(coalescer.take_error())
                        } else {
                            None
                        }
                    }
                    None => Some(result.err()),
                };
                if let Some(error) = report {
                    let _ = done_tx.send(TaskDone { task_id: item.parent, error });
                }
            }
            Ok(QueueMessage::Terminate) | Err(_) => {
                tracing::trace!(target: "exe.queue", "worker_terminate");
                // Wake exactly one sleeping peer before exiting, so a single
                // terminate signal cascades through every worker in the pool.
                let _ = work_tx.send(QueueMessage::Terminate);
                break;
            }
        }
    }
}

/// Shared behavior the scheduler drives: hand it a ready task id, it
/// eventually reports a `TaskDone` on the channel passed at construction.
pub trait TaskQueue: Send + Sync {
    fn enqueue(&self, task_id: TaskId);
    fn terminate(&self);
}

fn spawn_pool(
    slots: usize,
    done_tx: Sender<TaskDone>,
    board_manager: Arc<flame_mb::MessageBoardManager>,
) -> (Sender<QueueMessage>, Vec<JoinHandle<()>>) {
    let (tx, rx) = unbounded::<QueueMessage>();
    let handles = (0..slots.max(1))
        .map(|_| {
            let rx = rx.clone();
            let tx = tx.clone();
            let done_tx = done_tx.clone();
            let board_manager = Arc::clone(&board_manager);
            std::thread::spawn(move || worker_loop(rx, tx, done_tx, board_manager))
        })
        .collect();
    (tx, handles)
}

/// Plain FIFO queue: one `WorkItem` per enqueued task id, never split.
pub struct FifoQueue {
    tx: Sender<QueueMessage>,
    task_manager: Arc<TaskManager>,
    _handles: Vec<JoinHandle<()>>,
}

impl FifoQueue {
    pub fn new(
        slots: usize,
        task_manager: Arc<TaskManager>,
        board_manager: Arc<flame_mb::MessageBoardManager>,
        done_tx: Sender<TaskDone>,
    ) -> Self {
        let (tx, handles) = spawn_pool(slots, done_tx, board_manager);
        Self { tx, task_manager, _handles: handles }
    }
}

impl TaskQueue for FifoQueue {
    fn enqueue(&self, task_id: TaskId) {
        let task = self.task_manager.task(task_id).clone();
        let item = WorkItem { parent: task_id, task, coalescer: None };
        let _ = self.tx.send(QueueMessage::Run(item));
    }

    fn terminate(&self) {
        let _ = self.tx.send(QueueMessage::Terminate);
    }
}

/// FIFO queue that consults [`TaskSplitter`] before dispatch: an agent task
/// whose kind is marked splittable and whose population clears the
/// configured thresholds is broken into subtasks that run independently and
/// coalesce into one `TaskDone` for the original task id.
pub struct SplittingFifoQueue {
    tx: Sender<QueueMessage>,
    task_manager: Arc<TaskManager>,
    split_config: Arc<RwLock<SplitConfig>>,
    splitter: TaskSplitter,
    _handles: Vec<JoinHandle<()>>,
}

impl SplittingFifoQueue {
    pub fn new(
        slots: usize,
        task_manager: Arc<TaskManager>,
        board_manager: Arc<flame_mb::MessageBoardManager>,
        done_tx: Sender<TaskDone>,
        split_config: Arc<RwLock<SplitConfig>>,
    ) -> Self {
        let (tx, handles) = spawn_pool(slots, done_tx, board_manager);
        Self { tx, task_manager, split_config, splitter: TaskSplitter::new(), _handles: handles }
    }
}

impl TaskQueue for SplittingFifoQueue {
    fn enqueue(&self, task_id: TaskId) {
        let task = self.task_manager.task(task_id).clone();
        let Task::Agent(agent_task) = &task else {
            let item = WorkItem { parent: task_id, task, coalescer: None };
            let _ = self.tx.send(QueueMessage::Run(item));
            return;
        };

        let params = self.split_config.read().params(TaskKind::AgentFunction);
        let subtasks = params.and_then(|(max_subtasks, min_vector_size)| {
            self.splitter.maybe_split(agent_task, max_subtasks, min_vector_size).ok().flatten()
        });

        match subtasks {
            Some(subtasks) if subtasks.len() > 1 => {
                let coalescer = Arc::new(SplitCoalescer::new(subtasks.len()));
                for subtask in subtasks {
                    let item = WorkItem {
                        parent: task_id,
                        task: Task::Agent(subtask),
                        coalescer: Some(Arc::clone(&coalescer)),
                    };
                    let _ = self.tx.send(QueueMessage::Run(item));
                }
            }
            _ => {
                let item = WorkItem { parent: task_id, task, coalescer: None };
                let _ = self.tx.send(QueueMessage::Run(item));
            }
        }
    }

    fn terminate(&self) {
        let _ = self.tx.send(QueueMessage::Terminate);
    }
}
