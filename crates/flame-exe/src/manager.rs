//! Owns tasks keyed by name and the inter-task
//! dependency multigraph.

use std::collections::HashMap;

use flame_core::{FlameError, FlameResult, TaskId};

use crate::task::{BoardOp, MessageBoardTask, Task};

/// Registry of tasks plus the dependency DAG (`u → v` means "v may not
/// begin until u has completed in this iteration"). Dense `TaskId`s index
/// directly into `tasks`/`dependents`/`static_indegree`.
pub struct TaskManager {
    tasks: Vec<Task>,
    name_to_id: HashMap<String, TaskId>,
    dependents: Vec<Vec<TaskId>>,
    static_indegree: Vec<usize>,
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskManager {
    pub fn new() -> Self {
        Self { tasks: Vec::new(), name_to_id: HashMap::new(), dependents: Vec::new(), static_indegree: Vec::new() }
    }

    fn insert(&mut self, name: &str, task: Task) -> FlameResult<TaskId> {
        if self.name_to_id.contains_key(name) {
            return Err(FlameError::LogicError(format!("task '{name}' already registered")));
        }
        let id = TaskId(self.tasks.len() as u32);
        self.name_to_id.insert(name.to_string(), id);
        self.tasks.push(task);
        self.dependents.push(Vec::new());
        self.static_indegree.push(0);
        Ok(id)
    }

    /// Register an already-built [`crate::task::AgentTask`].
    pub fn add_agent_task(&mut self, task: crate::task::AgentTask) -> FlameResult<TaskId> {
        let name = task.name().to_string();
        self.insert(&name, Task::Agent(task))
    }

    /// `CreateMessageBoardTask(task_name, board, op)`.
    pub fn add_board_task(
        &mut self,
        task_name: impl Into<String>,
        board_name: impl Into<String>,
        op: BoardOp,
    ) -> FlameResult<TaskId> {
        let task_name = task_name.into();
        let task = MessageBoardTask::new(task_name.clone(), board_name, op);
        self.insert(&task_name, Task::Board(task))
    }

    /// `AddDependency(successor_name, predecessor_name)`.
    ///
    /// Raises `UnknownVariable`-equivalent (`LogicError`) if either name
    /// isn't registered.
    pub fn add_dependency(&mut self, successor_name: &str, predecessor_name: &str) -> FlameResult<()> {
        let successor = self.task_id(successor_name)?;
        let predecessor = self.task_id(predecessor_name)?;
        self.dependents[predecessor.index()].push(successor);
        self.static_indegree[successor.index()] += 1;
        Ok(())
    }

    pub fn task_id(&self, name: &str) -> FlameResult<TaskId> {
        self.name_to_id
            .get(name)
            .copied()
            .ok_or_else(|| FlameError::LogicError(format!("task '{name}' not registered")))
    }

    pub fn task(&self, id: TaskId) -> &Task {
        &self.tasks[id.index()]
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub(crate) fn dependents(&self, id: TaskId) -> &[TaskId] {
        &self.dependents[id.index()]
    }

    pub(crate) fn static_indegree(&self, id: TaskId) -> usize {
        self.static_indegree[id.index()]
    }

    pub(crate) fn all_ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        (0..self.tasks.len() as u32).map(TaskId)
    }
}
