//! The tagged union of agent transition tasks and
//! message-board tasks, each carrying its access-control list.

use std::collections::HashSet;
use std::sync::Arc;

use flame_core::FlameResult;
use flame_api::{AgentStatus, FlameContext, TransitionFn};
use flame_mb::{MessageBoardManager, MessageClient};
use flame_mem::AgentShadow;

/// Routing taxonomy a task kind maps to a queue, per the original
/// implementation's `Task::TaskType` enum (generalized to the three kinds
/// this core cares about; model-authoring kinds like `xcondition` stay out
/// of scope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    AgentFunction,
    MessageSync,
    MessageClear,
}

/// The operation a [`MessageBoardTask`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardOp {
    Sync,
    Clear,
}

/// An agent transition task: the user function `fn`, its shadow (the
/// variable ACL), its message ACLs, and — if this is a subtask produced by
/// the splitter — the row range it owns.
#[derive(Clone)]
pub struct AgentTask {
    pub(crate) name: String,
    pub(crate) agent_name: String,
    func: TransitionFn,
    shadow: Arc<AgentShadow>,
    post_msgs: Arc<HashSet<String>>,
    read_msgs: Arc<HashSet<String>>,
    is_split: bool,
    offset: usize,
    count: usize,
}

impl AgentTask {
    pub(crate) fn new(
        name: String,
        agent_name: String,
        func: TransitionFn,
        shadow: Arc<AgentShadow>,
        post_msgs: Arc<HashSet<String>>,
        read_msgs: Arc<HashSet<String>>,
    ) -> Self {
        Self { name, agent_name, func, shadow, post_msgs, read_msgs, is_split: false, offset: 0, count: 0 }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn is_split(&self) -> bool {
        self.is_split
    }

    /// The population size of the underlying agent memory (unsplit size,
    /// not this task's own window).
    pub fn population_size(&self) -> FlameResult<usize> {
        self.shadow.memory().population_size()
    }

    /// This task's own row count: the full population unless [`is_split`](Self::is_split).
    pub(crate) fn row_count(&self) -> FlameResult<usize> {
        if self.is_split {
            Ok(self.count)
        } else {
            self.population_size()
        }
    }

    /// A subtask over `[offset, offset + count)`, sharing this task's
    /// shadow, function and ACLs.
    pub(crate) fn child(&self, offset: usize, count: usize) -> AgentTask {
        AgentTask {
            name: format!("{}#{offset}", self.name),
            agent_name: self.agent_name.clone(),
            func: Arc::clone(&self.func),
            shadow: Arc::clone(&self.shadow),
            post_msgs: Arc::clone(&self.post_msgs),
            read_msgs: Arc::clone(&self.read_msgs),
            is_split: true,
            offset,
            count,
        }
    }

    /// 1. Acquire a memory iterator (full population, or `[offset,
    ///    offset+count)` if split).
    /// 2. Acquire a message client scoped to this task's ACLs.
    /// 3. For each row, build the facade and invoke `fn`, honoring
    ///    `Alive`/`Dead`.
    /// 4. Step the iterator; stop at end.
    pub fn run(&self, board_manager: &Arc<MessageBoardManager>) -> FlameResult<()> {
        let mut it = if self.is_split {
            self.shadow.memory_iterator_windowed(self.offset, self.count)?
        } else {
            self.shadow.memory_iterator()?
        };
        let client = MessageClient::new(
            Arc::clone(board_manager),
            (*self.post_msgs).clone(),
            (*self.read_msgs).clone(),
        );
        while !it.at_end() {
            let ctx = FlameContext::new(&self.shadow, &it, &client);
            let status = (self.func)(&ctx)?;
            if status == AgentStatus::Dead {
                self.shadow.memory().mark_dead(it.current_row());
            }
            it.step();
        }
        Ok(())
    }
}

/// A board-lifecycle task: dispatches `Sync` or `Clear` on a named board.
#[derive(Debug, Clone)]
pub struct MessageBoardTask {
    pub(crate) name: String,
    pub(crate) board_name: String,
    pub(crate) op: BoardOp,
}

impl MessageBoardTask {
    pub fn new(name: impl Into<String>, board_name: impl Into<String>, op: BoardOp) -> Self {
        Self { name: name.into(), board_name: board_name.into(), op }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run(&self, board_manager: &MessageBoardManager) -> FlameResult<()> {
        match self.op {
            BoardOp::Sync => board_manager.sync(&self.board_name),
            BoardOp::Clear => board_manager.clear(&self.board_name),
        }
    }
}

/// Tagged union of agent and board tasks.
#[derive(Clone)]
pub enum Task {
    Agent(AgentTask),
    Board(MessageBoardTask),
}

impl Task {
    pub fn name(&self) -> &str {
        match self {
            Task::Agent(t) => t.name(),
            Task::Board(t) => t.name(),
        }
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            Task::Agent(_) => TaskKind::AgentFunction,
            Task::Board(t) => match t.op {
                BoardOp::Sync => TaskKind::MessageSync,
                BoardOp::Clear => TaskKind::MessageClear,
            },
        }
    }

    pub fn run(&self, board_manager: &Arc<MessageBoardManager>) -> FlameResult<()> {
        match self {
            Task::Agent(t) => t.run(board_manager),
            Task::Board(t) => t.run(board_manager),
        }
    }
}
