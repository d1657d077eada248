//! Fluent construction of an [`AgentTask`]'s access-control lists, mirroring
//! the driver-facing `CreateAgentTask(...) -> task handle` surface from the
//! external interface for building an agent task.

use std::collections::HashSet;
use std::sync::Arc;

use flame_core::{FlameError, FlameResult};
use flame_api::TransitionFn;
use flame_mb::MessageBoardManager;
use flame_mem::{AgentMemory, AgentShadow};

use crate::task::AgentTask;

/// Handle returned by `CreateAgentTask`; configure ACLs, then
/// [`build`](Self::build) to produce the frozen [`AgentTask`].
pub struct AgentTaskBuilder {
    name: String,
    agent_name: String,
    func: TransitionFn,
    shadow: AgentShadow,
    board_manager: Arc<MessageBoardManager>,
    post_msgs: HashSet<String>,
    read_msgs: HashSet<String>,
}

impl AgentTaskBuilder {
    pub fn new(
        name: impl Into<String>,
        agent_name: impl Into<String>,
        memory: Arc<AgentMemory>,
        board_manager: Arc<MessageBoardManager>,
        func: TransitionFn,
    ) -> Self {
        Self {
            name: name.into(),
            agent_name: agent_name.into(),
            func,
            shadow: AgentShadow::new(memory),
            board_manager,
            post_msgs: HashSet::new(),
            read_msgs: HashSet::new(),
        }
    }

    /// `AllowAccess(var, writable)`. Raises `UnknownVariable` if `var`
    /// isn't registered on the agent, `LogicError` on a duplicate grant.
    pub fn allow_access(&mut self, var: &str, writable: bool) -> FlameResult<&mut Self> {
        self.shadow.allow_access(var, writable)?;
        Ok(self)
    }

    /// `AllowMessagePost(board)`. Raises `InvalidArgument` if `board` isn't
    /// registered with the message board manager, `InvalidOperation` if
    /// `board` is already allowed for reading on this task (a board may
    /// appear in at most one of `{read_msgs, post_msgs}` per task).
    pub fn allow_message_post(&mut self, board: &str) -> FlameResult<&mut Self> {
        if !self.board_manager.board_exists(board) {
            return Err(FlameError::InvalidArgument(format!("unknown board '{board}'")));
        }
        if self.read_msgs.contains(board) {
            return Err(FlameError::InvalidOperation(format!(
                "board '{board}' already allowed for reading on this task"
            )));
        }
        self.post_msgs.insert(board.to_string());
        Ok(self)
    }

    /// `AllowMessageRead(board)`. Raises `InvalidArgument` if `board` isn't
    /// registered with the message board manager, `InvalidOperation` if
    /// `board` is already allowed for posting on this task.
    pub fn allow_message_read(&mut self, board: &str) -> FlameResult<&mut Self> {
        if !self.board_manager.board_exists(board) {
            return Err(FlameError::InvalidArgument(format!("unknown board '{board}'")));
        }
        if self.post_msgs.contains(board) {
            return Err(FlameError::InvalidOperation(format!(
                "board '{board}' already allowed for posting on this task"
            )));
        }
        self.read_msgs.insert(board.to_string());
        Ok(self)
    }

    pub fn build(self) -> AgentTask {
        AgentTask::new(
            self.name,
            self.agent_name,
            self.func,
            Arc::new(self.shadow),
            Arc::new(self.post_msgs),
            Arc::new(self.read_msgs),
        )
    }
}
