//! The accessor object passed into a transition
//! function, bound to one agent row and one message client.

use std::sync::Arc;

use flame_core::{FlameError, FlameResult};
use flame_mb::{Message, MessageClient, MessageIterator};
use flame_mem::{AgentShadow, MemoryIterator};

/// Row-survival contract a transition function returns. `Dead` marks the
/// row for later compaction; it does not remove it mid-iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Alive,
    Dead,
}

/// The object passed to a transition function.
///
/// Bound to the current row of `iter` and to `client`'s cached board
/// access. ACL checks happen here (readable/writable against the owning
/// shadow) before delegating to the iterator/client, which separately
/// enforce the type tag.
pub struct FlameContext<'a> {
    shadow: &'a AgentShadow,
    iter: &'a MemoryIterator<'a>,
    client: &'a MessageClient,
}

impl<'a> FlameContext<'a> {
    pub fn new(shadow: &'a AgentShadow, iter: &'a MemoryIterator<'a>, client: &'a MessageClient) -> Self {
        Self { shadow, iter, client }
    }

    /// Fetch the current row's value of `name` as `T`.
    ///
    /// Raises `AccessDenied` if `name` is not in the shadow's readable set,
    /// `TypeMismatch` if the stored type tag does not match `T`.
    pub fn get_mem<T: Clone + 'static>(&self, name: &str) -> FlameResult<T> {
        if !self.shadow.is_readable(name) {
            return Err(FlameError::AccessDenied(format!("variable '{name}' not readable")));
        }
        self.iter.get(name)
    }

    /// Write `value` into the current row's `name` column.
    ///
    /// Raises `AccessDenied` if `name` is not in the shadow's writable set,
    /// `TypeMismatch` if the stored type tag does not match `T`.
    pub fn set_mem<T: Clone + 'static>(&self, name: &str, value: T) -> FlameResult<()> {
        if !self.shadow.is_writable(name) {
            return Err(FlameError::AccessDenied(format!("variable '{name}' not writable")));
        }
        self.iter.set(name, value)
    }

    /// Post `msg` to `board` through this task's cached writer.
    ///
    /// Raises `AccessDenied` if `board` is not in the task's `post_msgs`.
    pub fn post_message<M: Message>(&self, board: &str, msg: M) -> FlameResult<()> {
        self.client.post(board, msg)
    }

    /// A fresh iterator over `board`'s current `live` messages.
    ///
    /// Raises `AccessDenied` if `board` is not in the task's `read_msgs`.
    pub fn message_iterator<M: Message>(&self, board: &str) -> FlameResult<MessageIterator<M>> {
        self.client.read_iterator(board)
    }
}

/// A user-written transition function: reads/writes the bound row and
/// boards through `ctx`, returns whether the row survives the iteration.
pub type TransitionFn = Arc<dyn Fn(&FlameContext) -> FlameResult<AgentStatus> + Send + Sync>;
