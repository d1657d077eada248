//! Per-task proxy over the message board manager, caching one `BoardWriter`
//! per board name for the lifetime of a task.

use std::any::Any;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use flame_core::{FlameError, FlameResult};

use crate::board::BoardWriter;
use crate::manager::MessageBoardManager;
use crate::message::Message;

/// Not thread-safe by design: exactly one task — or split subtask, which
/// gets its own `MessageClient` — owns an instance. `Send` so it can be
/// moved onto the worker thread that runs the task; never shared behind
/// `&` across threads.
pub struct MessageClient {
    manager: Arc<MessageBoardManager>,
    post_msgs: HashSet<String>,
    read_msgs: HashSet<String>,
    writer_cache: RefCell<HashMap<String, Box<dyn Any>>>,
}

impl MessageClient {
    pub fn new(manager: Arc<MessageBoardManager>, post_msgs: HashSet<String>, read_msgs: HashSet<String>) -> Self {
        Self { manager, post_msgs, read_msgs, writer_cache: RefCell::new(HashMap::new()) }
    }

    /// Post `msg` to `board`.
    ///
    /// Raises `AccessDenied` if `board` is not in this task's `post_msgs`.
    pub fn post<M: Message>(&self, board: &str, msg: M) -> FlameResult<()> {
        if !self.post_msgs.contains(board) {
            return Err(FlameError::AccessDenied(format!("board '{board}' not in post_msgs")));
        }
        let mut cache = self.writer_cache.borrow_mut();
        if !cache.contains_key(board) {
            let writer = self.manager.board_writer::<M>(board)?;
            cache.insert(board.to_string(), Box::new(writer));
        }
        let writer = cache
            .get(board)
            .and_then(|b| b.downcast_ref::<BoardWriter<M>>())
            .expect("cached writer type matches the type this board was acquired with");
        writer.post(msg)
    }

    /// A fresh snapshot iterator over `board`'s current `live` messages.
    ///
    /// Raises `AccessDenied` if `board` is not in this task's `read_msgs`.
    pub fn read_iterator<M: Message>(&self, board: &str) -> FlameResult<crate::board::MessageIterator<M>> {
        if !self.read_msgs.contains(board) {
            return Err(FlameError::AccessDenied(format!("board '{board}' not in read_msgs")));
        }
        self.manager.reader::<M>(board)
    }
}
