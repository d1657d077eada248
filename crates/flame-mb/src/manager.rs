//! Process-wide registry of named message boards.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use flame_core::{FlameError, FlameResult};

use crate::board::{BoardWriter, MessageBoard, MessageIterator};
use crate::message::Message;

/// A registered board plus the monomorphized dispatch functions needed to
/// `Sync`/`Clear`/`GetCount` it without the caller naming its element
/// type again.
struct BoardEntry {
    board: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    sync_fn: fn(&(dyn Any + Send + Sync)),
    clear_fn: fn(&(dyn Any + Send + Sync)),
    count_fn: fn(&(dyn Any + Send + Sync)) -> usize,
}

fn sync_impl<M: Message>(any: &(dyn Any + Send + Sync)) {
    any.downcast_ref::<MessageBoard<M>>().expect("type tag checked at registration").sync();
}

fn clear_impl<M: Message>(any: &(dyn Any + Send + Sync)) {
    any.downcast_ref::<MessageBoard<M>>().expect("type tag checked at registration").clear();
}

fn count_impl<M: Message>(any: &(dyn Any + Send + Sync)) -> usize {
    any.downcast_ref::<MessageBoard<M>>().expect("type tag checked at registration").get_count()
}

/// Singleton-style registry mapping board name to board: `RegisterMessage<T>`
/// raises a logic error on a duplicate name; everything else is a read-only
/// lookup by name once registration is done.
#[derive(Default)]
pub struct MessageBoardManager {
    boards: RwLock<HashMap<String, BoardEntry>>,
}

impl MessageBoardManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new board of element type `M` under `name`.
    ///
    /// Raises `LogicError` if `name` is already registered.
    pub fn register_message<M: Message>(&self, name: impl Into<String>) -> FlameResult<()> {
        let name = name.into();
        let mut boards = self.boards.write();
        if boards.contains_key(&name) {
            return Err(FlameError::LogicError(format!("board '{name}' already registered")));
        }
        boards.insert(
            name,
            BoardEntry {
                board: Arc::new(MessageBoard::<M>::new()),
                type_id: TypeId::of::<M>(),
                sync_fn: sync_impl::<M>,
                clear_fn: clear_impl::<M>,
                count_fn: count_impl::<M>,
            },
        );
        Ok(())
    }

    pub fn board_exists(&self, name: &str) -> bool {
        self.boards.read().contains_key(name)
    }

    fn get_board<M: Message>(&self, name: &str) -> FlameResult<Arc<MessageBoard<M>>> {
        let boards = self.boards.read();
        let entry = boards.get(name).ok_or_else(|| FlameError::UnknownBoard(name.to_string()))?;
        if entry.type_id != TypeId::of::<M>() {
            return Err(FlameError::TypeMismatch(format!("board '{name}' is not of the requested type")));
        }
        Arc::clone(&entry.board)
            .downcast::<MessageBoard<M>>()
            .map_err(|_| FlameError::TypeMismatch(format!("board '{name}' is not of the requested type")))
    }

    /// A fresh writer registered against board `name`.
    ///
    /// Raises `UnknownBoard` if `name` is not registered, `TypeMismatch` if
    /// it was registered with a different element type.
    pub fn board_writer<M: Message>(&self, name: &str) -> FlameResult<BoardWriter<M>> {
        Ok(self.get_board::<M>(name)?.writer())
    }

    /// A snapshot iterator over board `name`'s current `live` messages.
    pub fn reader<M: Message>(&self, name: &str) -> FlameResult<MessageIterator<M>> {
        Ok(self.get_board::<M>(name)?.reader())
    }

    /// Dispatch `Sync` on board `name`.
    pub fn sync(&self, name: &str) -> FlameResult<()> {
        tracing::debug!(target: "mb.manager", board = name, "sync_dispatch");
        self.with_entry(name, |e| (e.sync_fn)(e.board.as_ref()))
    }

    /// Dispatch `Clear` on board `name`.
    pub fn clear(&self, name: &str) -> FlameResult<()> {
        tracing::debug!(target: "mb.manager", board = name, "clear_dispatch");
        self.with_entry(name, |e| (e.clear_fn)(e.board.as_ref()))
    }

    pub fn get_count(&self, name: &str) -> FlameResult<usize> {
        self.with_entry(name, |e| (e.count_fn)(e.board.as_ref()))
    }

    fn with_entry<R>(&self, name: &str, f: impl FnOnce(&BoardEntry) -> R) -> FlameResult<R> {
        let boards = self.boards.read();
        let entry = boards.get(name).ok_or_else(|| FlameError::UnknownBoard(name.to_string()))?;
        Ok(f(entry))
    }

    /// Reset all registered boards. Available only for test builds.
    #[cfg(any(test, feature = "test-util"))]
    pub fn reset_for_test(&self) {
        self.boards.write().clear();
    }
}
