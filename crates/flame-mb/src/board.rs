//! `B`/`W`/`MIt` sealed typed message bag, per-thread board
//! writer, and a read-only snapshot iterator.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{ArcRwLockReadGuard, Mutex, RawRwLock, RwLock};

use flame_core::{FlameError, FlameResult};

use crate::message::Message;

/// Per-writer shared state: a private post buffer plus a validity flag
/// flipped by the next `Sync`.
struct WriterState<M: Message> {
    buffer: Mutex<Vec<M>>,
    valid: AtomicBool,
}

/// Goes invalid on the board's next `Sync`.
pub struct BoardWriter<M: Message> {
    state: Arc<WriterState<M>>,
}

impl<M: Message> BoardWriter<M> {
    /// Append `msg` to this writer's private buffer.
    ///
    /// Raises `InvalidOperation` if the board has been synced since this
    /// writer was acquired.
    pub fn post(&self, msg: M) -> FlameResult<()> {
        if !self.state.valid.load(Ordering::Acquire) {
            return Err(FlameError::InvalidOperation(
                "post on a writer invalidated by a prior sync".to_string(),
            ));
        }
        self.state.buffer.lock().push(msg);
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.state.valid.load(Ordering::Acquire)
    }
}

/// A read-only snapshot view over a board's `live` messages at the moment
/// of acquisition, held via a shared read lock (owning a clone of the
/// board's `Arc`, so it carries no borrowed lifetime) that coexists with
/// other readers and blocks a concurrent `Sync`/`Clear`.
pub struct MessageIterator<M: Message> {
    guard: ArcRwLockReadGuard<RawRwLock, Vec<M>>,
    pos: usize,
}

impl<M: Message> MessageIterator<M> {
    fn new(guard: ArcRwLockReadGuard<RawRwLock, Vec<M>>) -> Self {
        Self { guard, pos: 0 }
    }

    pub fn at_end(&self) -> bool {
        self.pos == self.guard.len()
    }

    pub fn next(&mut self) {
        if !self.at_end() {
            self.pos += 1;
        }
    }

    pub fn get(&self) -> Option<&M> {
        self.guard.get(self.pos)
    }

    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    pub fn get_count(&self) -> usize {
        self.guard.len()
    }
}

impl<M: Message> Iterator for MessageIterator<M> {
    type Item = M;

    fn next(&mut self) -> Option<M> {
        let item = self.guard.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }
}

/// Sealed typed bag of messages with two-phase
/// post→sync publishing and `Clear`.
pub struct MessageBoard<M: Message> {
    live: Arc<RwLock<Vec<M>>>,
    writers: Mutex<Vec<Arc<WriterState<M>>>>,
}

impl<M: Message> Default for MessageBoard<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Message> MessageBoard<M> {
    pub fn new() -> Self {
        Self { live: Arc::new(RwLock::new(Vec::new())), writers: Mutex::new(Vec::new()) }
    }

    /// A fresh writer with an empty private buffer, registered against
    /// this board in acquisition order.
    pub fn writer(&self) -> BoardWriter<M> {
        let state = Arc::new(WriterState { buffer: Mutex::new(Vec::new()), valid: AtomicBool::new(true) });
        self.writers.lock().push(Arc::clone(&state));
        BoardWriter { state }
    }

    /// A snapshot iterator over the board's current `live` messages.
    pub fn reader(&self) -> MessageIterator<M> {
        MessageIterator::new(self.live.read_arc())
    }

    pub fn get_count(&self) -> usize {
        self.live.read().len()
    }

    /// Acquire the structural lock, move every registered writer's buffer
    /// into `live` in registration order, clear each buffer, and mark each
    /// writer invalid.
    pub fn sync(&self) {
        let writers = self.writers.lock();
        let mut live = self.live.write();
        let mut merged = 0usize;
        for w in writers.iter() {
            let mut buf = w.buffer.lock();
            if !buf.is_empty() {
                merged += buf.len();
                live.append(&mut buf);
            }
            w.valid.store(false, Ordering::Release);
        }
        tracing::debug!(
            target: "mb.board",
            writers = writers.len(),
            merged,
            live = live.len(),
            "board_sync"
        );
    }

    /// Truncate `live` to empty.
    pub fn clear(&self) {
        let mut live = self.live.write();
        let cleared = live.len();
        live.clear();
        tracing::debug!(target: "mb.board", cleared, "board_clear");
    }
}
