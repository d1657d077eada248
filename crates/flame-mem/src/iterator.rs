//! Raw-cursor iteration over a windowed slice of an agent shadow's variables.

use std::any::TypeId;
use std::collections::HashMap;

use flame_core::{FlameError, FlameResult};

use crate::shadow::AgentShadow;
use crate::vector::step_raw_ptr;

/// One raw cursor seeded from a variable's column at construction time.
struct RawCursor {
    ptr: *mut u8,
    type_id: TypeId,
    elem_size: usize,
}

/// Seeds one raw-pointer cursor per variable the
/// owning shadow allows, and steps every cursor in lock-step.
///
/// Position 0 corresponds to row `offset`; `at_end() ⇔ pos == count`.
pub struct MemoryIterator<'a> {
    shadow: &'a AgentShadow,
    offset: usize,
    count: usize,
    pos: usize,
    cursors: HashMap<String, RawCursor>,
}

impl<'a> MemoryIterator<'a> {
    pub(crate) fn new(shadow: &'a AgentShadow, offset: usize, count: usize) -> FlameResult<Self> {
        let mut cursors = HashMap::new();
        for name in shadow.readable_names() {
            let handle = shadow.memory().vector_handle(name)?;
            let ptr = if count == 0 {
                std::ptr::null_mut()
            } else {
                handle.raw_ptr_at(offset)
            };
            cursors.insert(
                name.clone(),
                RawCursor { ptr, type_id: handle.elem_type_id(), elem_size: handle.elem_size() },
            );
        }
        Ok(Self { shadow, offset, count, pos: 0, cursors })
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos == self.count
    }

    /// The current absolute row index (`offset + pos`).
    pub fn current_row(&self) -> usize {
        self.offset + self.pos
    }

    /// Advance every cursor by one element stride.
    ///
    /// No-op once `at_end()`.
    pub fn step(&mut self) {
        if self.at_end() {
            return;
        }
        for cursor in self.cursors.values_mut() {
            // SAFETY: every cursor was seeded from `raw_ptr_at(offset)` on a
            // column of length >= offset + count, and is stepped at most
            // `count - 1` times before `at_end()` becomes true.
            cursor.ptr = unsafe { step_raw_ptr(cursor.ptr, cursor.elem_size) };
        }
        self.pos += 1;
    }

    /// Reset every cursor back to the iterator's base offset.
    pub fn rewind(&mut self) {
        if self.pos == 0 {
            return;
        }
        for (name, cursor) in self.cursors.iter_mut() {
            let handle = self
                .shadow
                .memory()
                .vector_handle(name)
                .expect("cursor name was valid at construction");
            cursor.ptr = if self.count == 0 { std::ptr::null_mut() } else { handle.raw_ptr_at(self.offset) };
        }
        self.pos = 0;
    }

    /// Read the current row's value of `name` as `T`.
    ///
    /// Raises `AccessDenied` if `name` is not in this iterator's cursor set
    /// (i.e. not allowed on the owning shadow), `TypeMismatch` if the
    /// stored type tag does not match `T`.
    pub fn get<T: Clone + 'static>(&self, name: &str) -> FlameResult<T> {
        let cursor = self
            .cursors
            .get(name)
            .ok_or_else(|| FlameError::AccessDenied(format!("variable '{name}' not readable")))?;
        if cursor.type_id != std::any::TypeId::of::<T>() {
            return Err(FlameError::TypeMismatch(format!(
                "variable '{name}' is not of the requested type"
            )));
        }
        // SAFETY: type tag checked above; pointer is valid for the current
        // row because `pos < count` whenever this is called from task
        // execution (callers stop iterating once `at_end()`).
        Ok(unsafe { &*(cursor.ptr as *const T) }.clone())
    }

    /// Write `value` into the current row's `name` column.
    ///
    /// Writability (vs. mere readability) is enforced by the caller
    /// (`flame-api`'s `FlameContext`), which also checks the shadow's
    /// `writable` set before calling this.
    ///
    /// Raises `AccessDenied` if `name` is not in this iterator's cursor set,
    /// `TypeMismatch` if the stored type tag does not match `T`.
    pub fn set<T: Clone + 'static>(&self, name: &str, value: T) -> FlameResult<()> {
        let cursor = self
            .cursors
            .get(name)
            .ok_or_else(|| FlameError::AccessDenied(format!("variable '{name}' not accessible")))?;
        if cursor.type_id != std::any::TypeId::of::<T>() {
            return Err(FlameError::TypeMismatch(format!(
                "variable '{name}' is not of the requested type"
            )));
        }
        // SAFETY: see `get`.
        unsafe { *(cursor.ptr as *mut T) = value };
        Ok(())
    }
}
