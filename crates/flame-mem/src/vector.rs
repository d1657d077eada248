//! Type-erased, raw-pointer-steppable columns of agent-variable values.
//!
//! # Design
//!
//! Each variable is stored as a `TypedVector<T>` behind a
//! `Box<dyn VectorHandle>` in [`crate::store::AgentMemory`]. `TypedVector<T>`
//! wraps its backing `Vec<T>` in an `UnsafeCell` so every operation — append
//! during population load, raw pointer stepping during task execution — is
//! `&self`, never `&mut self`. This mirrors the raw-pointer discipline the
//! teacher's `AgentRngs::get_many_mut` uses: the caller (here, the memory
//! iterator and the population loader) is trusted to never create two
//! simultaneous aliasing writes into the same row.

use std::any::{Any, TypeId};
use std::cell::UnsafeCell;

// ── Trait object ──────────────────────────────────────────────────────────────

/// Type-erased interface over a single variable's backing column.
///
/// Sealed via the private `Sealed` supertrait so external code cannot
/// implement it and break the raw-pointer contract.
pub trait VectorHandle: Send + Sync + sealed::Sealed {
    /// Current element count.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reserve additional capacity without changing `len`.
    fn reserve(&self, additional: usize);

    /// The runtime type tag recorded at registration.
    fn elem_type_id(&self) -> TypeId;

    /// `size_of::<T>()` for the element type, used to step raw pointers.
    fn elem_size(&self) -> usize;

    /// Typeless pointer to the element at `offset`. Caller must have
    /// obtained `T` out of band (via the recorded type tag) before
    /// dereferencing.
    ///
    /// # Panics
    /// Panics if `offset >= len()`.
    fn raw_ptr_at(&self, offset: usize) -> *mut u8;

    /// Compact the column in place, keeping only indices where
    /// `keep[i]` is `true`. `keep.len()` must equal `self.len()`.
    fn retain_indices(&self, keep: &[bool]);

    #[doc(hidden)]
    fn as_any(&self) -> &dyn Any;

    #[doc(hidden)]
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

mod sealed {
    pub trait Sealed {}
}

/// Advance a raw pointer returned by [`VectorHandle::raw_ptr_at`] by exactly
/// one element stride. Typeless — the caller supplies the stride.
///
/// # Safety
/// `p` must be a pointer previously returned by `raw_ptr_at`/`step_raw_ptr`
/// on the same handle, and the resulting pointer must not be dereferenced
/// past the column's length.
#[inline]
pub unsafe fn step_raw_ptr(p: *mut u8, stride: usize) -> *mut u8 {
    unsafe { p.add(stride) }
}

// ── Concrete column ─────────────────────────────────────────────────────────

/// A growable, type-tagged column of agent-variable values.
///
/// Exposes `&self`-only mutation (`reserve`, `push`, `set`, raw pointer
/// access) so it can live behind a shared `Arc<AgentMemory>` while still
/// supporting population loading and in-place row writes from task
/// execution.
pub struct TypedVector<T> {
    inner: UnsafeCell<Vec<T>>,
}

// SAFETY: access is serialized by the scheduler's dependency graph — at
// most one task holds writable access to a given variable in any
// dependency antichain. Concurrent
// readers never alias a concurrent writer because the validator upstream
// of this crate enforces that invariant on the task graph.
unsafe impl<T: Send> Send for TypedVector<T> {}
unsafe impl<T: Send> Sync for TypedVector<T> {}

impl<T: Clone + Send + Sync + 'static> sealed::Sealed for TypedVector<T> {}

impl<T: Clone + Send + Sync + 'static> Default for TypedVector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> TypedVector<T> {
    pub fn new() -> Self {
        Self { inner: UnsafeCell::new(Vec::new()) }
    }

    /// Append a value, growing the column by one element.
    ///
    /// Used exclusively by population loading, before any task executes
    /// against this column in the current iteration ("their
    /// vectors' sizes grow solely via append at population-load time, then
    /// remain constant through an iteration").
    pub fn push(&self, value: T) {
        // SAFETY: population loading is single-threaded and happens before
        // any shadow/iterator over this column is constructed.
        unsafe { (*self.inner.get()).push(value) };
    }

    /// Clone out the value at `index`.
    pub fn get(&self, index: usize) -> T {
        // SAFETY: read-only access to an in-bounds element; overlapping
        // writers never touch the same row concurrently (see impl note on
        // `Send`/`Sync` above).
        unsafe { (*self.inner.get())[index].clone() }
    }

    /// Overwrite the value at `index`.
    pub fn set(&self, index: usize, value: T) {
        // SAFETY: see `get`.
        unsafe { (*self.inner.get())[index] = value };
    }

}

impl<T: Clone + Send + Sync + 'static> VectorHandle for TypedVector<T> {
    fn len(&self) -> usize {
        unsafe { (*self.inner.get()).len() }
    }

    fn reserve(&self, additional: usize) {
        unsafe { (*self.inner.get()).reserve(additional) };
    }

    fn elem_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn elem_size(&self) -> usize {
        std::mem::size_of::<T>()
    }

    fn raw_ptr_at(&self, offset: usize) -> *mut u8 {
        let vec = unsafe { &mut *self.inner.get() };
        assert!(offset < vec.len() || (offset == 0 && vec.is_empty()), "raw_ptr_at out of bounds");
        let ptr = vec.as_mut_ptr();
        // SAFETY: `offset` is within the allocation (checked above, except
        // the empty-vector zero-offset case which never gets dereferenced).
        unsafe { ptr.add(offset) as *mut u8 }
    }

    fn retain_indices(&self, keep: &[bool]) {
        let vec = unsafe { &mut *self.inner.get() };
        let mut write = 0;
        for read in 0..vec.len() {
            if keep[read] {
                if write != read {
                    vec.swap(write, read);
                }
                write += 1;
            }
        }
        vec.truncate(write);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
