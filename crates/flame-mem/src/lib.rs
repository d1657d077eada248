//! `flame-mem` — columnar agent memory store, capability shadows, and
//! raw-cursor memory iterators for the flame2 execution core.
//!
//! | Module      | Contents                                         |
//! |-------------|---------------------------------------------------|
//! | [`vector`]  | `TypedVector<T>`, the type-erased `VectorHandle`  |
//! | [`store`]   | `AgentMemory` (register → `hint_population` → frozen) |
//! | [`shadow`]  | `AgentShadow` (per-task capability filter)        |
//! | [`iterator`]| `MemoryIterator` (lock-step raw cursor stepping)  |

pub mod iterator;
pub mod shadow;
pub mod store;
pub mod vector;


pub use iterator::MemoryIterator;
pub use shadow::AgentShadow;
pub use store::AgentMemory;
pub use vector::{TypedVector, VectorHandle};
