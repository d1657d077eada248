//! `flame-core` — foundational ids, error taxonomy, and logging init for the
//! flame2 execution core.
//!
//! This crate is a dependency of every other `flame-*` crate. It
//! intentionally carries no `flame-*` dependencies.
//!
//! | Module      | Contents                                   |
//! |-------------|---------------------------------------------|
//! | [`ids`]     | `TaskId`, `QueueId`                        |
//! | [`error`]   | `FlameError`, `FlameResult`                |
//! | [`logging`] | `init_tracing` (behind the `init` feature) |

pub mod error;
pub mod ids;
pub mod logging;


pub use error::{FlameError, FlameResult};
pub use ids::{QueueId, TaskId};
#[cfg(feature = "init")]
pub use logging::init_tracing;
