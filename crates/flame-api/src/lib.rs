//! `flame-api` — the in-function user-API facade (component J) exposed to
//! transition functions.

pub mod context;

#[cfg(test)]
mod tests;

pub use context::{AgentStatus, FlameContext, TransitionFn};
