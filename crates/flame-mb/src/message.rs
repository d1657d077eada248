//! The element-type contract for a message board.

use std::fmt::Debug;

/// A user-defined record posted to a board.
///
/// `Debug` stands in for an unambiguous serialization operator
/// used for debugging dumps"; `Clone` lets a message be cheaply duplicated
/// when moved from a writer's private buffer into the board's `live` set.
pub trait Message: Debug + Clone + Send + Sync + 'static {}

impl<T: Debug + Clone + Send + Sync + 'static> Message for T {}
