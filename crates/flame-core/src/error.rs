//! Framework error type.
//!
//! Every fallible operation in the columnar memory store, message boards,
//! task/ACL setup and the scheduler returns `FlameResult<T>`. Variants map
//! directly onto the abstract error taxonomy: registration-protocol misuse
//! is `LogicError`, bad parameters are `InvalidArgument`, operating on an
//! object in the wrong lifecycle phase is `InvalidOperation`, runtime ACL
//! violations from user code are `AccessDenied`, typed-lookup mismatches are
//! `TypeMismatch`, name lookups that miss are `UnknownVariable`/`UnknownBoard`,
//! and debug-mode invariant checks are `InternalConsistency`.

use thiserror::Error;

/// The top-level error type for the flame2 execution core.
#[derive(Debug, Error)]
pub enum FlameError {
    #[error("logic error: {0}")]
    LogicError(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    #[error("unknown board: {0}")]
    UnknownBoard(String),

    #[error("internal consistency violation: {0}")]
    InternalConsistency(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type used throughout every `flame-*` crate.
pub type FlameResult<T> = Result<T, FlameError>;
