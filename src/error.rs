use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::error;

/// Result type used throughout the crate's fallible entry points.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors surfaced by the optimizer, the traversal operator, and the pool manager.
#[derive(Debug, Error)]
pub enum GraphError {
    /// `SetFilter` was called on an operator that already carries a filter tree.
    #[error("filter already attached to this operator")]
    FilterAlreadySet,

    /// `Clone` was invoked with a target operator type that doesn't match the source.
    #[error("clone target type mismatch: expected {expected}, got {found}")]
    CloneTypeMismatch {
        /// Operator type the clone was supposed to produce.
        expected: &'static str,
        /// Operator type actually supplied.
        found: &'static str,
    },

    /// `create_pools` was called on an already-initialized pool manager.
    #[error("thread pools already initialized")]
    PoolAlreadyInitialized,

    /// A submit call arrived while the targeted pool was not `RUNNING`.
    #[error("pool '{0}' is not running")]
    PoolNotRunning(&'static str),

    /// A reader or writer submission was rejected by `MAX_QUEUED_QUERIES` admission control.
    #[error("queue full: pool '{0}' has reached its admission bound")]
    QueueFull(&'static str),

    /// Corruption or poisoning detected in an internal lock.
    #[error("corruption detected: {0}")]
    Corruption(String),

    /// Invalid argument supplied by a caller.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Catch-all for conditions not otherwise modeled.
    #[error("{0}")]
    Other(String),
}

/// Locks `mutex`, converting poisoning into a `Corruption` error instead of panicking.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| {
        error!("internal lock poisoned - fatal error");
        GraphError::Corruption("internal lock poisoned".into())
    })
}
