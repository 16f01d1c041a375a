use std::sync::Arc;
use thiserror::Error;

/// Failure surfaced when a node's value, a pool job, or a scheduled graph is
/// retrieved.
///
/// Cloneable so that a cached failure can be handed to every caller waiting
/// on the same node.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum TaskError {
    /// Work was enqueued after the pool began shutting down.
    #[error("enqueue on stopped worker pool")]
    StoppedPool,

    /// A [`Value`](crate::types::Value) was extracted as a type it does not
    /// hold.
    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    TypeMismatch {
        /// The requested type.
        expected: &'static str,
        /// The type actually stored.
        found: &'static str,
    },

    /// A user-supplied computation body returned an error.
    #[error("computation failed: {0}")]
    Computation(Arc<anyhow::Error>),

    /// User code panicked while running on the pool or inside a node.
    #[error("computation panicked: {0}")]
    Panicked(Arc<str>),

    /// The node has not completed a cached computation yet.
    #[error("result is not computed yet")]
    NotComputed,

    /// A thread asked for a cached node it is itself still computing.
    #[error("cache gate re-entered by the thread computing it")]
    Reentered,
}

impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        // Bodies that `?` a `TaskError` (e.g. a type mismatch on an input) keep
        // its kind.
        err.downcast::<TaskError>()
            .unwrap_or_else(|err| Self::Computation(Arc::new(err)))
    }
}

/// Error returned when a [`WorkerPool`](crate::pool::WorkerPool) cannot be
/// started.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PoolSetupError {
    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn worker thread")]
    Spawn(#[from] std::io::Error),
}
