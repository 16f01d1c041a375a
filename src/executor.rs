mod execute;
mod setup;

use crate::{
    config::Config,
    error::{PoolSetupError, TaskError},
    executor::{execute::walk, setup::GraphPlan},
    node::TaskNode,
    pool::{JobHandle, PoolHandle, WorkerPool},
    types::Value,
};

/// Evaluates task graphs over an owned [`WorkerPool`].
///
/// Evaluating a root:
/// - Discovers every node reachable through dependency edges, once each,
///   and counts each node's dependencies.
/// - Seeds a ready queue with the nodes that have none.
/// - Executes ready nodes one by one, releasing a dependent once its last
///   dependency finishes. While nothing is ready the driving thread runs
///   queued pool jobs, so nested work progresses even on a single worker.
/// - Returns the value the root produced.
///
/// The graph must be acyclic; a cycle is not detected and the walk never
/// finishes.
#[must_use]
#[derive(Debug)]
pub struct Scheduler {
    pool: WorkerPool,
}

impl Scheduler {
    /// Starts a scheduler with a pool configured by `config`.
    ///
    /// # Errors
    /// If a worker thread cannot be spawned.
    pub fn new(config: &Config) -> Result<Self, PoolSetupError> {
        Ok(Self {
            pool: WorkerPool::new(config)?,
        })
    }

    /// Starts a scheduler with `workers` worker threads.
    ///
    /// # Errors
    /// If a worker thread cannot be spawned.
    pub fn with_workers(workers: usize) -> Result<Self, PoolSetupError> {
        Ok(Self {
            pool: WorkerPool::with_workers(workers)?,
        })
    }

    /// The pool graphs are evaluated on.
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Evaluates `root` and its dependencies on the calling thread.
    ///
    /// # Errors
    /// The first node failure encountered.
    pub fn execute(&self, root: &TaskNode) -> Result<Value, TaskError> {
        Self::execute_on(&self.pool, root)
    }

    /// Queues the evaluation of `root` as a single job of the pool and
    /// returns immediately.
    ///
    /// # Errors
    /// [`TaskError::StoppedPool`] if the pool is shutting down. Node failures
    /// are reported through the returned handle.
    pub fn submit(&self, root: &TaskNode) -> Result<JobHandle<Value>, TaskError> {
        let pool = self.pool.handle();
        let root = root.clone();
        self.pool.enqueue(move || Self::execute_on(&pool, &root))
    }

    /// Evaluates `root` on the calling thread, using `pool` for nested work.
    ///
    /// # Errors
    /// The first node failure encountered.
    pub fn execute_on(pool: &PoolHandle, root: &TaskNode) -> Result<Value, TaskError> {
        let plan = GraphPlan::discover(root);
        tracing::debug!(
            root = %root.id(),
            nodes = plan.nodes.len(),
            "discovered task graph"
        );
        walk(&plan, root, pool)
    }

    /// Shuts the pool down; see [`WorkerPool::shutdown`].
    pub fn shutdown(&mut self) {
        self.pool.shutdown();
    }
}
