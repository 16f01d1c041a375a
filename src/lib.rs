//! Dependency-aware parallel task graph over a reentrant worker pool.
//!
//! Users build a directed acyclic graph of [`TaskNode`]s, wire
//! producer→consumer edges with [`TaskNode::depends_on`], and ask a
//! [`Scheduler`] to evaluate a root. Every node reachable from the root is
//! evaluated once, in dependency order, while the nodes' own work fans out
//! over a fixed-size [`WorkerPool`]. It:
//! - Caches each node's outcome behind an execute-once gate, so concurrent
//!   callers of the same node share a single computation.
//! - Never blocks a thread on pool-submitted work: waiting threads run queued
//!   jobs themselves ("helping"), which keeps nested submissions from
//!   deadlocking a bounded pool, even one with a single worker.
//! - Ships a [`MapReduce`] task that fans map, shuffle and reduce phases out
//!   on the same pool with deterministic, key-ordered output.
//!
//! Key modules:
//! - `pool`: the worker pool, its queue handle and job handles.
//! - `node`: graph vertices, edges and the cache gate.
//! - `task`: the `Task` capability implemented by node bodies, plus the
//!   plain closure task.
//! - `map_reduce`: the three-phase aggregation task.
//! - `executor`: graph discovery and the ready-queue walk.
//!
//! Quick start:
//! 1. Create nodes with [`TaskNode::from_fn`] or [`TaskNode::new`].
//! 2. Declare edges with [`TaskNode::depends_on`] before running anything.
//! 3. Call [`Scheduler::execute`] (synchronous) or [`Scheduler::submit`]
//!    (returns a [`JobHandle`]) with the root, then extract the typed value
//!    with [`Value::get`] or [`Value::cloned`].
//!
//! ```
//! use mrgraph::{Scheduler, TaskNode};
//!
//! let numbers = TaskNode::from_fn(|_| Ok(vec![1, 2, 3, 4, 5]));
//! let sum = TaskNode::from_fn(|inputs| Ok(inputs[0].get::<Vec<i32>>()?.iter().sum::<i32>()));
//! sum.depends_on(&numbers);
//!
//! let scheduler = Scheduler::with_workers(2)?;
//! let value = scheduler.submit(&sum)?.wait()?;
//! assert_eq!(value.cloned::<i32>()?, 15);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Pool and scheduler construction parameters.
pub mod config;
/// Error kinds surfaced by nodes, pools and the scheduler.
pub mod error;
/// The task graph scheduler.
///
/// Discovers the graph reachable from a root, orders it by counting
/// outstanding dependencies and drives it to completion.
pub mod executor;
/// Three-phase map/shuffle/reduce task.
pub mod map_reduce;
/// Task graph vertices.
///
/// Defines `TaskNode` with its owning dependency edges, weak dependent
/// links and the execute-once cache gate.
pub mod node;
/// Fixed-size worker pool with reentrant helping.
pub mod pool;
mod sync;
/// The `Task` interface and the context handed to running tasks.
pub mod task;
/// Node identities and the dynamic `Value` container.
pub mod types;
mod utils;

pub use crate::{
    config::Config,
    error::{PoolSetupError, TaskError},
    executor::Scheduler,
    map_reduce::{MapReduce, Reduced},
    node::{ExecutionState, TaskNode, WeakTaskNode},
    pool::{JobHandle, PoolHandle, WorkerPool},
    task::{ExecContext, FnTask, Task},
    types::{NodeId, Value},
};
