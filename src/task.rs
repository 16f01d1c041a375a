use crate::{error::TaskError, node::TaskNode, pool::PoolHandle, types::Value};
use core::{any::Any, fmt::Debug, marker::PhantomData};

/// Computation body of a [`TaskNode`].
///
/// A node invokes `run` once per computation: exactly once over its lifetime
/// when caching is enabled, on every [`TaskNode::execute`] otherwise. The
/// body reads its dependencies and submits nested work through the
/// [`ExecContext`].
pub trait Task: Debug + Send + Sync + 'static {
    /// Compute the node's value.
    ///
    /// # Errors
    /// Any failure of the body or of a dependency it pulled. The error is
    /// surfaced to whoever retrieves the node's value.
    fn run(&self, ctx: &ExecContext<'_>) -> Result<Value, TaskError>;
}

/// What a [`Task`] sees while it runs.
#[derive(Debug)]
pub struct ExecContext<'a> {
    pub(crate) dependencies: Vec<TaskNode>,
    pub(crate) pool: &'a PoolHandle,
}

impl ExecContext<'_> {
    /// Dependencies of the running node, in declaration order.
    #[must_use]
    pub fn dependencies(&self) -> &[TaskNode] {
        &self.dependencies
    }

    /// The pool the node is executed through.
    #[must_use]
    pub fn pool(&self) -> &PoolHandle {
        self.pool
    }

    /// Executes the `idx`-th dependency through the same pool and returns
    /// its value, or `None` if there is no such dependency.
    ///
    /// # Errors
    /// The dependency's failure.
    pub fn input(&self, idx: usize) -> Result<Option<Value>, TaskError> {
        self.dependencies
            .get(idx)
            .map(|dependency| dependency.execute(self.pool))
            .transpose()
    }

    /// Executes every dependency in declaration order and collects their
    /// values.
    ///
    /// # Errors
    /// The first dependency failure.
    pub fn inputs(&self) -> Result<Vec<Value>, TaskError> {
        self.dependencies
            .iter()
            .map(|dependency| dependency.execute(self.pool))
            .collect()
    }
}

/// Plain task: a closure over the values of all dependencies.
///
/// The closure's output is wrapped into a [`Value`].
#[derive(derive_more::Debug)]
pub struct FnTask<F, T> {
    #[debug(skip)]
    body: F,
    #[debug(skip)]
    _output: PhantomData<fn() -> T>,
}

impl<F, T> FnTask<F, T>
where
    F: Fn(&[Value]) -> anyhow::Result<T> + Send + Sync + 'static,
    T: Any + Send + Sync,
{
    /// Wraps `body`.
    pub fn new(body: F) -> Self {
        Self {
            body,
            _output: PhantomData,
        }
    }
}

impl<F, T> Task for FnTask<F, T>
where
    F: Fn(&[Value]) -> anyhow::Result<T> + Send + Sync + 'static,
    T: Any + Send + Sync,
{
    fn run(&self, ctx: &ExecContext<'_>) -> Result<Value, TaskError> {
        let inputs = ctx.inputs()?;
        Ok(Value::new((self.body)(&inputs)?))
    }
}
