use crate::{
    error::TaskError,
    pool::PoolHandle,
    sync::{AtomicBool, Condvar, Mutex, Ordering, lock, thread, wait},
    task::{ExecContext, FnTask, Task},
    types::{NodeId, Value},
    utils::catch_panic,
};
use core::{
    any::Any,
    fmt,
    hash::{Hash, Hasher},
};
use std::sync::{Arc, Weak};

/// Vertex of a task graph.
///
/// A cheap, cloneable handle compared by identity. A node owns its
/// dependencies: a dependency stays alive for as long as any node depending
/// on it does. The reverse links to dependents are weak and only used for
/// inspection.
///
/// With caching enabled (the default) the node's [`Task`] runs at most once
/// no matter how many threads call [`TaskNode::execute`]; every caller gets
/// the same [`Value`] (or the same error).
#[derive(Clone)]
pub struct TaskNode {
    inner: Arc<NodeInner>,
}

/// Non-owning reference to a [`TaskNode`].
#[derive(Debug, Clone)]
pub struct WeakTaskNode {
    inner: Weak<NodeInner>,
}

/// Observable phase of a node's cache gate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExecutionState {
    /// No cached computation has started.
    NotStarted,
    /// A thread is running the cached computation; others wait for it.
    InProgress,
    /// The cached outcome is available.
    Done,
}

struct NodeInner {
    task: Box<dyn Task>,
    cache_enabled: AtomicBool,
    // Edges are appended only while the graph is built; the locks keep
    // concurrent misuse memory-safe, not meaningful.
    dependencies: Mutex<Vec<TaskNode>>,
    dependents: Mutex<Vec<Weak<NodeInner>>>,
    gate: Mutex<Gate>,
    done: Condvar,
}

enum Gate {
    NotStarted,
    /// Holds the thread running the computation.
    InProgress(thread::ThreadId),
    Done(Result<Value, TaskError>),
}

impl TaskNode {
    /// A node running `task`, with caching enabled.
    pub fn new(task: impl Task) -> Self {
        Self::with_caching(task, true)
    }

    /// A node running `task`, caching its outcome iff `cache_enabled`.
    pub fn with_caching(task: impl Task, cache_enabled: bool) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                task: Box::new(task),
                cache_enabled: AtomicBool::new(cache_enabled),
                dependencies: Mutex::new(Vec::new()),
                dependents: Mutex::new(Vec::new()),
                gate: Mutex::new(Gate::NotStarted),
                done: Condvar::new(),
            }),
        }
    }

    /// A cached node running a [`FnTask`] over `body`.
    pub fn from_fn<F, T>(body: F) -> Self
    where
        F: Fn(&[Value]) -> anyhow::Result<T> + Send + Sync + 'static,
        T: Any + Send + Sync,
    {
        Self::new(FnTask::new(body))
    }

    /// Identity of this node.
    #[must_use]
    pub fn id(&self) -> NodeId {
        NodeId(Arc::as_ptr(&self.inner).addr())
    }

    /// Declares that this node consumes `other`'s value.
    ///
    /// `other` is kept alive by this node; this node is recorded as a weak
    /// dependent of `other`. Does nothing when `other` is `None`. Must be
    /// called before any execution involving either node starts, and must
    /// not close a cycle.
    pub fn depends_on<'a>(&self, other: impl Into<Option<&'a TaskNode>>) {
        let Some(other) = other.into() else {
            return;
        };
        lock(&self.inner.dependencies).push(other.clone());
        lock(&other.inner.dependents).push(Arc::downgrade(&self.inner));
    }

    /// Dependencies in declaration order.
    #[must_use]
    pub fn dependencies(&self) -> Vec<TaskNode> {
        lock(&self.inner.dependencies).clone()
    }

    /// Dependents that are still alive, in registration order.
    #[must_use]
    pub fn dependents(&self) -> Vec<TaskNode> {
        lock(&self.inner.dependents)
            .iter()
            .filter_map(Weak::upgrade)
            .map(|inner| TaskNode { inner })
            .collect()
    }

    /// Whether the outcome is cached.
    #[must_use]
    pub fn cache_enabled(&self) -> bool {
        self.inner.cache_enabled.load(Ordering::Acquire)
    }

    /// Switches caching on or off for subsequent [`TaskNode::execute`] calls.
    ///
    /// An outcome cached earlier stays readable through
    /// [`TaskNode::result`].
    pub fn set_cache_enabled(&self, cache_enabled: bool) {
        self.inner
            .cache_enabled
            .store(cache_enabled, Ordering::Release);
    }

    /// Current phase of the cache gate.
    #[must_use]
    pub fn state(&self) -> ExecutionState {
        match &*lock(&self.inner.gate) {
            Gate::NotStarted => ExecutionState::NotStarted,
            Gate::InProgress(_) => ExecutionState::InProgress,
            Gate::Done(_) => ExecutionState::Done,
        }
    }

    /// Computes this node's value.
    ///
    /// Without caching, every call pulls all dependencies through `pool`
    /// and reruns the task. With caching, the first caller runs the task
    /// and stores the outcome; concurrent callers block until it is stored,
    /// later callers return it immediately.
    ///
    /// # Errors
    /// The task's failure (cached like a value), including
    /// [`TaskError::Panicked`] if it panicked. [`TaskError::Reentered`] if
    /// the calling thread is the one computing this node, which happens when
    /// it picks up a job needing the node while helping the pool.
    pub fn execute(&self, pool: &PoolHandle) -> Result<Value, TaskError> {
        if !self.cache_enabled() {
            return self.compute(pool);
        }
        {
            let me = thread::current().id();
            let mut gate = lock(&self.inner.gate);
            loop {
                let owner = match &*gate {
                    Gate::Done(outcome) => return outcome.clone(),
                    Gate::NotStarted => None,
                    Gate::InProgress(owner) => Some(*owner),
                };
                match owner {
                    None => {
                        *gate = Gate::InProgress(me);
                        break;
                    }
                    // Reached through helping: the computation further down
                    // this stack would never finish while we wait for it.
                    Some(owner) if owner == me => {
                        tracing::warn!(node = %self.id(), "cache gate re-entered by its owner");
                        return Err(TaskError::Reentered);
                    }
                    Some(_) => gate = wait(&self.inner.done, gate),
                }
            }
        }
        let outcome = self.compute(pool);
        *lock(&self.inner.gate) = Gate::Done(outcome.clone());
        self.inner.done.notify_all();
        outcome
    }

    /// The cached outcome.
    ///
    /// # Errors
    /// [`TaskError::NotComputed`] before the gate reaches
    /// [`ExecutionState::Done`]; the cached failure afterwards, if any.
    pub fn result(&self) -> Result<Value, TaskError> {
        match &*lock(&self.inner.gate) {
            Gate::Done(outcome) => outcome.clone(),
            Gate::NotStarted | Gate::InProgress(_) => Err(TaskError::NotComputed),
        }
    }

    /// The cached value extracted as a `T`.
    ///
    /// # Errors
    /// As [`TaskNode::result`], or [`TaskError::TypeMismatch`].
    pub fn result_as<T: Any + Clone>(&self) -> Result<T, TaskError> {
        self.result()?.cloned()
    }

    /// A non-owning reference to this node.
    #[must_use]
    pub fn downgrade(&self) -> WeakTaskNode {
        WeakTaskNode {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn compute(&self, pool: &PoolHandle) -> Result<Value, TaskError> {
        tracing::trace!(node = %self.id(), task = ?self.inner.task, "computing");
        let ctx = ExecContext {
            dependencies: self.dependencies(),
            pool,
        };
        catch_panic(|| self.inner.task.run(&ctx))
            .unwrap_or_else(|msg| Err(TaskError::Panicked(msg)))
    }
}

impl WeakTaskNode {
    /// The node, if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<TaskNode> {
        self.inner.upgrade().map(|inner| TaskNode { inner })
    }
}

impl fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskNode")
            .field("id", &self.id())
            .field("task", &self.inner.task)
            .field("cache_enabled", &self.cache_enabled())
            .field("state", &self.state())
            .finish()
    }
}

impl PartialEq for TaskNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for TaskNode {}

impl Hash for TaskNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}
