use crate::{
    config::Config,
    error::{PoolSetupError, TaskError},
    sync::{Condvar, Mutex, lock, thread, wait},
    utils::catch_panic,
};
use derive_more::{Debug, Deref};
use std::{collections::VecDeque, sync::Arc};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed set of worker threads draining one shared FIFO queue.
///
/// Dereferences to a [`PoolHandle`], which is what tasks receive and what
/// nested work is submitted through. Dropping the pool (or calling
/// [`WorkerPool::shutdown`]) rejects new work, lets the workers drain every
/// job queued so far, and joins them.
#[must_use]
#[derive(Debug, Deref)]
pub struct WorkerPool {
    #[deref]
    handle: PoolHandle,
    #[debug(skip)]
    workers: Vec<thread::JoinHandle<()>>,
}

/// Cloneable handle to a pool's queue.
///
/// Unlike [`WorkerPool`] it does not own the workers, so it may be moved into
/// jobs running on the pool itself.
#[derive(Debug, Clone)]
pub struct PoolHandle {
    #[debug(skip)]
    shared: Arc<Shared>,
}

struct Shared {
    queue: Mutex<Queue>,
    available: Condvar,
}

struct Queue {
    jobs: VecDeque<Job>,
    stopped: bool,
}

impl WorkerPool {
    /// Spawns `config.workers` worker threads.
    ///
    /// # Errors
    /// If a worker thread cannot be spawned. Workers spawned before the
    /// failure are shut down.
    pub fn new(config: &Config) -> Result<Self, PoolSetupError> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                jobs: VecDeque::new(),
                stopped: false,
            }),
            available: Condvar::new(),
        });
        let mut pool = Self {
            handle: PoolHandle { shared },
            workers: Vec::with_capacity(config.workers.get()),
        };
        for idx in 0..config.workers.get() {
            let shared = Arc::clone(&pool.handle.shared);
            let worker = thread::Builder::new()
                .name(format!("{}-{idx}", config.thread_name))
                .spawn(move || shared.work())?;
            pool.workers.push(worker);
        }
        tracing::debug!(workers = pool.workers.len(), "worker pool started");
        Ok(pool)
    }

    /// Shorthand for a default [`Config`] with `workers` threads.
    ///
    /// # Errors
    /// See [`WorkerPool::new`].
    pub fn with_workers(workers: usize) -> Result<Self, PoolSetupError> {
        Self::new(&Config::default().with_workers(workers))
    }

    /// Number of worker threads still attached to the pool.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// A cloneable handle to this pool's queue.
    #[must_use]
    pub fn handle(&self) -> PoolHandle {
        self.handle.clone()
    }

    /// Stops accepting work, waits for the queue to drain and joins every
    /// worker. Idempotent.
    pub fn shutdown(&mut self) {
        lock(&self.shared.queue).stopped = true;
        self.shared.available.notify_all();
        if self.workers.is_empty() {
            return;
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("worker thread terminated abnormally");
            }
        }
        tracing::debug!("worker pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl PoolHandle {
    /// Appends `work` to the queue and returns a handle to its outcome.
    ///
    /// A panic inside `work` is caught and reported through the handle as
    /// [`TaskError::Panicked`]; the worker that ran it keeps going.
    ///
    /// # Errors
    /// [`TaskError::StoppedPool`] once shutdown has begun.
    pub fn enqueue<F, T>(&self, work: F) -> Result<JobHandle<T>, TaskError>
    where
        F: FnOnce() -> Result<T, TaskError> + Send + 'static,
        T: Send + 'static,
    {
        let slot = Arc::new(Slot {
            outcome: Mutex::new(None),
            filled: Condvar::new(),
        });
        let job_slot = Arc::clone(&slot);
        let job: Job = Box::new(move || {
            let outcome = catch_panic(work).unwrap_or_else(|msg| {
                tracing::warn!(%msg, "pool job panicked");
                Err(TaskError::Panicked(msg))
            });
            job_slot.fill(outcome);
        });
        {
            let mut queue = lock(&self.shared.queue);
            if queue.stopped {
                return Err(TaskError::StoppedPool);
            }
            queue.jobs.push_back(job);
        }
        self.shared.available.notify_one();
        Ok(JobHandle { slot })
    }

    /// Runs one queued job on the calling thread, if there is one.
    ///
    /// Any thread waiting on pool-submitted work calls this to supply the
    /// capacity it would otherwise be holding idle. Returns whether a job ran.
    pub fn try_execute_one(&self) -> bool {
        let Some(job) = lock(&self.shared.queue).jobs.pop_front() else {
            return false;
        };
        job();
        true
    }

    /// Number of jobs waiting in the queue.
    #[must_use]
    pub fn pending(&self) -> usize {
        lock(&self.shared.queue).jobs.len()
    }

    /// Whether shutdown has begun.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        lock(&self.shared.queue).stopped
    }
}

impl Shared {
    fn work(&self) {
        loop {
            let job = {
                let mut queue = lock(&self.queue);
                loop {
                    if let Some(job) = queue.jobs.pop_front() {
                        break job;
                    }
                    if queue.stopped {
                        return;
                    }
                    queue = wait(&self.available, queue);
                }
            };
            job();
        }
    }
}

/// Eventual outcome of a job submitted with [`PoolHandle::enqueue`].
#[must_use]
#[derive(Debug)]
pub struct JobHandle<T> {
    #[debug(skip)]
    slot: Arc<Slot<T>>,
}

struct Slot<T> {
    outcome: Mutex<Option<Result<T, TaskError>>>,
    filled: Condvar,
}

impl<T> Slot<T> {
    fn fill(&self, outcome: Result<T, TaskError>) {
        *lock(&self.outcome) = Some(outcome);
        self.filled.notify_all();
    }
}

impl<T> JobHandle<T> {
    /// Whether the job has finished.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        lock(&self.slot.outcome).is_some()
    }

    /// Blocks until the job has finished.
    ///
    /// Only safe from threads whose blocking cannot starve the pool, i.e.
    /// threads that are not themselves pool workers. Inside pool work use
    /// [`JobHandle::wait_helping`].
    ///
    /// # Errors
    /// The job's own error, or [`TaskError::Panicked`].
    pub fn wait(self) -> Result<T, TaskError> {
        let mut outcome = lock(&self.slot.outcome);
        loop {
            if let Some(outcome) = outcome.take() {
                return outcome;
            }
            outcome = wait(&self.slot.filled, outcome);
        }
    }

    /// Polls until the job has finished, running one queued job of `pool`
    /// and yielding between polls.
    ///
    /// Never blocks on the pool, so it makes progress even when every
    /// worker is itself waiting on nested work.
    ///
    /// # Errors
    /// The job's own error, or [`TaskError::Panicked`].
    pub fn wait_helping(self, pool: &PoolHandle) -> Result<T, TaskError> {
        loop {
            if let Some(outcome) = lock(&self.slot.outcome).take() {
                return outcome;
            }
            if pool.try_execute_one() {
                tracing::trace!("helped with one queued job");
            }
            thread::yield_now();
        }
    }
}
