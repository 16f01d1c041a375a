use core::num::NonZeroUsize;

/// Construction parameters of a [`WorkerPool`](crate::pool::WorkerPool) and
/// the [`Scheduler`](crate::executor::Scheduler) that owns one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of worker threads.
    pub workers: NonZeroUsize,
    /// Prefix of worker thread names; the worker index is appended.
    pub thread_name: String,
}

impl Default for Config {
    /// One worker per available hardware thread.
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
            thread_name: "mrgraph-worker".to_owned(),
        }
    }
}

impl Config {
    /// Sets the worker count; `0` is clamped to `1`.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = NonZeroUsize::new(workers).unwrap_or(NonZeroUsize::MIN);
        self
    }

    /// Sets the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }
}
