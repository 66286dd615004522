//! A fixed pool of worker threads for batched queries.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::FutureExt;
use log::{debug, error};

use crate::error::{Result, TreeIndexError};

/// A fixed-size pool of named worker threads.
///
/// Workers are named `tree-index-{i}`. Tasks are never cancelled or prioritized: once
/// submitted, a task runs to completion.
#[derive(Debug)]
pub struct ThreadPool {
    pool: rayon::ThreadPool,
}

impl ThreadPool {
    /// Start a pool of `num_threads` workers.
    pub fn new(num_threads: usize) -> Result<Self> {
        if num_threads == 0 {
            return Err(TreeIndexError::InvalidArgument(
                "A thread pool needs at least one thread.".to_string(),
            ));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .thread_name(|i| format!("tree-index-{}", i))
            .num_threads(num_threads)
            // a panicking task drops its sender, which its handle reports as cancelled
            .panic_handler(|_| error!("A thread pool task panicked."))
            .build()?;
        debug!("Started thread pool with {} workers", num_threads);

        Ok(Self { pool })
    }

    /// Start a pool with one worker per available core.
    pub fn with_available_parallelism() -> Result<Self> {
        Self::new(
            std::thread::available_parallelism()
                .map(usize::from)
                .unwrap_or(1),
        )
    }

    /// The number of worker threads.
    pub fn current_num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Enqueue a task and return a handle on its result.
    pub fn run_task<R: Send + 'static>(
        &self,
        f: impl FnOnce() -> R + Send + 'static,
    ) -> TaskHandle<R> {
        let (sender, receiver) = oneshot::channel();
        self.pool.spawn(move || {
            sender.send(f()).ok();
        });
        TaskHandle { receiver }
    }

    /// Run `f`, which may submit tasks borrowing from the caller's stack through the
    /// provided [`TaskScope`]. Returns once every submitted task has completed.
    pub fn scope<'scope, R: Send>(
        &self,
        f: impl FnOnce(&TaskScope<'_, 'scope>) -> R + Send,
    ) -> R {
        self.pool.scope(|scope| f(&TaskScope { scope }))
    }

    /// Run `f` on one of the pool's workers and wait for it.
    pub fn install<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        self.pool.install(f)
    }
}

/// Task submission inside [`ThreadPool::scope`].
pub struct TaskScope<'a, 'scope> {
    scope: &'a rayon::Scope<'scope>,
}

impl<'a, 'scope> TaskScope<'a, 'scope> {
    /// Enqueue a task that may borrow anything outliving the scope.
    pub fn run_task(&self, f: impl FnOnce() + Send + 'scope) {
        self.scope.spawn(move |_| f());
    }
}

/// The pending result of [`ThreadPool::run_task`].
///
/// The handle can be awaited, or joined from a thread that is not a worker of the same
/// pool.
#[derive(Debug)]
pub struct TaskHandle<R> {
    receiver: oneshot::Receiver<R>,
}

impl<R> TaskHandle<R> {
    /// Block until the task completes.
    pub fn join(self) -> Result<R> {
        futures::executor::block_on(self)
    }
}

impl<R> Future for TaskHandle<R> {
    type Output = Result<R>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.receiver
            .poll_unpin(cx)
            .map(|result| result.map_err(|_| TreeIndexError::TaskCancelled))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn run_task_returns_results() {
        let pool = ThreadPool::new(2).unwrap();
        assert_eq!(pool.current_num_threads(), 2);

        let handles: Vec<_> = (0..8u64).map(|i| pool.run_task(move || i * i)).collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results, vec![0, 1, 4, 9, 16, 25, 36, 49]);
    }

    #[test]
    fn panicking_task_is_cancelled() {
        let pool = ThreadPool::new(1).unwrap();
        let handle = pool.run_task(|| -> u32 { panic!("boom") });
        assert!(matches!(handle.join(), Err(TreeIndexError::TaskCancelled)));

        // the pool keeps working
        assert_eq!(pool.run_task(|| 3).join().unwrap(), 3);
    }

    #[test]
    fn scope_joins_borrowed_tasks() {
        let pool = ThreadPool::new(3).unwrap();
        let mut output = vec![0usize; 100];
        pool.scope(|scope| {
            for (chunk_index, chunk) in output.chunks_mut(7).enumerate() {
                scope.run_task(move || {
                    for (i, value) in chunk.iter_mut().enumerate() {
                        *value = chunk_index * 7 + i;
                    }
                });
            }
        });
        assert_eq!(output, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn workers_are_named() {
        let pool = ThreadPool::new(1).unwrap();
        let name = pool.install(|| std::thread::current().name().map(String::from));
        assert_eq!(name.as_deref(), Some("tree-index-0"));
    }

    #[test]
    fn available_parallelism() {
        let pool = ThreadPool::with_available_parallelism().unwrap();
        assert!(pool.current_num_threads() >= 1);
    }

    #[test]
    fn zero_threads_is_invalid() {
        assert!(matches!(
            ThreadPool::new(0),
            Err(TreeIndexError::InvalidArgument(_))
        ));
    }
}
