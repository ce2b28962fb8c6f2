//! Fixed-size worker pool for dispatching independent backtests.
//!
//! Each backtest is internally single-threaded; the pool only provides
//! cross-backtest parallelism. `submit` hands back a join-able handle;
//! `shutdown` (also run on drop) closes the queue, lets the workers drain
//! what was already submitted, and joins them. Submissions after shutdown
//! are rejected.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread;
use thiserror::Error;
use tracing::error;

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("thread pool has been shut down")]
    ShutDown,

    #[error("task ended without producing a result")]
    Lost,
}

/// Handle to a submitted task's eventual result.
pub struct TaskHandle<T> {
    result: Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Block until the task finishes. `Err(Lost)` means the task panicked.
    pub fn join(self) -> Result<T, PoolError> {
        self.result.recv().map_err(|_| PoolError::Lost)
    }
}

pub struct ThreadPool {
    queue: Option<Sender<Job>>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl ThreadPool {
    pub fn new(threads: usize) -> Self {
        assert!(threads > 0, "thread pool needs at least one worker");
        let (queue, jobs) = crossbeam_channel::unbounded::<Job>();
        let workers = (0..threads)
            .map(|index| {
                let jobs: Receiver<Job> = jobs.clone();
                thread::Builder::new()
                    .name(format!("tapesim-worker-{index}"))
                    .spawn(move || {
                        for job in jobs.iter() {
                            if catch_unwind(AssertUnwindSafe(job)).is_err() {
                                error!("worker task panicked");
                            }
                        }
                    })
                    .expect("failed to spawn worker thread")
            })
            .collect();
        Self {
            queue: Some(queue),
            workers,
        }
    }

    /// Enqueue a task for execution on some worker.
    pub fn submit<F, T>(&self, task: F) -> Result<TaskHandle<T>, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let queue = self.queue.as_ref().ok_or(PoolError::ShutDown)?;
        let (tx, rx) = bounded(1);
        queue
            .send(Box::new(move || {
                let _ = tx.send(task());
            }))
            .map_err(|_| PoolError::ShutDown)?;
        Ok(TaskHandle { result: rx })
    }

    /// Close the queue, drain already-submitted tasks and join the workers.
    /// Idempotent.
    pub fn shutdown(&mut self) {
        self.queue.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("worker thread panicked during shutdown");
            }
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
