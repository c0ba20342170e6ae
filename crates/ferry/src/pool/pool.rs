//! Fixed-size worker pool fed by a single task channel

use super::future::{self, TaskHandle};
use super::task::{IntoRunnable, Runnable};
use super::worker::Worker;
use crate::channel::Channel;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by pool operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The pool's channel has left the listening state; no new task is
    /// accepted.
    #[error("pool is no longer accepting tasks")]
    NotListening,

    /// `join` was called on a pool that had already been joined or
    /// killed.
    #[error("pool has already been joined or killed")]
    AlreadyStopped,
}

/// Fixed-size pool of worker threads executing type-erased tasks.
///
/// The pool owns its channel and its workers; submission erases the
/// callable behind a uniform runnable and hands back a [`TaskHandle`]
/// that resolves to the task's typed result. Shutdown composes with the
/// channel lifecycle: [`join`](Pool::join) drains, [`kill`](Pool::kill)
/// aborts, and either way every worker is joined before control returns.
pub struct Pool {
    channel: Arc<Channel<Box<dyn Runnable>>>,
    workers: Vec<Worker>,
}

impl Pool {
    /// Create a pool and eagerly spawn `worker_count` workers.
    /// A count of zero selects the number of CPU cores.
    pub fn new(worker_count: usize) -> Self {
        let count = if worker_count == 0 {
            num_cpus::get()
        } else {
            worker_count
        };

        let channel = Arc::new(Channel::new());
        let workers = (0..count)
            .map(|index| Worker::spawn(index, Arc::clone(&channel)))
            .collect();

        Self { channel, workers }
    }

    /// Number of workers.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Submit a callable for execution and receive a handle to its
    /// result.
    ///
    /// Accepts both `FnOnce() -> T` and `FnOnce(&TaskContext) -> T`
    /// callables; the context-taking form observes the executing
    /// worker's identity and statistics. The handle resolves to the
    /// callable's return value, to the captured panic if it failed, or
    /// to an aborted state if the pool was killed before the task ran.
    pub fn add_task<M, F>(&self, f: F) -> Result<TaskHandle<F::Output>, PoolError>
    where
        F: IntoRunnable<M>,
    {
        let (promise, handle) = future::pair();
        let task = f.into_runnable(promise);

        match self.channel.send(task) {
            Ok(()) => Ok(handle),
            Err(_rejected) => Err(PoolError::NotListening),
        }
    }

    /// True while the pool is still accepting tasks.
    pub fn joinable(&self) -> bool {
        self.channel.joinable()
    }

    /// Drain and stop: every accepted task runs to completion, then all
    /// workers exit and are joined. Subsequent submissions fail.
    pub fn join(&mut self) -> Result<(), PoolError> {
        let result = self
            .channel
            .join(|| {})
            .map_err(|_| PoolError::AlreadyStopped);

        // Workers are joined even when the channel had already stopped,
        // so a racing join/kill still leaves no thread behind.
        self.join_workers();
        result
    }

    /// Stop abruptly: enqueued-but-unstarted tasks are discarded (their
    /// handles resolve aborted), in-flight tasks complete, and all
    /// workers are joined.
    pub fn kill(&mut self) {
        self.channel.kill();
        self.join_workers();
    }

    fn join_workers(&mut self) {
        for worker in &mut self.workers {
            worker.join();
        }
    }
}

impl Drop for Pool {
    /// Equivalent to [`kill`](Pool::kill) when the pool is still live;
    /// a no-op after an explicit `join` or `kill`.
    fn drop(&mut self) {
        self.channel.kill();
        self.join_workers();
    }
}
