//! Worker thread that drains the pool's task channel

use super::context::TaskContext;
use super::task::Runnable;
use crate::channel::Channel;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A single pool worker: a named OS thread looping on the task channel
/// until it reports that no further task will ever arrive.
pub(crate) struct Worker {
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn the worker thread. The worker keeps only a shared view onto
    /// the channel; the pool joins it before the channel is released.
    pub(crate) fn spawn(index: usize, channel: Arc<Channel<Box<dyn Runnable>>>) -> Self {
        let handle = thread::Builder::new()
            .name(format!("ferry-worker-{}", index))
            .spawn(move || Self::run_loop(index, channel))
            .expect("failed to spawn worker thread");

        Self {
            handle: Some(handle),
        }
    }

    /// Worker main loop: receive, run, count, repeat.
    fn run_loop(index: usize, channel: Arc<Channel<Box<dyn Runnable>>>) {
        let mut context = TaskContext::new(index);

        // A failed receive is the only exit: the channel is dead and
        // will never yield another task.
        while let Ok(task) = channel.recv() {
            task.run(&context);
            context.record_completed();
        }

        #[cfg(debug_assertions)]
        eprintln!("ferry worker {} shutting down", index);
    }

    /// Join the worker thread. Idempotent.
    pub(crate) fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().expect("failed to join worker thread");
        }
    }
}
