//! One-slot result handoff between a worker and the submitting caller

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use thiserror::Error;

/// Failure delivered through a task's handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The task's callable panicked while running; the payload text is
    /// captured and carried here.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task was discarded before it ran (pool killed or dropped).
    #[error("task was discarded before running")]
    Aborted,
}

/// Outcome observed through a [`TaskHandle`].
pub type TaskResult<T> = Result<T, TaskError>;

/// One-slot state shared by a promise/handle pair. Exactly one writer,
/// exactly one reader; publication happens under the slot lock.
struct Shared<T> {
    slot: Mutex<Option<TaskResult<T>>>,
    ready: Condvar,
}

/// Producer half of a task's result slot. Travels with the task and is
/// written exactly once; dropping it unwritten resolves the handle as
/// aborted, so every accepted task reaches a terminal state.
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
    delivered: bool,
}

/// Consumer half of a task's result slot, returned by
/// [`Pool::add_task`](super::Pool::add_task).
pub struct TaskHandle<T> {
    shared: Arc<Shared<T>>,
}

/// Create a linked promise/handle pair.
pub(crate) fn pair<T>() -> (Promise<T>, TaskHandle<T>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(None),
        ready: Condvar::new(),
    });
    (
        Promise {
            shared: Arc::clone(&shared),
            delivered: false,
        },
        TaskHandle { shared },
    )
}

impl<T> Promise<T> {
    /// Resolve the handle with the task's value.
    pub fn fulfill(mut self, value: T) {
        self.deliver(Ok(value));
    }

    /// Resolve the handle with a failure.
    pub fn fail(mut self, error: TaskError) {
        self.deliver(Err(error));
    }

    fn deliver(&mut self, result: TaskResult<T>) {
        let mut slot = self.shared.slot.lock();
        *slot = Some(result);
        self.delivered = true;
        self.shared.ready.notify_all();
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if !self.delivered {
            self.deliver(Err(TaskError::Aborted));
        }
    }
}

impl<T> TaskHandle<T> {
    /// Block until the task reaches a terminal state and take its result.
    pub fn wait(self) -> TaskResult<T> {
        let mut slot = self.shared.slot.lock();
        while slot.is_none() {
            self.shared.ready.wait(&mut slot);
        }
        slot.take().expect("slot is written before the signal")
    }

    /// Non-blocking completion probe.
    pub fn is_ready(&self) -> bool {
        self.shared.slot.lock().is_some()
    }
}
