//! Type-erased one-shot tasks and submission overload selection

use super::context::TaskContext;
use super::future::{Promise, TaskError};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Erased one-shot unit of work executed by a pool worker.
///
/// Implementations resolve their paired [`TaskHandle`](super::TaskHandle)
/// whether they return, panic, or are dropped without running, and they
/// never unwind into the worker.
pub trait Runnable: Send {
    /// Consume the task and run it.
    fn run(self: Box<Self>, ctx: &TaskContext);
}

/// Marker selecting the `FnOnce() -> T` submission signature.
pub struct WithoutContext;

/// Marker selecting the `FnOnce(&TaskContext) -> T` submission signature.
pub struct WithContext;

/// Conversion from a callable into an erased [`Runnable`].
///
/// The marker parameter lets the two accepted signatures coexist as
/// distinct impls; the compiler picks the right one from the callable's
/// own signature, so both spellings submit through the same
/// [`Pool::add_task`](super::Pool::add_task).
pub trait IntoRunnable<Marker>: Send + 'static {
    /// Value the task's handle resolves to.
    type Output: Send + 'static;

    /// Package the callable and its result producer behind the erased
    /// interface.
    fn into_runnable(self, promise: Promise<Self::Output>) -> Box<dyn Runnable>;
}

impl<F, T> IntoRunnable<WithoutContext> for F
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn into_runnable(self, promise: Promise<T>) -> Box<dyn Runnable> {
        Box::new(PlainTask {
            callable: self,
            promise,
        })
    }
}

impl<F, T> IntoRunnable<WithContext> for F
where
    F: FnOnce(&TaskContext) -> T + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn into_runnable(self, promise: Promise<T>) -> Box<dyn Runnable> {
        Box::new(ContextTask {
            callable: self,
            promise,
        })
    }
}

/// Task whose callable ignores the worker context.
struct PlainTask<F, T> {
    callable: F,
    promise: Promise<T>,
}

impl<F, T> Runnable for PlainTask<F, T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    fn run(self: Box<Self>, _ctx: &TaskContext) {
        let Self { callable, promise } = *self;
        match panic::catch_unwind(AssertUnwindSafe(callable)) {
            Ok(value) => promise.fulfill(value),
            Err(payload) => promise.fail(TaskError::Panicked(panic_message(&*payload))),
        }
    }
}

/// Task whose callable receives the worker context first.
struct ContextTask<F, T> {
    callable: F,
    promise: Promise<T>,
}

impl<F, T> Runnable for ContextTask<F, T>
where
    F: FnOnce(&TaskContext) -> T + Send + 'static,
    T: Send + 'static,
{
    fn run(self: Box<Self>, ctx: &TaskContext) {
        let Self { callable, promise } = *self;
        match panic::catch_unwind(AssertUnwindSafe(|| callable(ctx))) {
            Ok(value) => promise.fulfill(value),
            Err(payload) => promise.fail(TaskError::Panicked(panic_message(&*payload))),
        }
    }
}

/// Extract the human-readable text from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("non-string panic payload")
    }
}
