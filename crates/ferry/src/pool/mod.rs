//! Fixed-size worker pool over the message channel
//!
//! [`Pool`] owns a task channel and a fixed set of worker threads.
//! Submissions are erased behind the [`Runnable`] interface and wired to
//! a one-slot [`TaskHandle`] so the caller can await a typed result;
//! workers drain the channel until its lifecycle reports end-of-stream.

mod context;
mod future;
#[allow(clippy::module_inception)]
mod pool;
mod task;
mod worker;

pub use context::TaskContext;
pub use future::{Promise, TaskError, TaskHandle, TaskResult};
pub use pool::{Pool, PoolError};
pub use task::{IntoRunnable, Runnable, WithContext, WithoutContext};
