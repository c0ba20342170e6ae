//! Ferry: a bounded-lifetime message channel and a worker pool built on
//! top of it.
//!
//! Two tightly coupled primitives:
//!
//! - [`Channel`]: an unbounded multi-producer, multi-consumer FIFO of
//!   owned values with an explicit lifecycle: graceful drain via
//!   [`join`](Channel::join), abrupt abort via [`kill`](Channel::kill).
//!   [`SignalChannel`] is the payload-free specialization for cheap
//!   N-way signalling.
//! - [`Pool`]: a fixed set of worker threads draining a single task
//!   channel. [`Pool::add_task`] erases the callable's signature behind
//!   a uniform runnable and returns a [`TaskHandle`] resolving to the
//!   task's typed result; panics are captured per task and never
//!   terminate a worker.
//!
//! Everything runs on preemptive OS threads; there is no async runtime.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod channel;
pub mod pool;

pub use channel::{Channel, ChannelError, ChannelState, SendError, SignalChannel};
pub use pool::{Pool, PoolError, TaskContext, TaskError, TaskHandle, TaskResult};
