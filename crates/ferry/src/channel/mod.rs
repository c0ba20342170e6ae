//! Bounded-lifetime message channel
//!
//! [`Channel`] moves owned values between threads through an unbounded
//! FIFO guarded by a mutex and a pair of condition signals, with an
//! explicit lifecycle: *Listening → Joining → Dead* for a graceful
//! drain, or *Listening → Killing → Dead* for an abort.
//! [`SignalChannel`] is the payload-free specialization backed by a
//! counter instead of a queue.

#[allow(clippy::module_inception)]
mod channel;
mod signal;
mod state;

pub use channel::{Channel, ChannelError, SendError};
pub use signal::SignalChannel;
pub use state::ChannelState;
