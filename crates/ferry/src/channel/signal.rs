//! Payload-free channel variant for cheap N-way signalling

use super::channel::ChannelError;
use super::state::{ChannelState, Lifecycle};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counting signal channel: the degenerate channel whose payload is
/// "a signal".
///
/// The message queue is replaced by a non-negative counter of pending
/// signals. The lifecycle matches [`Channel`](super::Channel) except
/// that there is no graceful `join`; with no inventory to drain, the
/// only shutdown is [`kill`](SignalChannel::kill).
pub struct SignalChannel {
    /// Pending signal count
    pending: AtomicUsize,

    /// Lifecycle variable, readable without the parking lock
    lifecycle: Lifecycle,

    /// Parking lock for blocked receivers; holds no data
    park: Mutex<()>,

    /// Raised when signals arrive or the channel dies
    signalled: Condvar,
}

impl SignalChannel {
    /// Create a signal channel in the Listening state.
    pub fn new() -> Self {
        Self {
            pending: AtomicUsize::new(0),
            lifecycle: Lifecycle::new(),
            park: Mutex::new(()),
            signalled: Condvar::new(),
        }
    }

    /// Post one signal and wake one receiver.
    pub fn send(&self) -> Result<(), ChannelError> {
        self.send_many(1)
    }

    /// Post `n` signals at once and wake all receivers.
    pub fn send_many(&self, n: usize) -> Result<(), ChannelError> {
        if self.lifecycle.load() != ChannelState::Listening {
            return Err(ChannelError::NotListening);
        }

        {
            let _guard = self.park.lock();
            // Authoritative re-check: kill zeroes the counter and
            // publishes Dead under this lock, so no signal can land on
            // a dead channel. Holding it across the increment also
            // means a receiver between its counter check and its wait
            // cannot miss the notification.
            if self.lifecycle.load() != ChannelState::Listening {
                return Err(ChannelError::NotListening);
            }
            self.pending.fetch_add(n, Ordering::Release);
        }

        if n == 1 {
            self.signalled.notify_one();
        } else {
            self.signalled.notify_all();
        }
        Ok(())
    }

    /// Consume one signal, blocking until one is available.
    ///
    /// Returns [`ChannelError::Dead`] once the channel is no longer
    /// receivable.
    pub fn recv(&self) -> Result<(), ChannelError> {
        loop {
            if self.lifecycle.load() != ChannelState::Listening {
                return Err(ChannelError::Dead);
            }

            if self.take_one() {
                // Keep further receivers moving while signals remain
                if self.pending.load(Ordering::Acquire) > 0 {
                    self.signalled.notify_one();
                }
                return Ok(());
            }

            let mut guard = self.park.lock();
            if self.pending.load(Ordering::Acquire) == 0
                && self.lifecycle.load() == ChannelState::Listening
            {
                self.signalled.wait(&mut guard);
            }
        }
    }

    /// Consume one signal without blocking. Returns false when none is
    /// pending or the channel is no longer receivable; never fails.
    pub fn try_recv(&self) -> bool {
        self.lifecycle.load() == ChannelState::Listening && self.take_one()
    }

    fn take_one(&self) -> bool {
        let mut current = self.pending.load(Ordering::Acquire);
        while current > 0 {
            match self.pending.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
        false
    }

    /// Abort the channel: reset the counter, wake every waiter, go Dead.
    /// Non-blocking, infallible, idempotent.
    pub fn kill(&self) {
        if !self.lifecycle.begin_kill() {
            return;
        }

        // The counter reset and the Dead transition happen under the
        // parking lock: senders re-check the lifecycle under it, so no
        // concurrent send can leave pending signals behind, and waiters
        // between their check and their wait still observe the shutdown.
        let guard = self.park.lock();
        self.pending.store(0, Ordering::Release);
        self.lifecycle.store(ChannelState::Dead);
        drop(guard);

        self.signalled.notify_all();
    }

    /// Number of signals posted but not yet consumed.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChannelState {
        self.lifecycle.load()
    }
}

impl Default for SignalChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SignalChannel {
    fn drop(&mut self) {
        self.kill();
    }
}
