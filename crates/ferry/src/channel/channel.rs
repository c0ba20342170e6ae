//! Multi-producer, multi-consumer FIFO with an explicit lifecycle

use super::state::{ChannelState, Lifecycle};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

/// Error returned by a rejected send; hands the message back to the
/// caller, which retains ownership.
#[derive(Error)]
#[error("send on a channel that is no longer listening")]
pub struct SendError<T>(
    /// The rejected message.
    pub T,
);

impl<T> SendError<T> {
    /// Recover the message that could not be enqueued.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SendError(..)")
    }
}

/// Errors surfaced by channel operations that do not carry a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The channel has left the listening state and accepts no signal.
    #[error("channel is not listening")]
    NotListening,

    /// No further message will ever arrive on this channel.
    #[error("channel is dead")]
    Dead,

    /// `join` was called on a channel that is already joining or dead.
    #[error("channel is already joining or dead")]
    AlreadyJoining,
}

/// Unbounded in-memory FIFO of owned values with a four-state lifecycle.
///
/// Senders and receivers share the channel through `&self` (typically
/// behind an `Arc`). `join` drains the queue gracefully and then marks
/// the channel dead; `kill` discards the inventory and unblocks every
/// waiter immediately.
pub struct Channel<T> {
    /// FIFO of owned messages, mutable only under this guard
    queue: Mutex<VecDeque<T>>,

    /// Raised when a message is enqueued
    msg_available: Condvar,

    /// Raised when a receive leaves the queue empty
    queue_empty: Condvar,

    /// Lifecycle variable, readable without the guard
    lifecycle: Lifecycle,

    /// Serializes the shutdown paths (`join` and `kill`) so the join
    /// hook runs with the channel pinned in Listening
    shutdown: Mutex<()>,
}

impl<T> Channel<T> {
    /// Create a channel in the Listening state.
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            msg_available: Condvar::new(),
            queue_empty: Condvar::new(),
            lifecycle: Lifecycle::new(),
            shutdown: Mutex::new(()),
        }
    }

    /// Enqueue a message and wake one receiver.
    ///
    /// Fails once the channel has left Listening; the message travels
    /// back in the error.
    pub fn send(&self, msg: T) -> Result<(), SendError<T>> {
        if self.lifecycle.load() != ChannelState::Listening {
            return Err(SendError(msg));
        }

        let mut queue = self.queue.lock();
        // Authoritative re-check: join publishes its transition under
        // this guard, so no message can slip in after Joining.
        if self.lifecycle.load() != ChannelState::Listening {
            return Err(SendError(msg));
        }

        queue.push_back(msg);
        self.msg_available.notify_one();
        Ok(())
    }

    /// Enqueue a batch atomically and wake all receivers.
    ///
    /// The batch occupies contiguous positions in the queue; no other
    /// send interleaves with it.
    pub fn send_bulk(&self, msgs: Vec<T>) -> Result<(), SendError<Vec<T>>> {
        if self.lifecycle.load() != ChannelState::Listening {
            return Err(SendError(msgs));
        }

        let mut queue = self.queue.lock();
        if self.lifecycle.load() != ChannelState::Listening {
            return Err(SendError(msgs));
        }

        queue.extend(msgs);
        self.msg_available.notify_all();
        Ok(())
    }

    /// Dequeue the oldest message, blocking while the channel may still
    /// produce one.
    ///
    /// Returns [`ChannelError::Dead`] once no further message will ever
    /// arrive: after `kill`, or after a completed `join` has drained the
    /// queue.
    pub fn recv(&self) -> Result<T, ChannelError> {
        let mut queue = self.queue.lock();
        loop {
            if !self.lifecycle.load().receivable() {
                return Err(ChannelError::Dead);
            }

            if let Some(msg) = queue.pop_front() {
                self.notify_after_pop(&queue);
                return Ok(msg);
            }

            self.msg_available.wait(&mut queue);
        }
    }

    /// Non-blocking receive. Returns `None` when the queue is empty or
    /// the channel is no longer receivable; never fails.
    pub fn try_recv(&self) -> Option<T> {
        let mut queue = self.queue.lock();
        if !self.lifecycle.load().receivable() {
            return None;
        }

        let msg = queue.pop_front()?;
        self.notify_after_pop(&queue);
        Some(msg)
    }

    /// Wake policy after a successful pop: keep remaining receivers
    /// moving, or report the drain so a joiner can finish.
    fn notify_after_pop(&self, queue: &VecDeque<T>) {
        if queue.is_empty() {
            self.queue_empty.notify_all();
        } else {
            self.msg_available.notify_one();
        }
    }

    /// Gracefully shut the channel down, blocking until the queue drains.
    ///
    /// `hook` runs before the state advances to Joining: it is the last
    /// moment at which sends (including the caller's own, e.g. a poison
    /// pill) can still succeed. It runs only when this caller wins the
    /// shutdown race; a losing joiner fails without side effects. Once
    /// the queue empties the channel goes Dead and every blocked
    /// receiver is woken to observe it.
    pub fn join<F: FnOnce()>(&self, hook: F) -> Result<(), ChannelError> {
        let shutdown = self.shutdown.lock();
        if self.lifecycle.load() != ChannelState::Listening {
            return Err(ChannelError::AlreadyJoining);
        }

        // Transitions serialize through the shutdown lock, so the
        // channel stays Listening for the duration of the hook, and the
        // queue guard is free for the hook's own sends.
        hook();

        let mut queue = self.queue.lock();
        self.lifecycle.store(ChannelState::Joining);

        // Release the shutdown lock before blocking so a concurrent
        // kill can override the drain.
        drop(shutdown);

        // A kill that overrides Joining drains the queue and signals
        // queue_empty itself, so both exit conditions hold.
        while !queue.is_empty() && self.lifecycle.load() == ChannelState::Joining {
            self.queue_empty.wait(&mut queue);
        }

        if self.lifecycle.load() == ChannelState::Joining {
            self.lifecycle.store(ChannelState::Dead);
            self.msg_available.notify_all();
        }

        Ok(())
    }

    /// Abort the channel: discard every queued message and unblock all
    /// waiters. Non-blocking, infallible, idempotent.
    pub fn kill(&self) {
        let _shutdown = self.shutdown.lock();
        if !self.lifecycle.begin_kill() {
            return;
        }

        let mut queue = self.queue.lock();
        self.msg_available.notify_all();

        // Inventory is destroyed before the channel is published as Dead.
        let discarded = std::mem::take(&mut *queue);
        drop(discarded);

        self.queue_empty.notify_all();
        self.lifecycle.store(ChannelState::Dead);
    }

    /// True while the channel is Listening (sends accepted, `join` valid).
    pub fn joinable(&self) -> bool {
        self.lifecycle.load() == ChannelState::Listening
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChannelState {
        self.lifecycle.load()
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// True when no message is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Channel<T> {
    /// Force the lifecycle to Dead, waking any (contract-violating)
    /// stragglers before storage is released.
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_send_recv_fifo() {
        let channel = Channel::new();

        channel.send(1).unwrap();
        channel.send(2).unwrap();
        channel.send(3).unwrap();

        assert_eq!(channel.len(), 3);
        assert_eq!(channel.recv(), Ok(1));
        assert_eq!(channel.recv(), Ok(2));
        assert_eq!(channel.recv(), Ok(3));
        assert!(channel.is_empty());
    }

    #[test]
    fn test_try_recv() {
        let channel = Channel::new();
        assert_eq!(channel.try_recv(), None);

        channel.send(7).unwrap();
        assert_eq!(channel.try_recv(), Some(7));
        assert_eq!(channel.try_recv(), None);

        channel.kill();
        channel.send(8).unwrap_err();
        assert_eq!(channel.try_recv(), None);
    }

    #[test]
    fn test_send_returns_message_on_failure() {
        let channel = Channel::new();
        channel.kill();

        let err = channel.send(String::from("kept")).unwrap_err();
        assert_eq!(err.into_inner(), "kept");

        let err = channel
            .send_bulk(vec![String::from("a"), String::from("b")])
            .unwrap_err();
        assert_eq!(err.into_inner(), vec!["a", "b"]);
    }

    #[test]
    fn test_join_on_empty_channel_goes_dead() {
        let channel: Channel<i32> = Channel::new();
        assert!(channel.joinable());

        channel.join(|| {}).unwrap();

        assert!(!channel.joinable());
        assert_eq!(channel.state(), ChannelState::Dead);
        assert_eq!(channel.recv(), Err(ChannelError::Dead));
        assert!(channel.send(1).is_err());
    }

    #[test]
    fn test_second_join_fails() {
        let channel: Channel<i32> = Channel::new();
        channel.join(|| {}).unwrap();
        assert_eq!(channel.join(|| {}), Err(ChannelError::AlreadyJoining));
    }

    #[test]
    fn test_join_drains_queue_before_dying() {
        let channel = Arc::new(Channel::new());
        channel.send_bulk(vec![10, 20, 30]).unwrap();

        let consumer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                let mut seen = Vec::new();
                while let Ok(v) = channel.recv() {
                    seen.push(v);
                }
                seen
            })
        };

        channel.join(|| {}).unwrap();
        assert_eq!(consumer.join().unwrap(), vec![10, 20, 30]);
    }

    #[test]
    fn test_join_hook_runs_while_listening() {
        let channel = Arc::new(Channel::new());
        channel.send(1).unwrap();

        let consumer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                let mut seen = Vec::new();
                while let Ok(v) = channel.recv() {
                    seen.push(v);
                }
                seen
            })
        };

        // The hook is the last Listening-time side effect: a poison pill
        // enqueued here must still be delivered.
        channel.join(|| channel.send(2).unwrap()).unwrap();

        assert_eq!(consumer.join().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_recv_blocks_until_send() {
        let channel = Arc::new(Channel::new());

        let producer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                channel.send(42).unwrap();
            })
        };

        assert_eq!(channel.recv(), Ok(42));
        producer.join().unwrap();
    }

    #[test]
    fn test_kill_unblocks_receiver() {
        let channel: Arc<Channel<i32>> = Arc::new(Channel::new());

        let consumer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.recv())
        };

        // Give the receiver time to block
        thread::sleep(Duration::from_millis(50));
        channel.kill();

        assert_eq!(consumer.join().unwrap(), Err(ChannelError::Dead));
    }

    struct DropProbe(Arc<AtomicUsize>);

    impl Drop for DropProbe {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_kill_destroys_queued_messages() {
        let drops = Arc::new(AtomicUsize::new(0));
        let channel = Channel::new();

        for _ in 0..5 {
            channel.send(DropProbe(Arc::clone(&drops))).unwrap();
        }
        assert_eq!(drops.load(Ordering::Relaxed), 0);

        channel.kill();

        assert_eq!(drops.load(Ordering::Relaxed), 5);
        assert!(channel.is_empty());
        assert_eq!(channel.state(), ChannelState::Dead);
    }

    #[test]
    fn test_bulk_send_is_contiguous() {
        let channel = Channel::new();
        channel.send(0).unwrap();
        channel.send_bulk(vec![1, 2, 3]).unwrap();
        channel.send(4).unwrap();

        let mut seen = Vec::new();
        while let Some(v) = channel.try_recv() {
            seen.push(v);
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_concurrent_joins_run_hook_once() {
        let channel: Arc<Channel<i32>> = Arc::new(Channel::new());
        let hook_runs = Arc::new(AtomicUsize::new(0));

        let joiners: Vec<_> = (0..2)
            .map(|_| {
                let channel = Arc::clone(&channel);
                let hook_runs = Arc::clone(&hook_runs);
                thread::spawn(move || {
                    channel
                        .join(move || {
                            hook_runs.fetch_add(1, Ordering::Relaxed);
                        })
                        .is_ok()
                })
            })
            .collect();

        let outcomes: Vec<bool> = joiners.into_iter().map(|j| j.join().unwrap()).collect();

        // Exactly one joiner wins, and only the winner's hook runs
        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
        assert_eq!(hook_runs.load(Ordering::Relaxed), 1);
        assert_eq!(channel.state(), ChannelState::Dead);
    }

    #[test]
    fn test_kill_overrides_join() {
        let channel = Arc::new(Channel::new());
        channel.send(1).unwrap();

        // The joiner blocks on the non-empty queue; kill must release it.
        let joiner = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.join(|| {}))
        };

        thread::sleep(Duration::from_millis(50));
        channel.kill();

        assert_eq!(joiner.join().unwrap(), Ok(()));
        assert_eq!(channel.state(), ChannelState::Dead);
    }
}
