//! Channel lifecycle state machine

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a channel.
///
/// Transitions are monotonic in shutdownness: Listening may advance to
/// Joining (graceful drain) or Killing (abort); Joining advances to Dead
/// when the queue empties, or is overridden by Killing; Killing advances
/// to Dead once the inventory is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelState {
    /// Accepting sends and receives.
    Listening = 0,
    /// Draining: sends rejected, receives allowed until the queue empties.
    Joining = 1,
    /// Aborting: all operations rejected, queued messages discarded.
    Killing = 2,
    /// Terminal: every operation fails.
    Dead = 3,
}

impl ChannelState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Listening,
            1 => Self::Joining,
            2 => Self::Killing,
            _ => Self::Dead,
        }
    }

    /// Whether messages may still be dequeued in this state.
    pub(crate) fn receivable(self) -> bool {
        matches!(self, Self::Listening | Self::Joining)
    }
}

/// Atomic cell holding a [`ChannelState`].
///
/// Reads that gate behaviour use acquire ordering and transition writes
/// use release ordering, so state changes are visible to concurrent
/// senders and receivers without the queue guard.
pub(crate) struct Lifecycle(AtomicU8);

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(ChannelState::Listening as u8))
    }

    pub(crate) fn load(&self) -> ChannelState {
        ChannelState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, state: ChannelState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Advance any live state to Killing. Returns false when the channel
    /// is already Killing or Dead.
    pub(crate) fn begin_kill(&self) -> bool {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if current >= ChannelState::Killing as u8 {
                return false;
            }
            match self.0.compare_exchange_weak(
                current,
                ChannelState::Killing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_lifecycle_is_listening() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.load(), ChannelState::Listening);
        assert!(lifecycle.load().receivable());
    }

    #[test]
    fn test_store_publishes_transition() {
        let lifecycle = Lifecycle::new();

        lifecycle.store(ChannelState::Joining);
        assert_eq!(lifecycle.load(), ChannelState::Joining);
        assert!(lifecycle.load().receivable());

        lifecycle.store(ChannelState::Dead);
        assert_eq!(lifecycle.load(), ChannelState::Dead);
    }

    #[test]
    fn test_begin_kill_from_live_states() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.begin_kill());
        assert_eq!(lifecycle.load(), ChannelState::Killing);

        // Killing a channel that is already shutting down is a no-op
        assert!(!lifecycle.begin_kill());

        lifecycle.store(ChannelState::Dead);
        assert!(!lifecycle.begin_kill());
        assert_eq!(lifecycle.load(), ChannelState::Dead);
    }

    #[test]
    fn test_begin_kill_overrides_joining() {
        let lifecycle = Lifecycle::new();
        lifecycle.store(ChannelState::Joining);
        assert!(lifecycle.begin_kill());
        assert_eq!(lifecycle.load(), ChannelState::Killing);
    }

    #[test]
    fn test_receivable_states() {
        assert!(ChannelState::Listening.receivable());
        assert!(ChannelState::Joining.receivable());
        assert!(!ChannelState::Killing.receivable());
        assert!(!ChannelState::Dead.receivable());
    }
}
