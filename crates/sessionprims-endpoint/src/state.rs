use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a connection endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    /// Transport assigned, nothing exchanged yet.
    Initialized = 0,
    /// Receive path running; nothing sent yet.
    NewlyOpened = 1,
    /// Sending and receiving.
    Open = 2,
    /// Graceful close in progress.
    ShuttingDown = 3,
    /// Transport failed. Reconnecting is expected to help.
    Lost = 4,
    /// Local fault or protocol violation.
    Error = 5,
    /// Clean termination completed.
    Closed = 6,
}

impl ConnectionState {
    /// True once the endpoint can no longer carry traffic.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::ShuttingDown | Self::Lost | Self::Error | Self::Closed
        )
    }

    /// True while the receive loop should keep running.
    pub fn is_active(self) -> bool {
        matches!(self, Self::NewlyOpened | Self::Open)
    }

    fn can_become(self, next: Self) -> bool {
        match (self, next) {
            (Self::Initialized, Self::NewlyOpened) | (Self::NewlyOpened, Self::Open) => true,
            (Self::ShuttingDown, Self::Closed) => true,
            (current, next) => !current.is_terminal() && next.is_terminal(),
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Initialized,
            1 => Self::NewlyOpened,
            2 => Self::Open,
            3 => Self::ShuttingDown,
            4 => Self::Lost,
            5 => Self::Error,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initialized => "initialized",
            Self::NewlyOpened => "newly_opened",
            Self::Open => "open",
            Self::ShuttingDown => "shutting_down",
            Self::Lost => "lost",
            Self::Error => "error",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Atomic holder for [`ConnectionState`].
///
/// Terminal states are never downgraded; the only move out of one is
/// `ShuttingDown -> Closed`.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(ConnectionState::Initialized as u8))
    }

    pub(crate) fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `next` if allowed, returning the previous state on change.
    pub(crate) fn transition(&self, next: ConnectionState) -> Option<ConnectionState> {
        let mut current = self.get();
        loop {
            if !current.can_become(next) {
                return None;
            }
            match self.0.compare_exchange(
                current as u8,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(current),
                Err(actual) => current = ConnectionState::from_u8(actual),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::ConnectionState::*;

    #[test]
    fn forward_path() {
        let cell = StateCell::new();
        assert_eq!(cell.transition(NewlyOpened), Some(Initialized));
        assert_eq!(cell.transition(Open), Some(NewlyOpened));
        assert_eq!(cell.transition(ShuttingDown), Some(Open));
        assert_eq!(cell.transition(Closed), Some(ShuttingDown));
        assert_eq!(cell.get(), Closed);
    }

    #[test]
    fn open_is_only_reached_from_newly_opened() {
        let cell = StateCell::new();
        assert_eq!(cell.transition(Open), None);
        assert_eq!(cell.get(), Initialized);
    }

    #[test]
    fn terminal_states_are_never_downgraded() {
        for terminal in [Lost, Error, Closed] {
            let cell = StateCell::new();
            cell.transition(NewlyOpened);
            assert!(cell.transition(terminal).is_some());
            for next in [Initialized, NewlyOpened, Open, ShuttingDown, Lost, Error, Closed] {
                assert_eq!(cell.transition(next), None, "{terminal} -> {next}");
            }
            assert_eq!(cell.get(), terminal);
        }
    }

    #[test]
    fn shutting_down_only_finishes_as_closed() {
        let cell = StateCell::new();
        cell.transition(ShuttingDown);
        assert_eq!(cell.transition(Lost), None);
        assert_eq!(cell.transition(Error), None);
        assert_eq!(cell.transition(Closed), Some(ShuttingDown));
    }

    #[test]
    fn any_live_state_can_fail() {
        for live in [Initialized, NewlyOpened, Open] {
            assert!(live.can_become(Lost));
            assert!(live.can_become(Error));
            assert!(!live.is_terminal());
        }
        assert!(Open.is_active());
        assert!(!Initialized.is_active());
    }
}
