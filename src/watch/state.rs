// src/watch/state.rs

use std::sync::atomic::{AtomicU8, Ordering};

use crate::types::WatcherState;

/// Atomic tri-state lifecycle flag shared by the caller and the dispatch
/// thread.
///
/// `Idle -> Running` only succeeds from `Idle`; any state can move to
/// `Stopped`, and `Stopped` is terminal.
#[derive(Debug)]
pub struct StateCell {
    raw: AtomicU8,
}

impl StateCell {
    pub fn new() -> Self {
        Self {
            raw: AtomicU8::new(WatcherState::Idle.as_u8()),
        }
    }

    pub fn get(&self) -> WatcherState {
        WatcherState::from_u8(self.raw.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.get() == WatcherState::Running
    }

    /// Move `Idle -> Running`. On failure returns the state actually found.
    pub fn begin(&self) -> Result<(), WatcherState> {
        self.raw
            .compare_exchange(
                WatcherState::Idle.as_u8(),
                WatcherState::Running.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(WatcherState::from_u8)
    }

    /// Move to `Stopped`, returning the previous state.
    pub fn stop(&self) -> WatcherState {
        WatcherState::from_u8(self.raw.swap(WatcherState::Stopped.as_u8(), Ordering::AcqRel))
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_only_from_idle() {
        let cell = StateCell::new();
        assert_eq!(cell.begin(), Ok(()));
        assert_eq!(cell.begin(), Err(WatcherState::Running));
        assert!(cell.is_running());
    }

    #[test]
    fn stop_is_terminal_and_reports_previous_state() {
        let cell = StateCell::new();
        assert_eq!(cell.stop(), WatcherState::Idle);
        assert_eq!(cell.stop(), WatcherState::Stopped);
        assert_eq!(cell.begin(), Err(WatcherState::Stopped));
        assert_eq!(cell.get(), WatcherState::Stopped);
    }
}
