//! Clock drivers advance the playback position.
//!
//! At most one driver is attached to the coordinator at a time. Each driver
//! writes through a [`ClockHandle`] carrying the generation it was started
//! under; once the coordinator hands off to another driver the generation
//! moves on and the old handle's writes are dropped.

use crate::error::EngineResult;
use crate::state::{PlaybackState, SharedState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockKind {
    Simulated,
    RealAudio,
}

/// A driver's write access to the shared state
#[derive(Clone)]
pub struct ClockHandle {
    state: SharedState,
    generation: u64,
}

impl ClockHandle {
    pub(crate) fn new(state: SharedState, generation: u64) -> Self {
        Self { state, generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Runs `f` if this handle still owns the state, `None` once superseded
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut PlaybackState) -> R) -> Option<R> {
        let mut state = self.state.lock();
        if state.generation() != self.generation {
            return None;
        }
        Some(f(&mut state))
    }

    pub fn is_current(&self) -> bool {
        self.state.lock().generation() == self.generation
    }
}

impl std::fmt::Debug for ClockHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockHandle")
            .field("generation", &self.generation)
            .finish()
    }
}

pub trait ClockDriver: Send {
    fn kind(&self) -> ClockKind;

    fn start(&mut self, handle: ClockHandle) -> EngineResult<()>;

    fn pause(&mut self) -> EngineResult<()>;

    fn resume(&mut self) -> EngineResult<()>;

    /// Cancels the driver and releases anything it holds. Idempotent.
    fn stop(&mut self);

    fn current_position(&self) -> f64;

    fn is_running(&self) -> bool;

    /// Whether pause and resume act on a live output rather than a flag
    fn owns_live_output(&self) -> bool {
        false
    }

    /// Moves the driver's own cursor, if it has one
    fn reposition(&self, _secs: f64) {}

    fn set_gain(&self, _gain: f32) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_handle_goes_quiet_after_bump() {
        let state: SharedState = Arc::new(Mutex::new(PlaybackState::default()));
        let generation = state.lock().generation();
        let handle = ClockHandle::new(Arc::clone(&state), generation);

        assert_eq!(handle.with_state(|s| s.volume()), Some(1.0));
        assert!(handle.is_current());

        state.lock().bump_generation();

        assert_eq!(handle.with_state(|s| s.set_volume(0.0)), None);
        assert!(!handle.is_current());
        assert_eq!(state.lock().volume(), 1.0);
    }
}
