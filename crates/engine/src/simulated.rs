//! Wall-clock driver for catalog books.
//!
//! Books have no audio behind them; a tokio interval moves the position by
//! `rate x tick` while the state says playing.

use crate::clock::{ClockDriver, ClockHandle, ClockKind};
use crate::error::{EngineError, EngineResult};
use crate::state::{PlaybackMode, PlaybackState};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Result of one simulated tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Advanced,
    Idle,
    Finished,
}

/// Applies a single tick to the state.
///
/// Reaching the end clamps the position to the duration and pauses.
pub fn advance_simulated(state: &mut PlaybackState, tick_secs: f64) -> TickOutcome {
    if state.mode() != PlaybackMode::Simulated || !state.is_playing() {
        return TickOutcome::Idle;
    }

    let next = state.position() + state.rate().advance_for(tick_secs);
    state.set_position(next);

    if state.at_end() {
        state.set_playing(false);
        TickOutcome::Finished
    } else {
        TickOutcome::Advanced
    }
}

pub struct SimulatedDriver {
    tick: Duration,
    handle: Option<ClockHandle>,
    task: Option<JoinHandle<()>>,
}

impl SimulatedDriver {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick: if tick.is_zero() { DEFAULT_TICK } else { tick },
            handle: None,
            task: None,
        }
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

impl ClockDriver for SimulatedDriver {
    fn kind(&self) -> ClockKind {
        ClockKind::Simulated
    }

    fn start(&mut self, handle: ClockHandle) -> EngineResult<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| EngineError::InvalidState(format!("No async runtime: {}", e)))?;

        self.stop();

        let tick = self.tick;
        let task_handle = handle.clone();
        let task = runtime.spawn(async move {
            let tick_secs = tick.as_secs_f64();
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;

            loop {
                interval.tick().await;
                match task_handle.with_state(|state| advance_simulated(state, tick_secs)) {
                    None => break,
                    Some(TickOutcome::Finished) => log::info!("Simulated playback reached the end"),
                    Some(_) => {}
                }
            }

            log::debug!(
                "Simulated clock for generation {} retired",
                task_handle.generation()
            );
        });

        log::debug!("Simulated clock started, generation {}", handle.generation());
        self.handle = Some(handle);
        self.task = Some(task);
        Ok(())
    }

    fn pause(&mut self) -> EngineResult<()> {
        Ok(())
    }

    fn resume(&mut self) -> EngineResult<()> {
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn current_position(&self) -> f64 {
        self.handle
            .as_ref()
            .and_then(|h| h.with_state(|s| s.position()))
            .unwrap_or(0.0)
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for SimulatedDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
