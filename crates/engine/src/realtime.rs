//! Driver for AI narrator previews, which play through a real audio graph.
//!
//! The position is whatever the graph has rendered. A poll task copies it
//! into the state; when the graph runs out it pauses and releases the graph.

use crate::clock::{ClockDriver, ClockHandle, ClockKind};
use crate::context::{AudioGraph, GraphControl, SharedContext};
use crate::error::{EngineError, EngineResult};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_POLL: Duration = Duration::from_millis(100);

/// The live graph; `None` once released
type GraphSlot = Arc<Mutex<Option<Box<dyn AudioGraph>>>>;

/// Stops the graph if it is still held. Only the first caller gets to stop it.
fn release_graph(slot: &GraphSlot) {
    let taken = slot.lock().take();
    if let Some(mut graph) = taken {
        match graph.stop() {
            Ok(()) => log::debug!("Preview graph released"),
            Err(e) if e.is_benign() => log::debug!("Preview graph was already stopped"),
            Err(e) => log::warn!("Failed to stop preview graph: {}", e),
        }
    }
}

pub struct RealAudioDriver {
    context: SharedContext,
    graph: GraphSlot,
    control: Arc<GraphControl>,
    poll: Duration,
    task: Option<JoinHandle<()>>,
}

impl RealAudioDriver {
    pub fn new(context: SharedContext, graph: Box<dyn AudioGraph>, poll: Duration) -> Self {
        let control = graph.control();
        Self {
            context,
            graph: Arc::new(Mutex::new(Some(graph))),
            control,
            poll: if poll.is_zero() { DEFAULT_POLL } else { poll },
            task: None,
        }
    }

    pub fn control(&self) -> &Arc<GraphControl> {
        &self.control
    }

    pub fn has_live_graph(&self) -> bool {
        self.graph.lock().is_some()
    }
}

impl ClockDriver for RealAudioDriver {
    fn kind(&self) -> ClockKind {
        ClockKind::RealAudio
    }

    fn start(&mut self, handle: ClockHandle) -> EngineResult<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| EngineError::InvalidState(format!("No async runtime: {}", e)))?;

        {
            let mut graph = self.graph.lock();
            let graph = graph
                .as_mut()
                .ok_or_else(|| EngineError::InvalidState("Preview graph released".to_string()))?;
            graph.start()?;
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }

        let control = Arc::clone(&self.control);
        let graph = Arc::clone(&self.graph);
        let poll = self.poll;

        self.task = Some(runtime.spawn(async move {
            let mut interval = tokio::time::interval(poll);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let finished = handle.with_state(|state| {
                    state.set_position(control.position_secs());
                    let done = control.has_ended() || state.at_end();
                    if done {
                        state.set_position(state.duration());
                        state.set_playing(false);
                    }
                    done
                });

                match finished {
                    None => break,
                    Some(true) => {
                        log::info!("Preview finished");
                        release_graph(&graph);
                        break;
                    }
                    Some(false) => {}
                }
            }
        }));

        log::debug!("Preview clock started");
        Ok(())
    }

    fn pause(&mut self) -> EngineResult<()> {
        self.context.lock().suspend()
    }

    fn resume(&mut self) -> EngineResult<()> {
        self.context.lock().resume()
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        release_graph(&self.graph);
    }

    fn current_position(&self) -> f64 {
        self.control.position_secs()
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn owns_live_output(&self) -> bool {
        self.has_live_graph()
    }

    fn reposition(&self, secs: f64) {
        self.control.seek_to(secs);
    }

    fn set_gain(&self, gain: f32) {
        self.control.set_gain(gain);
    }
}

impl Drop for RealAudioDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
