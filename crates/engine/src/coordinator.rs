//! Playback coordinator.
//!
//! Owns the playback state and whichever clock driver is attached. Catalog
//! books run on the simulated clock; narrated previews run on real audio.
//! Every hand-off between drivers goes through [`PlaybackCoordinator::detach_driver`],
//! which bumps the state generation before stopping the old driver, so a
//! tick already in flight can no longer write.

use crate::clock::{ClockDriver, ClockHandle, ClockKind};
use crate::context::{AudioContext, ContextFactory, ContextSlot, ContextState};
use crate::decoder::{DecodeHints, DecodedBuffer, PreviewDecoder};
use crate::error::{EngineError, EngineResult};
use crate::output::{AudioOutputConfig, CpalContext};
use crate::preview::{PreviewAudioProvider, PreviewOutcome};
use crate::realtime::{RealAudioDriver, DEFAULT_POLL};
use crate::simulated::{SimulatedDriver, DEFAULT_TICK};
use crate::speed::PlaybackRate;
use crate::state::{ActiveItem, PlaybackMode, PlaybackSnapshot, PlaybackState, PreviewItem, SharedState};
use audioshelf_core::CatalogBook;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_SKIP_SECS: f64 = 15.0;

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Simulated clock period
    pub tick: Duration,
    /// How often preview progress is read from the graph
    pub poll: Duration,
    pub skip_secs: f64,
    pub initial_volume: f32,
    pub initial_rate: PlaybackRate,
    pub decode_hints: DecodeHints,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            poll: DEFAULT_POLL,
            skip_secs: DEFAULT_SKIP_SECS,
            initial_volume: 1.0,
            initial_rate: PlaybackRate::default(),
            decode_hints: DecodeHints::default(),
        }
    }
}

pub struct PlaybackCoordinator {
    state: SharedState,
    driver: Option<Box<dyn ClockDriver>>,
    context: ContextSlot,
    config: CoordinatorConfig,
}

impl PlaybackCoordinator {
    /// Creates an idle coordinator. `context_factory` is called the first
    /// time a preview needs audio output.
    pub fn new(config: CoordinatorConfig, context_factory: ContextFactory) -> Self {
        let state = PlaybackState::new(config.initial_volume, config.initial_rate);
        Self {
            state: Arc::new(Mutex::new(state)),
            driver: None,
            context: ContextSlot::new(context_factory),
            config,
        }
    }

    /// Coordinator that plays previews through cpal
    pub fn with_cpal_output(config: CoordinatorConfig, output: AudioOutputConfig) -> Self {
        Self::new(
            config,
            Box::new(move || {
                CpalContext::new(output.clone()).map(|c| Box::new(c) as Box<dyn AudioContext>)
            }),
        )
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.state.lock().snapshot()
    }

    pub fn mode(&self) -> PlaybackMode {
        self.state.lock().mode()
    }

    /// Kind of the attached driver, if any
    pub fn clock_kind(&self) -> Option<ClockKind> {
        self.driver.as_ref().map(|d| d.kind())
    }

    pub fn audio_context_initialized(&self) -> bool {
        self.context.is_initialized()
    }

    /// Retires the current driver. The generation moves first so nothing the
    /// old driver still has in flight can land.
    fn detach_driver(&mut self) -> u64 {
        let generation = self.state.lock().bump_generation();
        if let Some(mut driver) = self.driver.take() {
            log::debug!("Detaching {:?} clock", driver.kind());
            driver.stop();
        }
        generation
    }

    fn attach_simulated(&mut self, generation: u64) -> EngineResult<()> {
        let mut driver = SimulatedDriver::new(self.config.tick);
        driver.start(ClockHandle::new(Arc::clone(&self.state), generation))?;
        self.driver = Some(Box::new(driver));
        Ok(())
    }

    /// Loads a catalog book at its stored progress and starts the simulated clock
    pub fn load_and_play(&mut self, book: CatalogBook) -> EngineResult<()> {
        let generation = self.detach_driver();

        log::info!("Playing '{}' by {}", book.title, book.author);
        let position = book.progress.as_secs_f64();
        self.state
            .lock()
            .load(ActiveItem::Book(book), position, true);

        if let Err(e) = self.attach_simulated(generation) {
            self.state.lock().set_playing(false);
            return Err(e);
        }
        Ok(())
    }

    /// Flips play/pause. A live preview suspends or resumes the audio output.
    pub fn toggle_play_pause(&mut self) -> EngineResult<()> {
        let (mode, playing) = {
            let state = self.state.lock();
            (state.mode(), state.is_playing())
        };

        if mode == PlaybackMode::Idle {
            return Ok(());
        }

        match self.driver.as_mut().filter(|d| d.owns_live_output()) {
            Some(driver) if playing => driver.pause()?,
            Some(driver) => driver.resume()?,
            // A preview without a graph has finished or never started; nothing could play it
            None if mode == PlaybackMode::Preview && !playing => {
                log::debug!("Preview has no audio left to resume");
                return Ok(());
            }
            None => {}
        }

        self.state.lock().set_playing(!playing);
        Ok(())
    }

    /// Moves to `target_secs`, clamped to the loaded item
    pub fn seek(&mut self, target_secs: f64) {
        if !target_secs.is_finite() {
            return;
        }

        let target = {
            let state = self.state.lock();
            if state.mode() == PlaybackMode::Idle {
                return;
            }
            target_secs.clamp(0.0, state.duration())
        };

        if let Some(driver) = &self.driver {
            driver.reposition(target);
        }
        self.state.lock().set_position(target);
    }

    pub fn skip_forward(&mut self) {
        let position = self.state.lock().position();
        self.seek(position + self.config.skip_secs);
    }

    pub fn skip_back(&mut self) {
        let position = self.state.lock().position();
        self.seek(position - self.config.skip_secs);
    }

    /// `None` cycles to the next offered rate; a value snaps to the nearest one
    pub fn set_playback_rate(&mut self, rate: Option<f32>) -> PlaybackRate {
        let mut state = self.state.lock();
        let next = match rate {
            Some(value) => PlaybackRate::nearest(value),
            None => state.rate().next(),
        };
        state.set_rate(next);
        log::debug!("Playback rate {}", next);
        next
    }

    /// Clamped to `[0, 1]`, applied live to a playing preview. Returns the applied volume.
    pub fn set_volume(&mut self, volume: f32) -> f32 {
        let applied = {
            let mut state = self.state.lock();
            state.set_volume(volume);
            state.volume()
        };
        if let Some(driver) = &self.driver {
            driver.set_gain(applied);
        }
        applied
    }

    /// Plays an already-decoded preview through the audio context.
    ///
    /// Ordering: pause and stop the current driver (including any earlier
    /// preview graph), acquire the context, build the new graph, then load
    /// the preview item and start the real-audio clock.
    pub fn start_preview(&mut self, buffer: DecodedBuffer) -> EngineResult<()> {
        self.state.lock().set_playing(false);
        self.detach_driver();

        let context = match self.context.get_or_create() {
            Ok(context) => context,
            Err(e) => return Err(self.recover_from_failed_preview(e)),
        };

        {
            let mut ctx = context.lock();
            if ctx.state() != ContextState::Running {
                if let Err(e) = ctx.resume() {
                    drop(ctx);
                    return Err(self.recover_from_failed_preview(e));
                }
            }
        }

        let buffer = Arc::new(buffer);
        let volume = self.state.lock().volume();
        let created = context.lock().create_graph(Arc::clone(&buffer), volume);
        let graph = match created {
            Ok(graph) => graph,
            Err(e) => return Err(self.recover_from_failed_preview(e)),
        };

        let duration_secs = buffer.duration_secs();
        let generation = {
            let mut state = self.state.lock();
            let generation = state.bump_generation();
            state.load(ActiveItem::Preview(PreviewItem::new(duration_secs)), 0.0, true);
            generation
        };

        let mut driver = RealAudioDriver::new(context, graph, self.config.poll);
        if let Err(e) = driver.start(ClockHandle::new(Arc::clone(&self.state), generation)) {
            driver.stop();
            self.state.lock().set_playing(false);
            return Err(e);
        }

        log::info!("Preview started ({:.1}s)", duration_secs);
        self.driver = Some(Box::new(driver));
        Ok(())
    }

    /// Re-attaches a paused simulated clock if a book is still loaded, so
    /// the user can resume it after a preview that never started.
    fn recover_from_failed_preview(&mut self, error: EngineError) -> EngineError {
        log::warn!("Preview could not start: {}", error);
        if self.state.lock().mode() == PlaybackMode::Simulated && self.driver.is_none() {
            let generation = self.state.lock().bump_generation();
            if let Err(e) = self.attach_simulated(generation) {
                log::warn!("Could not restore simulated clock: {}", e);
            }
        }
        error
    }

    /// Full preview flow: hold current playback, fetch narration, decode, play.
    ///
    /// Never fails outright; any problem yields [`PreviewOutcome::Unavailable`]
    /// with the current item left loaded and paused.
    pub async fn preview(
        &mut self,
        provider: &dyn PreviewAudioProvider,
        decoder: &PreviewDecoder,
        text: &str,
    ) -> PreviewOutcome {
        self.hold_playback();

        let audio = match provider.request_preview_audio(text).await {
            Ok(audio) => audio,
            Err(e) => {
                log::warn!("Preview audio request failed: {}", e);
                return PreviewOutcome::unavailable(e);
            }
        };

        let buffer = match decoder.decode(audio, self.config.decode_hints).await {
            Ok(buffer) => buffer,
            Err(e) => {
                log::warn!("Preview audio could not be decoded: {}", e);
                return PreviewOutcome::unavailable(e);
            }
        };

        let duration_secs = buffer.duration_secs();
        match self.start_preview(buffer) {
            Ok(()) => PreviewOutcome::Started { duration_secs },
            Err(e) => PreviewOutcome::unavailable(e),
        }
    }

    /// Pauses whatever is playing without detaching its clock
    fn hold_playback(&mut self) {
        let playing = self.state.lock().is_playing();
        if !playing {
            return;
        }
        if let Some(driver) = self.driver.as_mut().filter(|d| d.owns_live_output()) {
            if let Err(e) = driver.pause() {
                log::warn!("Failed to suspend output: {}", e);
            }
        }
        self.state.lock().set_playing(false);
    }

    /// Stops everything and returns to idle. Volume and rate are kept.
    pub fn close(&mut self) {
        self.detach_driver();
        self.state.lock().reset();
        log::debug!("Player closed");
    }
}

impl Drop for PlaybackCoordinator {
    fn drop(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            driver.stop();
        }
    }
}

impl std::fmt::Debug for PlaybackCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackCoordinator")
            .field("state", &*self.state.lock())
            .field("clock", &self.clock_kind())
            .field("context", &self.context)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audioshelf_core::{BookId, Catalog};

    fn no_audio() -> ContextFactory {
        Box::new(|| Err(EngineError::Output("no audio in unit tests".to_string())))
    }

    fn book(id: &str) -> CatalogBook {
        Catalog::with_seed_books()
            .require(&BookId::from_string(id))
            .unwrap()
            .clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_and_play_resumes_from_progress() {
        let mut coordinator = PlaybackCoordinator::new(CoordinatorConfig::default(), no_audio());
        coordinator.load_and_play(book("3")).unwrap();

        let snap = coordinator.snapshot();
        assert_eq!(snap.mode, PlaybackMode::Simulated);
        assert!(snap.is_playing);
        assert_eq!(snap.position_secs, 5400.0);
        assert_eq!(snap.duration_secs, 54000.0);
        assert_eq!(coordinator.clock_kind(), Some(ClockKind::Simulated));
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_on_idle_is_noop() {
        let mut coordinator = PlaybackCoordinator::new(CoordinatorConfig::default(), no_audio());
        coordinator.toggle_play_pause().unwrap();
        assert!(!coordinator.snapshot().is_playing);
        assert!(coordinator.snapshot().is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_and_skip_clamp() {
        let mut coordinator = PlaybackCoordinator::new(CoordinatorConfig::default(), no_audio());
        coordinator.load_and_play(book("3")).unwrap();

        coordinator.seek(100.0);
        assert_eq!(coordinator.snapshot().position_secs, 100.0);

        coordinator.skip_back();
        assert_eq!(coordinator.snapshot().position_secs, 85.0);

        coordinator.seek(5.0);
        coordinator.skip_back();
        assert_eq!(coordinator.snapshot().position_secs, 0.0);

        coordinator.seek(1e9);
        assert_eq!(coordinator.snapshot().position_secs, 54000.0);
        coordinator.skip_forward();
        assert_eq!(coordinator.snapshot().position_secs, 54000.0);

        coordinator.seek(f64::NAN);
        assert_eq!(coordinator.snapshot().position_secs, 54000.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_cycles_and_snaps() {
        let mut coordinator = PlaybackCoordinator::new(CoordinatorConfig::default(), no_audio());
        assert_eq!(coordinator.set_playback_rate(None).value(), 1.25);
        assert_eq!(coordinator.set_playback_rate(Some(1.9)).value(), 2.0);
        assert_eq!(coordinator.set_playback_rate(None).value(), 0.8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_volume_clamped() {
        let mut coordinator = PlaybackCoordinator::new(CoordinatorConfig::default(), no_audio());
        assert_eq!(coordinator.set_volume(1.7), 1.0);
        assert_eq!(coordinator.set_volume(-0.2), 0.0);
        assert_eq!(coordinator.set_volume(f32::INFINITY), 0.0);
        assert_eq!(coordinator.set_volume(0.4), 0.4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_is_idempotent() {
        let mut coordinator = PlaybackCoordinator::new(CoordinatorConfig::default(), no_audio());
        coordinator.set_volume(0.5);
        coordinator.load_and_play(book("1")).unwrap();
        coordinator.close();
        coordinator.close();

        let snap = coordinator.snapshot();
        assert!(snap.is_idle());
        assert!(snap.item.is_none());
        assert!(!snap.is_playing);
        assert_eq!(snap.volume, 0.5);
        assert!(coordinator.clock_kind().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_context_keeps_book_resumable() {
        let mut coordinator = PlaybackCoordinator::new(CoordinatorConfig::default(), no_audio());
        coordinator.load_and_play(book("3")).unwrap();

        let buffer = DecodedBuffer::new(vec![0.0; 24000], 24000, 1).unwrap();
        let err = coordinator.start_preview(buffer).unwrap_err();
        assert!(matches!(err, EngineError::AudioContextUnavailable(_)));
        assert!(!coordinator.audio_context_initialized());

        let snap = coordinator.snapshot();
        assert_eq!(snap.mode, PlaybackMode::Simulated);
        assert!(!snap.is_playing);
        assert_eq!(coordinator.clock_kind(), Some(ClockKind::Simulated));

        coordinator.toggle_play_pause().unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(coordinator.snapshot().position_secs, 5402.0);
    }
}
