//! Audio output abstraction.
//!
//! An [`AudioContext`] is the process-wide output handle, created lazily on
//! first preview and reused afterwards. Each preview plays through one
//! [`AudioGraph`]: a decoded buffer routed through a gain stage to the
//! output. Graphs expose their progress through a [`GraphControl`], which the
//! render side and the polling driver share without locks.

use crate::decoder::DecodedBuffer;
use crate::error::{EngineError, EngineResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Running,
    Suspended,
}

pub trait AudioContext: Send {
    fn state(&self) -> ContextState;

    fn resume(&mut self) -> EngineResult<()>;

    fn suspend(&mut self) -> EngineResult<()>;

    /// Output sample rate; buffers at other rates are resampled by the implementation
    fn sample_rate(&self) -> u32;

    /// Builds a graph for `buffer` with the given gain. The graph does not
    /// render until [`AudioGraph::start`].
    fn create_graph(
        &mut self,
        buffer: Arc<DecodedBuffer>,
        gain: f32,
    ) -> EngineResult<Box<dyn AudioGraph>>;
}

pub trait AudioGraph: Send {
    fn start(&mut self) -> EngineResult<()>;

    /// Stops and releases the graph. A second call fails with
    /// [`EngineError::AlreadyStopped`].
    fn stop(&mut self) -> EngineResult<()>;

    fn control(&self) -> Arc<GraphControl>;
}

/// Lock-free progress and gain for one graph
#[derive(Debug)]
pub struct GraphControl {
    cursor: AtomicU64,
    total_frames: u64,
    sample_rate: u32,
    gain_bits: AtomicU32,
    ended: AtomicBool,
}

impl GraphControl {
    pub fn new(total_frames: u64, sample_rate: u32, gain: f32) -> Self {
        Self {
            cursor: AtomicU64::new(0),
            total_frames,
            sample_rate: sample_rate.max(1),
            gain_bits: AtomicU32::new(sanitize_gain(gain).to_bits()),
            ended: AtomicBool::new(total_frames == 0),
        }
    }

    pub fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::Acquire)
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn position_secs(&self) -> f64 {
        self.cursor().min(self.total_frames) as f64 / f64::from(self.sample_rate)
    }

    pub fn duration_secs(&self) -> f64 {
        self.total_frames as f64 / f64::from(self.sample_rate)
    }

    pub fn gain(&self) -> f32 {
        f32::from_bits(self.gain_bits.load(Ordering::Relaxed))
    }

    pub fn set_gain(&self, gain: f32) {
        self.gain_bits
            .store(sanitize_gain(gain).to_bits(), Ordering::Relaxed);
    }

    /// Moves the read cursor. Seeking to the end ends playback.
    pub fn seek_to(&self, secs: f64) {
        if !secs.is_finite() {
            return;
        }
        let frame = (secs.max(0.0) * f64::from(self.sample_rate)) as u64;
        let frame = frame.min(self.total_frames);
        self.cursor.store(frame, Ordering::Release);
        self.ended
            .store(frame >= self.total_frames, Ordering::Release);
    }

    pub fn has_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    /// Fills `out` (interleaved, `out_channels` wide) from `source`
    /// (interleaved, `source_channels` wide) at the cursor, applying gain.
    ///
    /// Output channel `c` reads source channel `min(c, source_channels - 1)`,
    /// so mono is duplicated and extra source channels are dropped. Frames
    /// past the end are silence. Returns the number of frames rendered from
    /// the source.
    pub fn render(
        &self,
        source: &[f32],
        source_channels: usize,
        out: &mut [f32],
        out_channels: usize,
    ) -> usize {
        if source_channels == 0 || out_channels == 0 {
            out.fill(0.0);
            return 0;
        }

        let start = self.cursor();
        let available_frames = (source.len() / source_channels) as u64;
        let end = self.total_frames.min(available_frames);
        let out_frames = out.len() / out_channels;
        let gain = self.gain();

        let remaining = end.saturating_sub(start) as usize;
        let rendered = remaining.min(out_frames);

        for (i, frame) in out.chunks_exact_mut(out_channels).enumerate() {
            if i < rendered {
                let base = (start as usize + i) * source_channels;
                for (c, sample) in frame.iter_mut().enumerate() {
                    *sample = source[base + c.min(source_channels - 1)] * gain;
                }
            } else {
                frame.fill(0.0);
            }
        }

        let next = start + rendered as u64;
        // A concurrent seek wins over our advance
        let _ = self
            .cursor
            .compare_exchange(start, next, Ordering::AcqRel, Ordering::Acquire);

        if next >= end && self.cursor() >= end {
            self.ended.store(true, Ordering::Release);
        }

        rendered
    }
}

fn sanitize_gain(gain: f32) -> f32 {
    if gain.is_finite() {
        gain.clamp(0.0, 1.0)
    } else {
        1.0
    }
}

pub type SharedContext = Arc<Mutex<Box<dyn AudioContext>>>;

pub type ContextFactory = Box<dyn Fn() -> EngineResult<Box<dyn AudioContext>> + Send + Sync>;

/// Holds the session's audio context, creating it on first use.
///
/// A failed creation leaves the slot empty so the next preview can retry.
pub struct ContextSlot {
    factory: ContextFactory,
    context: Option<SharedContext>,
}

impl ContextSlot {
    pub fn new(factory: ContextFactory) -> Self {
        Self {
            factory,
            context: None,
        }
    }

    pub fn get_or_create(&mut self) -> EngineResult<SharedContext> {
        if let Some(context) = &self.context {
            return Ok(Arc::clone(context));
        }

        let context = (self.factory)().map_err(|e| match e {
            EngineError::AudioContextUnavailable(message) => {
                EngineError::AudioContextUnavailable(message)
            }
            other => EngineError::AudioContextUnavailable(other.to_string()),
        })?;

        log::info!("Audio context created at {} Hz", context.sample_rate());
        let context: SharedContext = Arc::new(Mutex::new(context));
        self.context = Some(Arc::clone(&context));
        Ok(context)
    }

    pub fn get(&self) -> Option<&SharedContext> {
        self.context.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }
}

impl std::fmt::Debug for ContextSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextSlot")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_render_mono_to_stereo_with_gain() {
        let control = GraphControl::new(3, 8000, 0.5);
        let source = [1.0, 0.5, -1.0];
        let mut out = [9.0f32; 8];

        let rendered = control.render(&source, 1, &mut out, 2);

        assert_eq!(rendered, 3);
        assert_eq!(out, [0.5, 0.5, 0.25, 0.25, -0.5, -0.5, 0.0, 0.0]);
        assert!(control.has_ended());
        assert_eq!(control.cursor(), 3);
    }

    #[test]
    fn test_render_stereo_to_mono_takes_first_channel() {
        let control = GraphControl::new(2, 8000, 1.0);
        let source = [0.1, 0.9, 0.2, 0.8];
        let mut out = [0.0f32; 2];

        control.render(&source, 2, &mut out, 1);

        assert_eq!(out, [0.1, 0.2]);
    }

    #[test]
    fn test_render_advances_cursor_in_blocks() {
        let control = GraphControl::new(8000, 8000, 1.0);
        let source = vec![0.0; 8000];
        let mut out = vec![0.0f32; 4000];

        control.render(&source, 1, &mut out, 1);
        assert!((control.position_secs() - 0.5).abs() < 1e-9);
        assert!(!control.has_ended());

        control.render(&source, 1, &mut out, 1);
        assert!(control.has_ended());
        assert!((control.position_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_seek_moves_cursor_and_clamps() {
        let control = GraphControl::new(8000, 8000, 1.0);
        control.seek_to(0.25);
        assert_eq!(control.cursor(), 2000);

        control.seek_to(99.0);
        assert_eq!(control.cursor(), 8000);
        assert!(control.has_ended());

        control.seek_to(0.0);
        assert!(!control.has_ended());

        control.seek_to(f64::NAN);
        assert_eq!(control.cursor(), 0);
    }

    #[test]
    fn test_gain_is_live() {
        let control = GraphControl::new(4, 8000, 1.0);
        control.set_gain(0.25);
        let mut out = [0.0f32; 1];
        control.render(&[1.0; 4], 1, &mut out, 1);
        assert_eq!(out[0], 0.25);

        control.set_gain(f32::NAN);
        assert_eq!(control.gain(), 1.0);
    }

    struct NullContext;

    impl AudioContext for NullContext {
        fn state(&self) -> ContextState {
            ContextState::Running
        }

        fn resume(&mut self) -> EngineResult<()> {
            Ok(())
        }

        fn suspend(&mut self) -> EngineResult<()> {
            Ok(())
        }

        fn sample_rate(&self) -> u32 {
            48000
        }

        fn create_graph(
            &mut self,
            _buffer: Arc<DecodedBuffer>,
            _gain: f32,
        ) -> EngineResult<Box<dyn AudioGraph>> {
            Err(EngineError::Output("null".to_string()))
        }
    }

    #[test]
    fn test_slot_creates_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut slot = ContextSlot::new(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(NullContext) as Box<dyn AudioContext>)
        }));

        assert!(!slot.is_initialized());
        let first = slot.get_or_create().unwrap();
        let second = slot.get_or_create().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_slot_failure_is_retryable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut slot = ContextSlot::new(Box::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(EngineError::Output("no device".to_string()))
            } else {
                Ok(Box::new(NullContext) as Box<dyn AudioContext>)
            }
        }));

        let err = slot.get_or_create().map(|_| ()).unwrap_err();
        assert!(matches!(err, EngineError::AudioContextUnavailable(_)));
        assert!(!slot.is_initialized());

        assert!(slot.get_or_create().is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
