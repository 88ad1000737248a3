//! Playback state owned by the coordinator

use crate::speed::PlaybackRate;
use audioshelf_core::CatalogBook;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which clock, if any, is driving the position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackMode {
    Idle,
    Simulated,
    Preview,
}

/// Transient item shown while an AI narration preview plays.
/// Never part of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewItem {
    pub title: String,
    pub author: String,
    pub duration_secs: f64,
}

impl PreviewItem {
    pub const ID: &'static str = "preview";

    pub fn new(duration_secs: f64) -> Self {
        Self {
            title: "AI Narrator Preview".to_string(),
            author: "AI Generated".to_string(),
            duration_secs,
        }
    }
}

/// The thing currently loaded in the player
#[derive(Debug, Clone, PartialEq)]
pub enum ActiveItem {
    Book(CatalogBook),
    Preview(PreviewItem),
}

impl ActiveItem {
    pub fn id(&self) -> &str {
        match self {
            ActiveItem::Book(book) => book.id.as_str(),
            ActiveItem::Preview(_) => PreviewItem::ID,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ActiveItem::Book(book) => &book.title,
            ActiveItem::Preview(item) => &item.title,
        }
    }

    pub fn author(&self) -> &str {
        match self {
            ActiveItem::Book(book) => &book.author,
            ActiveItem::Preview(item) => &item.author,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        match self {
            ActiveItem::Book(book) => book.duration.as_secs_f64(),
            ActiveItem::Preview(item) => item.duration_secs,
        }
    }

    pub fn mode(&self) -> PlaybackMode {
        match self {
            ActiveItem::Book(_) => PlaybackMode::Simulated,
            ActiveItem::Preview(_) => PlaybackMode::Preview,
        }
    }
}

/// Mutable playback state.
///
/// The mode is derived from the active item, so "item present iff not idle"
/// cannot be violated. Mutators are crate-private: only the coordinator and
/// its clock drivers write here.
#[derive(Debug, Clone)]
pub struct PlaybackState {
    active_item: Option<ActiveItem>,
    is_playing: bool,
    position_secs: f64,
    duration_secs: f64,
    volume: f32,
    rate: PlaybackRate,
    generation: u64,
}

impl PlaybackState {
    pub fn new(volume: f32, rate: PlaybackRate) -> Self {
        Self {
            active_item: None,
            is_playing: false,
            position_secs: 0.0,
            duration_secs: 0.0,
            volume: clamp_volume(volume).unwrap_or(1.0),
            rate,
            generation: 0,
        }
    }

    pub fn mode(&self) -> PlaybackMode {
        self.active_item
            .as_ref()
            .map(ActiveItem::mode)
            .unwrap_or(PlaybackMode::Idle)
    }

    pub fn active_item(&self) -> Option<&ActiveItem> {
        self.active_item.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn position(&self) -> f64 {
        self.position_secs
    }

    pub fn duration(&self) -> f64 {
        self.duration_secs
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn rate(&self) -> PlaybackRate {
        self.rate
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Loads an item, fixing its duration and starting position
    pub(crate) fn load(&mut self, item: ActiveItem, position_secs: f64, playing: bool) {
        self.duration_secs = item.duration_secs().max(0.0);
        self.active_item = Some(item);
        self.position_secs = 0.0;
        self.set_position(position_secs);
        self.is_playing = playing;
    }

    /// Back to idle; volume and rate survive
    pub(crate) fn reset(&mut self) {
        self.active_item = None;
        self.is_playing = false;
        self.position_secs = 0.0;
        self.duration_secs = 0.0;
    }

    /// Clamps into `[0, duration]`; non-finite input leaves the position unchanged
    pub(crate) fn set_position(&mut self, secs: f64) {
        if secs.is_finite() {
            self.position_secs = secs.clamp(0.0, self.duration_secs);
        }
    }

    pub(crate) fn set_playing(&mut self, playing: bool) {
        self.is_playing = playing;
    }

    pub(crate) fn set_volume(&mut self, volume: f32) {
        if let Some(v) = clamp_volume(volume) {
            self.volume = v;
        }
    }

    pub(crate) fn set_rate(&mut self, rate: PlaybackRate) {
        self.rate = rate;
    }

    /// Starts a new clock epoch; writers holding an older generation go quiet
    pub(crate) fn bump_generation(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    /// True once the position has reached the end of the loaded item
    pub fn at_end(&self) -> bool {
        self.active_item.is_some() && self.position_secs >= self.duration_secs
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            item: self.active_item.clone(),
            mode: self.mode(),
            is_playing: self.is_playing,
            position_secs: self.position_secs,
            duration_secs: self.duration_secs,
            volume: self.volume,
            rate: self.rate,
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new(1.0, PlaybackRate::default())
    }
}

fn clamp_volume(volume: f32) -> Option<f32> {
    volume.is_finite().then(|| volume.clamp(0.0, 1.0))
}

/// State shared between the coordinator and its driver tasks
pub type SharedState = Arc<Mutex<PlaybackState>>;

/// Read-only view handed to the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub item: Option<ActiveItem>,
    pub mode: PlaybackMode,
    pub is_playing: bool,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub volume: f32,
    pub rate: PlaybackRate,
}

impl PlaybackSnapshot {
    pub fn is_idle(&self) -> bool {
        self.mode == PlaybackMode::Idle
    }

    pub fn progress_fraction(&self) -> f64 {
        if self.duration_secs <= 0.0 {
            return 0.0;
        }
        (self.position_secs / self.duration_secs).clamp(0.0, 1.0)
    }

    pub fn remaining_secs(&self) -> f64 {
        (self.duration_secs - self.position_secs).max(0.0)
    }
}

#[cfg(test)]
mod state_tests {
    use super::*;
    use audioshelf_core::{BookId, Catalog, Duration};

    fn dune() -> CatalogBook {
        Catalog::with_seed_books()
            .require(&BookId::from_string("3"))
            .unwrap()
            .clone()
    }

    #[test]
    fn test_new_state_is_idle() {
        let state = PlaybackState::default();
        assert_eq!(state.mode(), PlaybackMode::Idle);
        assert!(state.active_item().is_none());
        assert!(!state.is_playing());
        assert_eq!(state.volume(), 1.0);
    }

    #[test]
    fn test_mode_follows_item() {
        let mut state = PlaybackState::default();
        state.load(ActiveItem::Book(dune()), 5400.0, true);
        assert_eq!(state.mode(), PlaybackMode::Simulated);
        assert_eq!(state.position(), 5400.0);
        assert_eq!(state.duration(), 54000.0);

        state.load(ActiveItem::Preview(PreviewItem::new(3.5)), 0.0, true);
        assert_eq!(state.mode(), PlaybackMode::Preview);
        assert_eq!(state.duration(), 3.5);

        state.reset();
        assert_eq!(state.mode(), PlaybackMode::Idle);
    }

    #[test]
    fn test_position_clamped() {
        let mut state = PlaybackState::default();
        state.load(ActiveItem::Book(dune()), 0.0, false);
        state.set_position(-10.0);
        assert_eq!(state.position(), 0.0);
        state.set_position(1e12);
        assert_eq!(state.position(), 54000.0);
        state.set_position(f64::NAN);
        assert_eq!(state.position(), 54000.0);
        assert!(state.at_end());
    }

    #[test]
    fn test_volume_and_rate_survive_reset() {
        let mut state = PlaybackState::default();
        state.set_volume(0.3);
        state.set_rate(PlaybackRate::nearest(1.5));
        state.load(ActiveItem::Book(dune()), 0.0, true);
        state.reset();
        assert_eq!(state.volume(), 0.3);
        assert_eq!(state.rate().value(), 1.5);
    }

    #[test]
    fn test_volume_clamped() {
        let mut state = PlaybackState::default();
        state.set_volume(4.0);
        assert_eq!(state.volume(), 1.0);
        state.set_volume(-1.0);
        assert_eq!(state.volume(), 0.0);
        state.set_volume(f32::NAN);
        assert_eq!(state.volume(), 0.0);
    }

    #[test]
    fn test_generation_bumps() {
        let mut state = PlaybackState::default();
        let first = state.bump_generation();
        let second = state.bump_generation();
        assert_eq!(second, first + 1);
    }

    #[test]
    fn test_snapshot_progress() {
        let mut state = PlaybackState::default();
        state.load(ActiveItem::Book(dune()), 5400.0, false);
        let snap = state.snapshot();
        assert!((snap.progress_fraction() - 0.1).abs() < 1e-9);
        assert_eq!(snap.remaining_secs(), 48600.0);
        assert_eq!(
            Duration::from_secs_f64(snap.position_secs),
            Duration::from_seconds(5400)
        );
    }
}
