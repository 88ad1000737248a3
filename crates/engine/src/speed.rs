/// Playback rates offered by the player's rate button, in cycling order
pub const RATE_STEPS: [f32; 5] = [0.8, 1.0, 1.25, 1.5, 2.0];

/// Represents a playback rate multiplier.
///
/// Always one of [`RATE_STEPS`]; the simulated clock advances by this many
/// seconds of book time per second of wall time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackRate {
    index: usize,
}

impl PlaybackRate {
    pub const DEFAULT: f32 = 1.0;

    /// Snaps any value to the nearest offered rate.
    ///
    /// Non-finite values fall back to the default rate.
    pub fn nearest(value: f32) -> Self {
        if !value.is_finite() {
            return Self::default();
        }

        let index = RATE_STEPS
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (*a - value)
                    .abs()
                    .partial_cmp(&(*b - value).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .unwrap_or(DEFAULT_INDEX);

        Self { index }
    }

    /// Exact lookup; `None` if the value is not an offered rate
    pub fn exact(value: f32) -> Option<Self> {
        RATE_STEPS
            .iter()
            .position(|r| (r - value).abs() < f32::EPSILON)
            .map(|index| Self { index })
    }

    /// The next offered rate, wrapping from the fastest back to the slowest
    pub fn next(self) -> Self {
        Self {
            index: (self.index + 1) % RATE_STEPS.len(),
        }
    }

    /// Returns the numeric value
    pub fn value(&self) -> f32 {
        RATE_STEPS[self.index]
    }

    /// Checks if this is normal speed
    pub fn is_normal(&self) -> bool {
        self.index == DEFAULT_INDEX
    }

    /// Seconds of book time covered by one tick of `tick_secs` wall time
    pub fn advance_for(&self, tick_secs: f64) -> f64 {
        f64::from(self.value()) * tick_secs
    }
}

const DEFAULT_INDEX: usize = 1;

impl Default for PlaybackRate {
    fn default() -> Self {
        Self {
            index: DEFAULT_INDEX,
        }
    }
}

impl std::fmt::Display for PlaybackRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x", self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_normal() {
        let rate = PlaybackRate::default();
        assert_eq!(rate.value(), 1.0);
        assert!(rate.is_normal());
    }

    #[test]
    fn test_cycle_order_and_wrap() {
        let mut rate = PlaybackRate::nearest(0.8);
        let mut seen = vec![rate.value()];
        for _ in 0..5 {
            rate = rate.next();
            seen.push(rate.value());
        }
        assert_eq!(seen, vec![0.8, 1.0, 1.25, 1.5, 2.0, 0.8]);
    }

    #[test]
    fn test_nearest_snaps() {
        assert_eq!(PlaybackRate::nearest(1.3).value(), 1.25);
        assert_eq!(PlaybackRate::nearest(9.0).value(), 2.0);
        assert_eq!(PlaybackRate::nearest(-1.0).value(), 0.8);
        assert_eq!(PlaybackRate::nearest(f32::NAN).value(), 1.0);
    }

    #[test]
    fn test_exact() {
        assert!(PlaybackRate::exact(1.5).is_some());
        assert!(PlaybackRate::exact(1.4).is_none());
    }

    #[test]
    fn test_advance_for_tick() {
        let rate = PlaybackRate::nearest(1.5);
        assert!((rate.advance_for(1.0) - 1.5).abs() < 1e-9);
        assert!((rate.advance_for(0.5) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_display() {
        assert_eq!(PlaybackRate::nearest(1.25).to_string(), "1.25x");
        assert_eq!(PlaybackRate::default().to_string(), "1x");
    }
}
