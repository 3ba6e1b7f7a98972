// animation/tween.rs - Property tweens with GSAP-style easing, stagger, repeat and yoyo

use std::time::Duration;
use super::{lerp, PlaybackState, Result, AnimationError};

/// Repeat count meaning "loop forever" (GSAP's `repeat: -1`)
pub const REPEAT_FOREVER: u32 = u32::MAX;

// ============================================================================
// EASING FUNCTIONS
// ============================================================================

/// Easing curves, named the way GSAP names them.
///
/// `power1` is quadratic, `power2` cubic, `power3` quartic and `power4`
/// quintic; the stored exponent is the GSAP power number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    Linear,
    PowerIn(u8),
    PowerOut(u8),
    PowerInOut(u8),
    SineInOut,
}

impl Easing {
    /// Parse a GSAP ease string such as `"power4.inOut"` or `"none"`.
    pub fn parse(name: &str) -> Result<Self> {
        let unknown = || AnimationError::UnknownEasing(name.to_string());

        match name {
            "none" | "linear" => return Ok(Easing::Linear),
            "sine.inOut" => return Ok(Easing::SineInOut),
            _ => {}
        }

        let (family, mode) = name.split_once('.').unwrap_or((name, "out"));
        let power: u8 = family
            .strip_prefix("power")
            .and_then(|n| n.parse().ok())
            .filter(|n| *n <= 4)
            .ok_or_else(unknown)?;

        if power == 0 {
            return Ok(Easing::Linear);
        }

        match mode {
            "in" => Ok(Easing::PowerIn(power)),
            "out" => Ok(Easing::PowerOut(power)),
            "inOut" => Ok(Easing::PowerInOut(power)),
            _ => Err(unknown()),
        }
    }

    /// Apply easing function to normalized time value
    #[inline]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Easing::Linear => t,
            Easing::PowerIn(p) => t.powi(p as i32 + 1),
            Easing::PowerOut(p) => 1.0 - (1.0 - t).powi(p as i32 + 1),
            Easing::PowerInOut(p) => {
                let exp = p as i32 + 1;
                if t < 0.5 {
                    (2.0 * t).powi(exp) / 2.0
                } else {
                    1.0 - (2.0 * (1.0 - t)).powi(exp) / 2.0
                }
            }
            Easing::SineInOut => -(((std::f32::consts::PI * t).cos() - 1.0) / 2.0),
        }
    }
}

// ============================================================================
// INTERPOLATABLE TRAIT
// ============================================================================

/// Trait for types that can be interpolated
pub trait Interpolate: Clone + 'static {
    fn interpolate(&self, other: &Self, t: f32) -> Self;
}

impl Interpolate for f32 {
    #[inline]
    fn interpolate(&self, other: &Self, t: f32) -> Self {
        lerp(*self, *other, t)
    }
}

impl Interpolate for glam::Vec3 {
    #[inline]
    fn interpolate(&self, other: &Self, t: f32) -> Self {
        self.lerp(*other, t.clamp(0.0, 1.0))
    }
}

// ============================================================================
// TWEEN IMPLEMENTATION
// ============================================================================

/// Generic tween for any interpolatable type.
///
/// The current value is the start value from construction on, so a tween
/// built from a "from" state renders that state before it ever plays.
pub struct Tween<T: Interpolate> {
    start: T,
    end: T,
    current: T,
    duration: Duration,
    elapsed: Duration,
    delay: Duration,
    delay_elapsed: Duration,
    easing: Easing,
    state: PlaybackState,
    repeat: u32,  // 0 = no repeat, REPEAT_FOREVER = infinite
    repeat_count: u32,
    yoyo: bool,
    reversed: bool,
}

impl<T: Interpolate> Tween<T> {
    /// Create new tween
    pub fn new(start: T, end: T, duration: Duration) -> Self {
        Self {
            start: start.clone(),
            end,
            current: start,
            duration,
            elapsed: Duration::ZERO,
            delay: Duration::ZERO,
            delay_elapsed: Duration::ZERO,
            easing: Easing::Linear,
            state: PlaybackState::Playing,
            repeat: 0,
            repeat_count: 0,
            yoyo: false,
            reversed: false,
        }
    }

    /// Set easing function
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Set initial delay
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set repeat count (REPEAT_FOREVER for infinite)
    pub fn with_repeat(mut self, count: u32) -> Self {
        self.repeat = count;
        self
    }

    /// Enable yoyo mode (reverse on repeat)
    pub fn with_yoyo(mut self, yoyo: bool) -> Self {
        self.yoyo = yoyo;
        self
    }

    /// Start paused; `resume` begins playback
    pub fn paused(mut self) -> Self {
        self.state = PlaybackState::Paused;
        self
    }

    /// Get current interpolated value
    pub fn current(&self) -> &T {
        &self.current
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Progress through the current iteration, in [0, 1]
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == PlaybackState::Paused {
            self.state = PlaybackState::Playing;
        }
    }

    /// Update tween and return true if still active
    pub fn update(&mut self, dt: Duration) -> bool {
        if self.state != PlaybackState::Playing {
            return self.state != PlaybackState::Finished;
        }

        // Delay consumes time first; the remainder carries into the tween
        let mut dt = dt;
        if self.delay_elapsed < self.delay {
            let remaining = self.delay - self.delay_elapsed;
            if dt < remaining {
                self.delay_elapsed += dt;
                return true;
            }
            self.delay_elapsed = self.delay;
            dt -= remaining;
        }

        self.elapsed += dt;

        while self.elapsed >= self.duration {
            if self.duration.is_zero() || self.repeat_count >= self.repeat {
                self.elapsed = self.duration;
                self.render();
                self.state = PlaybackState::Finished;
                return false;
            }

            if self.repeat != REPEAT_FOREVER {
                self.repeat_count += 1;
            }
            self.elapsed -= self.duration;

            if self.yoyo {
                self.reversed = !self.reversed;
            }
        }

        self.render();
        true
    }

    fn render(&mut self) {
        let raw = self.progress();
        let t = if self.reversed { 1.0 - raw } else { raw };
        self.current = self.start.interpolate(&self.end, self.easing.apply(t));
    }
}

/// Start offset of the `index`-th target in a staggered group
#[inline]
pub fn stagger(index: usize, each: Duration) -> Duration {
    each.mul_f64(index as f64)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_easing_boundaries() {
        for easing in [
            Easing::Linear,
            Easing::PowerOut(2),
            Easing::PowerInOut(4),
            Easing::SineInOut,
        ] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert!((easing.apply(1.0) - 1.0).abs() < 0.001);
        }
    }

    #[test]
    fn test_easing_parse() {
        assert_eq!(Easing::parse("none").unwrap(), Easing::Linear);
        assert_eq!(Easing::parse("power2.out").unwrap(), Easing::PowerOut(2));
        assert_eq!(Easing::parse("power4.inOut").unwrap(), Easing::PowerInOut(4));
        assert_eq!(Easing::parse("power3").unwrap(), Easing::PowerOut(3));
        assert!(Easing::parse("bounce.out").is_err());
        assert!(Easing::parse("power9.in").is_err());
    }

    #[test]
    fn test_power4_in_out_shape() {
        let ease = Easing::PowerInOut(4);
        assert!((ease.apply(0.25) - 0.015625).abs() < 1e-6);
        assert!((ease.apply(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_tween_update() {
        let mut tween = Tween::new(0.0f32, 100.0, Duration::from_millis(100));

        assert!(tween.update(Duration::from_millis(50)));
        assert!((tween.current() - 50.0).abs() < 1.0);

        assert!(!tween.update(Duration::from_millis(50)));
        assert_eq!(tween.state(), PlaybackState::Finished);
        assert!((tween.current() - 100.0).abs() < 0.001);
    }

    #[test]
    fn test_tween_delay_carries_remainder() {
        let mut tween = Tween::new(0.0f32, 100.0, Duration::from_millis(100))
            .with_delay(Duration::from_millis(40));

        tween.update(Duration::from_millis(30));
        assert_eq!(*tween.current(), 0.0);

        // 10ms finish the delay, 40ms go into the tween
        tween.update(Duration::from_millis(50));
        assert!((tween.current() - 40.0).abs() < 0.5);
    }

    #[test]
    fn test_tween_yoyo() {
        let mut tween = Tween::new(0.0f32, 100.0, Duration::from_millis(100))
            .with_repeat(1)
            .with_yoyo(true);

        tween.update(Duration::from_millis(100));
        assert!((tween.current() - 100.0).abs() < 0.001);

        tween.update(Duration::from_millis(50));
        assert!((tween.current() - 50.0).abs() < 1.0);

        assert!(!tween.update(Duration::from_millis(50)));
        assert!(tween.current().abs() < 0.001);
    }

    #[test]
    fn test_tween_repeats_forever() {
        let mut tween = Tween::new(0.0f32, 1.0, Duration::from_millis(10))
            .with_repeat(REPEAT_FOREVER)
            .with_yoyo(true);

        for _ in 0..1000 {
            assert!(tween.update(Duration::from_millis(7)));
        }
        assert_eq!(tween.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_paused_tween_holds_start_value() {
        let mut tween = Tween::new(-100.0f32, 0.0, Duration::from_millis(600)).paused();
        assert!(tween.update(Duration::from_millis(300)));
        assert_eq!(*tween.current(), -100.0);

        tween.resume();
        tween.update(Duration::from_millis(300));
        assert!((tween.current() + 50.0).abs() < 0.01);
    }

    #[test]
    fn test_vector_tween() {
        let from = glam::Vec3::new(0.0, 0.0, 25.0);
        let to = glam::Vec3::new(0.0, 0.0, -50.0);
        let mut tween = Tween::new(from, to, Duration::from_secs(4));
        tween.update(Duration::from_secs(2));
        assert!((tween.current().z + 12.5).abs() < 1e-4);
    }

    #[test]
    fn test_stagger_offsets() {
        let each = Duration::from_millis(200);
        assert_eq!(stagger(0, each), Duration::ZERO);
        assert_eq!(stagger(3, each), Duration::from_millis(600));
    }
}
