// animation/mod.rs - Tween, timeline, ticker and scroll trigger engine for page effects

pub mod tween;
pub mod timeline;
pub mod ticker;
pub mod scroll_trigger;

pub use tween::*;
pub use timeline::*;
pub use ticker::*;
pub use scroll_trigger::*;

// ============================================================================
// PLAYBACK STATE
// ============================================================================

/// Tween playback control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Finished,
}

// ============================================================================
// UTILITY FUNCTIONS
// ============================================================================

/// Linear interpolation, `t` clamped to [0, 1]
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Fraction of `[start, end]` covered by `value`, clamped to [0, 1].
/// A degenerate range reports 1 once `value` reaches `start`.
#[inline]
pub fn normalized_progress(value: f32, start: f32, end: f32) -> f32 {
    let span = end - start;
    if span.abs() <= f32::EPSILON {
        return if value >= start { 1.0 } else { 0.0 };
    }
    ((value - start) / span).clamp(0.0, 1.0)
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Animation system errors
#[derive(Debug, thiserror::Error)]
pub enum AnimationError {
    #[error("Invalid animation parameters: {0}")]
    InvalidParameters(String),

    #[error("Unknown easing '{0}'")]
    UnknownEasing(String),

    #[error("Invalid trigger position '{0}'")]
    InvalidTriggerPosition(String),
}

pub type Result<T> = std::result::Result<T, AnimationError>;
