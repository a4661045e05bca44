//! Elapsed-time interpolators. Every animated track in the scene (morph,
//! transform, opacity, color) is one of these; none of them count frames.

use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    QuadInOut,
    CubicOut,
    #[default]
    CubicInOut,
    ExpoOut,
}

impl Easing {
    /// Map linear progress `t` in [0,1] to eased progress in [0,1].
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) * 0.5
                }
            }
            Easing::CubicOut => 1.0 - (1.0 - t).powi(3),
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) * 0.5
                }
            }
            Easing::ExpoOut => {
                if t >= 1.0 {
                    1.0
                } else {
                    1.0 - 2f32.powf(-10.0 * t)
                }
            }
        }
    }
}

/// Duration and easing of one track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub duration_ms: f64,
    pub easing: Easing,
}

impl Timing {
    pub const fn new(duration_ms: f64, easing: Easing) -> Self {
        Self { duration_ms, easing }
    }
}

/// A killable 0→1 progress ramp driven by elapsed milliseconds.
#[derive(Debug, Clone)]
pub struct Interpolator {
    timing: Timing,
    progress: f32,
    done: bool,
    killed: bool,
}

impl Interpolator {
    pub fn new(timing: Timing) -> Self {
        Self {
            timing,
            progress: 0.0,
            done: false,
            killed: false,
        }
    }

    /// Advance to `elapsed_ms` since the track started and return the eased
    /// progress. Reaching the duration pins progress to exactly 1.
    pub fn tick(&mut self, elapsed_ms: f64) -> f32 {
        if self.killed {
            return self.progress;
        }

        let linear = if self.timing.duration_ms <= 0.0 {
            1.0
        } else {
            (elapsed_ms.max(0.0) / self.timing.duration_ms).min(1.0) as f32
        };

        if linear >= 1.0 {
            self.progress = 1.0;
            self.done = true;
        } else {
            self.progress = self.timing.easing.apply(linear);
        }

        self.progress
    }

    #[inline]
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// True once the ramp completed or was killed.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.done || self.killed
    }

    #[inline]
    pub fn is_killed(&self) -> bool {
        self.killed
    }

    /// Stop the ramp where it is; later ticks are ignored.
    pub fn kill(&mut self) {
        self.killed = true;
    }
}

/// An interpolator bound to the clock time it started at.
#[derive(Debug, Clone)]
pub struct Track {
    pub started_ms: f64,
    pub interp: Interpolator,
}

impl Track {
    pub fn start(now_ms: f64, timing: Timing) -> Self {
        Self {
            started_ms: now_ms,
            interp: Interpolator::new(timing),
        }
    }

    #[inline]
    pub fn tick(&mut self, now_ms: f64) -> f32 {
        self.interp.tick(now_ms - self.started_ms)
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.interp.is_done()
    }
}

/// Linear blend between two values of a tweened quantity.
pub trait Lerp: Copy {
    fn lerp(self, to: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    #[inline]
    fn lerp(self, to: Self, t: f32) -> Self {
        self + (to - self) * t
    }
}

impl Lerp for Vec3 {
    #[inline]
    fn lerp(self, to: Self, t: f32) -> Self {
        Vec3::lerp(self, to, t)
    }
}

/// A value tweened from `from` to `to` on its own track.
#[derive(Debug, Clone)]
pub struct Tween<T> {
    from: T,
    to: T,
    track: Track,
}

impl<T: Lerp> Tween<T> {
    pub fn start(from: T, to: T, now_ms: f64, timing: Timing) -> Self {
        Self {
            from,
            to,
            track: Track::start(now_ms, timing),
        }
    }

    /// Value at `now_ms`. Exactly `to` once the track completes.
    pub fn tick(&mut self, now_ms: f64) -> T {
        let t = self.track.tick(now_ms);
        if self.track.interp.is_done() && !self.track.interp.is_killed() {
            self.to
        } else {
            self.from.lerp(self.to, t)
        }
    }

    #[inline]
    pub fn target(&self) -> T {
        self.to
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.track.is_done()
    }

    pub fn kill(&mut self) {
        self.track.interp.kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn easings_hit_endpoints() {
        for e in [
            Easing::Linear,
            Easing::QuadInOut,
            Easing::CubicOut,
            Easing::CubicInOut,
            Easing::ExpoOut,
        ] {
            assert_relative_eq!(e.apply(0.0), 0.0, epsilon = 1e-6);
            assert_relative_eq!(e.apply(1.0), 1.0, epsilon = 1e-6);
            assert!(e.apply(0.3) <= e.apply(0.6));
        }
    }

    #[test]
    fn interpolator_is_time_based_and_pins_to_one() {
        let mut it = Interpolator::new(Timing::new(1000.0, Easing::Linear));
        assert_relative_eq!(it.tick(250.0), 0.25);
        assert!(!it.is_done());
        // A long frame skips straight to the end.
        assert_eq!(it.tick(5000.0), 1.0);
        assert!(it.is_done());
    }

    #[test]
    fn killed_interpolator_freezes() {
        let mut it = Interpolator::new(Timing::new(1000.0, Easing::Linear));
        it.tick(400.0);
        it.kill();
        assert!(it.is_done());
        assert_relative_eq!(it.tick(900.0), 0.4);
    }

    #[test]
    fn tween_lands_exactly_on_target() {
        let mut tw = Tween::start(Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0), 0.0, Timing::new(100.0, Easing::CubicOut));
        let mid = tw.tick(50.0);
        assert!(mid.x > 0.5 && mid.x < 1.0);
        assert_eq!(tw.tick(100.0), tw.target());
        assert!(tw.is_done());
    }

    #[test]
    fn zero_duration_completes_immediately() {
        let mut track = Track::start(100.0, Timing::new(0.0, Easing::CubicOut));
        assert_eq!(track.tick(100.0), 1.0);
        assert!(track.is_done());
    }
}
