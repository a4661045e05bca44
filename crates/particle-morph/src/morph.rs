//! Position (and optionally color) morph between two registered clouds.

use crate::gesture::Gesture;
use crate::tween::{Timing, Track};
use rayon::prelude::*;
use std::sync::Arc;

/// Below this many floats the lerp runs inline instead of on the pool.
const PAR_MIN_LEN: usize = 16 * 1024;

fn lerp_into(live: &mut [f32], from: &[f32], to: &[f32], t: f32) {
    let apply = |((l, f), d): ((&mut f32, &f32), &f32)| *l = *f + (*d - *f) * t;
    if live.len() >= PAR_MIN_LEN {
        live.par_iter_mut()
            .zip(from.par_iter())
            .zip(to.par_iter())
            .for_each(apply);
    } else {
        live.iter_mut().zip(from).zip(to).for_each(apply);
    }
}

/// Colors that move in lock-step with positions, sharing their progress.
#[derive(Debug, Clone)]
struct ColorLockstep {
    from: Vec<f32>,
    to: Arc<[f32]>,
}

#[derive(Debug, Clone)]
pub struct MorphTransition {
    target: Gesture,
    from: Vec<f32>,
    to: Arc<[f32]>,
    colors: Option<ColorLockstep>,
    track: Track,
}

/// Outcome of one morph tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MorphStep {
    pub progress: f32,
    pub colors_written: bool,
    pub done: bool,
}

impl MorphTransition {
    /// `from` is a snapshot of the live buffer taken at request time.
    pub fn start(target: Gesture, from: Vec<f32>, to: Arc<[f32]>, now_ms: f64, timing: Timing) -> Self {
        debug_assert_eq!(from.len(), to.len());
        Self {
            target,
            from,
            to,
            colors: None,
            track: Track::start(now_ms, timing),
        }
    }

    pub fn with_colors(mut self, from: Vec<f32>, to: Arc<[f32]>) -> Self {
        debug_assert_eq!(from.len(), to.len());
        self.colors = Some(ColorLockstep { from, to });
        self
    }

    #[inline]
    pub fn target(&self) -> Gesture {
        self.target
    }

    #[inline]
    pub fn progress(&self) -> f32 {
        self.track.interp.progress()
    }

    /// Advance to `now_ms` and write the interpolated buffers. On completion
    /// the destination is copied exactly rather than interpolated.
    pub fn tick(&mut self, now_ms: f64, live: &mut [f32], live_colors: &mut [f32]) -> MorphStep {
        if self.track.interp.is_killed() {
            return MorphStep {
                progress: self.progress(),
                colors_written: false,
                done: true,
            };
        }

        let progress = self.track.tick(now_ms);
        let done = self.track.is_done();

        if done {
            live.copy_from_slice(&self.to);
        } else {
            lerp_into(live, &self.from, &self.to, progress);
        }

        let colors_written = match &self.colors {
            Some(c) if live_colors.len() == c.to.len() => {
                if done {
                    live_colors.copy_from_slice(&c.to);
                } else {
                    lerp_into(live_colors, &c.from, &c.to, progress);
                }
                true
            }
            _ => false,
        };

        MorphStep {
            progress,
            colors_written,
            done,
        }
    }

    /// Stop the morph where it is; the live buffer keeps its last values.
    pub fn kill(&mut self) {
        self.track.interp.kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tween::Easing;

    fn hero() -> Vec<f32> {
        vec![0., 0., 0., 1., 1., 1., 2., 2., 2., 3., 3., 3.]
    }

    fn welcome() -> Arc<[f32]> {
        Arc::from(vec![1., 0., 0., 2., 1., 1., 3., 2., 2., 4., 3., 3.])
    }

    #[test]
    fn halfway_and_exact_landing() {
        let linear = Timing::new(1000.0, Easing::Linear);
        let mut m = MorphTransition::start(Gesture::Welcome, hero(), welcome(), 0.0, linear);
        let mut live = hero();

        let step = m.tick(500.0, &mut live, &mut []);
        assert!(!step.done && !step.colors_written);
        assert_eq!(live, vec![0.5, 0., 0., 1.5, 1., 1., 2.5, 2., 2., 3.5, 3., 3.]);

        assert!(m.tick(1000.0, &mut live, &mut []).done);
        assert_eq!(live.as_slice(), &*welcome());
    }

    #[test]
    fn colors_share_position_progress() {
        let linear = Timing::new(100.0, Easing::Linear);
        let mut m = MorphTransition::start(Gesture::Globe, vec![0.0; 3], Arc::from(vec![2.0; 3]), 0.0, linear)
            .with_colors(vec![0.0; 3], Arc::from(vec![1.0; 3]));
        let mut live = vec![0.0; 3];
        let mut colors = vec![0.0; 3];

        let step = m.tick(25.0, &mut live, &mut colors);
        assert!(step.colors_written);
        assert_eq!(live[0], 0.5);
        assert_eq!(colors[0], 0.25);
    }

    #[test]
    fn kill_freezes_progress() {
        let linear = Timing::new(100.0, Easing::Linear);
        let mut m = MorphTransition::start(Gesture::Welcome, hero(), welcome(), 0.0, linear);
        let mut live = hero();
        m.tick(50.0, &mut live, &mut []);
        m.kill();
        assert_eq!(m.progress(), 0.5);

        let snapshot = live.clone();
        assert!(m.tick(100.0, &mut live, &mut []).done);
        assert_eq!(live, snapshot);
    }
}
