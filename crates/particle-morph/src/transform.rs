//! Whole-entity transform: per-gesture tween targets, idle float, pointer
//! bias, drag rotation and auto-rotation layered on top.

use crate::tween::{Lerp, Timing, Tween};
use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Where a gesture places the entity, and how it is viewed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureTransform {
    pub position: Vec3,
    /// Euler XYZ, radians.
    pub rotation: Vec3,
    pub scale: f32,
    pub particle_size: f32,
    pub camera_distance: f32,
}

impl Default for GestureTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: 1.0,
            particle_size: 0.06,
            camera_distance: 22.0,
        }
    }
}

impl Lerp for GestureTransform {
    fn lerp(self, to: Self, t: f32) -> Self {
        Self {
            position: Lerp::lerp(self.position, to.position, t),
            rotation: Lerp::lerp(self.rotation, to.rotation, t),
            scale: Lerp::lerp(self.scale, to.scale, t),
            particle_size: Lerp::lerp(self.particle_size, to.particle_size, t),
            camera_distance: Lerp::lerp(self.camera_distance, to.camera_distance, t),
        }
    }
}

/// The transform actually applied to the entity this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityTransform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: f32,
}

impl EntityTransform {
    pub fn matrix(&self) -> Mat4 {
        let rot = Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z);
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), rot, self.position)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleParams {
    /// Vertical float amplitude, local units.
    pub float_amplitude: f32,
    pub float_period_s: f32,
    /// Peak idle Y rotation sway, radians.
    pub sway: f32,
    /// Rotation per unit of pointer NDC: x from pointer.y, y from pointer.x.
    pub pointer_bias: Vec2,
    /// Interactive-state spin about Y, radians per second.
    pub auto_rotate_speed: f32,
    /// Radians of rotation per dragged pixel.
    pub drag_speed: f32,
    /// Limit on dragged X rotation, radians.
    pub drag_clamp_x: f32,
}

impl Default for IdleParams {
    fn default() -> Self {
        Self {
            float_amplitude: 0.25,
            float_period_s: 6.3,
            sway: 0.08,
            pointer_bias: Vec2::new(0.12, 0.2),
            auto_rotate_speed: 0.15,
            drag_speed: 0.005,
            drag_clamp_x: 0.9,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransformController {
    params: IdleParams,
    settled: GestureTransform,
    tween: Option<Tween<GestureTransform>>,
    idle_position: Vec3,
    idle_rotation: Vec3,
    /// Drag and auto-rotation, x and y radians.
    interaction: Vec2,
    last_drag: Option<Vec2>,
}

impl TransformController {
    pub fn new(initial: GestureTransform, params: IdleParams) -> Self {
        Self {
            params,
            settled: initial,
            tween: None,
            idle_position: Vec3::ZERO,
            idle_rotation: Vec3::ZERO,
            interaction: Vec2::ZERO,
            last_drag: None,
        }
    }

    /// Jump to `target` with no tween.
    pub fn snap(&mut self, target: GestureTransform) {
        self.cancel();
        self.settled = target;
    }

    /// Tween from wherever the entity is now.
    pub fn tween_to(&mut self, target: GestureTransform, now_ms: f64, timing: Timing) {
        self.cancel();
        self.tween = Some(Tween::start(self.settled, target, now_ms, timing));
    }

    /// Kill the in-flight tween, keeping its current value.
    pub fn cancel(&mut self) {
        if let Some(mut tween) = self.tween.take() {
            tween.kill();
        }
    }

    pub fn is_tweening(&self) -> bool {
        self.tween.is_some()
    }

    /// Drop drag and auto-rotation state.
    pub fn reset_interaction(&mut self) {
        self.interaction = Vec2::ZERO;
        self.last_drag = None;
    }

    pub fn advance(&mut self, now_ms: f64) {
        if let Some(tween) = &mut self.tween {
            self.settled = tween.tick(now_ms);
            if tween.is_done() {
                self.tween = None;
            }
        }
    }

    /// Idle float, sway and pointer bias at clock time `now_ms`. `pointer` is
    /// in NDC.
    pub fn apply_idle(&mut self, now_ms: f64, pointer: Option<Vec2>) {
        let p = &self.params;
        let phase = (now_ms / 1000.0) as f32 * TAU / p.float_period_s.max(f32::EPSILON);

        self.idle_position = Vec3::new(0.0, phase.sin() * p.float_amplitude, 0.0);

        let pointer = pointer.unwrap_or(Vec2::ZERO);
        self.idle_rotation = Vec3::new(
            pointer.y * p.pointer_bias.x,
            (phase * 0.5).sin() * p.sway + pointer.x * p.pointer_bias.y,
            0.0,
        );
    }

    pub fn clear_idle(&mut self) {
        self.idle_position = Vec3::ZERO;
        self.idle_rotation = Vec3::ZERO;
    }

    pub fn auto_rotate(&mut self, dt_s: f32) {
        self.interaction.y += self.params.auto_rotate_speed * dt_s;
    }

    pub fn begin_drag(&mut self, pixel: Vec2) {
        self.last_drag = Some(pixel);
    }

    pub fn drag_to(&mut self, pixel: Vec2) {
        let Some(last) = self.last_drag else {
            return;
        };
        self.last_drag = Some(pixel);
        let delta = (pixel - last) * self.params.drag_speed;
        let clamp = self.params.drag_clamp_x;
        self.interaction.y += delta.x;
        self.interaction.x = (self.interaction.x + delta.y).clamp(-clamp, clamp);
    }

    pub fn end_drag(&mut self) {
        self.last_drag = None;
    }

    #[inline]
    pub fn is_dragging(&self) -> bool {
        self.last_drag.is_some()
    }

    #[inline]
    pub fn settled(&self) -> &GestureTransform {
        &self.settled
    }

    #[inline]
    pub fn interaction(&self) -> Vec2 {
        self.interaction
    }

    /// Tweened base plus every overlay.
    pub fn entity(&self) -> EntityTransform {
        EntityTransform {
            position: self.settled.position + self.idle_position,
            rotation: self.settled.rotation
                + self.idle_rotation
                + Vec3::new(self.interaction.x, self.interaction.y, 0.0),
            scale: self.settled.scale,
        }
    }
}
