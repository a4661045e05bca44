//! The live scene: one mutable particle buffer driven by the gesture state
//! machine, the disperse field and the transform controller, submitted to a
//! [`PointSink`] once per frame.
//!
//! Everything here runs on the host's frame thread. `request_state` and
//! `tick` are the only mutators; the morph and the disperse field never write
//! the live buffer in the same frame (`is_morphing` excludes the latter).

use crate::config::SceneConfig;
use crate::disperse::{DisperseField, Ray};
use crate::error::{MorphError, Result};
use crate::gesture::{Choreography, DeviceClass, Gesture};
use crate::loader::PointCloudLoader;
use crate::morph::MorphTransition;
use crate::registry::StateRegistry;
use crate::scatter::scatter_ball;
use crate::transform::{EntityTransform, TransformController};
use crate::tween::Tween;
use glam::{Mat4, Vec2, Vec3};
use log::{debug, info};
use rand::{rngs::StdRng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleMaterial {
    pub particle_size: f32,
    pub opacity: f32,
    /// Per-particle colors when set, `tint` otherwise.
    pub color_mode: bool,
    pub tint: Vec3,
}

/// Outward state for the host UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SceneFlags {
    pub loading: bool,
    pub is_morphing: bool,
    pub is_interactive: bool,
    pub content_revealed: bool,
}

/// One frame handed to the sink. Buffers are `Some` only when they changed
/// since the previous submit.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub positions: Option<&'a [f32]>,
    pub colors: Option<&'a [f32]>,
    pub world: Mat4,
    pub view_proj: Mat4,
    pub camera_distance: f32,
    pub material: ParticleMaterial,
}

/// Minimal renderable point buffer.
pub trait PointSink {
    fn submit(&mut self, frame: &Frame<'_>);

    /// Drop any buffers held for the scene. May be called more than once.
    fn release(&mut self);
}

pub struct SceneContext {
    config: SceneConfig,
    device: DeviceClass,
    rng: StdRng,
    registry: Option<StateRegistry>,

    live_positions: Vec<f32>,
    live_colors: Vec<f32>,
    positions_dirty: bool,
    colors_dirty: bool,

    current: Option<Gesture>,
    morph: Option<MorphTransition>,
    opacity: Option<Tween<f32>>,
    transform: TransformController,
    disperse: DisperseField,
    material: ParticleMaterial,

    pointer: Option<Vec2>,
    aspect: f32,
    flags: SceneFlags,
    last_tick_ms: Option<f64>,
}

impl SceneContext {
    /// A scene waiting for its point clouds; `loading` stays set until
    /// [`SceneContext::install`] or [`SceneContext::load`] succeeds.
    pub fn new(config: SceneConfig, device: DeviceClass, seed: u64) -> Self {
        let initial = config.transform_for(config.initial_gesture, device);
        let transform = TransformController::new(initial, config.idle);
        let disperse = DisperseField::new(0, config.disperse);
        let material = ParticleMaterial {
            particle_size: initial.particle_size,
            opacity: 0.0,
            color_mode: false,
            tint: config.tint,
        };

        Self {
            config,
            device,
            rng: StdRng::seed_from_u64(seed),
            registry: None,
            live_positions: Vec::new(),
            live_colors: Vec::new(),
            positions_dirty: false,
            colors_dirty: false,
            current: None,
            morph: None,
            opacity: None,
            transform,
            disperse,
            material,
            pointer: None,
            aspect: 16.0 / 9.0,
            flags: SceneFlags {
                loading: true,
                ..Default::default()
            },
            last_tick_ms: None,
        }
    }

    /// Load every configured gesture through `loader`, then install.
    pub fn load(&mut self, loader: &PointCloudLoader) -> Result<()> {
        let registry = loader.load_registry(self.config.shape_table())?;
        self.install(registry)
    }

    /// Take ownership of a fully loaded registry and show the initial gesture
    /// at rest.
    pub fn install(&mut self, registry: StateRegistry) -> Result<()> {
        let initial = self.config.initial_gesture;
        let state = registry.get(initial)?;
        let count = registry.particle_count();

        self.live_positions = state.positions.to_vec();
        self.live_colors = match &state.colors {
            Some(c) => c.to_vec(),
            None => self.config.tint.to_array().repeat(count),
        };
        self.positions_dirty = true;
        self.colors_dirty = true;

        self.disperse.resize(count);
        self.transform
            .snap(self.config.transform_for(initial, self.device));
        self.material.particle_size = self.transform.settled().particle_size;
        self.material.opacity = self.config.opacity_for(initial);
        self.material.color_mode = initial.is_interactive();

        self.flags = SceneFlags {
            loading: false,
            is_morphing: false,
            is_interactive: initial.is_interactive(),
            content_revealed: initial.choreography() == Choreography::InstantReveal,
        };
        self.current = Some(initial);

        info!(
            "Scene ready: {} gestures, {} particles, starting at {}",
            registry.len(),
            count,
            initial
        );
        self.registry = Some(registry);
        Ok(())
    }

    /// The navigation signal. Returns `Ok(false)` when `gesture` is already
    /// showing at rest; otherwise cancels whatever is in flight and starts the
    /// transition.
    pub fn request_state(&mut self, gesture: Gesture, now_ms: f64) -> Result<bool> {
        let registry = match &self.registry {
            Some(r) if !self.flags.loading => r,
            _ => return Err(MorphError::NotReady),
        };
        let target = registry.get(gesture)?.clone();

        if self.current == Some(gesture) && self.morph.is_none() {
            return Ok(false);
        }

        self.cancel_tracks();

        let choreography = gesture.choreography();
        let timings = self.config.timings;

        if choreography == Choreography::Interactive {
            let count = self.live_positions.len() / 3;
            let scattered = scatter_ball(count, self.config.scatter_radius, &mut self.rng);
            self.live_positions.copy_from_slice(&scattered.positions);
        }

        let mut morph = MorphTransition::start(
            gesture,
            self.live_positions.clone(),
            target.positions.clone(),
            now_ms,
            timings.morph,
        );
        if choreography == Choreography::Interactive {
            if let Some(colors) = &target.colors {
                morph = morph.with_colors(self.live_colors.clone(), colors.clone());
            }
        }
        self.morph = Some(morph);

        let target_transform = self.config.transform_for(gesture, self.device);
        match choreography {
            Choreography::InstantReveal => self.transform.snap(target_transform),
            _ => self
                .transform
                .tween_to(target_transform, now_ms, timings.transform),
        }
        self.transform.reset_interaction();
        if choreography.is_self_choreographed() {
            self.transform.clear_idle();
        }

        self.opacity = Some(Tween::start(
            self.material.opacity,
            self.config.opacity_for(gesture),
            now_ms,
            timings.opacity,
        ));
        self.material.color_mode = gesture.is_interactive();

        self.disperse.reset();
        self.flags.is_morphing = true;
        self.flags.is_interactive = gesture.is_interactive();
        self.flags.content_revealed = false;
        self.positions_dirty = true;

        debug!("{:?} -> {} at {:.0} ms", self.current, gesture, now_ms);
        self.current = Some(gesture);
        Ok(true)
    }

    fn cancel_tracks(&mut self) {
        if let Some(mut morph) = self.morph.take() {
            morph.kill();
        }
        if let Some(mut opacity) = self.opacity.take() {
            opacity.kill();
        }
        self.transform.cancel();
    }

    /// Advance every track to `now_ms`, layer idle motion, run the disperse
    /// field when eligible, then submit. Does nothing until loaded.
    pub fn tick(&mut self, now_ms: f64, sink: &mut dyn PointSink) {
        let Some(gesture) = self.current else {
            return;
        };
        if self.flags.loading {
            return;
        }

        let dt_s = self
            .last_tick_ms
            .map_or(0.0, |last| ((now_ms - last).max(0.0) / 1000.0) as f32);
        self.last_tick_ms = Some(now_ms);

        // Tracks.
        if let Some(morph) = &mut self.morph {
            let step = morph.tick(now_ms, &mut self.live_positions, &mut self.live_colors);
            self.positions_dirty = true;
            self.colors_dirty |= step.colors_written;

            if step.done {
                self.morph = None;
                self.flags.is_morphing = false;
                if gesture.choreography() == Choreography::InstantReveal {
                    self.flags.content_revealed = true;
                }
                debug!("Morph to {gesture} complete");
            }
        }

        if let Some(opacity) = &mut self.opacity {
            self.material.opacity = opacity.tick(now_ms);
            if opacity.is_done() {
                self.opacity = None;
            }
        }

        self.transform.advance(now_ms);
        self.material.particle_size = self.transform.settled().particle_size;

        // Idle motion.
        if gesture.choreography().is_self_choreographed() {
            self.transform.clear_idle();
        } else {
            self.transform.apply_idle(now_ms, self.pointer);
        }

        if gesture.is_interactive() && !self.transform.is_dragging() && !self.flags.is_morphing {
            self.transform.auto_rotate(dt_s);
        }

        let world = self.entity_transform().matrix();

        // Disperse.
        if !self.flags.is_morphing && gesture.allows_disperse() {
            let rest = self
                .registry
                .as_ref()
                .and_then(|r| r.get(gesture).ok())
                .map(|s| s.positions.clone());

            if let Some(rest) = rest {
                let ray = self.pointer.map(|ndc| self.pointer_ray(ndc).to_local(&world));
                if self.disperse.step(&rest, ray, &mut self.live_positions) {
                    self.positions_dirty = true;
                }
            }
        }

        let frame = Frame {
            positions: self.positions_dirty.then_some(self.live_positions.as_slice()),
            colors: self.colors_dirty.then_some(self.live_colors.as_slice()),
            world,
            view_proj: self.view_projection(),
            camera_distance: self.transform.settled().camera_distance,
            material: self.material,
        };
        sink.submit(&frame);

        self.positions_dirty = false;
        self.colors_dirty = false;
    }

    /// Kill every track, drop all buffers and release the sink. Safe to call
    /// at any point, including before loading finished, and more than once.
    pub fn teardown(&mut self, sink: &mut dyn PointSink) {
        self.cancel_tracks();
        self.transform.end_drag();
        self.transform.reset_interaction();

        self.registry = None;
        self.live_positions = Vec::new();
        self.live_colors = Vec::new();
        self.positions_dirty = false;
        self.colors_dirty = false;
        self.disperse.resize(0);

        self.current = None;
        self.pointer = None;
        self.last_tick_ms = None;
        self.flags = SceneFlags::default();

        sink.release();
        debug!("Scene torn down");
    }

    /// Pointer position in NDC, or `None` when it left the view.
    pub fn set_pointer(&mut self, ndc: Option<Vec2>) {
        self.pointer = ndc;
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    /// Drag input is only honored in the interactive state.
    pub fn pointer_down(&mut self, pixel: Vec2) {
        if self.flags.is_interactive {
            self.transform.begin_drag(pixel);
        }
    }

    pub fn pointer_move(&mut self, pixel: Vec2) {
        if self.flags.is_interactive {
            self.transform.drag_to(pixel);
        }
    }

    pub fn pointer_up(&mut self) {
        self.transform.end_drag();
    }

    fn camera_eye(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.transform.settled().camera_distance)
    }

    pub fn view_projection(&self) -> Mat4 {
        let cam = self.config.camera;
        let view = Mat4::look_at_rh(self.camera_eye(), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(cam.fov_y_deg.to_radians(), self.aspect, cam.near, cam.far);
        proj * view
    }

    /// World-space ray from the camera through `ndc`.
    pub fn pointer_ray(&self, ndc: Vec2) -> Ray {
        let eye = self.camera_eye();
        let far = self
            .view_projection()
            .inverse()
            .project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        Ray::new(eye, far - eye)
    }

    #[inline]
    pub fn entity_transform(&self) -> EntityTransform {
        self.transform.entity()
    }

    #[inline]
    pub fn flags(&self) -> SceneFlags {
        self.flags
    }

    #[inline]
    pub fn current(&self) -> Option<Gesture> {
        self.current
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.registry.is_some() && !self.flags.loading
    }

    pub fn live_positions(&self) -> &[f32] {
        &self.live_positions
    }

    pub fn live_colors(&self) -> &[f32] {
        &self.live_colors
    }

    pub fn material(&self) -> &ParticleMaterial {
        &self.material
    }

    pub fn morph_progress(&self) -> Option<f32> {
        self.morph.as_ref().map(MorphTransition::progress)
    }

    pub fn particle_count(&self) -> usize {
        self.registry.as_ref().map_or(0, StateRegistry::particle_count)
    }

    pub fn device(&self) -> DeviceClass {
        self.device
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::PointCloud;
    use crate::tween::{Easing, Timing};
    use approx::assert_relative_eq;

    #[derive(Default)]
    struct CountingSink {
        uploads: usize,
        frames: usize,
        released: usize,
    }

    impl PointSink for CountingSink {
        fn submit(&mut self, frame: &Frame<'_>) {
            self.frames += 1;
            self.uploads += usize::from(frame.positions.is_some());
        }

        fn release(&mut self) {
            self.released += 1;
        }
    }

    fn registry() -> StateRegistry {
        let mut reg = StateRegistry::new(2);
        reg.register(Gesture::Hero, PointCloud::new(vec![0.0; 6], None)).unwrap();
        reg.register(Gesture::Vision, PointCloud::new(vec![1.0; 6], None)).unwrap();
        reg.register(
            Gesture::Globe,
            PointCloud::new(vec![2.0; 6], Some(vec![0.2, 0.4, 0.6, 0.2, 0.4, 0.6])),
        )
        .unwrap();
        reg
    }

    fn ready_scene() -> SceneContext {
        let mut cfg = SceneConfig::default();
        cfg.timings.morph = Timing::new(100.0, Easing::Linear);
        let mut scene = SceneContext::new(cfg, DeviceClass::Desktop, 7);
        scene.install(registry()).unwrap();
        scene
    }

    #[test]
    fn requests_before_loading_are_rejected() {
        let mut scene = SceneContext::new(SceneConfig::default(), DeviceClass::Desktop, 0);
        assert!(scene.flags().loading);
        assert!(matches!(
            scene.request_state(Gesture::Hero, 0.0),
            Err(MorphError::NotReady)
        ));
    }

    #[test]
    fn unregistered_gesture_is_rejected_without_side_effects() {
        let mut scene = ready_scene();
        let err = scene.request_state(Gesture::Gallery, 0.0).unwrap_err();
        assert!(matches!(err, MorphError::UnknownState(Gesture::Gallery)));
        assert!(!scene.flags().is_morphing);
        assert_eq!(scene.current(), Some(Gesture::Hero));
    }

    #[test]
    fn active_state_request_is_a_noop() {
        let mut scene = ready_scene();
        assert!(!scene.request_state(Gesture::Hero, 0.0).unwrap());
        assert!(scene.morph_progress().is_none());
        assert!(!scene.transform.is_tweening());
    }

    #[test]
    fn unchanged_buffers_are_not_reuploaded() {
        let mut scene = ready_scene();
        let mut sink = CountingSink::default();
        scene.tick(0.0, &mut sink);
        scene.tick(16.0, &mut sink);
        scene.tick(32.0, &mut sink);
        assert_eq!(sink.frames, 3);
        assert_eq!(sink.uploads, 1);
    }

    #[test]
    fn globe_starts_scattered_and_morphs_colors() {
        let mut scene = ready_scene();
        let mut sink = CountingSink::default();

        assert!(scene.request_state(Gesture::Globe, 0.0).unwrap());
        assert!(scene.flags().is_interactive);
        assert!(scene.material().color_mode);
        assert_ne!(scene.live_positions(), &[0.0; 6]);

        scene.tick(100.0, &mut sink);
        assert_eq!(scene.live_positions(), &[2.0; 6]);
        assert_eq!(scene.live_colors(), &[0.2, 0.4, 0.6, 0.2, 0.4, 0.6]);
        assert!(!scene.flags().is_morphing);
    }

    #[test]
    fn drag_only_counts_in_the_interactive_state() {
        let mut scene = ready_scene();
        scene.pointer_down(Vec2::ZERO);
        scene.pointer_move(Vec2::new(100.0, 0.0));
        assert_eq!(scene.transform.interaction(), Vec2::ZERO);

        scene.request_state(Gesture::Globe, 0.0).unwrap();
        scene.pointer_down(Vec2::ZERO);
        scene.pointer_move(Vec2::new(100.0, 0.0));
        assert_relative_eq!(scene.transform.interaction().y, 0.5);
    }

    #[test]
    fn auto_rotation_waits_for_morph_and_drag() {
        let mut scene = ready_scene();
        let mut sink = CountingSink::default();
        scene.request_state(Gesture::Globe, 0.0).unwrap();

        scene.tick(50.0, &mut sink);
        assert_eq!(scene.transform.interaction(), Vec2::ZERO);

        scene.tick(100.0, &mut sink);
        let settled = scene.transform.interaction().y;
        scene.tick(1100.0, &mut sink);
        let spun = scene.transform.interaction().y;
        assert_relative_eq!(spun - settled, 0.15, epsilon = 1e-5);

        scene.pointer_down(Vec2::ZERO);
        scene.tick(2100.0, &mut sink);
        assert_eq!(scene.transform.interaction().y, spun);
    }

    #[test]
    fn teardown_is_idempotent() {
        let mut scene = ready_scene();
        let mut sink = CountingSink::default();
        scene.request_state(Gesture::Vision, 0.0).unwrap();

        scene.teardown(&mut sink);
        scene.teardown(&mut sink);
        assert_eq!(sink.released, 2);
        assert!(scene.live_positions().is_empty());
        assert!(!scene.flags().is_morphing);
        assert!(matches!(
            scene.request_state(Gesture::Hero, 0.0),
            Err(MorphError::NotReady)
        ));

        scene.tick(10.0, &mut sink);
        assert_eq!(sink.frames, 0);
    }

    #[test]
    fn pointer_ray_through_center_hits_origin() {
        let scene = ready_scene();
        let ray = scene.pointer_ray(Vec2::ZERO);
        assert_relative_eq!(ray.dir.z, -1.0, epsilon = 1e-5);
        assert_relative_eq!(ray.origin.z, scene.transform.settled().camera_distance);
    }
}
