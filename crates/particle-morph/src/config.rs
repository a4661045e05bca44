//! Scene configuration: particle budgets, timings, effect parameters and the
//! per-gesture table. Everything has a built-in default; a JSON document
//! overrides any subset of it.

use crate::disperse::DisperseParams;
use crate::error::{MorphError, Result};
use crate::gesture::{DeviceClass, Gesture};
use crate::loader::ShapeSource;
use crate::scatter::DEFAULT_SCATTER_RADIUS;
use crate::transform::{GestureTransform, IdleParams};
use crate::tween::{Easing, Timing};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleCounts {
    pub desktop: usize,
    pub constrained: usize,
}

impl Default for ParticleCounts {
    fn default() -> Self {
        Self {
            desktop: 24_000,
            constrained: 9_000,
        }
    }
}

impl ParticleCounts {
    pub fn for_device(&self, device: DeviceClass) -> usize {
        match device {
            DeviceClass::Desktop => self.desktop,
            DeviceClass::Constrained => self.constrained,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub morph: Timing,
    pub transform: Timing,
    pub opacity: Timing,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            morph: Timing::new(1800.0, Easing::CubicInOut),
            transform: Timing::new(1400.0, Easing::CubicOut),
            opacity: Timing::new(700.0, Easing::QuadInOut),
        }
    }
}

/// Camera used to turn pointer NDC into a ray.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraParams {
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            fov_y_deg: 45.0,
            near: 0.1,
            far: 500.0,
        }
    }
}

fn default_opacity() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureConfig {
    pub shape: ShapeSource,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default)]
    pub desktop: GestureTransform,
    #[serde(default)]
    pub constrained: GestureTransform,
}

impl GestureConfig {
    pub fn transform_for(&self, device: DeviceClass) -> GestureTransform {
        match device {
            DeviceClass::Desktop => self.desktop,
            DeviceClass::Constrained => self.constrained,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub particles: ParticleCounts,
    pub timings: Timings,
    pub disperse: DisperseParams,
    pub idle: IdleParams,
    pub camera: CameraParams,
    pub scatter_radius: f32,
    /// Particle tint when color mode is off.
    pub tint: Vec3,
    pub initial_gesture: Gesture,
    pub gestures: BTreeMap<Gesture, GestureConfig>,
}

fn transform(
    position: [f32; 3],
    rotation_y: f32,
    scale: f32,
    particle_size: f32,
    camera_distance: f32,
) -> GestureTransform {
    GestureTransform {
        position: Vec3::from_array(position),
        rotation: Vec3::new(0.0, rotation_y, 0.0),
        scale,
        particle_size,
        camera_distance,
    }
}

fn default_gestures() -> BTreeMap<Gesture, GestureConfig> {
    let entry = |shape, opacity, desktop, constrained| GestureConfig {
        shape,
        opacity,
        desktop,
        constrained,
    };

    BTreeMap::from([
        (
            Gesture::Hero,
            entry(
                ShapeSource::mesh("hero"),
                1.0,
                transform([2.5, 0.0, 0.0], -0.4, 1.0, 0.06, 22.0),
                transform([0.0, 1.5, 0.0], -0.2, 0.7, 0.08, 26.0),
            ),
        ),
        (
            Gesture::Welcome,
            entry(
                ShapeSource::Text {
                    lines: vec!["WELCOME".into(), "TO THE FUTURE".into()],
                    scale: 0.18,
                },
                1.0,
                transform([0.0, 0.0, 0.0], 0.0, 1.0, 0.05, 22.0),
                transform([0.0, 0.5, 0.0], 0.0, 0.55, 0.07, 26.0),
            ),
        ),
        (
            Gesture::Vision,
            entry(
                ShapeSource::mesh("vision"),
                1.0,
                transform([-2.5, 0.0, 0.0], 0.5, 1.0, 0.06, 22.0),
                transform([0.0, 1.5, 0.0], 0.3, 0.7, 0.08, 26.0),
            ),
        ),
        (
            Gesture::Scatter,
            entry(
                ShapeSource::Scatter {
                    radius: DEFAULT_SCATTER_RADIUS,
                },
                0.6,
                transform([0.0, 0.0, 0.0], 0.0, 1.0, 0.05, 28.0),
                transform([0.0, 0.0, 0.0], 0.0, 1.0, 0.07, 30.0),
            ),
        ),
        (
            Gesture::Gallery,
            entry(
                ShapeSource::mesh("gallery"),
                1.0,
                transform([0.0, -1.0, 0.0], 0.0, 0.8, 0.05, 24.0),
                transform([0.0, -0.5, 0.0], 0.0, 0.6, 0.07, 28.0),
            ),
        ),
        (
            Gesture::Globe,
            entry(
                ShapeSource::mesh("globe"),
                1.0,
                transform([0.0, 0.0, 0.0], 0.0, 1.1, 0.07, 20.0),
                transform([0.0, 0.0, 0.0], 0.0, 0.8, 0.09, 24.0),
            ),
        ),
    ])
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            particles: ParticleCounts::default(),
            timings: Timings::default(),
            disperse: DisperseParams::default(),
            idle: IdleParams::default(),
            camera: CameraParams::default(),
            scatter_radius: DEFAULT_SCATTER_RADIUS,
            tint: Vec3::new(0.75, 0.85, 1.0),
            initial_gesture: Gesture::Hero,
            gestures: default_gestures(),
        }
    }
}

impl SceneConfig {
    /// Parse a JSON override. Gestures the document omits keep their built-in
    /// entries.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let mut cfg: SceneConfig = serde_json::from_str(s)?;
        for (gesture, entry) in default_gestures() {
            cfg.gestures.entry(gesture).or_insert(entry);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.particles.desktop == 0 || self.particles.constrained == 0 {
            return Err(MorphError::InvalidConfig("particle counts must be positive".into()));
        }
        if !self.gestures.contains_key(&self.initial_gesture) {
            return Err(MorphError::InvalidConfig(format!(
                "initial gesture `{}` has no entry",
                self.initial_gesture
            )));
        }
        if self.disperse.radius <= 0.0 {
            return Err(MorphError::InvalidConfig("disperse radius must be positive".into()));
        }
        Ok(())
    }

    #[inline]
    pub fn particle_count(&self, device: DeviceClass) -> usize {
        self.particles.for_device(device)
    }

    pub fn gesture(&self, gesture: Gesture) -> Option<&GestureConfig> {
        self.gestures.get(&gesture)
    }

    /// Target transform for `gesture` on `device`; the neutral transform for
    /// gestures without an entry.
    pub fn transform_for(&self, gesture: Gesture, device: DeviceClass) -> GestureTransform {
        self.gesture(gesture)
            .map(|g| g.transform_for(device))
            .unwrap_or_default()
    }

    pub fn opacity_for(&self, gesture: Gesture) -> f32 {
        self.gesture(gesture).map_or(1.0, |g| g.opacity)
    }

    /// `(gesture, shape)` pairs for [`crate::loader::PointCloudLoader::load_registry`].
    pub fn shape_table(&self) -> impl Iterator<Item = (Gesture, &ShapeSource)> + '_ {
        self.gestures.iter().map(|(g, c)| (*g, &c.shape))
    }
}
