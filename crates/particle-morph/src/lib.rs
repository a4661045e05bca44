//! Morphing particle clouds.
//!
//! Target shapes (sampled meshes, glyph text, random scatter) are resolved by
//! the [`loader`] into equal-length point clouds and registered per
//! [`Gesture`]. A [`SceneContext`] owns the single live buffer, morphs it
//! between registered shapes on request, layers idle motion and the pointer
//! [`disperse`] field on top, and hands each frame to a [`PointSink`].
//!
//! ```no_run
//! use particle_morph::{DeviceClass, DirResources, Gesture, PointCloudLoader, SceneConfig, SceneContext};
//! use std::sync::Arc;
//!
//! # fn main() -> particle_morph::Result<()> {
//! let config = SceneConfig::default();
//! let device = DeviceClass::Desktop;
//! let loader = PointCloudLoader::new(
//!     Arc::new(DirResources::new("assets")),
//!     config.particle_count(device),
//!     42,
//! );
//!
//! let mut scene = SceneContext::new(config, device, 42);
//! scene.load(&loader)?;
//! scene.request_state(Gesture::Welcome, 0.0)?;
//! # Ok(())
//! # }
//! ```

pub mod cloud;
pub mod config;
pub mod disperse;
pub mod error;
pub mod gesture;
pub mod glyphs;
pub mod loader;
pub mod mesh;
pub mod morph;
pub mod registry;
pub mod scatter;
pub mod scene;
pub mod text;
pub mod transform;
pub mod tween;

pub use cloud::PointCloud;
pub use config::{GestureConfig, SceneConfig};
pub use disperse::{DisperseField, DisperseParams, Ray};
pub use error::{MorphError, Result};
pub use gesture::{Choreography, DeviceClass, Gesture};
pub use loader::{DirResources, PointCloudLoader, ResourceSource, ShapeSource};
pub use morph::MorphTransition;
pub use registry::{RegisteredState, StateRegistry};
pub use scene::{Frame, ParticleMaterial, PointSink, SceneContext, SceneFlags};
pub use transform::{EntityTransform, GestureTransform, IdleParams, TransformController};
pub use tween::{Easing, Interpolator, Timing};
