//! Resolves named target shapes into point clouds of one fixed particle count.
//!
//! Mesh shapes try a precomputed point resource first and fall back to
//! sampling the raw mesh. Either way the result is resolved once per name and
//! cached for the life of the loader.

use crate::cloud::PointCloud;
use crate::error::Result;
use crate::gesture::Gesture;
use crate::mesh::{sampler, MeshSource, ObjSource};
use crate::registry::StateRegistry;
use crate::scatter::{scatter_ball, DEFAULT_SCATTER_RADIUS};
use crate::text::generate_text;
use log::{debug, info, warn};
use parking_lot::Mutex;
use ptcl::PointResource;
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{
    collections::{hash_map::DefaultHasher, HashMap},
    hash::{Hash, Hasher},
    io,
    path::PathBuf,
    sync::{Arc, OnceLock},
};

fn default_text_scale() -> f32 {
    0.18
}

fn default_scatter_radius() -> f32 {
    DEFAULT_SCATTER_RADIUS
}

/// Where a gesture's target shape comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeSource {
    /// Precomputed resource `<name>` or, failing that, mesh asset `<name>`.
    Mesh { name: String },
    Text {
        lines: Vec<String>,
        #[serde(default = "default_text_scale")]
        scale: f32,
    },
    Scatter {
        #[serde(default = "default_scatter_radius")]
        radius: f32,
    },
}

impl ShapeSource {
    pub fn mesh(name: impl Into<String>) -> Self {
        ShapeSource::Mesh { name: name.into() }
    }

    /// Stable key for caching and per-shape seeding.
    fn key(&self) -> String {
        match self {
            ShapeSource::Mesh { name } => format!("mesh:{name}"),
            ShapeSource::Text { lines, scale } => format!("text:{}@{scale}", lines.join("\n")),
            ShapeSource::Scatter { radius } => format!("scatter:{radius}"),
        }
    }
}

/// Backing store for named shapes.
pub trait ResourceSource: Send + Sync {
    /// Precomputed points for `name`. Any error means the fast path is
    /// unavailable for that name.
    fn fetch_points(&self, name: &str) -> io::Result<PointResource>;

    /// Raw mesh asset for the sampling fallback.
    fn mesh_source(&self, name: &str) -> Box<dyn MeshSource>;
}

/// Assets laid out flat in one directory: `<name>.ptcl` or `<name>.json` for
/// precomputed points, `<name>.obj` for meshes.
#[derive(Debug, Clone)]
pub struct DirResources {
    pub root: PathBuf,
}

impl DirResources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ResourceSource for DirResources {
    fn fetch_points(&self, name: &str) -> io::Result<PointResource> {
        let mut last_err = None;
        for ext in ["ptcl", "json"] {
            let path = self.root.join(format!("{name}.{ext}"));
            if !path.is_file() {
                continue;
            }
            match ptcl::read_path(&path) {
                Ok(res) => return Ok(res),
                Err(e) => {
                    debug!("{}: {}", path.display(), e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no precomputed points for `{name}` in {}", self.root.display()),
            )
        }))
    }

    fn mesh_source(&self, name: &str) -> Box<dyn MeshSource> {
        Box::new(ObjSource::new(self.root.join(format!("{name}.obj"))))
    }
}

type Slot = Arc<OnceLock<Arc<PointCloud>>>;

pub struct PointCloudLoader {
    resources: Arc<dyn ResourceSource>,
    target: usize,
    seed: u64,
    resolved: Mutex<HashMap<String, Slot>>,
}

impl PointCloudLoader {
    pub fn new(resources: Arc<dyn ResourceSource>, target: usize, seed: u64) -> Self {
        Self {
            resources,
            target,
            seed,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn target(&self) -> usize {
        self.target
    }

    fn rng_for(&self, key: &str) -> StdRng {
        let mut h = DefaultHasher::new();
        key.hash(&mut h);
        StdRng::seed_from_u64(self.seed ^ h.finish())
    }

    fn slot(&self, key: &str) -> Slot {
        self.resolved
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    /// Fast path only; `None` when the resource is missing, unreadable or
    /// empty.
    fn fetch_precomputed(&self, name: &str) -> Option<PointCloud> {
        match self.resources.fetch_points(name) {
            Ok(res) if !res.is_empty() => {
                let available = res.point_count();
                let cloud = PointCloud::new(res.positions, res.colors).reconcile(self.target);
                info!("{name}: precomputed resource, {available} -> {} points", self.target);
                Some(cloud)
            }
            Ok(_) => {
                warn!("{name}: precomputed resource is empty; sampling mesh");
                None
            }
            Err(e) => {
                warn!("{name}: precomputed resource unavailable ({e}); sampling mesh");
                None
            }
        }
    }

    /// Resolve a mesh-derived shape. The mesh fallback runs at most once per
    /// name; later calls reuse the cached cloud.
    pub fn load_mesh(&self, name: &str) -> Arc<PointCloud> {
        let key = ShapeSource::mesh(name).key();
        self.slot(&key)
            .get_or_init(|| {
                let cloud = self.fetch_precomputed(name).unwrap_or_else(|| {
                    let source = self.resources.mesh_source(name);
                    let mut rng = self.rng_for(&key);
                    let cloud = sampler::sample_source(source.as_ref(), self.target, &mut rng);
                    info!("{name}: sampled {} from mesh", cloud.point_count());
                    cloud
                });
                Arc::new(cloud)
            })
            .clone()
    }

    /// Resolve any shape to exactly `target` points.
    pub fn load_shape(&self, shape: &ShapeSource) -> Result<PointCloud> {
        let cloud = match shape {
            ShapeSource::Mesh { name } => self.load_mesh(name).as_ref().clone(),
            ShapeSource::Text { lines, scale } => {
                let mut rng = self.rng_for(&shape.key());
                generate_text(lines.as_slice(), *scale, self.target, &mut rng)?
            }
            ShapeSource::Scatter { radius } => {
                let mut rng = self.rng_for(&shape.key());
                scatter_ball(self.target, *radius, &mut rng)
            }
        };

        Ok(cloud.reconcile(self.target))
    }

    /// Load every gesture's shape concurrently and register the results.
    /// Returns once all loads have finished.
    pub fn load_registry<'a, I>(&self, table: I) -> Result<StateRegistry>
    where
        I: IntoIterator<Item = (Gesture, &'a ShapeSource)>,
    {
        let jobs: Vec<(Gesture, &ShapeSource)> = table.into_iter().collect();

        let loaded: Vec<(Gesture, Result<PointCloud>)> = jobs
            .par_iter()
            .map(|(gesture, shape)| (*gesture, self.load_shape(shape)))
            .collect();

        let mut registry = StateRegistry::new(self.target);
        for (gesture, cloud) in loaded {
            registry.register(gesture, cloud?)?;
        }

        info!(
            "Registered {} gestures at {} particles each",
            registry.len(),
            self.target
        );
        Ok(registry)
    }
}
