//! In-memory triangle meshes and the narrow source capability the sampler
//! consumes. Any asset library can feed the sampler by producing a
//! [`MeshAsset`].

use crate::error::{MorphError, Result};
use glam::{Mat4, Vec2, Vec3};
use std::path::Path;
use std::sync::Arc;

/// Decoded RGB texture, rows stored top to bottom as image files store them.
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<[f32; 3]>,
}

impl Texture {
    pub fn from_image(img: &image::DynamicImage) -> Self {
        let rgb8 = img.to_rgb8();
        let (width, height) = rgb8.dimensions();
        let rgb = rgb8
            .pixels()
            .map(|p| {
                [
                    p[0] as f32 / 255.0,
                    p[1] as f32 / 255.0,
                    p[2] as f32 / 255.0,
                ]
            })
            .collect();

        Self { width, height, rgb }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let img = image::open(path)
            .map_err(|e| MorphError::Mesh(format!("texture {}: {}", path.display(), e)))?;
        Ok(Self::from_image(&img))
    }

    /// Nearest-texel lookup. UV origin is bottom-left, so V is flipped to hit
    /// image rows. `None` when the texel cannot be addressed.
    pub fn sample_nearest(&self, uv: Vec2) -> Option<Vec3> {
        if self.width == 0
            || self.height == 0
            || self.rgb.len() != (self.width as usize) * (self.height as usize)
            || !uv.is_finite()
        {
            return None;
        }

        let wrap = |t: f32| if (0.0..=1.0).contains(&t) { t } else { t.rem_euclid(1.0) };
        let u = wrap(uv.x);
        let v = wrap(uv.y);

        let x = ((u * (self.width - 1) as f32).round() as u32).min(self.width - 1);
        let y = (((1.0 - v) * (self.height - 1) as f32).round() as u32).min(self.height - 1);

        let [r, g, b] = self.rgb[(y * self.width + x) as usize];
        Some(Vec3::new(r, g, b))
    }
}

#[derive(Debug, Clone)]
pub struct Material {
    pub base_color: Vec3,
    pub texture: Option<Arc<Texture>>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: Vec3::ONE,
            texture: None,
        }
    }
}

/// One triangle mesh. Without `indices`, positions are consumed as
/// consecutive triples.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub indices: Option<Vec<u32>>,
    pub uvs: Option<Vec<Vec2>>,
    pub colors: Option<Vec<Vec3>>,
    pub material: Material,
    /// Local-to-world transform applied before sampling.
    pub transform: Mat4,
}

impl TriangleMesh {
    pub fn new(name: impl Into<String>, positions: Vec<Vec3>) -> Self {
        Self {
            name: name.into(),
            positions,
            indices: None,
            uvs: None,
            colors: None,
            material: Material::default(),
            transform: Mat4::IDENTITY,
        }
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    pub fn with_colors(mut self, colors: Vec<Vec3>) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// Vertex index triples; triangles referencing missing vertices are skipped.
    pub fn triangles(&self) -> Vec<[usize; 3]> {
        let n = self.positions.len();
        let tris: Vec<[usize; 3]> = match &self.indices {
            Some(idx) => idx
                .chunks_exact(3)
                .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
                .collect(),
            None => (0..n / 3).map(|t| [t * 3, t * 3 + 1, t * 3 + 2]).collect(),
        };

        tris.into_iter()
            .filter(|t| t.iter().all(|&i| i < n))
            .collect()
    }

    #[inline]
    pub fn world_corners(&self, tri: [usize; 3]) -> [Vec3; 3] {
        tri.map(|i| self.transform.transform_point3(self.positions[i]))
    }
}

/// A traversable collection of triangle meshes.
#[derive(Debug, Clone, Default)]
pub struct MeshAsset {
    pub meshes: Vec<TriangleMesh>,
}

impl MeshAsset {
    pub fn new(meshes: Vec<TriangleMesh>) -> Self {
        Self { meshes }
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.triangles().len()).sum()
    }
}

/// Anything that can enumerate triangle meshes for the sampler.
pub trait MeshSource: Send + Sync {
    fn load_asset(&self) -> Result<MeshAsset>;

    /// Human-readable origin for log lines.
    fn describe(&self) -> String;
}

impl MeshSource for MeshAsset {
    fn load_asset(&self) -> Result<MeshAsset> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory asset ({} meshes)", self.meshes.len())
    }
}
