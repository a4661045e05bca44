//! Area-weighted surface sampling of triangle meshes into fixed-size clouds.

use super::asset::{MeshAsset, MeshSource, Texture, TriangleMesh};
use crate::cloud::{fit_to_count, normalize_to_unit, PointCloud, UNIT_EXTENT};
use glam::{Vec2, Vec3};
use log::{debug, warn};
use rand::Rng;

/// Floor on samples drawn from each mesh, however many meshes share the budget.
pub const MIN_SAMPLES_PER_MESH: usize = 500;

/// Un-normalized sample pool, one entry per drawn surface point.
#[derive(Debug, Clone, Default)]
pub struct RawSamples {
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
}

impl RawSamples {
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

struct PreparedMesh<'a> {
    mesh: &'a TriangleMesh,
    tris: Vec<([usize; 3], [Vec3; 3])>,
    cumulative: Vec<f32>,
    total_area: f32,
}

impl<'a> PreparedMesh<'a> {
    fn new(mesh: &'a TriangleMesh) -> Self {
        let mut tris = Vec::new();
        let mut cumulative = Vec::new();
        let mut total_area = 0.0f32;

        for tri in mesh.triangles() {
            let [a, b, c] = mesh.world_corners(tri);
            let area = 0.5 * (b - a).cross(c - a).length();

            if !(area > 0.0) || !area.is_finite() {
                continue;
            }

            total_area += area;
            cumulative.push(total_area);
            tris.push((tri, [a, b, c]));
        }

        Self {
            mesh,
            tris,
            cumulative,
            total_area,
        }
    }

    /// Area-proportional pick: first triangle whose cumulative area exceeds
    /// a uniform draw.
    fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let r = rng.gen::<f32>() * self.total_area;
        self.cumulative
            .partition_point(|&c| c <= r)
            .min(self.tris.len() - 1)
    }
}

#[inline]
fn barycentric<R: Rng + ?Sized>(rng: &mut R) -> (f32, f32) {
    let mut u = rng.gen::<f32>();
    let mut v = rng.gen::<f32>();
    if u + v > 1.0 {
        u = 1.0 - u;
        v = 1.0 - v;
    }
    (u, v)
}

fn sample_mesh<R: Rng + ?Sized>(prepared: &PreparedMesh<'_>, count: usize, rng: &mut R, out: &mut RawSamples) {
    let mesh = prepared.mesh;
    let material = &mesh.material;

    let uvs = mesh.uvs.as_deref();
    let colors = mesh.colors.as_deref();
    let mut texture: Option<&Texture> = match (uvs, material.texture.as_deref()) {
        (Some(_), Some(tex)) => Some(tex),
        _ => None,
    };

    for _ in 0..count {
        let (tri, [a, b, c]) = prepared.tris[prepared.pick(rng)];
        let (u, v) = barycentric(rng);
        let w = 1.0 - u - v;

        let p = a + (b - a) * u + (c - a) * v;
        out.positions.extend_from_slice(&[p.x, p.y, p.z]);

        // A UV array shorter than the positions leaves those corners untextured.
        let corner_uvs =
            uvs.and_then(|uvs| Some((uvs.get(tri[0])?, uvs.get(tri[1])?, uvs.get(tri[2])?)));
        let tex_color = match (texture, corner_uvs) {
            (Some(tex), Some((ua, ub, uc))) => {
                let uv: Vec2 = *ua * w + *ub * u + *uc * v;
                let sampled = tex.sample_nearest(uv);
                if sampled.is_none() {
                    warn!(
                        "Texture sampling failed on mesh '{}'; using base color",
                        mesh.name
                    );
                    texture = None;
                }
                sampled
            }
            _ => None,
        };

        let color = tex_color
            .or_else(|| {
                colors.and_then(|cs| {
                    let (ca, cb, cc) = (cs.get(tri[0])?, cs.get(tri[1])?, cs.get(tri[2])?);
                    Some(*ca * w + *cb * u + *cc * v)
                })
            })
            .unwrap_or_else(|| material.base_color * rng.gen_range(0.9..=1.1))
            .clamp(Vec3::ZERO, Vec3::ONE);

        out.colors.extend_from_slice(&[color.x, color.y, color.z]);
    }
}

/// Draw the raw, un-normalized sample pool. Each mesh with surface area gets
/// `max(500, target / mesh_count)` samples, so the pool may over- or
/// undershoot `target`.
pub fn sample_raw<R: Rng + ?Sized>(asset: &MeshAsset, target: usize, rng: &mut R) -> RawSamples {
    let mesh_count = asset.meshes.len().max(1);
    let per_mesh = MIN_SAMPLES_PER_MESH.max(target / mesh_count);

    let mut out = RawSamples::default();
    for mesh in &asset.meshes {
        let prepared = PreparedMesh::new(mesh);
        if prepared.tris.is_empty() {
            debug!("Mesh '{}' has no non-degenerate triangles", mesh.name);
            continue;
        }

        out.positions.reserve(per_mesh * 3);
        out.colors.reserve(per_mesh * 3);
        sample_mesh(&prepared, per_mesh, rng, &mut out);
    }

    out
}

/// Sample, center, scale to the unit extent and reconcile to exactly `target`
/// points. An asset without usable surface yields the degenerate cloud.
pub fn sample_asset<R: Rng + ?Sized>(asset: &MeshAsset, target: usize, rng: &mut R) -> PointCloud {
    let mut raw = sample_raw(asset, target, rng);
    if raw.is_empty() {
        warn!("Mesh asset has no sampleable surface; emitting degenerate cloud");
        return PointCloud::degenerate(target);
    }

    normalize_to_unit(&mut raw.positions, UNIT_EXTENT);

    debug!("Sampled {} raw points for a target of {}", raw.len(), target);

    PointCloud::new(
        fit_to_count(&raw.positions, target),
        Some(fit_to_count(&raw.colors, target)),
    )
}

/// Load and sample in one go. A load failure is not fatal: the scene still
/// gets a degenerate cloud of the right size.
pub fn sample_source<R: Rng + ?Sized>(source: &dyn MeshSource, target: usize, rng: &mut R) -> PointCloud {
    match source.load_asset() {
        Ok(asset) => sample_asset(&asset, target, rng),
        Err(e) => {
            warn!("Mesh load failed for {}: {}", source.describe(), e);
            PointCloud::degenerate(target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::Bounds;
    use crate::error::{MorphError, Result};
    use crate::mesh::asset::Material;
    use approx::assert_relative_eq;
    use glam::Mat4;
    use rand::{rngs::StdRng, SeedableRng};
    use std::sync::Arc;

    fn unit_triangle() -> TriangleMesh {
        TriangleMesh::new("tri", vec![Vec3::ZERO, Vec3::X, Vec3::Y])
    }

    #[test]
    fn raw_triangle_samples_stay_on_the_triangle() {
        let mut rng = StdRng::seed_from_u64(7);
        let raw = sample_raw(&MeshAsset::new(vec![unit_triangle()]), 1000, &mut rng);

        assert_eq!(raw.len(), 1000);
        for p in raw.positions.chunks_exact(3) {
            assert_eq!(p[2], 0.0);
            assert!(p[0] >= 0.0 && p[1] >= 0.0);
            assert!(p[0] + p[1] <= 1.0 + 1e-6);
        }
    }

    #[test]
    fn normalized_cloud_is_centered_with_unit_extent() {
        let mut rng = StdRng::seed_from_u64(11);
        let mesh = TriangleMesh::new(
            "box-ish",
            vec![
                Vec3::new(3.0, 1.0, 0.0),
                Vec3::new(9.0, 1.0, 0.0),
                Vec3::new(3.0, 4.0, 2.0),
            ],
        );
        let cloud = sample_asset(&MeshAsset::new(vec![mesh]), 4000, &mut rng);

        assert_eq!(cloud.point_count(), 4000);
        let b = Bounds::of(&cloud.positions).unwrap();
        assert_relative_eq!(b.center().length(), 0.0, epsilon = 1e-3);
        assert_relative_eq!(b.largest_extent(), UNIT_EXTENT, epsilon = 1e-3);
    }

    #[test]
    fn degenerate_triangles_are_ignored() {
        let mut rng = StdRng::seed_from_u64(3);
        let flat = TriangleMesh::new("line", vec![Vec3::ZERO, Vec3::X, Vec3::X * 2.0]);
        let raw = sample_raw(&MeshAsset::new(vec![flat, unit_triangle()]), 100, &mut rng);
        // Only the real triangle contributes, with the per-mesh floor.
        assert_eq!(raw.len(), MIN_SAMPLES_PER_MESH);
    }

    #[test]
    fn per_mesh_floor_overshoots_then_reconciles() {
        let mut rng = StdRng::seed_from_u64(5);
        let meshes = (0..3)
            .map(|i| {
                unit_triangle().with_transform(Mat4::from_translation(Vec3::X * i as f32 * 2.0))
            })
            .collect();
        let asset = MeshAsset::new(meshes);

        assert_eq!(sample_raw(&asset, 900, &mut rng).len(), 3 * MIN_SAMPLES_PER_MESH);
        assert_eq!(sample_asset(&asset, 900, &mut rng).point_count(), 900);
    }

    #[test]
    fn color_priority_texture_then_vertex_then_base() {
        let mut rng = StdRng::seed_from_u64(9);
        let tex = Texture {
            width: 1,
            height: 1,
            rgb: vec![[0.0, 1.0, 0.0]],
        };
        let textured = unit_triangle()
            .with_uvs(vec![Vec2::ZERO, Vec2::X, Vec2::Y])
            .with_colors(vec![Vec3::X; 3])
            .with_material(Material {
                base_color: Vec3::Z,
                texture: Some(Arc::new(tex)),
            });
        let raw = sample_raw(&MeshAsset::new(vec![textured]), 10, &mut rng);
        assert!(raw.colors.chunks_exact(3).all(|c| c == [0.0, 1.0, 0.0]));

        let vertex_colored = unit_triangle().with_colors(vec![Vec3::X; 3]);
        let raw = sample_raw(&MeshAsset::new(vec![vertex_colored]), 10, &mut rng);
        for c in raw.colors.chunks_exact(3) {
            assert_relative_eq!(c[0], 1.0, epsilon = 1e-5);
            assert_relative_eq!(c[1], 0.0, epsilon = 1e-5);
        }

        let plain = unit_triangle().with_material(Material {
            base_color: Vec3::splat(0.5),
            texture: None,
        });
        let raw = sample_raw(&MeshAsset::new(vec![plain]), 10, &mut rng);
        for c in raw.colors.chunks_exact(3) {
            assert!((0.45..=0.55).contains(&c[0]));
        }
    }

    #[test]
    fn broken_texture_falls_back_to_base_color() {
        let mut rng = StdRng::seed_from_u64(1);
        let broken = Texture {
            width: 4,
            height: 4,
            rgb: vec![],
        };
        let mesh = unit_triangle()
            .with_uvs(vec![Vec2::ZERO, Vec2::X, Vec2::Y])
            .with_material(Material {
                base_color: Vec3::new(0.0, 0.0, 0.5),
                texture: Some(Arc::new(broken)),
            });
        let raw = sample_raw(&MeshAsset::new(vec![mesh]), 20, &mut rng);
        for c in raw.colors.chunks_exact(3) {
            assert_eq!(c[0], 0.0);
            assert!(c[2] > 0.4 && c[2] < 0.6);
        }
    }

    #[test]
    fn short_uv_array_falls_back_to_vertex_colors() {
        let mut rng = StdRng::seed_from_u64(4);
        let tex = Texture {
            width: 1,
            height: 1,
            rgb: vec![[0.0, 1.0, 0.0]],
        };
        let mesh = unit_triangle()
            .with_uvs(vec![Vec2::ZERO])
            .with_colors(vec![Vec3::X; 3])
            .with_material(Material {
                base_color: Vec3::Z,
                texture: Some(Arc::new(tex)),
            });

        let cloud = sample_source(&MeshAsset::new(vec![mesh]), 10, &mut rng);
        assert_eq!(cloud.point_count(), 10);
        for c in cloud.colors.unwrap().chunks_exact(3) {
            assert_relative_eq!(c[0], 1.0, epsilon = 1e-5);
            assert_relative_eq!(c[1], 0.0, epsilon = 1e-5);
        }
    }

    struct FailingSource;

    impl MeshSource for FailingSource {
        fn load_asset(&self) -> Result<MeshAsset> {
            Err(MorphError::Mesh("unreadable".into()))
        }

        fn describe(&self) -> String {
            "failing".into()
        }
    }

    #[test]
    fn load_failure_yields_zero_gray_cloud() {
        let mut rng = StdRng::seed_from_u64(2);
        let cloud = sample_source(&FailingSource, 64, &mut rng);
        assert_eq!(cloud.positions, vec![0.0; 64 * 3]);
        assert_eq!(cloud.colors.unwrap(), vec![0.5; 64 * 3]);
    }
}
