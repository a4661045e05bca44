//! Pointer-driven local repulsion around the rest shape.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisperseParams {
    /// Influence radius around the pointer ray, in local units.
    pub radius: f32,
    /// Peak displacement at the ray, in local units.
    pub strength: f32,
    /// Per-frame approach rate toward the target offset.
    pub smoothing: f32,
    /// Per-frame decay factor outside the radius.
    pub decay: f32,
}

impl Default for DisperseParams {
    fn default() -> Self {
        Self {
            radius: 2.2,
            strength: 1.6,
            smoothing: 0.1,
            decay: 0.92,
        }
    }
}

/// A ray with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self {
            origin,
            dir: dir.normalize_or_zero(),
        }
    }

    /// Express the ray in the local space of an entity with world matrix
    /// `world`.
    pub fn to_local(&self, world: &Mat4) -> Self {
        let inv = world.inverse();
        Self::new(
            inv.transform_point3(self.origin),
            inv.transform_vector3(self.dir),
        )
    }
}

/// Offsets below this magnitude are snapped to zero once the pointer leaves.
const REST_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone)]
pub struct DisperseField {
    params: DisperseParams,
    offsets: Vec<f32>,
    at_rest: bool,
}

impl DisperseField {
    pub fn new(particle_count: usize, params: DisperseParams) -> Self {
        Self {
            params,
            offsets: vec![0.0; particle_count * 3],
            at_rest: true,
        }
    }

    /// Zero every offset. Called whenever a transition starts.
    pub fn reset(&mut self) {
        self.offsets.fill(0.0);
        self.at_rest = true;
    }

    /// Resize for a new particle count; offsets restart at zero.
    pub fn resize(&mut self, particle_count: usize) {
        self.offsets.clear();
        self.offsets.resize(particle_count * 3, 0.0);
        self.at_rest = true;
    }

    pub fn offsets(&self) -> &[f32] {
        &self.offsets
    }

    #[inline]
    pub fn is_at_rest(&self) -> bool {
        self.at_rest
    }

    /// One frame of the field. `ray` is the pointer ray in the entity's local
    /// space. Writes `live = rest + offset` and returns whether `live` was
    /// touched; a settled field with no pointer writes nothing.
    pub fn step(&mut self, rest: &[f32], ray: Option<Ray>, live: &mut [f32]) -> bool {
        debug_assert_eq!(rest.len(), self.offsets.len());
        debug_assert_eq!(live.len(), self.offsets.len());

        if ray.is_none() && self.at_rest {
            return false;
        }

        let DisperseParams {
            radius,
            strength,
            smoothing,
            decay,
        } = self.params;

        let mut peak = 0.0f32;
        for ((off, r), out) in self
            .offsets
            .chunks_exact_mut(3)
            .zip(rest.chunks_exact(3))
            .zip(live.chunks_exact_mut(3))
        {
            let p = Vec3::new(r[0], r[1], r[2]);
            let mut o = Vec3::new(off[0], off[1], off[2]);

            let pushed = ray.and_then(|ray| {
                let t = (p - ray.origin).dot(ray.dir);
                let closest = ray.origin + ray.dir * t;
                let away = p - closest;
                let distance = away.length();
                (distance < radius).then(|| {
                    let falloff = (1.0 - distance / radius).powi(2);
                    away.normalize_or_zero() * falloff * strength
                })
            });

            match pushed {
                Some(target) => o += (target - o) * smoothing,
                None => o *= decay,
            }

            peak = peak.max(o.abs().max_element());
            off.copy_from_slice(&o.to_array());
            out.copy_from_slice(&(p + o).to_array());
        }

        if ray.is_none() && peak < REST_EPSILON {
            self.offsets.fill(0.0);
            live.copy_from_slice(rest);
            self.at_rest = true;
        } else {
            self.at_rest = false;
        }

        true
    }
}
