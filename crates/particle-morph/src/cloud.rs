//! Flat point cloud buffers and the length/scale normalization shared by every
//! shape source.

use glam::Vec3;
use rayon::prelude::*;

/// Largest extent of every normalized mesh cloud.
pub const UNIT_EXTENT: f32 = 10.0;

/// Mid-gray used for degenerate clouds.
pub const FALLBACK_GRAY: f32 = 0.5;

/// A flat xyz position buffer with an optional parallel RGB buffer.
///
/// Index `i` of every cloud registered in a scene refers to the same logical
/// particle, so lengths are reconciled before registration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointCloud {
    pub positions: Vec<f32>,
    pub colors: Option<Vec<f32>>,
}

impl PointCloud {
    pub fn new(positions: Vec<f32>, colors: Option<Vec<f32>>) -> Self {
        Self { positions, colors }
    }

    /// All-zero positions with mid-gray colors; what a failed mesh load yields.
    pub fn degenerate(count: usize) -> Self {
        Self {
            positions: vec![0.0; count * 3],
            colors: Some(vec![FALLBACK_GRAY; count * 3]),
        }
    }

    #[inline]
    pub fn point_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Brings the cloud to exactly `target` points: stride decimation when it
    /// has more, modulo repetition to close any remaining gap.
    pub fn reconcile(self, target: usize) -> Self {
        let available = self.point_count();
        if available == target {
            return self;
        }

        let (positions, colors) = if available > target {
            (
                decimate_stride(&self.positions, target),
                self.colors.as_deref().map(|c| decimate_stride(c, target)),
            )
        } else {
            (self.positions, self.colors)
        };

        Self {
            positions: fit_to_count(&positions, target),
            colors: colors.as_deref().map(|c| fit_to_count(c, target)),
        }
    }
}

/// Axis-aligned bounds of a flat position buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn of(positions: &[f32]) -> Option<Self> {
        if positions.len() < 3 {
            return None;
        }

        let (min, max) = positions
            .par_chunks_exact(3)
            .map(|p| {
                let v = Vec3::new(p[0], p[1], p[2]);
                (v, v)
            })
            .reduce(
                || (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
                |(a_min, a_max), (b_min, b_max)| (a_min.min(b_min), a_max.max(b_max)),
            );

        Some(Self { min, max })
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    #[inline]
    pub fn largest_extent(&self) -> f32 {
        self.size().max_element()
    }
}

/// Recenter on the origin and scale uniformly so the largest extent equals
/// `unit`. A zero extent keeps scale 1.
pub fn normalize_to_unit(positions: &mut [f32], unit: f32) {
    let Some(bounds) = Bounds::of(positions) else {
        return;
    };

    let center = bounds.center();
    let extent = bounds.largest_extent();
    let scale = if extent > 0.0 { unit / extent } else { 1.0 };

    positions.par_chunks_exact_mut(3).for_each(|p| {
        p[0] = (p[0] - center.x) * scale;
        p[1] = (p[1] - center.y) * scale;
        p[2] = (p[2] - center.z) * scale;
    });
}

/// Uniform decimation by the fixed stride `k = ceil(available / target)`.
pub fn decimate_stride(values: &[f32], target: usize) -> Vec<f32> {
    let available = values.len() / 3;
    if target == 0 || available <= target {
        return values[..available * 3].to_vec();
    }

    let k = available.div_ceil(target);
    let mut out = Vec::with_capacity(available.div_ceil(k) * 3);
    for i in (0..available).step_by(k) {
        out.extend_from_slice(&values[i * 3..i * 3 + 3]);
    }
    out
}

/// Exactly `target` triples by modulo indexing into `values`. An empty source
/// yields zeros.
pub fn fit_to_count(values: &[f32], target: usize) -> Vec<f32> {
    let available = values.len() / 3;
    if available == 0 {
        return vec![0.0; target * 3];
    }

    let mut out = Vec::with_capacity(target * 3);
    for i in 0..target {
        let src = (i % available) * 3;
        out.extend_from_slice(&values[src..src + 3]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn normalize_centers_and_scales_largest_extent() {
        let mut p = vec![2.0, 2.0, 2.0, 6.0, 3.0, 2.5];
        normalize_to_unit(&mut p, UNIT_EXTENT);

        let b = Bounds::of(&p).unwrap();
        assert_relative_eq!(b.center().length(), 0.0, epsilon = 1e-5);
        assert_relative_eq!(b.largest_extent(), UNIT_EXTENT, epsilon = 1e-4);
    }

    #[test]
    fn normalize_keeps_scale_for_a_single_point() {
        let mut p = vec![3.0, -1.0, 4.0, 3.0, -1.0, 4.0];
        normalize_to_unit(&mut p, UNIT_EXTENT);
        assert!(p.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn stride_decimation_is_uniform() {
        let values: Vec<f32> = (0..10).flat_map(|i| [i as f32, 0.0, 0.0]).collect();
        let out = decimate_stride(&values, 4);
        // k = ceil(10 / 4) = 3 -> points 0, 3, 6, 9
        let xs: Vec<f32> = out.chunks_exact(3).map(|p| p[0]).collect();
        assert_eq!(xs, vec![0.0, 3.0, 6.0, 9.0]);
    }

    #[test]
    fn reconcile_always_hits_target() {
        let values: Vec<f32> = (0..10).flat_map(|i| [i as f32, 1.0, 2.0]).collect();
        for target in [1, 3, 7, 10, 11, 25] {
            let cloud = PointCloud::new(values.clone(), Some(values.clone())).reconcile(target);
            assert_eq!(cloud.positions.len(), target * 3);
            assert_eq!(cloud.colors.unwrap().len(), target * 3);
        }
    }

    #[test]
    fn fit_repeats_by_modulo() {
        let out = fit_to_count(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3);
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 1.0, 2.0, 3.0]);
        assert_eq!(fit_to_count(&[], 2), vec![0.0; 6]);
    }
}
