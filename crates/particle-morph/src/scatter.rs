//! Uniform random ball clouds.

use crate::cloud::PointCloud;
use rand::Rng;
use std::f32::consts::TAU;

pub const DEFAULT_SCATTER_RADIUS: f32 = 18.0;

/// `count` points uniformly distributed inside a ball of `radius`, drawn
/// directly (no rejection): uniform direction, radius `r * cbrt(u)`.
pub fn scatter_ball<R: Rng + ?Sized>(count: usize, radius: f32, rng: &mut R) -> PointCloud {
    let mut positions = Vec::with_capacity(count * 3);

    for _ in 0..count {
        let z: f32 = rng.gen_range(-1.0..=1.0);
        let phi: f32 = rng.gen_range(0.0..TAU);
        let ring = (1.0 - z * z).max(0.0).sqrt();
        let r = radius * rng.gen::<f32>().cbrt();

        positions.extend_from_slice(&[r * ring * phi.cos(), r * ring * phi.sin(), r * z]);
    }

    PointCloud::new(positions, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn points_stay_inside_the_ball() {
        let mut rng = StdRng::seed_from_u64(8);
        let cloud = scatter_ball(5000, DEFAULT_SCATTER_RADIUS, &mut rng);
        assert_eq!(cloud.point_count(), 5000);
        for p in cloud.positions.chunks_exact(3) {
            let len = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
            assert!(len <= DEFAULT_SCATTER_RADIUS + 1e-3);
        }
    }

    #[test]
    fn volume_is_filled_not_just_the_shell() {
        let mut rng = StdRng::seed_from_u64(9);
        let cloud = scatter_ball(4000, 1.0, &mut rng);
        let inner = cloud
            .positions
            .chunks_exact(3)
            .filter(|p| (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt() < 0.5)
            .count();
        // Expected share is 0.5^3 = 12.5%.
        let share = inner as f32 / 4000.0;
        assert!((0.09..0.16).contains(&share), "inner share {share}");
    }
}
