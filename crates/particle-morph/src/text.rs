//! Text lines to point cloud via the built-in glyph grid.

use crate::cloud::PointCloud;
use crate::error::{MorphError, Result};
use crate::glyphs::{cell_on, glyph, GLYPH_COLS, GLYPH_ROWS};
use glam::Vec3;
use rand::Rng;

/// Horizontal advance per character, in cells.
pub const ADVANCE_CELLS: usize = 8;
/// Baseline-to-baseline distance, in cells.
pub const LINE_HEIGHT_CELLS: usize = 12;
/// Per-axis jitter around an anchor, as a fraction of the cell scale.
pub const JITTER: f32 = 0.35;

/// Anchor positions (cell centers, z = 0) for every lit glyph cell. Each line
/// is centered on x = 0 and the block on y = 0.
pub fn text_anchors<S: AsRef<str>>(lines: &[S], scale: f32) -> Vec<Vec3> {
    let trailing_gap = (ADVANCE_CELLS - GLYPH_COLS) as f32;
    let block_cells = (lines.len() * LINE_HEIGHT_CELLS) as f32 - (LINE_HEIGHT_CELLS - GLYPH_ROWS) as f32;
    let top = block_cells.max(0.0) * scale * 0.5;

    let mut anchors = Vec::new();
    for (line_idx, line) in lines.iter().enumerate() {
        let chars: Vec<char> = line.as_ref().chars().collect();
        let width_cells = (chars.len() * ADVANCE_CELLS) as f32 - trailing_gap;
        let left = -width_cells.max(0.0) * scale * 0.5;
        let line_top = top - (line_idx * LINE_HEIGHT_CELLS) as f32 * scale;

        for (char_idx, c) in chars.iter().enumerate() {
            let Some(pattern) = glyph(*c) else {
                continue;
            };
            let origin_x = left + (char_idx * ADVANCE_CELLS) as f32 * scale;

            for row in 0..GLYPH_ROWS {
                for col in 0..GLYPH_COLS {
                    if cell_on(pattern, col, row) {
                        anchors.push(Vec3::new(
                            origin_x + (col as f32 + 0.5) * scale,
                            line_top - (row as f32 + 0.5) * scale,
                            0.0,
                        ));
                    }
                }
            }
        }
    }

    anchors
}

/// Spread exactly `target` jittered particles over the text's lit cells.
/// Every anchor gets `target / anchors` particles; the remainder goes one
/// each to the leading anchors.
pub fn generate_text<S: AsRef<str>, R: Rng + ?Sized>(
    lines: &[S],
    scale: f32,
    target: usize,
    rng: &mut R,
) -> Result<PointCloud> {
    let anchors = text_anchors(lines, scale);
    if anchors.is_empty() {
        return Err(MorphError::EmptyText);
    }

    let base = target / anchors.len();
    let remainder = target % anchors.len();
    let jitter = JITTER * scale;

    let mut positions = Vec::with_capacity(target * 3);
    for (i, anchor) in anchors.iter().enumerate() {
        let n = base + usize::from(i < remainder);
        for _ in 0..n {
            positions.extend_from_slice(&[
                anchor.x + rng.gen_range(-jitter..=jitter),
                anchor.y + rng.gen_range(-jitter..=jitter),
                anchor.z + rng.gen_range(-jitter..=jitter),
            ]);
        }
    }

    Ok(PointCloud::new(positions, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::Bounds;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn places_exactly_the_target_count() {
        let mut rng = StdRng::seed_from_u64(42);
        for target in [0, 1, 17, 1000, 24_000] {
            let cloud = generate_text(&["HELLO", "WORLD!"], 0.2, target, &mut rng).unwrap();
            assert_eq!(cloud.point_count(), target);
        }
    }

    #[test]
    fn block_is_centered() {
        let anchors = text_anchors(&["HH", "HH"], 1.0);
        let flat: Vec<f32> = anchors.iter().flat_map(|a| a.to_array()).collect();
        let b = Bounds::of(&flat).unwrap();
        assert_relative_eq!(b.center().x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(b.center().y, 0.0, epsilon = 1e-5);
        assert!(anchors.iter().all(|a| a.z == 0.0));
    }

    #[test]
    fn unknown_characters_advance_blank() {
        let plain = text_anchors(&["A A"], 1.0);
        let odd = text_anchors(&["A~A"], 1.0);
        assert_eq!(plain, odd);
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let anchors = text_anchors(&["I"], 0.5);
        let cloud = generate_text(&["I"], 0.5, anchors.len() * 4, &mut rng).unwrap();
        let limit = JITTER * 0.5 + 1e-6;
        for (i, p) in cloud.positions.chunks_exact(3).enumerate() {
            let a = anchors[i / 4];
            assert!((p[0] - a.x).abs() <= limit);
            assert!((p[1] - a.y).abs() <= limit);
            assert!(p[2].abs() <= limit);
        }
    }

    #[test]
    fn blank_text_is_an_error() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = generate_text(&["   ", ""], 1.0, 10, &mut rng).unwrap_err();
        assert!(matches!(err, MorphError::EmptyText));
    }
}
