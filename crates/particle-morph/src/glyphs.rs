//! Built-in 7x9 glyph patterns for the text shape generator.
//!
//! Each glyph is nine row masks, top row first; bit 6 is the leftmost column.

pub const GLYPH_COLS: usize = 7;
pub const GLYPH_ROWS: usize = 9;

pub type GlyphPattern = [u8; GLYPH_ROWS];

#[rustfmt::skip]
const GLYPHS: &[(char, GlyphPattern)] = &[
    ('A', [0b0000000, 0b0011100, 0b0100010, 0b0100010, 0b0111110, 0b0100010, 0b0100010, 0b0100010, 0b0000000]),
    ('B', [0b0000000, 0b0111100, 0b0100010, 0b0100010, 0b0111100, 0b0100010, 0b0100010, 0b0111100, 0b0000000]),
    ('C', [0b0000000, 0b0011100, 0b0100010, 0b0100000, 0b0100000, 0b0100000, 0b0100010, 0b0011100, 0b0000000]),
    ('D', [0b0000000, 0b0111100, 0b0100010, 0b0100010, 0b0100010, 0b0100010, 0b0100010, 0b0111100, 0b0000000]),
    ('E', [0b0000000, 0b0111110, 0b0100000, 0b0100000, 0b0111100, 0b0100000, 0b0100000, 0b0111110, 0b0000000]),
    ('F', [0b0000000, 0b0111110, 0b0100000, 0b0100000, 0b0111100, 0b0100000, 0b0100000, 0b0100000, 0b0000000]),
    ('G', [0b0000000, 0b0011100, 0b0100010, 0b0100000, 0b0101110, 0b0100010, 0b0100010, 0b0011110, 0b0000000]),
    ('H', [0b0000000, 0b0100010, 0b0100010, 0b0100010, 0b0111110, 0b0100010, 0b0100010, 0b0100010, 0b0000000]),
    ('I', [0b0000000, 0b0011100, 0b0001000, 0b0001000, 0b0001000, 0b0001000, 0b0001000, 0b0011100, 0b0000000]),
    ('J', [0b0000000, 0b0001110, 0b0000100, 0b0000100, 0b0000100, 0b0000100, 0b0100100, 0b0011000, 0b0000000]),
    ('K', [0b0000000, 0b0100010, 0b0100100, 0b0101000, 0b0110000, 0b0101000, 0b0100100, 0b0100010, 0b0000000]),
    ('L', [0b0000000, 0b0100000, 0b0100000, 0b0100000, 0b0100000, 0b0100000, 0b0100000, 0b0111110, 0b0000000]),
    ('M', [0b0000000, 0b0100010, 0b0110110, 0b0101010, 0b0101010, 0b0100010, 0b0100010, 0b0100010, 0b0000000]),
    ('N', [0b0000000, 0b0100010, 0b0100010, 0b0110010, 0b0101010, 0b0100110, 0b0100010, 0b0100010, 0b0000000]),
    ('O', [0b0000000, 0b0011100, 0b0100010, 0b0100010, 0b0100010, 0b0100010, 0b0100010, 0b0011100, 0b0000000]),
    ('P', [0b0000000, 0b0111100, 0b0100010, 0b0100010, 0b0111100, 0b0100000, 0b0100000, 0b0100000, 0b0000000]),
    ('Q', [0b0000000, 0b0011100, 0b0100010, 0b0100010, 0b0100010, 0b0101010, 0b0100100, 0b0011010, 0b0000000]),
    ('R', [0b0000000, 0b0111100, 0b0100010, 0b0100010, 0b0111100, 0b0101000, 0b0100100, 0b0100010, 0b0000000]),
    ('S', [0b0000000, 0b0011110, 0b0100000, 0b0100000, 0b0011100, 0b0000010, 0b0000010, 0b0111100, 0b0000000]),
    ('T', [0b0000000, 0b0111110, 0b0001000, 0b0001000, 0b0001000, 0b0001000, 0b0001000, 0b0001000, 0b0000000]),
    ('U', [0b0000000, 0b0100010, 0b0100010, 0b0100010, 0b0100010, 0b0100010, 0b0100010, 0b0011100, 0b0000000]),
    ('V', [0b0000000, 0b0100010, 0b0100010, 0b0100010, 0b0100010, 0b0100010, 0b0010100, 0b0001000, 0b0000000]),
    ('W', [0b0000000, 0b0100010, 0b0100010, 0b0100010, 0b0101010, 0b0101010, 0b0101010, 0b0010100, 0b0000000]),
    ('X', [0b0000000, 0b0100010, 0b0100010, 0b0010100, 0b0001000, 0b0010100, 0b0100010, 0b0100010, 0b0000000]),
    ('Y', [0b0000000, 0b0100010, 0b0100010, 0b0100010, 0b0010100, 0b0001000, 0b0001000, 0b0001000, 0b0000000]),
    ('Z', [0b0000000, 0b0111110, 0b0000010, 0b0000100, 0b0001000, 0b0010000, 0b0100000, 0b0111110, 0b0000000]),
    ('0', [0b0000000, 0b0011100, 0b0100010, 0b0100110, 0b0101010, 0b0110010, 0b0100010, 0b0011100, 0b0000000]),
    ('1', [0b0000000, 0b0001000, 0b0011000, 0b0001000, 0b0001000, 0b0001000, 0b0001000, 0b0011100, 0b0000000]),
    ('2', [0b0000000, 0b0011100, 0b0100010, 0b0000010, 0b0000100, 0b0001000, 0b0010000, 0b0111110, 0b0000000]),
    ('3', [0b0000000, 0b0111110, 0b0000100, 0b0001000, 0b0000100, 0b0000010, 0b0100010, 0b0011100, 0b0000000]),
    ('4', [0b0000000, 0b0000100, 0b0001100, 0b0010100, 0b0100100, 0b0111110, 0b0000100, 0b0000100, 0b0000000]),
    ('5', [0b0000000, 0b0111110, 0b0100000, 0b0111100, 0b0000010, 0b0000010, 0b0100010, 0b0011100, 0b0000000]),
    ('6', [0b0000000, 0b0001100, 0b0010000, 0b0100000, 0b0111100, 0b0100010, 0b0100010, 0b0011100, 0b0000000]),
    ('7', [0b0000000, 0b0111110, 0b0000010, 0b0000100, 0b0001000, 0b0010000, 0b0010000, 0b0010000, 0b0000000]),
    ('8', [0b0000000, 0b0011100, 0b0100010, 0b0100010, 0b0011100, 0b0100010, 0b0100010, 0b0011100, 0b0000000]),
    ('9', [0b0000000, 0b0011100, 0b0100010, 0b0100010, 0b0011110, 0b0000010, 0b0000100, 0b0011000, 0b0000000]),
    (' ', [0b0000000, 0b0000000, 0b0000000, 0b0000000, 0b0000000, 0b0000000, 0b0000000, 0b0000000, 0b0000000]),
    ('.', [0b0000000, 0b0000000, 0b0000000, 0b0000000, 0b0000000, 0b0000000, 0b0011000, 0b0011000, 0b0000000]),
    (',', [0b0000000, 0b0000000, 0b0000000, 0b0000000, 0b0000000, 0b0011000, 0b0001000, 0b0010000, 0b0000000]),
    ('!', [0b0000000, 0b0001000, 0b0001000, 0b0001000, 0b0001000, 0b0001000, 0b0000000, 0b0001000, 0b0000000]),
    ('?', [0b0000000, 0b0011100, 0b0100010, 0b0000010, 0b0000100, 0b0001000, 0b0000000, 0b0001000, 0b0000000]),
    ('-', [0b0000000, 0b0000000, 0b0000000, 0b0000000, 0b0111110, 0b0000000, 0b0000000, 0b0000000, 0b0000000]),
    ('&', [0b0000000, 0b0011000, 0b0100100, 0b0101000, 0b0010000, 0b0101010, 0b0100100, 0b0011010, 0b0000000]),
    (':', [0b0000000, 0b0000000, 0b0011000, 0b0011000, 0b0000000, 0b0011000, 0b0011000, 0b0000000, 0b0000000]),
    ('\'', [0b0000000, 0b0001000, 0b0001000, 0b0010000, 0b0000000, 0b0000000, 0b0000000, 0b0000000, 0b0000000]),
    ('/', [0b0000000, 0b0000000, 0b0000010, 0b0000100, 0b0001000, 0b0010000, 0b0100000, 0b0000000, 0b0000000]),
];

/// Pattern for `c`, matched case-insensitively. `None` for unsupported
/// characters, which render as blank advance.
pub fn glyph(c: char) -> Option<&'static GlyphPattern> {
    let c = c.to_ascii_uppercase();
    GLYPHS.iter().find(|(g, _)| *g == c).map(|(_, rows)| rows)
}

/// Whether the cell at `col` (0 = left) of `row` (0 = top) is lit.
#[inline]
pub fn cell_on(pattern: &GlyphPattern, col: usize, row: usize) -> bool {
    col < GLYPH_COLS && row < GLYPH_ROWS && pattern[row] & (1 << (GLYPH_COLS - 1 - col)) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mask_fits_in_seven_bits() {
        for (c, rows) in GLYPHS {
            assert!(rows.iter().all(|r| *r < 1 << GLYPH_COLS), "glyph {c:?}");
        }
    }

    #[test]
    fn lookup_is_case_insensitive_and_space_is_blank() {
        assert_eq!(glyph('a'), glyph('A'));
        assert!(glyph(' ').unwrap().iter().all(|r| *r == 0));
        assert!(glyph('~').is_none());
    }

    #[test]
    fn cell_bits_read_left_to_right() {
        let t = glyph('T').unwrap();
        // Top bar of T spans columns 1..=5 on row 1.
        assert!(!cell_on(t, 0, 1));
        assert!((1..=5).all(|c| cell_on(t, c, 1)));
        assert!(cell_on(t, 3, 4) && !cell_on(t, 1, 4));
    }
}
