//! Input mapping: scroll offset to page sections, digit keys and cursor
//! coordinates. Each section corresponds to one gesture, in `Gesture::ALL`
//! order.

use glam::Vec2;
use particle_morph::Gesture;
use winit::keyboard::KeyCode;

/// Scroll distance covered by one section, in logical pixels.
pub const SECTION_HEIGHT_PX: f32 = 600.0;

/// Pixels per line for wheels that report line deltas.
pub const LINE_HEIGHT_PX: f32 = 40.0;

/// Tracks a virtual page scroll and reports section changes.
#[derive(Debug, Clone)]
pub struct ScrollNavigator {
    offset: f32,
    section_height: f32,
    section: usize,
}

impl Default for ScrollNavigator {
    fn default() -> Self {
        Self::new(SECTION_HEIGHT_PX)
    }
}

impl ScrollNavigator {
    pub fn new(section_height: f32) -> Self {
        Self {
            offset: 0.0,
            section_height: section_height.max(1.0),
            section: 0,
        }
    }

    fn max_offset(&self) -> f32 {
        (Gesture::ALL.len() - 1) as f32 * self.section_height
    }

    /// Scroll by `delta_px` (positive scrolls down the page). Returns the new
    /// section's gesture when the midpoint of a section boundary is crossed.
    pub fn scroll(&mut self, delta_px: f32) -> Option<Gesture> {
        self.offset = (self.offset + delta_px).clamp(0.0, self.max_offset());
        let section = ((self.offset / self.section_height) + 0.5).floor() as usize;
        let section = section.min(Gesture::ALL.len() - 1);

        if section == self.section {
            return None;
        }
        self.section = section;
        Some(Gesture::ALL[section])
    }

    /// Move the page to `gesture`'s section without reporting it.
    pub fn jump_to(&mut self, gesture: Gesture) {
        if let Some(idx) = Gesture::ALL.iter().position(|g| *g == gesture) {
            self.section = idx;
            self.offset = idx as f32 * self.section_height;
        }
    }

    #[inline]
    pub fn section(&self) -> Gesture {
        Gesture::ALL[self.section]
    }

    #[inline]
    pub fn offset(&self) -> f32 {
        self.offset
    }
}

/// Digits 1..=6 select gestures directly.
pub fn digit_gesture(key: KeyCode) -> Option<Gesture> {
    let idx = match key {
        KeyCode::Digit1 | KeyCode::Numpad1 => 0,
        KeyCode::Digit2 | KeyCode::Numpad2 => 1,
        KeyCode::Digit3 | KeyCode::Numpad3 => 2,
        KeyCode::Digit4 | KeyCode::Numpad4 => 3,
        KeyCode::Digit5 | KeyCode::Numpad5 => 4,
        KeyCode::Digit6 | KeyCode::Numpad6 => 5,
        _ => return None,
    };
    Gesture::ALL.get(idx).copied()
}

/// Window pixel position to normalized device coordinates (y up).
pub fn cursor_to_ndc(x: f64, y: f64, width: u32, height: u32) -> Option<Vec2> {
    if width == 0 || height == 0 {
        return None;
    }
    let nx = (x / width as f64) * 2.0 - 1.0;
    let ny = 1.0 - (y / height as f64) * 2.0;
    Some(Vec2::new(nx as f32, ny as f32))
}
