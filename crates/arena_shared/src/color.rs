//! Tank colors.
//!
//! Every participant derives a tank's color from its id alone, so all views
//! of the arena agree without the color ever crossing the wire.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Linear RGB color, each channel in `[0, 1]`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Color {
    /// Red channel
    pub r: f32,
    /// Green channel
    pub g: f32,
    /// Blue channel
    pub b: f32,
}

impl Color {
    /// Creates a new color
    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Black
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);

    /// White
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);

    /// Palette color for a participant id (wraps modulo the palette size).
    #[must_use]
    pub const fn for_id(id: u8) -> Self {
        TANK_PALETTE[id as usize % TANK_PALETTE.len()]
    }
}

/// The fixed tank palette, indexed by participant id.
pub const TANK_PALETTE: [Color; 9] = [
    Color::WHITE,
    Color::new(1.0, 0.0, 0.0),
    Color::new(0.0, 1.0, 0.0),
    Color::new(0.0, 0.0, 1.0),
    Color::new(1.0, 1.0, 0.0),
    Color::new(1.0, 0.0, 1.0),
    Color::new(0.0, 1.0, 1.0),
    Color::new(0.5, 0.0, 0.0),
    Color::new(0.5, 0.0, 0.5),
];
