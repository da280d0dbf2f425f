use palette::{Hsl, IntoColor, Srgb};
use plotters::style::RGBColor;

/// Number of distinct colours before the rotation repeats.
pub const PALETTE_SIZE: usize = 10;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<RGBColor> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.45);
            let rgb: Srgb = hsl.into_color();
            RGBColor(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Marker shapes
// ---------------------------------------------------------------------------

/// Marker shapes, rotated in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    FilledCircle,
    FilledSquare,
    FilledTriangleUp,
    FilledTriangleDown,
    OpenCircle,
    OpenSquare,
    OpenTriangleUp,
    OpenDiamond,
    OpenCross,
    FilledStar,
}

pub const MARKERS: [Marker; 10] = [
    Marker::FilledCircle,
    Marker::FilledSquare,
    Marker::FilledTriangleUp,
    Marker::FilledTriangleDown,
    Marker::OpenCircle,
    Marker::OpenSquare,
    Marker::OpenTriangleUp,
    Marker::OpenDiamond,
    Marker::OpenCross,
    Marker::FilledStar,
];

impl Marker {
    pub fn is_filled(self) -> bool {
        matches!(
            self,
            Marker::FilledCircle
                | Marker::FilledSquare
                | Marker::FilledTriangleUp
                | Marker::FilledTriangleDown
                | Marker::FilledStar
        )
    }
}

// ---------------------------------------------------------------------------
// Style rotation: slot → colour + marker
// ---------------------------------------------------------------------------

/// Cycles colours and markers by style slot.
#[derive(Debug, Clone)]
pub struct StyleCycle {
    colors: Vec<RGBColor>,
}

impl Default for StyleCycle {
    fn default() -> Self {
        Self {
            colors: generate_palette(PALETTE_SIZE),
        }
    }
}

impl StyleCycle {
    pub fn color(&self, slot: usize) -> RGBColor {
        self.colors[slot % self.colors.len()]
    }

    pub fn marker(&self, slot: usize) -> Marker {
        MARKERS[slot % MARKERS.len()]
    }
}
