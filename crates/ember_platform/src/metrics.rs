//! Display metrics reported by the platform

use ember_core::{Insets, Rect};

/// Density and safe-area information for the surface's display
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayMetrics {
    /// Physical pixels per logical point
    pub density: f32,
    /// Safe-area insets in points
    pub safe_insets: Insets,
}

impl Default for DisplayMetrics {
    fn default() -> Self {
        Self {
            density: 1.0,
            safe_insets: Insets::ZERO,
        }
    }
}

impl DisplayMetrics {
    pub fn new(density: f32) -> Self {
        Self {
            density: if density > 0.0 { density } else { 1.0 },
            ..Default::default()
        }
    }

    pub fn with_safe_insets(mut self, insets: Insets) -> Self {
        self.safe_insets = insets;
        self
    }

    /// Convert points to physical pixels
    pub fn to_pixels(&self, points: f32) -> f32 {
        points * self.density
    }

    /// Convert physical pixels to points
    pub fn to_points(&self, pixels: f32) -> f32 {
        pixels / self.density
    }

    /// Bounds minus the safe-area insets, in pixels
    pub fn safe_bounds(&self, bounds_px: Rect) -> Rect {
        bounds_px.deflate(self.safe_insets.scaled(self.density))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_density_conversions() {
        let m = DisplayMetrics::new(3.0);
        assert_eq!(m.to_pixels(2.0), 6.0);
        assert_eq!(m.to_points(6.0), 2.0);
        assert_eq!(DisplayMetrics::new(0.0).density, 1.0);
    }

    #[test]
    fn test_safe_bounds() {
        let m = DisplayMetrics::new(2.0).with_safe_insets(Insets::new(0.0, 10.0, 0.0, 5.0));
        let safe = m.safe_bounds(Rect::new(0.0, 0.0, 100.0, 200.0));
        assert_eq!(safe, Rect::new(0.0, 20.0, 100.0, 170.0));
    }
}
