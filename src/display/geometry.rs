/// Host view geometry. Written by the UI thread, snapshotted by the engine
/// thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenGeometry {
    pub width: u32,
    pub height: u32,
    pub swap_modifiers: bool,
    /// Scale the guest display to the view instead of resizing the view on
    /// mode switches.
    pub zoom_to_fit: bool,
    /// Backing pixels per view point.
    pub scale_factor: f64,
}

impl Default for ScreenGeometry {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            swap_modifiers: false,
            zoom_to_fit: false,
            scale_factor: 1.0,
        }
    }
}

impl ScreenGeometry {
    /// Convert a size in view points to backing pixels.
    pub fn convert_to_pixels(&self, size: (f64, f64)) -> (f64, f64) {
        (size.0 * self.scale_factor, size.1 * self.scale_factor)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixels_follow_backing_scale() {
        let geometry = ScreenGeometry {
            scale_factor: 2.0,
            ..ScreenGeometry::default()
        };
        assert_eq!(geometry.convert_to_pixels((320.0, 240.5)), (640.0, 481.0));
    }
}
