//! Display state shared between the engine thread and the UI thread.
//!
//! Everything that both threads touch lives in one [`SharedDisplayState`]
//! behind a single mutex. Critical sections only swap `Arc`s and copy
//! metadata; compositing and toolkit calls happen after the lock is gone.

pub mod cursor;
pub mod dirty;
pub mod geometry;
pub mod surface;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use cursor::{CursorImage, CursorOverlayState};
pub use dirty::DirtyRegionDispatcher;
pub use geometry::ScreenGeometry;
pub use surface::{DisplaySurface, PixelFormat, RenderSnapshot, SurfaceHandoff, SurfaceId};

/// Axis-aligned rectangle in pixels. `x`/`y` may be negative before
/// clipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Intersect with `(0, 0, width, height)`. `None` when nothing is left.
    pub fn clip_to(&self, width: u32, height: u32) -> Option<Rect> {
        let right = (self.x.saturating_add(self.width)).min(clamp_dim(width));
        let bottom = (self.y.saturating_add(self.height)).min(clamp_dim(height));
        let left = self.x.max(0);
        let top = self.y.max(0);
        let clipped = Rect::new(left, top, right - left, bottom - top);
        (!clipped.is_empty()).then_some(clipped)
    }

    /// Scale by `sx`/`sy`, rounding outwards so the scaled rect covers
    /// every pixel the unscaled rect touched.
    pub fn scale(&self, sx: f64, sy: f64) -> Rect {
        let left = (f64::from(self.x) * sx).floor();
        let top = (f64::from(self.y) * sy).floor();
        let right = (f64::from(self.x + self.width) * sx).ceil();
        let bottom = (f64::from(self.y + self.height) * sy).ceil();
        Rect::new(
            left as i32,
            top as i32,
            (right - left) as i32,
            (bottom - top) as i32,
        )
    }
}

fn clamp_dim(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[derive(Debug, Default)]
pub(crate) struct DisplayState {
    pub(crate) surface: Option<Arc<DisplaySurface>>,
    pub(crate) adopt_pending: bool,
    pub(crate) cursor: Option<Arc<CursorImage>>,
    pub(crate) mouse_x: i32,
    pub(crate) mouse_y: i32,
    pub(crate) mouse_visible: bool,
    pub(crate) geometry: ScreenGeometry,
}

/// Handle passed to both threads at construction.
#[derive(Debug, Default)]
pub struct SharedDisplayState {
    inner: Mutex<DisplayState>,
}

impl SharedDisplayState {
    pub fn new(geometry: ScreenGeometry) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(DisplayState {
                geometry,
                ..DisplayState::default()
            }),
        })
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, DisplayState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current_surface_id(&self) -> Option<SurfaceId> {
        self.lock().surface.as_ref().map(|s| s.id())
    }

    pub fn current_surface(&self) -> Option<Arc<DisplaySurface>> {
        self.lock().surface.clone()
    }

    pub fn geometry(&self) -> ScreenGeometry {
        self.lock().geometry
    }

    /// The UI shell resized the view.
    pub fn set_view_size(&self, width: u32, height: u32) {
        let mut state = self.lock();
        state.geometry.width = width;
        state.geometry.height = height;
    }

    pub fn set_scale_factor(&self, factor: f64) {
        self.lock().geometry.scale_factor = factor;
    }

    pub fn set_swap_modifiers(&self, swap: bool) {
        self.lock().geometry.swap_modifiers = swap;
    }

    /// View size and guest surface size, for mapping pointer coordinates.
    pub fn pointer_mapping(&self) -> ((u32, u32), (u32, u32)) {
        let state = self.lock();
        let view = (state.geometry.width, state.geometry.height);
        let guest = state
            .surface
            .as_ref()
            .map(|s| (s.width(), s.height()))
            .unwrap_or(view);
        (view, guest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_origin_truncates_the_visible_extent() {
        let rect = Rect::new(-4, 2, 10, 10);
        assert_eq!(rect.clip_to(100, 100), Some(Rect::new(0, 2, 6, 10)));
    }

    #[test]
    fn clip_never_exceeds_buffer_bounds() {
        let rect = Rect::new(95, 90, 16, 16);
        assert_eq!(rect.clip_to(100, 100), Some(Rect::new(95, 90, 5, 10)));
        assert_eq!(Rect::new(120, 0, 16, 16).clip_to(100, 100), None);
    }

    #[test]
    fn scaling_rounds_outwards() {
        let rect = Rect::new(1, 1, 1, 1);
        assert_eq!(rect.scale(1.5, 1.5), Rect::new(1, 1, 2, 2));
    }
}
