use super::{Rect, SharedDisplayState, SurfaceId};
use crate::ui::queue::{UiCommand, UiQueue};
use crate::ui::toolkit::Toolkit;
use std::sync::Arc;

/// Forwards guest dirty regions to the UI thread, tagged with the surface
/// they were drawn on.
#[derive(Clone)]
pub struct DirtyRegionDispatcher {
    state: Arc<SharedDisplayState>,
    queue: UiQueue,
}

impl DirtyRegionDispatcher {
    pub fn new(state: Arc<SharedDisplayState>, queue: UiQueue) -> Self {
        Self { state, queue }
    }

    /// Engine thread. Returns the tag used, or `None` when there is no
    /// surface to draw on.
    pub fn schedule(&self, rect: Rect) -> Option<SurfaceId> {
        let Some(surface) = self.state.current_surface_id() else {
            tracing::trace!(?rect, "dirty region before any surface, dropping");
            return None;
        };
        self.schedule_tagged(surface, rect);
        Some(surface)
    }

    pub(crate) fn schedule_tagged(&self, surface: SurfaceId, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        self.queue.post(UiCommand::Redraw { surface, rect });
    }

    /// UI thread: invalidate `rect` if `tag` is still the current surface.
    /// Returns whether anything was invalidated.
    pub fn apply(&self, tag: SurfaceId, rect: Rect, toolkit: &mut dyn Toolkit) -> bool {
        let (surface_size, view_size) = {
            let state = self.state.lock();
            match &state.surface {
                Some(surface) if surface.id() == tag => (
                    (surface.width(), surface.height()),
                    state.geometry.size(),
                ),
                _ => {
                    tracing::trace!(surface = tag.get(), "stale redraw dropped");
                    return false;
                }
            }
        };

        let Some(clipped) = rect.clip_to(surface_size.0, surface_size.1) else {
            return false;
        };
        let view_rect = if view_size == surface_size || surface_size.0 == 0 || surface_size.1 == 0 {
            clipped
        } else {
            let sx = f64::from(view_size.0) / f64::from(surface_size.0);
            let sy = f64::from(view_size.1) / f64::from(surface_size.1);
            clipped.scale(sx, sy)
        };
        toolkit.invalidate(view_rect);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{DisplaySurface, PixelFormat, ScreenGeometry, SurfaceHandoff};
    use crate::ui::headless::HeadlessToolkit;
    use crate::ui::queue::ui_queue;

    #[test]
    fn redraw_for_replaced_surface_is_dropped() {
        let state = SharedDisplayState::new(ScreenGeometry::default());
        let (queue, _rx) = ui_queue();
        let handoff = SurfaceHandoff::new(Arc::clone(&state), queue.clone());
        let dirty = DirtyRegionDispatcher::new(state, queue);

        let first = handoff.switch_surface(DisplaySurface::blank(640, 480, PixelFormat::Bgrx8888).unwrap());
        let tag = dirty.schedule(Rect::new(0, 0, 10, 10)).unwrap();
        assert_eq!(tag, first);
        handoff.switch_surface(DisplaySurface::blank(640, 480, PixelFormat::Bgrx8888).unwrap());

        let mut toolkit = HeadlessToolkit::default();
        assert!(!dirty.apply(tag, Rect::new(0, 0, 10, 10), &mut toolkit));
        assert!(toolkit.invalidated().is_empty());
    }

    #[test]
    fn region_is_scaled_into_view_coordinates() {
        let state = SharedDisplayState::new(ScreenGeometry {
            width: 1280,
            height: 960,
            zoom_to_fit: true,
            ..ScreenGeometry::default()
        });
        let (queue, _rx) = ui_queue();
        let handoff = SurfaceHandoff::new(Arc::clone(&state), queue.clone());
        let dirty = DirtyRegionDispatcher::new(state, queue);
        let id = handoff.switch_surface(DisplaySurface::blank(640, 480, PixelFormat::Bgrx8888).unwrap());

        let mut toolkit = HeadlessToolkit::default();
        assert!(dirty.apply(id, Rect::new(10, 20, 30, 40), &mut toolkit));
        assert_eq!(toolkit.invalidated(), &[Rect::new(20, 40, 60, 80)]);
    }

    #[test]
    fn no_surface_means_nothing_scheduled() {
        let state = SharedDisplayState::new(ScreenGeometry::default());
        let (queue, rx) = ui_queue();
        let dirty = DirtyRegionDispatcher::new(state, queue);
        assert!(dirty.schedule(Rect::new(0, 0, 1, 1)).is_none());
        assert!(rx.try_recv().is_none());
    }
}
