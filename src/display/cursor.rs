use super::{DirtyRegionDispatcher, Rect, SharedDisplayState};
use std::sync::Arc;

/// Guest cursor bitmap, replaced wholesale on each definition.
#[derive(Debug)]
pub struct CursorImage {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl CursorImage {
    pub fn new(width: u32, height: u32, pixels: Arc<[u8]>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// A visible cursor at its guest position.
#[derive(Debug, Clone)]
pub struct CursorPlacement {
    pub image: Arc<CursorImage>,
    pub x: i32,
    pub y: i32,
}

/// Cursor bitmap, position and visibility. Lives alongside the surface in
/// [`SharedDisplayState`] but is defined and moved independently of it.
pub struct CursorOverlayState {
    state: Arc<SharedDisplayState>,
    dirty: DirtyRegionDispatcher,
}

fn dims(image: Option<&Arc<CursorImage>>) -> (i32, i32) {
    image
        .map(|i| {
            (
                i32::try_from(i.width()).unwrap_or(i32::MAX),
                i32::try_from(i.height()).unwrap_or(i32::MAX),
            )
        })
        .unwrap_or((0, 0))
}

impl CursorOverlayState {
    pub fn new(state: Arc<SharedDisplayState>, dirty: DirtyRegionDispatcher) -> Self {
        Self { state, dirty }
    }

    /// Engine thread: install a new cursor bitmap. While the cursor is
    /// visible, the old box is erased and the new one drawn.
    /// Returns the rectangles scheduled for redraw.
    pub fn define(&self, image: CursorImage) -> Vec<Rect> {
        let (previous, boxes, tag, bounds) = {
            let mut state = self.state.lock();
            let (old_w, old_h) = dims(state.cursor.as_ref());
            let previous = state.cursor.replace(Arc::new(image));
            let (new_w, new_h) = dims(state.cursor.as_ref());
            let (x, y) = (state.mouse_x, state.mouse_y);
            let boxes = if state.mouse_visible {
                vec![Rect::new(x, y, old_w, old_h), Rect::new(x, y, new_w, new_h)]
            } else {
                Vec::new()
            };
            let tag = state.surface.as_ref().map(|s| (s.id(), (s.width(), s.height())));
            (previous, boxes, tag.map(|t| t.0), tag.map(|t| t.1))
        };
        drop(previous);
        self.schedule(boxes, tag, bounds)
    }

    /// Engine thread: move the cursor and/or change its visibility.
    /// Returns the rectangles scheduled for redraw.
    pub fn move_to(&self, x: i32, y: i32, visible: bool) -> Vec<Rect> {
        let (boxes, tag, bounds) = {
            let mut state = self.state.lock();
            let (w, h) = dims(state.cursor.as_ref());
            let mut boxes = Vec::with_capacity(2);
            if state.mouse_visible {
                boxes.push(Rect::new(state.mouse_x, state.mouse_y, w, h));
            }
            state.mouse_x = x;
            state.mouse_y = y;
            state.mouse_visible = visible;
            if visible {
                boxes.push(Rect::new(x, y, w, h));
            }
            let tag = state.surface.as_ref().map(|s| (s.id(), (s.width(), s.height())));
            (boxes, tag.map(|t| t.0), tag.map(|t| t.1))
        };
        self.schedule(boxes, tag, bounds)
    }

    pub fn position(&self) -> (i32, i32, bool) {
        let state = self.state.lock();
        (state.mouse_x, state.mouse_y, state.mouse_visible)
    }

    fn schedule(
        &self,
        boxes: Vec<Rect>,
        tag: Option<super::SurfaceId>,
        bounds: Option<(u32, u32)>,
    ) -> Vec<Rect> {
        let (Some(tag), Some((width, height))) = (tag, bounds) else {
            return Vec::new();
        };
        // Erase and draw boxes stay separate even when they coincide.
        let scheduled: Vec<Rect> = boxes
            .iter()
            .filter_map(|r| r.clip_to(width, height))
            .collect();
        for rect in &scheduled {
            self.dirty.schedule_tagged(tag, *rect);
        }
        scheduled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{DisplaySurface, PixelFormat, ScreenGeometry, SurfaceHandoff};
    use crate::ui::queue::ui_queue;

    fn cursor(width: u32, height: u32) -> CursorImage {
        CursorImage::new(width, height, vec![0u8; (width * height * 4) as usize].into())
    }

    fn overlay() -> CursorOverlayState {
        let state = SharedDisplayState::new(ScreenGeometry::default());
        let (queue, _rx) = ui_queue();
        SurfaceHandoff::new(Arc::clone(&state), queue.clone())
            .switch_surface(DisplaySurface::blank(640, 480, PixelFormat::Bgrx8888).unwrap());
        let dirty = DirtyRegionDispatcher::new(Arc::clone(&state), queue);
        CursorOverlayState::new(state, dirty)
    }

    #[test]
    fn redefine_while_visible_erases_old_and_draws_new() {
        let overlay = overlay();
        overlay.define(cursor(16, 16));
        overlay.move_to(100, 50, true);
        let rects = overlay.define(cursor(32, 24));
        assert_eq!(
            rects,
            vec![Rect::new(100, 50, 16, 16), Rect::new(100, 50, 32, 24)]
        );
    }

    #[test]
    fn same_size_redefine_still_erases_and_draws() {
        let overlay = overlay();
        overlay.define(cursor(16, 16));
        overlay.move_to(10, 10, true);
        let rects = overlay.define(cursor(16, 16));
        assert_eq!(
            rects,
            vec![Rect::new(10, 10, 16, 16), Rect::new(10, 10, 16, 16)]
        );
    }

    #[test]
    fn hidden_cursor_redefinition_invalidates_nothing() {
        let overlay = overlay();
        overlay.define(cursor(16, 16));
        assert!(overlay.define(cursor(8, 8)).is_empty());
    }

    #[test]
    fn move_clips_against_the_buffer() {
        let overlay = overlay();
        overlay.define(cursor(16, 16));
        let rects = overlay.move_to(-6, 470, true);
        assert_eq!(rects, vec![Rect::new(0, 470, 10, 10)]);

        let rects = overlay.move_to(10, 10, false);
        assert_eq!(rects, vec![Rect::new(0, 470, 10, 10)]);
        assert_eq!(overlay.position(), (10, 10, false));
    }
}
