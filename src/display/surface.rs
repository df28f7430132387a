use super::cursor::CursorPlacement;
use super::{ScreenGeometry, SharedDisplayState};
use crate::error::ShimError;
use crate::ui::queue::{UiCommand, UiQueue};
use crate::ui::toolkit::Toolkit;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one display surface. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u64);

impl SurfaceId {
    fn next() -> Self {
        Self(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Bgrx8888,
    Rgbx8888,
    Rgb565,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Bgrx8888 | PixelFormat::Rgbx8888 => 4,
            PixelFormat::Rgb565 => 2,
        }
    }
}

fn packed_stride(width: u32, format: PixelFormat) -> Option<u32> {
    width.checked_mul(format.bytes_per_pixel())
}

/// Engine-owned framebuffer for one display mode. Replaced on mode switch,
/// never mutated in place.
#[derive(Debug)]
pub struct DisplaySurface {
    id: SurfaceId,
    width: u32,
    height: u32,
    format: PixelFormat,
    stride: u32,
    pixels: Arc<[u8]>,
}

impl DisplaySurface {
    /// Wrap `pixels` with a tightly packed stride.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Arc<[u8]>,
    ) -> Result<Self, ShimError> {
        let stride =
            packed_stride(width, format).ok_or(ShimError::SurfaceTooLarge { width, height })?;
        Ok(Self::with_stride(width, height, format, stride, pixels))
    }

    pub fn with_stride(
        width: u32,
        height: u32,
        format: PixelFormat,
        stride: u32,
        pixels: Arc<[u8]>,
    ) -> Self {
        Self {
            id: SurfaceId::next(),
            width,
            height,
            format,
            stride,
            pixels,
        }
    }

    /// Zero-filled surface.
    pub fn blank(width: u32, height: u32, format: PixelFormat) -> Result<Self, ShimError> {
        let len = packed_stride(width, format)
            .and_then(|stride| usize::try_from(stride).ok())
            .and_then(|stride| stride.checked_mul(usize::try_from(height).ok()?))
            .ok_or(ShimError::SurfaceTooLarge { width, height })?;
        Self::new(width, height, format, vec![0u8; len].into())
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Everything a render pass needs, captured under the display mutex.
/// Holding the snapshot keeps the buffers alive after a switch.
#[derive(Debug, Clone)]
pub struct RenderSnapshot {
    pub surface: Option<Arc<DisplaySurface>>,
    pub cursor: Option<CursorPlacement>,
    pub geometry: ScreenGeometry,
}

pub struct SurfaceHandoff {
    state: Arc<SharedDisplayState>,
    queue: UiQueue,
}

impl SurfaceHandoff {
    pub fn new(state: Arc<SharedDisplayState>, queue: UiQueue) -> Self {
        Self { state, queue }
    }

    /// Engine thread: make `surface` current. Schedules one geometry task
    /// unless one is already pending.
    pub fn switch_surface(&self, surface: DisplaySurface) -> SurfaceId {
        let id = surface.id();
        let (previous, schedule) = {
            let mut state = self.state.lock();
            let previous = state.surface.replace(Arc::new(surface));
            let schedule = !state.adopt_pending;
            state.adopt_pending = true;
            (previous, schedule)
        };
        drop(previous);

        tracing::debug!(surface = id.get(), schedule, "surface switched");
        if schedule {
            self.queue.post(UiCommand::AdoptGeometry);
        }
        id
    }

    /// UI thread: apply the geometry of whatever surface is current now.
    pub fn adopt_geometry(&self, toolkit: &mut dyn Toolkit) -> Option<SurfaceId> {
        let (surface, resize) = {
            let mut state = self.state.lock();
            state.adopt_pending = false;
            let surface = state.surface.clone()?;
            let resize = !state.geometry.zoom_to_fit;
            if resize {
                state.geometry.width = surface.width();
                state.geometry.height = surface.height();
            }
            (surface, resize)
        };

        if resize {
            toolkit.resize_view(surface.width(), surface.height());
        }
        toolkit.surface_changed(&surface);
        tracing::debug!(
            surface = surface.id().get(),
            width = surface.width(),
            height = surface.height(),
            "adopted surface geometry"
        );
        Some(surface.id())
    }

    pub fn render_snapshot(&self) -> RenderSnapshot {
        let state = self.state.lock();
        let cursor = match (&state.cursor, state.mouse_visible) {
            (Some(image), true) => Some(CursorPlacement {
                image: Arc::clone(image),
                x: state.mouse_x,
                y: state.mouse_y,
            }),
            _ => None,
        };
        RenderSnapshot {
            surface: state.surface.clone(),
            cursor,
            geometry: state.geometry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::headless::HeadlessToolkit;
    use crate::ui::queue::ui_queue;

    #[test]
    fn burst_of_switches_schedules_one_adopt() {
        let state = SharedDisplayState::new(ScreenGeometry::default());
        let (queue, rx) = ui_queue();
        let handoff = SurfaceHandoff::new(state, queue);

        handoff.switch_surface(DisplaySurface::blank(640, 480, PixelFormat::Bgrx8888).unwrap());
        handoff.switch_surface(DisplaySurface::blank(800, 600, PixelFormat::Bgrx8888).unwrap());
        let last = handoff.switch_surface(DisplaySurface::blank(1024, 768, PixelFormat::Bgrx8888).unwrap());

        assert!(matches!(rx.try_recv(), Some(UiCommand::AdoptGeometry)));
        assert!(rx.try_recv().is_none());

        let mut toolkit = HeadlessToolkit::default();
        assert_eq!(handoff.adopt_geometry(&mut toolkit), Some(last));
        assert_eq!(toolkit.view_size(), (1024, 768));

        handoff.switch_surface(DisplaySurface::blank(640, 480, PixelFormat::Bgrx8888).unwrap());
        assert!(matches!(rx.try_recv(), Some(UiCommand::AdoptGeometry)));
    }

    #[test]
    fn zoom_to_fit_keeps_view_size() {
        let state = SharedDisplayState::new(ScreenGeometry {
            width: 1280,
            height: 800,
            zoom_to_fit: true,
            ..ScreenGeometry::default()
        });
        let (queue, _rx) = ui_queue();
        let handoff = SurfaceHandoff::new(Arc::clone(&state), queue);
        handoff.switch_surface(DisplaySurface::blank(640, 480, PixelFormat::Rgb565).unwrap());

        let mut toolkit = HeadlessToolkit::default();
        handoff.adopt_geometry(&mut toolkit);
        assert_eq!(state.geometry().size(), (1280, 800));
        assert_eq!(toolkit.surface_changes(), 1);
    }

    #[test]
    fn oversized_surface_is_rejected() {
        match DisplaySurface::blank(u32::MAX, 2, PixelFormat::Bgrx8888) {
            Err(ShimError::SurfaceTooLarge { width, height }) => {
                assert_eq!((width, height), (u32::MAX, 2));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(packed_stride(40_000, PixelFormat::Bgrx8888), Some(160_000));
    }

    #[test]
    fn snapshot_outlives_replacement() {
        let state = SharedDisplayState::new(ScreenGeometry::default());
        let (queue, _rx) = ui_queue();
        let handoff = SurfaceHandoff::new(state, queue);
        let pixels: Arc<[u8]> = vec![7u8; 4 * 4 * 4].into();
        handoff.switch_surface(DisplaySurface::new(4, 4, PixelFormat::Bgrx8888, pixels).unwrap());

        let snapshot = handoff.render_snapshot();
        handoff.switch_surface(DisplaySurface::blank(8, 8, PixelFormat::Bgrx8888).unwrap());

        let surface = snapshot.surface.expect("surface captured");
        assert_eq!(surface.width(), 4);
        assert!(surface.pixels().iter().all(|b| *b == 7));
    }
}
