use crate::clipboard::{ClipboardFill, ClipboardInfo, ClipboardSyncChannel, ClipboardType, PeerId};
use crate::display::{
    CursorImage, CursorOverlayState, DirtyRegionDispatcher, DisplaySurface, Rect, RenderSnapshot,
    ScreenGeometry, SharedDisplayState, SurfaceHandoff, SurfaceId,
};
use crate::engine::{Engine, EngineLock};
use crate::error::ShimError;
use crate::input::{EventOutcome, HostEvent, InputReconciler};
use crate::settings::Settings;
use crate::startup::StartupHandshake;
use crate::ui::queue::{UiCommand, UiQueue};
use std::sync::{Arc, Mutex, PoisonError};

/// Peer id the shim uses when it owns a clipboard.
pub const HOST_PEER: PeerId = PeerId(1);

/// The display shim as seen by the engine thread and by the UI shell.
///
/// Shared by `Arc` between both threads. Engine-facing methods never call
/// the toolkit directly; they post to the UI queue.
pub struct DisplayShim {
    engine: Arc<dyn Engine>,
    lock: Arc<EngineLock>,
    state: Arc<SharedDisplayState>,
    queue: UiQueue,
    handshake: StartupHandshake,
    handoff: SurfaceHandoff,
    dirty: DirtyRegionDispatcher,
    cursor: CursorOverlayState,
    clipboard: ClipboardSyncChannel,
    reconciler: Mutex<InputReconciler>,
    full_grab: bool,
}

impl DisplayShim {
    pub fn new(
        settings: &Settings,
        engine: Arc<dyn Engine>,
        lock: Arc<EngineLock>,
        queue: UiQueue,
    ) -> Self {
        let state = SharedDisplayState::new(ScreenGeometry {
            swap_modifiers: settings.swap_option_command,
            zoom_to_fit: settings.zoom_to_fit,
            ..ScreenGeometry::default()
        });
        let dirty = DirtyRegionDispatcher::new(Arc::clone(&state), queue.clone());
        Self {
            handoff: SurfaceHandoff::new(Arc::clone(&state), queue.clone()),
            cursor: CursorOverlayState::new(Arc::clone(&state), dirty.clone()),
            dirty,
            clipboard: ClipboardSyncChannel::new(
                HOST_PEER,
                Arc::clone(&engine),
                Arc::clone(&lock),
                queue.clone(),
            ),
            reconciler: Mutex::new(InputReconciler::from_settings(settings)),
            handshake: StartupHandshake::default(),
            full_grab: settings.full_grab,
            engine,
            lock,
            state,
            queue,
        }
    }

    pub fn handshake(&self) -> &StartupHandshake {
        &self.handshake
    }

    pub fn engine_lock(&self) -> &Arc<EngineLock> {
        &self.lock
    }

    pub fn queue(&self) -> &UiQueue {
        &self.queue
    }

    pub fn handoff(&self) -> &SurfaceHandoff {
        &self.handoff
    }

    pub fn dirty_regions(&self) -> &DirtyRegionDispatcher {
        &self.dirty
    }

    pub fn clipboard(&self) -> &ClipboardSyncChannel {
        &self.clipboard
    }

    pub fn full_grab(&self) -> bool {
        self.full_grab
    }

    // Engine side.

    pub fn on_surface_ready(&self, surface: DisplaySurface) -> SurfaceId {
        self.handoff.switch_surface(surface)
    }

    pub fn on_surface_switch(&self, surface: DisplaySurface) -> SurfaceId {
        self.handoff.switch_surface(surface)
    }

    pub fn on_region_dirty(&self, x: i32, y: i32, width: i32, height: i32) {
        self.dirty.schedule(Rect::new(x, y, width, height));
    }

    pub fn on_cursor_define(&self, image: CursorImage) {
        self.cursor.define(image);
    }

    pub fn on_cursor_move(&self, x: i32, y: i32, visible: bool) {
        self.cursor.move_to(x, y, visible);
    }

    pub fn on_clipboard_owner_changed(&self, info: Arc<ClipboardInfo>) {
        self.clipboard.on_owner_changed(info);
    }

    pub fn on_clipboard_request(&self, info: Arc<ClipboardInfo>, kind: ClipboardType) {
        self.clipboard.on_data_requested(info, kind);
    }

    /// The guest stopped or resumed.
    pub fn on_run_state_changed(&self, running: bool) {
        self.queue.post(UiCommand::SetPaused(!running));
    }

    /// Report a device error to the user.
    pub fn alert(&self, title: &str, message: &str) {
        self.queue.post(UiCommand::Alert {
            title: title.to_string(),
            message: message.to_string(),
        });
    }

    pub fn request_quit(&self) {
        self.queue.post(UiCommand::Quit);
    }

    /// Block until every UI command queued so far has run. Must be called
    /// without the engine lock; the UI thread may be waiting for it.
    pub fn flush_ui(&self) -> Result<(), ShimError> {
        self.queue.dispatch_sync(|_| ())
    }

    // UI side.

    /// Feed one host event through the input reconciler under the engine
    /// lock.
    pub fn handle(&self, event: &HostEvent) -> EventOutcome {
        let (view, guest) = self.state.pointer_mapping();
        let swap = self.state.geometry().swap_modifiers;
        let mut reconciler = self
            .reconciler
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        reconciler.set_pointer_mapping(view, guest);
        reconciler.set_swap_option_command(swap);
        self.lock
            .with_lock(|_| reconciler.handle(self.engine.as_ref(), event))
    }

    /// Takes effect from the next handled event.
    pub fn set_swap_option_command(&self, swap: bool) {
        tracing::debug!(swap, "option/command swap changed");
        self.state.set_swap_modifiers(swap);
    }

    pub fn current_screen_size(&self) -> (u32, u32) {
        self.state.geometry().size()
    }

    pub fn convert_to_pixels(&self, size: (f64, f64)) -> (f64, f64) {
        self.state.geometry().convert_to_pixels(size)
    }

    pub fn on_view_resized(&self, width: u32, height: u32) {
        self.state.set_view_size(width, height);
        self.lock
            .with_lock(|_| self.engine.notify_view_size(width, height));
    }

    pub fn set_backing_scale(&self, factor: f64) {
        self.state.set_scale_factor(factor);
    }

    /// The host wants guest clipboard data. Blocks until it is filled or
    /// the clipboard is replaced.
    pub fn provide_host_clipboard(&self, kind: ClipboardType) -> ClipboardFill {
        self.clipboard.provide_host_data(kind)
    }

    pub fn render_snapshot(&self) -> RenderSnapshot {
        self.handoff.render_snapshot()
    }
}
