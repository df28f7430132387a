use super::toolkit::Toolkit;
use crate::display::{DisplaySurface, Rect};
use crate::input::HostEvent;
use std::collections::VecDeque;
use std::sync::Arc;

/// Toolkit without a window. Records what it was asked to do and logs it.
#[derive(Debug, Default)]
pub struct HeadlessToolkit {
    view: (u32, u32),
    invalidated: Vec<Rect>,
    surface_changes: usize,
    alerts: Vec<(String, String)>,
    paused: bool,
    captured: bool,
    pending: VecDeque<HostEvent>,
    unhandled: Vec<HostEvent>,
}

impl HeadlessToolkit {
    /// Queue input to be returned by the next pump.
    pub fn push_event(&mut self, event: HostEvent) {
        self.pending.push_back(event);
    }

    pub fn unhandled(&self) -> &[HostEvent] {
        &self.unhandled
    }

    pub fn view_size(&self) -> (u32, u32) {
        self.view
    }

    pub fn invalidated(&self) -> &[Rect] {
        &self.invalidated
    }

    pub fn take_invalidated(&mut self) -> Vec<Rect> {
        std::mem::take(&mut self.invalidated)
    }

    pub fn surface_changes(&self) -> usize {
        self.surface_changes
    }

    pub fn alerts(&self) -> &[(String, String)] {
        &self.alerts
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }
}

impl Toolkit for HeadlessToolkit {
    fn invalidate(&mut self, rect: Rect) {
        tracing::trace!(?rect, "invalidate");
        self.invalidated.push(rect);
    }

    fn resize_view(&mut self, width: u32, height: u32) {
        tracing::debug!(width, height, "resize view");
        self.view = (width, height);
    }

    fn surface_changed(&mut self, surface: &Arc<DisplaySurface>) {
        tracing::debug!(
            surface = surface.id().get(),
            format = ?surface.format(),
            "surface changed"
        );
        self.surface_changes += 1;
    }

    fn show_alert(&mut self, title: &str, message: &str) {
        tracing::error!(%title, %message, "alert");
        self.alerts.push((title.to_string(), message.to_string()));
    }

    fn set_pause_overlay(&mut self, paused: bool) {
        tracing::info!(paused, "pause overlay");
        self.paused = paused;
    }

    fn set_cursor_captured(&mut self, captured: bool) {
        tracing::debug!(captured, "cursor capture");
        self.captured = captured;
    }

    fn pump_native_events(&mut self) -> Vec<HostEvent> {
        self.pending.drain(..).collect()
    }

    fn unhandled_event(&mut self, event: &HostEvent) {
        tracing::trace!(?event, "event returned to host");
        self.unhandled.push(event.clone());
    }
}
