use crate::clipboard::ClipboardType;
use crate::display::surface::DisplaySurface;
use crate::display::Rect;
use crate::input::HostEvent;
use anyhow::Result;
use std::sync::Arc;

/// Host toolkit operations. Every method runs on the UI thread.
pub trait Toolkit {
    /// Request a redraw of `rect`, in view coordinates.
    fn invalidate(&mut self, rect: Rect);
    fn resize_view(&mut self, width: u32, height: u32);
    /// A new surface became current. Texture backends rebind here.
    fn surface_changed(&mut self, surface: &Arc<DisplaySurface>);
    fn show_alert(&mut self, title: &str, message: &str);
    fn set_pause_overlay(&mut self, paused: bool);
    /// Hide the host cursor and confine it to the view while captured.
    fn set_cursor_captured(&mut self, captured: bool);
    /// Collect pending native input. Called once per loop iteration.
    fn pump_native_events(&mut self) -> Vec<HostEvent> {
        Vec::new()
    }
    /// An event the shim did not consume; the host handles it (menus,
    /// shortcuts).
    fn unhandled_event(&mut self, _event: &HostEvent) {}
}

/// The host's system pasteboard.
pub trait HostPasteboard {
    /// Counter bumped by the host whenever pasteboard ownership changes.
    fn change_count(&mut self) -> i64;
    fn has_text(&mut self) -> bool;
    fn read_text(&mut self) -> Option<Vec<u8>>;
    /// Claim the pasteboard on behalf of the guest, promising `types`.
    /// Returns the new change count.
    fn declare_guest_owned(&mut self, types: &[ClipboardType]) -> i64;
    fn write_text(&mut self, bytes: &[u8]);
    /// Whether the host pulls promised data on demand. When false the UI
    /// loop fills the pasteboard right after declaring ownership.
    fn provides_lazily(&self) -> bool {
        true
    }
}

impl<P: HostPasteboard + ?Sized> HostPasteboard for Box<P> {
    fn change_count(&mut self) -> i64 {
        (**self).change_count()
    }

    fn has_text(&mut self) -> bool {
        (**self).has_text()
    }

    fn read_text(&mut self) -> Option<Vec<u8>> {
        (**self).read_text()
    }

    fn declare_guest_owned(&mut self, types: &[ClipboardType]) -> i64 {
        (**self).declare_guest_owned(types)
    }

    fn write_text(&mut self, bytes: &[u8]) {
        (**self).write_text(bytes)
    }

    fn provides_lazily(&self) -> bool {
        (**self).provides_lazily()
    }
}

/// In-process pasteboard used by the headless binary and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryPasteboard {
    text: Option<String>,
    change_count: i64,
    promised: Vec<ClipboardType>,
}

impl MemoryPasteboard {
    pub fn with_text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            change_count: 1,
            promised: Vec::new(),
        }
    }

    /// Simulate another host application copying `text`.
    pub fn host_copy(&mut self, text: &str) {
        self.text = Some(text.to_string());
        self.promised.clear();
        self.change_count += 1;
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn promised(&self) -> &[ClipboardType] {
        &self.promised
    }
}

impl HostPasteboard for MemoryPasteboard {
    fn change_count(&mut self) -> i64 {
        self.change_count
    }

    fn has_text(&mut self) -> bool {
        self.text.is_some()
    }

    fn read_text(&mut self) -> Option<Vec<u8>> {
        self.text.as_ref().map(|t| t.as_bytes().to_vec())
    }

    fn declare_guest_owned(&mut self, types: &[ClipboardType]) -> i64 {
        self.text = None;
        self.promised = types.to_vec();
        self.change_count += 1;
        self.change_count
    }

    fn write_text(&mut self, bytes: &[u8]) {
        self.text = Some(String::from_utf8_lossy(bytes).into_owned());
    }
}

/// System clipboard through `arboard`.
///
/// `arboard` has no change counter and no lazy promises, so changes are
/// detected by comparing text and guest data is written eagerly.
pub struct ArboardPasteboard {
    clipboard: arboard::Clipboard,
    last_text: Option<String>,
    change_count: i64,
}

impl ArboardPasteboard {
    pub fn new() -> Result<Self> {
        let mut clipboard = arboard::Clipboard::new()?;
        let last_text = clipboard.get_text().ok();
        Ok(Self {
            clipboard,
            last_text,
            change_count: 0,
        })
    }

    fn current_text(&mut self) -> Option<String> {
        match self.clipboard.get_text() {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::trace!("clipboard read error: {e}");
                None
            }
        }
    }
}

impl HostPasteboard for ArboardPasteboard {
    fn change_count(&mut self) -> i64 {
        let text = self.current_text();
        if text != self.last_text {
            self.last_text = text;
            self.change_count += 1;
        }
        self.change_count
    }

    fn has_text(&mut self) -> bool {
        self.current_text().is_some_and(|t| !t.is_empty())
    }

    fn read_text(&mut self) -> Option<Vec<u8>> {
        self.current_text().map(String::into_bytes)
    }

    fn declare_guest_owned(&mut self, _types: &[ClipboardType]) -> i64 {
        self.last_text = self.current_text();
        self.change_count += 1;
        self.change_count
    }

    fn write_text(&mut self, bytes: &[u8]) {
        let text = String::from_utf8_lossy(bytes).into_owned();
        match self.clipboard.set_text(text.clone()) {
            Ok(()) => self.last_text = Some(text),
            Err(e) => tracing::error!("failed to write clipboard: {e}"),
        }
    }

    fn provides_lazily(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaring_guest_ownership_bumps_the_count() {
        let mut pasteboard = MemoryPasteboard::with_text("host");
        let before = pasteboard.change_count();
        let after = pasteboard.declare_guest_owned(&[ClipboardType::Text]);
        assert_eq!(after, before + 1);
        assert!(!pasteboard.has_text());
        assert_eq!(pasteboard.promised(), &[ClipboardType::Text]);
    }

    #[test]
    fn fulfilling_a_promise_keeps_the_count() {
        let mut pasteboard = MemoryPasteboard::default();
        let count = pasteboard.declare_guest_owned(&[ClipboardType::Text]);
        pasteboard.write_text(b"guest");
        assert_eq!(pasteboard.change_count(), count);
        assert_eq!(pasteboard.text(), Some("guest"));
    }
}
