use super::{Axis, Engine, GuestButton};
use crate::clipboard::{ClipboardInfo, ClipboardType, PeerId};
use crate::input::console::ConsoleKey;
use crate::input::keycodes::GuestKey;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Key { key: GuestKey, down: bool },
    PointerAbsolute { axis: Axis, value: i32, min: i32, max: i32 },
    PointerRelative { axis: Axis, delta: i32 },
    Button { button: GuestButton, down: bool },
    Sync,
    ConsoleKey(ConsoleKey),
    SelectConsole(usize),
    ClipboardAnnounce { peer: PeerId },
    ClipboardRequest { kind: ClipboardType },
    ClipboardPublish { peer: PeerId, kind: ClipboardType, len: usize },
    ViewSize { width: u32, height: u32 },
}

/// Engine stand-in that records every call and logs it at `trace`.
///
/// Used by the headless binary and by tests.
#[derive(Debug)]
pub struct RecordingEngine {
    calls: Mutex<Vec<EngineCall>>,
    graphical: AtomicBool,
    absolute: AtomicBool,
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            graphical: AtomicBool::new(true),
            absolute: AtomicBool::new(false),
        }
    }
}

impl RecordingEngine {
    pub fn set_graphical(&self, graphical: bool) {
        self.graphical.store(graphical, Ordering::SeqCst);
    }

    pub fn set_pointer_absolute(&self, absolute: bool) {
        self.absolute.store(absolute, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn take_calls(&self) -> Vec<EngineCall> {
        std::mem::take(&mut *self.calls.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn record(&self, call: EngineCall) {
        tracing::trace!(?call, "engine call");
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl Engine for RecordingEngine {
    fn submit_key_event(&self, key: GuestKey, down: bool) {
        self.record(EngineCall::Key { key, down });
    }

    fn submit_pointer_absolute(&self, axis: Axis, value: i32, min: i32, max: i32) {
        self.record(EngineCall::PointerAbsolute {
            axis,
            value,
            min,
            max,
        });
    }

    fn submit_pointer_relative(&self, axis: Axis, delta: i32) {
        self.record(EngineCall::PointerRelative { axis, delta });
    }

    fn submit_button(&self, button: GuestButton, down: bool) {
        self.record(EngineCall::Button { button, down });
    }

    fn sync_input_batch(&self) {
        self.record(EngineCall::Sync);
    }

    fn submit_console_key(&self, key: ConsoleKey) {
        self.record(EngineCall::ConsoleKey(key));
    }

    fn current_console_is_graphical(&self) -> bool {
        self.graphical.load(Ordering::SeqCst)
    }

    fn select_console(&self, index: usize) {
        self.record(EngineCall::SelectConsole(index));
    }

    fn pointer_is_absolute(&self) -> bool {
        self.absolute.load(Ordering::SeqCst)
    }

    fn clipboard_announce(&self, info: &Arc<ClipboardInfo>) {
        self.record(EngineCall::ClipboardAnnounce { peer: info.owner() });
    }

    fn clipboard_request_data(&self, _info: &Arc<ClipboardInfo>, kind: ClipboardType) {
        self.record(EngineCall::ClipboardRequest { kind });
    }

    fn clipboard_publish(
        &self,
        peer: PeerId,
        info: &Arc<ClipboardInfo>,
        kind: ClipboardType,
        bytes: Vec<u8>,
    ) {
        self.record(EngineCall::ClipboardPublish {
            peer,
            kind,
            len: bytes.len(),
        });
        info.set_data(kind, bytes);
    }

    fn notify_view_size(&self, width: u32, height: u32) {
        self.record(EngineCall::ViewSize { width, height });
    }
}
