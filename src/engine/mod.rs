//! The engine collaborator: the virtual machine's execution thread as seen
//! from the display shim.

pub mod lock;
pub mod recording;

use crate::clipboard::{ClipboardInfo, ClipboardType, PeerId};
use crate::input::console::ConsoleKey;
use crate::input::keycodes::GuestKey;
use std::sync::Arc;

pub use lock::{EngineLock, EngineLockScope};
pub use recording::{EngineCall, RecordingEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuestButton {
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
    Side,
    Extra,
}

/// Operations the shim invokes on the engine.
///
/// Every method is called with the engine lock held by the calling thread.
pub trait Engine: Send + Sync {
    fn submit_key_event(&self, key: GuestKey, down: bool);
    fn submit_pointer_absolute(&self, axis: Axis, value: i32, min: i32, max: i32);
    fn submit_pointer_relative(&self, axis: Axis, delta: i32);
    fn submit_button(&self, button: GuestButton, down: bool);
    fn sync_input_batch(&self);
    /// Deliver one key to the active text console.
    fn submit_console_key(&self, key: ConsoleKey);
    fn current_console_is_graphical(&self) -> bool;
    fn select_console(&self, index: usize);
    /// Whether the emulated pointing device takes absolute coordinates.
    fn pointer_is_absolute(&self) -> bool;
    /// A new clipboard owned by the host was created.
    fn clipboard_announce(&self, info: &Arc<ClipboardInfo>);
    /// Ask the owner of `info` to fill in data for `kind`.
    fn clipboard_request_data(&self, info: &Arc<ClipboardInfo>, kind: ClipboardType);
    /// Store `bytes` for `kind` on `info` on behalf of `peer` and notify
    /// clipboard listeners.
    fn clipboard_publish(
        &self,
        peer: PeerId,
        info: &Arc<ClipboardInfo>,
        kind: ClipboardType,
        bytes: Vec<u8>,
    );
    /// The host view changed size; the guest may want to follow it.
    fn notify_view_size(&self, _width: u32, _height: u32) {}
}
