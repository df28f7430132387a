pub mod capture_hook;
pub mod console;
pub mod events;
pub mod keycodes;
pub mod reconciler;

pub use capture_hook::{CaptureHook, MockCaptureHook};
pub use console::ConsoleKey;
pub use events::{HostButton, HostEvent, HostModifiers, KeyStateSet, ModifierSnapshot};
pub use keycodes::{GuestKey, Keymap};
pub use reconciler::{EventOutcome, InputReconciler};
