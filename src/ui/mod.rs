//! Everything that runs on the UI thread.

pub mod event_loop;
pub mod headless;
pub mod queue;
pub mod toolkit;

pub use event_loop::UiLoop;
pub use headless::HeadlessToolkit;
pub use queue::{ui_queue, UiCommand, UiQueue, UiReceiver};
pub use toolkit::{ArboardPasteboard, HostPasteboard, MemoryPasteboard, Toolkit};
