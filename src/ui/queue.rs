//! FIFO work queue drained by the UI loop.
//!
//! Any thread may post commands. `post` never blocks; `dispatch_sync` runs a
//! closure on the UI thread and waits for its result over a reply channel.

use crate::clipboard::{ClipboardInfo, ClipboardType};
use crate::display::{Rect, SurfaceId};
use crate::error::ShimError;
use crate::ui::toolkit::Toolkit;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

pub type UiTask = Box<dyn FnOnce(&mut dyn Toolkit) + Send>;

pub enum UiCommand {
    /// Re-read the current surface and apply its geometry.
    AdoptGeometry,
    /// Invalidate `rect` if `surface` is still current.
    Redraw { surface: SurfaceId, rect: Rect },
    /// The guest owns the clipboard; declare it on the host pasteboard.
    AdvertiseClipboard,
    /// The guest asked for host clipboard data.
    ServeClipboardRequest {
        info: Arc<ClipboardInfo>,
        kind: ClipboardType,
    },
    /// Guest run state changed; show or hide the pause overlay.
    SetPaused(bool),
    Alert { title: String, message: String },
    Run(UiTask),
    Quit,
}

impl fmt::Debug for UiCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UiCommand::AdoptGeometry => f.write_str("AdoptGeometry"),
            UiCommand::Redraw { surface, rect } => f
                .debug_struct("Redraw")
                .field("surface", surface)
                .field("rect", rect)
                .finish(),
            UiCommand::AdvertiseClipboard => f.write_str("AdvertiseClipboard"),
            UiCommand::ServeClipboardRequest { kind, .. } => f
                .debug_struct("ServeClipboardRequest")
                .field("kind", kind)
                .finish_non_exhaustive(),
            UiCommand::SetPaused(paused) => f.debug_tuple("SetPaused").field(paused).finish(),
            UiCommand::Alert { title, .. } => f
                .debug_struct("Alert")
                .field("title", title)
                .finish_non_exhaustive(),
            UiCommand::Run(_) => f.write_str("Run(..)"),
            UiCommand::Quit => f.write_str("Quit"),
        }
    }
}

/// Sending half of the UI work queue.
#[derive(Clone)]
pub struct UiQueue {
    tx: Sender<UiCommand>,
    ui_thread: Arc<OnceCell<ThreadId>>,
}

/// Receiving half, owned by the UI loop.
pub struct UiReceiver {
    rx: Receiver<UiCommand>,
    ui_thread: Arc<OnceCell<ThreadId>>,
}

pub fn ui_queue() -> (UiQueue, UiReceiver) {
    let (tx, rx) = channel();
    let ui_thread = Arc::new(OnceCell::new());
    (
        UiQueue {
            tx,
            ui_thread: Arc::clone(&ui_thread),
        },
        UiReceiver { rx, ui_thread },
    )
}

impl UiQueue {
    /// Fire and forget. A closed queue means the UI loop has exited, in
    /// which case the command is dropped.
    pub fn post(&self, command: UiCommand) {
        if let Err(err) = self.tx.send(command) {
            tracing::debug!(command = ?err.0, "UI queue closed, dropping command");
        }
    }

    pub fn is_ui_thread(&self) -> bool {
        self.ui_thread.get() == Some(&thread::current().id())
    }

    /// Run `task` on the UI thread and wait for its result.
    pub fn dispatch_sync<R, F>(&self, task: F) -> Result<R, ShimError>
    where
        R: Send + 'static,
        F: FnOnce(&mut dyn Toolkit) -> R + Send + 'static,
    {
        if self.is_ui_thread() {
            return Err(ShimError::DispatchOnUiThread);
        }
        let (reply_tx, reply_rx) = channel();
        self.tx
            .send(UiCommand::Run(Box::new(move |toolkit| {
                let _ = reply_tx.send(task(toolkit));
            })))
            .map_err(|_| ShimError::QueueClosed)?;
        reply_rx.recv().map_err(|_| ShimError::QueueClosed)
    }
}

impl UiReceiver {
    /// Record the calling thread as the UI thread. Only the first call takes
    /// effect.
    pub fn bind_current_thread(&self) {
        let id = thread::current().id();
        if self.ui_thread.set(id).is_err() && self.ui_thread.get() != Some(&id) {
            tracing::warn!("UI queue already bound to another thread");
        }
    }

    pub fn try_recv(&self) -> Option<UiCommand> {
        self.rx.try_recv().ok()
    }

    /// `Ok(None)` on timeout, `Err` once every sender is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<UiCommand>, ShimError> {
        match self.rx.recv_timeout(timeout) {
            Ok(command) => Ok(Some(command)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(ShimError::QueueClosed),
        }
    }
}
