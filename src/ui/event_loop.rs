use super::queue::{UiCommand, UiReceiver};
use super::toolkit::{HostPasteboard, Toolkit};
use crate::clipboard::{ClipboardFill, ClipboardType};
use crate::input::capture_hook::{platform_hook, CaptureHook};
use crate::input::HostEvent;
use crate::shim::DisplayShim;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

const QUEUE_POLL: Duration = Duration::from_millis(16);
const CLIPBOARD_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// The UI thread's loop: pumps native input, drains the work queue and
/// polls the host pasteboard.
pub struct UiLoop<T: Toolkit, P: HostPasteboard> {
    shim: Arc<DisplayShim>,
    rx: UiReceiver,
    toolkit: T,
    pasteboard: P,
    hook: Box<dyn CaptureHook>,
    hook_tx: Sender<HostEvent>,
    hook_rx: Receiver<HostEvent>,
    last_clipboard_poll: Option<Instant>,
}

impl<T: Toolkit, P: HostPasteboard> UiLoop<T, P> {
    pub fn new(shim: Arc<DisplayShim>, rx: UiReceiver, toolkit: T, pasteboard: P) -> Self {
        let (hook_tx, hook_rx) = channel();
        Self {
            shim,
            rx,
            toolkit,
            pasteboard,
            hook: platform_hook(),
            hook_tx,
            hook_rx,
            last_clipboard_poll: None,
        }
    }

    pub fn with_capture_hook(mut self, hook: Box<dyn CaptureHook>) -> Self {
        self.hook = hook;
        self
    }

    pub fn toolkit(&self) -> &T {
        &self.toolkit
    }

    pub fn toolkit_mut(&mut self) -> &mut T {
        &mut self.toolkit
    }

    pub fn pasteboard(&self) -> &P {
        &self.pasteboard
    }

    pub fn pasteboard_mut(&mut self) -> &mut P {
        &mut self.pasteboard
    }

    /// Run until a `Quit` command arrives or every queue sender is gone.
    pub fn run(&mut self) {
        self.rx.bind_current_thread();
        tracing::info!("UI loop running");
        self.shim.handshake().ui_loop_started();

        loop {
            let mut events = self.toolkit.pump_native_events();
            events.extend(self.hook_rx.try_iter());
            for event in events {
                self.dispatch_event(&event);
            }

            self.poll_host_clipboard();

            match self.rx.recv_timeout(QUEUE_POLL) {
                Ok(Some(command)) => {
                    if !self.execute(command) {
                        break;
                    }
                }
                Ok(None) => continue,
                Err(err) => {
                    tracing::debug!(?err, "UI queue closed");
                    break;
                }
            }
        }

        if self.hook.is_installed() {
            self.hook.uninstall();
        }
        tracing::info!("UI loop exited");
    }

    /// Returns false when the loop should stop.
    fn execute(&mut self, command: UiCommand) -> bool {
        match command {
            UiCommand::AdoptGeometry => {
                self.shim.handoff().adopt_geometry(&mut self.toolkit);
            }
            UiCommand::Redraw { surface, rect } => {
                self.shim
                    .dirty_regions()
                    .apply(surface, rect, &mut self.toolkit);
            }
            UiCommand::AdvertiseClipboard => self.advertise_clipboard(),
            UiCommand::ServeClipboardRequest { info, kind } => {
                self.shim
                    .clipboard()
                    .serve_request(&info, kind, &mut self.pasteboard);
            }
            UiCommand::SetPaused(paused) => self.toolkit.set_pause_overlay(paused),
            UiCommand::Alert { title, message } => self.toolkit.show_alert(&title, &message),
            UiCommand::Run(task) => task(&mut self.toolkit),
            UiCommand::Quit => return false,
        }
        true
    }

    fn dispatch_event(&mut self, event: &HostEvent) {
        let outcome = self.shim.handle(event);
        if let Some(capture) = outcome.capture {
            self.apply_capture(capture);
        }
        if !outcome.consumed {
            self.toolkit.unhandled_event(event);
        }
    }

    fn apply_capture(&mut self, captured: bool) {
        self.toolkit.set_cursor_captured(captured);
        if !self.shim.full_grab() {
            return;
        }
        if captured {
            if let Err(err) = self.hook.install(self.hook_tx.clone()) {
                tracing::warn!(?err, "global input capture unavailable, continuing without it");
            }
        } else {
            self.hook.uninstall();
        }
    }

    fn advertise_clipboard(&mut self) {
        let clipboard = self.shim.clipboard();
        clipboard.advertise(&mut self.pasteboard);
        if self.pasteboard.provides_lazily() {
            return;
        }
        match clipboard.provide_host_data(ClipboardType::Text) {
            ClipboardFill::Filled(bytes) => self.pasteboard.write_text(&bytes),
            ClipboardFill::Unavailable => {}
            ClipboardFill::Abandoned => tracing::trace!("guest clipboard replaced before fill"),
        }
    }

    fn poll_host_clipboard(&mut self) {
        let due = self
            .last_clipboard_poll
            .map_or(true, |at| at.elapsed() >= CLIPBOARD_POLL_INTERVAL);
        if !due {
            return;
        }
        self.last_clipboard_poll = Some(Instant::now());
        self.shim.clipboard().refresh_from_host(&mut self.pasteboard);
    }
}
