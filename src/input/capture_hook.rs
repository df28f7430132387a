//! Global keyboard capture while the pointer is grabbed.
//!
//! With full grab enabled, host shortcuts (Command-Tab, the Windows key)
//! would otherwise be consumed by the host before the view sees them. The
//! hook swallows those keys system-wide and hands them to the UI loop as
//! ordinary [`HostEvent`]s.

use super::events::HostEvent;
use crate::error::ShimError;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub trait CaptureHook: Send {
    fn install(&mut self, sender: Sender<HostEvent>) -> Result<(), ShimError>;
    fn uninstall(&mut self);
    fn is_installed(&self) -> bool;
}

/// Platform hook for this build.
pub fn platform_hook() -> Box<dyn CaptureHook> {
    Box::new(platform::GrabHook::default())
}

#[cfg(all(target_os = "windows", feature = "unstable_grab"))]
mod platform {
    use super::CaptureHook;
    use crate::error::ShimError;
    use crate::input::events::{HostEvent, HostModifiers};
    use crate::input::keycodes::vk;
    use once_cell::sync::Lazy;
    use rdev::{grab, Event, EventType, Key};
    use std::cell::Cell;
    use std::sync::mpsc::Sender;
    use std::sync::Mutex;
    use std::thread;

    static CAPTURE_SENDER: Lazy<Mutex<Option<Sender<HostEvent>>>> = Lazy::new(|| Mutex::new(None));

    /// `rdev::grab` never returns, so the grab thread is started once and
    /// passes events through while no sender is installed.
    static GRAB_STARTED: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(false));

    fn host_code(key: Key) -> Option<u16> {
        let code = match key {
            Key::MetaLeft => vk::COMMAND,
            Key::MetaRight => vk::RIGHT_COMMAND,
            Key::Alt => vk::OPTION,
            Key::AltGr => vk::RIGHT_OPTION,
            Key::ControlLeft => vk::CONTROL,
            Key::ControlRight => vk::RIGHT_CONTROL,
            Key::ShiftLeft => vk::SHIFT,
            Key::ShiftRight => vk::RIGHT_SHIFT,
            Key::Tab => vk::TAB,
            Key::Escape => vk::ESCAPE,
            Key::Space => vk::SPACE,
            _ => return None,
        };
        Some(code)
    }

    fn modifier_flag(key: Key) -> Option<HostModifiers> {
        match key {
            Key::MetaLeft | Key::MetaRight => Some(HostModifiers::COMMAND),
            Key::Alt | Key::AltGr => Some(HostModifiers::OPTION),
            Key::ControlLeft | Key::ControlRight => Some(HostModifiers::CONTROL),
            Key::ShiftLeft | Key::ShiftRight => Some(HostModifiers::SHIFT),
            _ => None,
        }
    }

    thread_local! {
        static MODIFIERS: Cell<HostModifiers> = Cell::new(HostModifiers::empty());
    }

    fn forward(event: &Event) -> bool {
        let (key, down) = match event.event_type {
            EventType::KeyPress(k) => (k, true),
            EventType::KeyRelease(k) => (k, false),
            _ => return false,
        };
        let Some(keycode) = host_code(key) else {
            return false;
        };
        let Ok(guard) = CAPTURE_SENDER.lock() else {
            return false;
        };
        let Some(sender) = guard.as_ref() else {
            return false;
        };

        let modifiers = MODIFIERS.with(|cell| {
            let mut modifiers = cell.get();
            if let Some(flag) = modifier_flag(key) {
                modifiers.set(flag, down);
            }
            cell.set(modifiers);
            modifiers
        });
        let host_event = match (modifier_flag(key), down) {
            (Some(_), _) => HostEvent::FlagsChanged { keycode, modifiers },
            (None, true) => HostEvent::KeyDown {
                keycode,
                modifiers,
                text: None,
            },
            (None, false) => HostEvent::KeyUp { keycode, modifiers },
        };
        tracing::trace!(?host_event, "captured host key");
        sender.send(host_event).is_ok()
    }

    #[derive(Debug, Default)]
    pub struct GrabHook {
        installed: bool,
    }

    impl CaptureHook for GrabHook {
        fn install(&mut self, sender: Sender<HostEvent>) -> Result<(), ShimError> {
            let mut started = GRAB_STARTED
                .lock()
                .map_err(|_| ShimError::CaptureUnavailable("grab state lock poisoned".into()))?;
            if !*started {
                thread::Builder::new()
                    .name("capture-hook".to_string())
                    .spawn(|| {
                        let callback = |event: Event| -> Option<Event> {
                            if forward(&event) {
                                None
                            } else {
                                Some(event)
                            }
                        };
                        if let Err(e) = grab(callback) {
                            tracing::error!("failed to grab events: {:?}", e);
                        }
                    })
                    .map_err(|e| ShimError::CaptureUnavailable(e.to_string()))?;
                *started = true;
            }
            let mut slot = CAPTURE_SENDER
                .lock()
                .map_err(|_| ShimError::CaptureUnavailable("sender lock poisoned".into()))?;
            *slot = Some(sender);
            self.installed = true;
            Ok(())
        }

        fn uninstall(&mut self) {
            if let Ok(mut slot) = CAPTURE_SENDER.lock() {
                *slot = None;
            }
            self.installed = false;
        }

        fn is_installed(&self) -> bool {
            self.installed
        }
    }
}

#[cfg(not(all(target_os = "windows", feature = "unstable_grab")))]
mod platform {
    use super::CaptureHook;
    use crate::error::ShimError;
    use crate::input::events::HostEvent;
    use std::sync::mpsc::Sender;

    #[derive(Debug, Default)]
    pub struct GrabHook;

    impl CaptureHook for GrabHook {
        fn install(&mut self, _sender: Sender<HostEvent>) -> Result<(), ShimError> {
            Err(ShimError::CaptureUnavailable(
                "global capture is not supported in this build".into(),
            ))
        }

        fn uninstall(&mut self) {}

        fn is_installed(&self) -> bool {
            false
        }
    }
}

#[derive(Debug, Default)]
struct MockHookState {
    sender: Option<Sender<HostEvent>>,
    installs: usize,
    uninstalls: usize,
    fail: bool,
}

/// Hook that records install/uninstall and lets tests inject events.
///
/// Clones share state, so a test can keep one handle while the UI loop owns
/// another.
#[derive(Debug, Default, Clone)]
pub struct MockCaptureHook {
    state: Arc<Mutex<MockHookState>>,
}

impl MockCaptureHook {
    /// A hook whose installation always fails.
    pub fn failing() -> Self {
        let hook = Self::default();
        hook.lock().fail = true;
        hook
    }

    pub fn installs(&self) -> usize {
        self.lock().installs
    }

    pub fn uninstalls(&self) -> usize {
        self.lock().uninstalls
    }

    /// Deliver `event` as if the platform hook caught it. False when the
    /// hook is not installed.
    pub fn inject(&self, event: HostEvent) -> bool {
        self.lock()
            .sender
            .as_ref()
            .is_some_and(|sender| sender.send(event).is_ok())
    }

    fn lock(&self) -> MutexGuard<'_, MockHookState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CaptureHook for MockCaptureHook {
    fn install(&mut self, sender: Sender<HostEvent>) -> Result<(), ShimError> {
        let mut state = self.lock();
        if state.fail {
            return Err(ShimError::CaptureUnavailable("mock failure".into()));
        }
        if state.sender.is_none() {
            state.installs += 1;
        }
        state.sender = Some(sender);
        Ok(())
    }

    fn uninstall(&mut self) {
        let mut state = self.lock();
        if state.sender.take().is_some() {
            state.uninstalls += 1;
        }
    }

    fn is_installed(&self) -> bool {
        self.lock().sender.is_some()
    }
}
