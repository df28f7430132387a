//! Host input to guest input.
//!
//! Hosts do not deliver key-up events to inactive windows, so the tracked
//! guest modifier state drifts whenever focus moves away mid-press. Every
//! event that carries modifier flags first reconciles the guest state with
//! those flags before the event itself is handled.

use super::console;
use super::events::{HostButton, HostEvent, HostModifiers, KeyStateSet, ModifierSnapshot};
use super::keycodes::{GuestKey, Keymap};
use crate::engine::{Axis, Engine, GuestButton};
use crate::settings::Settings;

/// Result of handling one host event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventOutcome {
    /// False hands the event back to the host (menus, shortcuts).
    pub consumed: bool,
    /// Pointer capture changed; the UI shell applies it.
    pub capture: Option<bool>,
}

impl EventOutcome {
    fn consumed() -> Self {
        Self {
            consumed: true,
            capture: None,
        }
    }

    fn unhandled() -> Self {
        Self::default()
    }

    fn with_capture(mut self, capture: Option<bool>) -> Self {
        if capture.is_some() {
            self.capture = capture;
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Concept {
    Shift,
    Control,
    Option,
    Command,
}

pub struct InputReconciler {
    keymap: Keymap,
    keys: KeyStateSet,
    capslock: bool,
    swap_option_command: bool,
    left_command_key: bool,
    grabbed: bool,
    focused: bool,
    buttons: u8,
    view: (u32, u32),
    guest: (u32, u32),
}

impl InputReconciler {
    pub fn new(keymap: Keymap, swap_option_command: bool, left_command_key: bool) -> Self {
        Self {
            keymap,
            keys: KeyStateSet::default(),
            capslock: false,
            swap_option_command,
            left_command_key,
            grabbed: false,
            focused: true,
            buttons: 0,
            view: (0, 0),
            guest: (0, 0),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Keymap::with_overrides(&settings.keymap_overrides),
            settings.swap_option_command,
            settings.left_command_key,
        )
    }

    pub fn is_grabbed(&self) -> bool {
        self.grabbed
    }

    pub fn set_swap_option_command(&mut self, swap: bool) {
        self.swap_option_command = swap;
    }

    /// View size and guest display size used to scale absolute pointer
    /// coordinates.
    pub fn set_pointer_mapping(&mut self, view: (u32, u32), guest: (u32, u32)) {
        self.view = view;
        self.guest = guest;
    }

    pub fn snapshot(&self) -> ModifierSnapshot {
        let any = |keys: [GuestKey; 2]| keys.iter().any(|k| self.keys.is_down(*k));
        ModifierSnapshot {
            shift: any(self.concept_keys(Concept::Shift)),
            control: any(self.concept_keys(Concept::Control)),
            option: any(self.concept_keys(Concept::Option)),
            command: any(self.concept_keys(Concept::Command)),
            capslock: self.capslock,
            keys: self.keys,
        }
    }

    /// Handle one host event. The engine lock must be held.
    pub fn handle(&mut self, engine: &dyn Engine, event: &HostEvent) -> EventOutcome {
        if let Some(modifiers) = event.modifiers() {
            self.repair(engine, modifiers);
        }

        match event {
            HostEvent::FlagsChanged { keycode, modifiers } => {
                self.flags_changed(engine, *keycode, *modifiers);
                EventOutcome::consumed()
            }
            HostEvent::KeyDown {
                keycode,
                modifiers,
                text,
            } => self.key_down(engine, *keycode, *modifiers, text.as_deref()),
            HostEvent::KeyUp { keycode, modifiers } => self.key_up(engine, *keycode, *modifiers),
            HostEvent::ScrollWheel { delta_y, .. } => {
                self.scroll(engine, *delta_y);
                EventOutcome::consumed()
            }
            HostEvent::MouseMoved { x, y, dx, dy, .. } => {
                if !self.grabbed {
                    return EventOutcome::unhandled();
                }
                self.queue_pointer(engine, *x, *y, *dx, *dy);
                engine.sync_input_batch();
                EventOutcome::consumed()
            }
            HostEvent::MouseButton {
                button,
                down,
                x,
                y,
                ..
            } => self.mouse_button(engine, *button, *down, *x, *y),
            HostEvent::PointerEntered => {
                let capture = if engine.pointer_is_absolute() && !self.grabbed && self.focused {
                    self.grab()
                } else {
                    None
                };
                EventOutcome::consumed().with_capture(capture)
            }
            HostEvent::PointerExited => {
                let capture = if engine.pointer_is_absolute() && self.grabbed {
                    self.ungrab()
                } else {
                    None
                };
                EventOutcome::consumed().with_capture(capture)
            }
            HostEvent::FocusChanged(focused) => {
                self.focused = *focused;
                if *focused {
                    return EventOutcome::consumed();
                }
                self.lift_all_keys(engine);
                EventOutcome::consumed().with_capture(self.ungrab())
            }
        }
    }

    /// Release pointer capture. Returns the capture change, if any.
    pub fn ungrab(&mut self) -> Option<bool> {
        if !self.grabbed {
            return None;
        }
        self.grabbed = false;
        tracing::debug!("pointer released");
        Some(false)
    }

    pub fn grab(&mut self) -> Option<bool> {
        if self.grabbed {
            return None;
        }
        self.grabbed = true;
        tracing::debug!("pointer captured");
        Some(true)
    }

    /// Send key-up for every guest key that is down.
    pub fn lift_all_keys(&mut self, engine: &dyn Engine) {
        if self.keys.is_empty() {
            return;
        }
        for key in GuestKey::ALL {
            if self.keys.is_down(key) {
                self.key_event(engine, key, false);
            }
        }
    }

    fn concept_keys(&self, concept: Concept) -> [GuestKey; 2] {
        match (concept, self.swap_option_command) {
            (Concept::Shift, _) => [GuestKey::Shift, GuestKey::ShiftR],
            (Concept::Control, _) => [GuestKey::Ctrl, GuestKey::CtrlR],
            (Concept::Option, false) | (Concept::Command, true) => [GuestKey::Alt, GuestKey::AltR],
            (Concept::Command, false) | (Concept::Option, true) => {
                [GuestKey::MetaL, GuestKey::MetaR]
            }
        }
    }

    fn repair(&mut self, engine: &dyn Engine, modifiers: HostModifiers) {
        if modifiers.contains(HostModifiers::CAPS_LOCK) != self.capslock {
            self.key_event(engine, GuestKey::CapsLock, true);
            self.key_event(engine, GuestKey::CapsLock, false);
        }
        let concepts = [
            (HostModifiers::SHIFT, Concept::Shift),
            (HostModifiers::CONTROL, Concept::Control),
            (HostModifiers::OPTION, Concept::Option),
            (HostModifiers::COMMAND, Concept::Command),
        ];
        for (flag, concept) in concepts {
            if !modifiers.contains(flag) {
                for key in self.concept_keys(concept) {
                    self.key_event(engine, key, false);
                }
            }
        }
    }

    /// Forward a key transition unless it would repeat the tracked state.
    fn key_event(&mut self, engine: &dyn Engine, key: GuestKey, down: bool) -> bool {
        if self.keys.is_down(key) == down {
            return false;
        }
        self.keys.set(key, down);
        if key == GuestKey::CapsLock && down {
            self.capslock = !self.capslock;
        }
        engine.submit_key_event(key, down);
        true
    }

    fn toggle(&mut self, engine: &dyn Engine, key: GuestKey) {
        let down = !self.keys.is_down(key);
        self.key_event(engine, key, down);
    }

    fn swapped(&self, key: GuestKey) -> GuestKey {
        if !self.swap_option_command {
            return key;
        }
        match key {
            GuestKey::Alt => GuestKey::MetaL,
            GuestKey::AltR => GuestKey::MetaR,
            GuestKey::MetaL => GuestKey::Alt,
            GuestKey::MetaR => GuestKey::AltR,
            other => other,
        }
    }

    fn guest_key(&self, keycode: u16) -> Option<GuestKey> {
        self.keymap.translate(keycode).map(|key| self.swapped(key))
    }

    fn flags_changed(&mut self, engine: &dyn Engine, keycode: u16, modifiers: HostModifiers) {
        let Some(host_key) = self.keymap.translate(keycode) else {
            tracing::trace!(keycode, "unmapped modifier key");
            return;
        };
        let required = match host_key {
            GuestKey::Shift | GuestKey::ShiftR => HostModifiers::SHIFT,
            GuestKey::Ctrl | GuestKey::CtrlR => HostModifiers::CONTROL,
            GuestKey::Alt | GuestKey::AltR => HostModifiers::OPTION,
            GuestKey::MetaL | GuestKey::MetaR => {
                if !self.grabbed || (host_key == GuestKey::MetaL && !self.left_command_key) {
                    return;
                }
                HostModifiers::COMMAND
            }
            // Caps lock is reconciled from the flags alone.
            _ => return,
        };
        if modifiers.contains(required) {
            self.toggle(engine, self.swapped(host_key));
        }
    }

    fn key_down(
        &mut self,
        engine: &dyn Engine,
        keycode: u16,
        modifiers: HostModifiers,
        text: Option<&str>,
    ) -> EventOutcome {
        if !self.grabbed && modifiers.contains(HostModifiers::COMMAND) {
            return EventOutcome::unhandled();
        }
        let key = self.guest_key(keycode);

        if modifiers.contains(HostModifiers::CONTROL | HostModifiers::OPTION) {
            match key {
                Some(GuestKey::G) => {
                    return EventOutcome::consumed().with_capture(self.ungrab());
                }
                Some(digit) => {
                    if let Some(index) = digit.console_index() {
                        tracing::debug!(index, "selecting console");
                        engine.select_console(index);
                        return EventOutcome::consumed();
                    }
                }
                None => {}
            }
        }

        if engine.current_console_is_graphical() {
            match key {
                Some(key) => {
                    self.key_event(engine, key, true);
                }
                None => tracing::trace!(keycode, "unmapped key"),
            }
        } else if let Some(console_key) =
            console::translate(key, modifiers.contains(HostModifiers::CONTROL), text)
        {
            engine.submit_console_key(console_key);
        }
        EventOutcome::consumed()
    }

    fn key_up(&mut self, engine: &dyn Engine, keycode: u16, modifiers: HostModifiers) -> EventOutcome {
        // The matching key-down went to the host.
        if !self.grabbed && modifiers.contains(HostModifiers::COMMAND) {
            return EventOutcome::consumed();
        }
        if engine.current_console_is_graphical() {
            if let Some(key) = self.guest_key(keycode) {
                self.key_event(engine, key, false);
            }
        }
        EventOutcome::consumed()
    }

    fn scroll(&mut self, engine: &dyn Engine, delta_y: f64) {
        if delta_y == 0.0 {
            return;
        }
        let button = if delta_y > 0.0 {
            GuestButton::WheelUp
        } else {
            GuestButton::WheelDown
        };
        engine.submit_button(button, true);
        engine.sync_input_batch();
        engine.submit_button(button, false);
        engine.sync_input_batch();
    }

    fn mouse_button(
        &mut self,
        engine: &dyn Engine,
        button: HostButton,
        down: bool,
        x: f64,
        y: f64,
    ) -> EventOutcome {
        if !self.grabbed {
            if button == HostButton::Left && !down && self.focused {
                return EventOutcome::consumed().with_capture(self.grab());
            }
            return EventOutcome::unhandled();
        }

        let (guest_button, bit) = match button {
            HostButton::Left => (GuestButton::Left, 1 << 0),
            HostButton::Right => (GuestButton::Right, 1 << 1),
            HostButton::Middle => (GuestButton::Middle, 1 << 2),
            HostButton::Side => (GuestButton::Side, 1 << 3),
            HostButton::Extra => (GuestButton::Extra, 1 << 4),
        };
        if (self.buttons & bit != 0) != down {
            if down {
                self.buttons |= bit;
            } else {
                self.buttons &= !bit;
            }
            engine.submit_button(guest_button, down);
        }
        self.queue_pointer(engine, x, y, 0.0, 0.0);
        engine.sync_input_batch();
        EventOutcome::consumed()
    }

    fn queue_pointer(&self, engine: &dyn Engine, x: f64, y: f64, dx: f64, dy: f64) {
        if engine.pointer_is_absolute() {
            let (view_w, view_h) = self.view;
            let (guest_w, guest_h) = self.guest;
            let scale = |value: f64, from: u32, to: u32| -> i32 {
                if from == 0 {
                    return 0;
                }
                let scaled = value * f64::from(to) / f64::from(from);
                scaled.clamp(0.0, f64::from(to)) as i32
            };
            let max_x = i32::try_from(guest_w).unwrap_or(i32::MAX);
            let max_y = i32::try_from(guest_h).unwrap_or(i32::MAX);
            engine.submit_pointer_absolute(Axis::X, scale(x, view_w, guest_w), 0, max_x);
            engine.submit_pointer_absolute(Axis::Y, scale(y, view_h, guest_h), 0, max_y);
        } else if dx != 0.0 || dy != 0.0 {
            engine.submit_pointer_relative(Axis::X, dx as i32);
            engine.submit_pointer_relative(Axis::Y, dy as i32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineCall, RecordingEngine};
    use crate::input::keycodes::vk;

    fn reconciler() -> InputReconciler {
        InputReconciler::new(Keymap::default(), false, true)
    }

    fn key_calls(engine: &RecordingEngine) -> Vec<(GuestKey, bool)> {
        engine
            .take_calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::Key { key, down } => Some((key, down)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn capslock_drift_is_repaired_with_one_toggle() {
        let engine = RecordingEngine::default();
        let mut input = reconciler();
        let flags = HostEvent::FlagsChanged {
            keycode: vk::CAPS_LOCK,
            modifiers: HostModifiers::CAPS_LOCK,
        };

        input.handle(&engine, &flags);
        assert_eq!(
            key_calls(&engine),
            vec![(GuestKey::CapsLock, true), (GuestKey::CapsLock, false)]
        );
        assert!(input.snapshot().capslock);

        input.handle(&engine, &flags);
        assert!(key_calls(&engine).is_empty());
    }

    #[test]
    fn modifier_flag_absent_releases_both_sides() {
        let engine = RecordingEngine::default();
        let mut input = reconciler();
        input.handle(
            &engine,
            &HostEvent::FlagsChanged {
                keycode: vk::RIGHT_SHIFT,
                modifiers: HostModifiers::SHIFT,
            },
        );
        assert_eq!(key_calls(&engine), vec![(GuestKey::ShiftR, true)]);

        input.handle(
            &engine,
            &HostEvent::KeyDown {
                keycode: vk::ANSI_A,
                modifiers: HostModifiers::empty(),
                text: Some("a".into()),
            },
        );
        assert_eq!(
            key_calls(&engine),
            vec![(GuestKey::ShiftR, false), (GuestKey::A, true)]
        );
    }

    #[test]
    fn command_toggles_only_while_grabbed() {
        let engine = RecordingEngine::default();
        let mut input = reconciler();
        let command = HostEvent::FlagsChanged {
            keycode: vk::COMMAND,
            modifiers: HostModifiers::COMMAND,
        };
        input.handle(&engine, &command);
        assert!(key_calls(&engine).is_empty());

        input.grab();
        input.handle(&engine, &command);
        assert_eq!(key_calls(&engine), vec![(GuestKey::MetaL, true)]);
    }

    #[test]
    fn swapped_option_becomes_meta() {
        let engine = RecordingEngine::default();
        let mut input = InputReconciler::new(Keymap::default(), true, true);
        input.handle(
            &engine,
            &HostEvent::FlagsChanged {
                keycode: vk::OPTION,
                modifiers: HostModifiers::OPTION,
            },
        );
        assert_eq!(key_calls(&engine), vec![(GuestKey::MetaL, true)]);
        assert!(input.snapshot().option);
    }

    #[test]
    fn command_shortcut_goes_to_host_when_not_grabbed() {
        let engine = RecordingEngine::default();
        let mut input = reconciler();
        let outcome = input.handle(
            &engine,
            &HostEvent::KeyDown {
                keycode: vk::ANSI_Q,
                modifiers: HostModifiers::COMMAND,
                text: Some("q".into()),
            },
        );
        assert!(!outcome.consumed);
        let outcome = input.handle(
            &engine,
            &HostEvent::KeyUp {
                keycode: vk::ANSI_Q,
                modifiers: HostModifiers::COMMAND,
            },
        );
        assert!(outcome.consumed);
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn control_option_g_releases_the_pointer() {
        let engine = RecordingEngine::default();
        let mut input = reconciler();
        input.grab();
        let mods = HostModifiers::CONTROL | HostModifiers::OPTION;
        input.handle(
            &engine,
            &HostEvent::FlagsChanged {
                keycode: vk::CONTROL,
                modifiers: HostModifiers::CONTROL,
            },
        );
        input.handle(
            &engine,
            &HostEvent::FlagsChanged {
                keycode: vk::OPTION,
                modifiers: mods,
            },
        );
        engine.take_calls();

        let outcome = input.handle(
            &engine,
            &HostEvent::KeyDown {
                keycode: vk::ANSI_G,
                modifiers: mods,
                text: None,
            },
        );
        assert_eq!(outcome.capture, Some(false));
        assert!(!input.is_grabbed());
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn text_console_receives_translated_keys() {
        let engine = RecordingEngine::default();
        engine.set_graphical(false);
        let mut input = reconciler();
        input.handle(
            &engine,
            &HostEvent::KeyDown {
                keycode: vk::UP_ARROW,
                modifiers: HostModifiers::CONTROL,
                text: None,
            },
        );
        input.handle(
            &engine,
            &HostEvent::KeyDown {
                keycode: vk::ANSI_X,
                modifiers: HostModifiers::empty(),
                text: Some("x".into()),
            },
        );
        assert_eq!(
            engine.take_calls(),
            vec![
                EngineCall::ConsoleKey(console::ConsoleKey::CtrlUp),
                EngineCall::ConsoleKey(console::ConsoleKey::Char('x')),
            ]
        );
    }

    #[test]
    fn relative_motion_only_while_grabbed() {
        let engine = RecordingEngine::default();
        let mut input = reconciler();
        let motion = HostEvent::MouseMoved {
            x: 10.0,
            y: 10.0,
            dx: 3.0,
            dy: -2.0,
            modifiers: HostModifiers::empty(),
        };
        assert!(!input.handle(&engine, &motion).consumed);

        input.grab();
        assert!(input.handle(&engine, &motion).consumed);
        assert_eq!(
            engine.take_calls(),
            vec![
                EngineCall::PointerRelative { axis: Axis::X, delta: 3 },
                EngineCall::PointerRelative { axis: Axis::Y, delta: -2 },
                EngineCall::Sync,
            ]
        );
    }

    #[test]
    fn absolute_motion_is_scaled_to_the_guest() {
        let engine = RecordingEngine::default();
        engine.set_pointer_absolute(true);
        let mut input = reconciler();
        input.set_pointer_mapping((1280, 960), (640, 480));
        input.handle(&engine, &HostEvent::PointerEntered);
        input.handle(
            &engine,
            &HostEvent::MouseMoved {
                x: 200.0,
                y: 100.0,
                dx: 0.0,
                dy: 0.0,
                modifiers: HostModifiers::empty(),
            },
        );
        assert_eq!(
            engine.take_calls(),
            vec![
                EngineCall::PointerAbsolute { axis: Axis::X, value: 100, min: 0, max: 640 },
                EngineCall::PointerAbsolute { axis: Axis::Y, value: 50, min: 0, max: 480 },
                EngineCall::Sync,
            ]
        );

        let outcome = input.handle(&engine, &HostEvent::PointerExited);
        assert_eq!(outcome.capture, Some(false));
    }

    #[test]
    fn left_release_captures_the_pointer() {
        let engine = RecordingEngine::default();
        let mut input = reconciler();
        let press = |down| HostEvent::MouseButton {
            button: HostButton::Left,
            down,
            x: 5.0,
            y: 5.0,
            modifiers: HostModifiers::empty(),
        };
        assert!(!input.handle(&engine, &press(true)).consumed);
        let outcome = input.handle(&engine, &press(false));
        assert_eq!(outcome.capture, Some(true));
        assert!(engine.calls().is_empty());

        input.handle(&engine, &press(true));
        input.handle(&engine, &press(true));
        let buttons: Vec<_> = engine
            .take_calls()
            .into_iter()
            .filter(|c| matches!(c, EngineCall::Button { .. }))
            .collect();
        assert_eq!(
            buttons,
            vec![EngineCall::Button { button: GuestButton::Left, down: true }]
        );
    }
}
