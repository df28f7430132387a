use super::keycodes::GuestKey;
use bitflags::bitflags;

bitflags! {
    /// Modifier flags attached to every host input event.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct HostModifiers: u8 {
        const SHIFT = 1 << 0;
        const CONTROL = 1 << 1;
        const OPTION = 1 << 2;
        const COMMAND = 1 << 3;
        const CAPS_LOCK = 1 << 4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostButton {
    Left,
    Right,
    Middle,
    Side,
    Extra,
}

/// Input as delivered by the host toolkit. Coordinates are view pixels
/// with the origin at the top left.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A modifier key went down or up.
    FlagsChanged { keycode: u16, modifiers: HostModifiers },
    KeyDown {
        keycode: u16,
        modifiers: HostModifiers,
        /// Composed characters, used by text consoles.
        text: Option<String>,
    },
    KeyUp { keycode: u16, modifiers: HostModifiers },
    ScrollWheel { delta_y: f64, modifiers: HostModifiers },
    MouseMoved {
        x: f64,
        y: f64,
        dx: f64,
        dy: f64,
        modifiers: HostModifiers,
    },
    MouseButton {
        button: HostButton,
        down: bool,
        x: f64,
        y: f64,
        modifiers: HostModifiers,
    },
    PointerEntered,
    PointerExited,
    FocusChanged(bool),
}

impl HostEvent {
    pub fn modifiers(&self) -> Option<HostModifiers> {
        match self {
            HostEvent::FlagsChanged { modifiers, .. }
            | HostEvent::KeyDown { modifiers, .. }
            | HostEvent::KeyUp { modifiers, .. }
            | HostEvent::ScrollWheel { modifiers, .. }
            | HostEvent::MouseMoved { modifiers, .. }
            | HostEvent::MouseButton { modifiers, .. } => Some(*modifiers),
            HostEvent::PointerEntered | HostEvent::PointerExited | HostEvent::FocusChanged(_) => {
                None
            }
        }
    }
}

/// Down/up state for every guest key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyStateSet {
    bits: [u64; 4],
}

impl KeyStateSet {
    pub fn is_down(&self, key: GuestKey) -> bool {
        let i = key.index();
        self.bits[i / 64] & (1 << (i % 64)) != 0
    }

    pub fn set(&mut self, key: GuestKey, down: bool) {
        let i = key.index();
        if down {
            self.bits[i / 64] |= 1 << (i % 64);
        } else {
            self.bits[i / 64] &= !(1 << (i % 64));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|w| *w == 0)
    }

    pub fn count(&self) -> u32 {
        self.bits.iter().map(|w| w.count_ones()).sum()
    }
}

/// Guest-side modifier view tracked by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModifierSnapshot {
    pub shift: bool,
    pub control: bool,
    pub option: bool,
    pub command: bool,
    pub capslock: bool,
    pub keys: KeyStateSet,
}
