//! Guest key codes and the host-to-guest key table.
//!
//! Host codes are the raw virtual key codes reported by the host toolkit.
//! The default table covers the Macintosh virtual key set; other hosts
//! supply their own through `Settings::keymap_overrides`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Keys of the emulated keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum GuestKey {
    Shift,
    ShiftR,
    Alt,
    AltR,
    Ctrl,
    CtrlR,
    MetaL,
    MetaR,
    CapsLock,
    NumLock,
    ScrollLock,
    Esc,
    Num1,
    Num2,
    Num3,
    Num4,
    Num5,
    Num6,
    Num7,
    Num8,
    Num9,
    Num0,
    Minus,
    Equal,
    Backspace,
    Tab,
    Q,
    W,
    E,
    R,
    T,
    Y,
    U,
    I,
    O,
    P,
    BracketLeft,
    BracketRight,
    Ret,
    A,
    S,
    D,
    F,
    G,
    H,
    J,
    K,
    L,
    Semicolon,
    Apostrophe,
    GraveAccent,
    Backslash,
    Z,
    X,
    C,
    V,
    B,
    N,
    M,
    Comma,
    Dot,
    Slash,
    Spc,
    Less,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Print,
    Pause,
    Insert,
    Delete,
    Home,
    End,
    PgUp,
    PgDn,
    Up,
    Down,
    Left,
    Right,
    Kp0,
    Kp1,
    Kp2,
    Kp3,
    Kp4,
    Kp5,
    Kp6,
    Kp7,
    Kp8,
    Kp9,
    KpDecimal,
    KpAdd,
    KpSubtract,
    KpMultiply,
    KpDivide,
    KpEnter,
    KpEquals,
    KpComma,
    Menu,
    Ro,
    Yen,
    Henkan,
    Hiragana,
    AudioMute,
    VolumeUp,
    VolumeDown,
}

impl GuestKey {
    pub const COUNT: usize = GuestKey::VolumeDown as usize + 1;

    /// Every key, in discriminant order.
    pub const ALL: [GuestKey; GuestKey::COUNT] = [
        GuestKey::Shift,
        GuestKey::ShiftR,
        GuestKey::Alt,
        GuestKey::AltR,
        GuestKey::Ctrl,
        GuestKey::CtrlR,
        GuestKey::MetaL,
        GuestKey::MetaR,
        GuestKey::CapsLock,
        GuestKey::NumLock,
        GuestKey::ScrollLock,
        GuestKey::Esc,
        GuestKey::Num1,
        GuestKey::Num2,
        GuestKey::Num3,
        GuestKey::Num4,
        GuestKey::Num5,
        GuestKey::Num6,
        GuestKey::Num7,
        GuestKey::Num8,
        GuestKey::Num9,
        GuestKey::Num0,
        GuestKey::Minus,
        GuestKey::Equal,
        GuestKey::Backspace,
        GuestKey::Tab,
        GuestKey::Q,
        GuestKey::W,
        GuestKey::E,
        GuestKey::R,
        GuestKey::T,
        GuestKey::Y,
        GuestKey::U,
        GuestKey::I,
        GuestKey::O,
        GuestKey::P,
        GuestKey::BracketLeft,
        GuestKey::BracketRight,
        GuestKey::Ret,
        GuestKey::A,
        GuestKey::S,
        GuestKey::D,
        GuestKey::F,
        GuestKey::G,
        GuestKey::H,
        GuestKey::J,
        GuestKey::K,
        GuestKey::L,
        GuestKey::Semicolon,
        GuestKey::Apostrophe,
        GuestKey::GraveAccent,
        GuestKey::Backslash,
        GuestKey::Z,
        GuestKey::X,
        GuestKey::C,
        GuestKey::V,
        GuestKey::B,
        GuestKey::N,
        GuestKey::M,
        GuestKey::Comma,
        GuestKey::Dot,
        GuestKey::Slash,
        GuestKey::Spc,
        GuestKey::Less,
        GuestKey::F1,
        GuestKey::F2,
        GuestKey::F3,
        GuestKey::F4,
        GuestKey::F5,
        GuestKey::F6,
        GuestKey::F7,
        GuestKey::F8,
        GuestKey::F9,
        GuestKey::F10,
        GuestKey::F11,
        GuestKey::F12,
        GuestKey::Print,
        GuestKey::Pause,
        GuestKey::Insert,
        GuestKey::Delete,
        GuestKey::Home,
        GuestKey::End,
        GuestKey::PgUp,
        GuestKey::PgDn,
        GuestKey::Up,
        GuestKey::Down,
        GuestKey::Left,
        GuestKey::Right,
        GuestKey::Kp0,
        GuestKey::Kp1,
        GuestKey::Kp2,
        GuestKey::Kp3,
        GuestKey::Kp4,
        GuestKey::Kp5,
        GuestKey::Kp6,
        GuestKey::Kp7,
        GuestKey::Kp8,
        GuestKey::Kp9,
        GuestKey::KpDecimal,
        GuestKey::KpAdd,
        GuestKey::KpSubtract,
        GuestKey::KpMultiply,
        GuestKey::KpDivide,
        GuestKey::KpEnter,
        GuestKey::KpEquals,
        GuestKey::KpComma,
        GuestKey::Menu,
        GuestKey::Ro,
        GuestKey::Yen,
        GuestKey::Henkan,
        GuestKey::Hiragana,
        GuestKey::AudioMute,
        GuestKey::VolumeUp,
        GuestKey::VolumeDown,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// The console index selected by this key under Control+Option, for
    /// the digit keys 1 to 9.
    pub fn console_index(self) -> Option<usize> {
        let index = match self {
            GuestKey::Num1 => 0,
            GuestKey::Num2 => 1,
            GuestKey::Num3 => 2,
            GuestKey::Num4 => 3,
            GuestKey::Num5 => 4,
            GuestKey::Num6 => 5,
            GuestKey::Num7 => 6,
            GuestKey::Num8 => 7,
            GuestKey::Num9 => 8,
            _ => return None,
        };
        Some(index)
    }
}

/// Macintosh virtual key codes.
pub mod vk {
    pub const ANSI_A: u16 = 0x00;
    pub const ANSI_S: u16 = 0x01;
    pub const ANSI_D: u16 = 0x02;
    pub const ANSI_F: u16 = 0x03;
    pub const ANSI_H: u16 = 0x04;
    pub const ANSI_G: u16 = 0x05;
    pub const ANSI_Z: u16 = 0x06;
    pub const ANSI_X: u16 = 0x07;
    pub const ANSI_C: u16 = 0x08;
    pub const ANSI_V: u16 = 0x09;
    pub const ISO_SECTION: u16 = 0x0A;
    pub const ANSI_B: u16 = 0x0B;
    pub const ANSI_Q: u16 = 0x0C;
    pub const ANSI_W: u16 = 0x0D;
    pub const ANSI_E: u16 = 0x0E;
    pub const ANSI_R: u16 = 0x0F;
    pub const ANSI_Y: u16 = 0x10;
    pub const ANSI_T: u16 = 0x11;
    pub const ANSI_1: u16 = 0x12;
    pub const ANSI_2: u16 = 0x13;
    pub const ANSI_3: u16 = 0x14;
    pub const ANSI_4: u16 = 0x15;
    pub const ANSI_6: u16 = 0x16;
    pub const ANSI_5: u16 = 0x17;
    pub const ANSI_EQUAL: u16 = 0x18;
    pub const ANSI_9: u16 = 0x19;
    pub const ANSI_7: u16 = 0x1A;
    pub const ANSI_MINUS: u16 = 0x1B;
    pub const ANSI_8: u16 = 0x1C;
    pub const ANSI_0: u16 = 0x1D;
    pub const ANSI_RIGHT_BRACKET: u16 = 0x1E;
    pub const ANSI_O: u16 = 0x1F;
    pub const ANSI_U: u16 = 0x20;
    pub const ANSI_LEFT_BRACKET: u16 = 0x21;
    pub const ANSI_I: u16 = 0x22;
    pub const ANSI_P: u16 = 0x23;
    pub const RETURN: u16 = 0x24;
    pub const ANSI_L: u16 = 0x25;
    pub const ANSI_J: u16 = 0x26;
    pub const ANSI_QUOTE: u16 = 0x27;
    pub const ANSI_K: u16 = 0x28;
    pub const ANSI_SEMICOLON: u16 = 0x29;
    pub const ANSI_BACKSLASH: u16 = 0x2A;
    pub const ANSI_COMMA: u16 = 0x2B;
    pub const ANSI_SLASH: u16 = 0x2C;
    pub const ANSI_N: u16 = 0x2D;
    pub const ANSI_M: u16 = 0x2E;
    pub const ANSI_PERIOD: u16 = 0x2F;
    pub const TAB: u16 = 0x30;
    pub const SPACE: u16 = 0x31;
    pub const ANSI_GRAVE: u16 = 0x32;
    pub const DELETE: u16 = 0x33;
    pub const ESCAPE: u16 = 0x35;
    pub const RIGHT_COMMAND: u16 = 0x36;
    pub const COMMAND: u16 = 0x37;
    pub const SHIFT: u16 = 0x38;
    pub const CAPS_LOCK: u16 = 0x39;
    pub const OPTION: u16 = 0x3A;
    pub const CONTROL: u16 = 0x3B;
    pub const RIGHT_SHIFT: u16 = 0x3C;
    pub const RIGHT_OPTION: u16 = 0x3D;
    pub const RIGHT_CONTROL: u16 = 0x3E;
    pub const KEYPAD_DECIMAL: u16 = 0x41;
    pub const KEYPAD_MULTIPLY: u16 = 0x43;
    pub const KEYPAD_PLUS: u16 = 0x45;
    pub const KEYPAD_CLEAR: u16 = 0x47;
    pub const VOLUME_UP: u16 = 0x48;
    pub const VOLUME_DOWN: u16 = 0x49;
    pub const MUTE: u16 = 0x4A;
    pub const KEYPAD_DIVIDE: u16 = 0x4B;
    pub const KEYPAD_ENTER: u16 = 0x4C;
    pub const KEYPAD_MINUS: u16 = 0x4E;
    pub const KEYPAD_EQUALS: u16 = 0x51;
    pub const KEYPAD_0: u16 = 0x52;
    pub const KEYPAD_1: u16 = 0x53;
    pub const KEYPAD_2: u16 = 0x54;
    pub const KEYPAD_3: u16 = 0x55;
    pub const KEYPAD_4: u16 = 0x56;
    pub const KEYPAD_5: u16 = 0x57;
    pub const KEYPAD_6: u16 = 0x58;
    pub const KEYPAD_7: u16 = 0x59;
    pub const KEYPAD_8: u16 = 0x5B;
    pub const KEYPAD_9: u16 = 0x5C;
    pub const JIS_YEN: u16 = 0x5D;
    pub const JIS_UNDERSCORE: u16 = 0x5E;
    pub const JIS_KEYPAD_COMMA: u16 = 0x5F;
    pub const F5: u16 = 0x60;
    pub const F6: u16 = 0x61;
    pub const F7: u16 = 0x62;
    pub const F3: u16 = 0x63;
    pub const F8: u16 = 0x64;
    pub const F9: u16 = 0x65;
    pub const JIS_EISU: u16 = 0x66;
    pub const F11: u16 = 0x67;
    pub const JIS_KANA: u16 = 0x68;
    pub const F13: u16 = 0x69;
    pub const F14: u16 = 0x6B;
    pub const F10: u16 = 0x6D;
    pub const CONTEXTUAL_MENU: u16 = 0x6E;
    pub const F12: u16 = 0x6F;
    pub const F15: u16 = 0x71;
    pub const HELP: u16 = 0x72;
    pub const HOME: u16 = 0x73;
    pub const PAGE_UP: u16 = 0x74;
    pub const FORWARD_DELETE: u16 = 0x75;
    pub const F4: u16 = 0x76;
    pub const END: u16 = 0x77;
    pub const F2: u16 = 0x78;
    pub const PAGE_DOWN: u16 = 0x79;
    pub const F1: u16 = 0x7A;
    pub const LEFT_ARROW: u16 = 0x7B;
    pub const RIGHT_ARROW: u16 = 0x7C;
    pub const DOWN_ARROW: u16 = 0x7D;
    pub const UP_ARROW: u16 = 0x7E;
}

const DEFAULT_TABLE: &[(u16, GuestKey)] = &[
    (vk::ANSI_A, GuestKey::A),
    (vk::ANSI_B, GuestKey::B),
    (vk::ANSI_C, GuestKey::C),
    (vk::ANSI_D, GuestKey::D),
    (vk::ANSI_E, GuestKey::E),
    (vk::ANSI_F, GuestKey::F),
    (vk::ANSI_G, GuestKey::G),
    (vk::ANSI_H, GuestKey::H),
    (vk::ANSI_I, GuestKey::I),
    (vk::ANSI_J, GuestKey::J),
    (vk::ANSI_K, GuestKey::K),
    (vk::ANSI_L, GuestKey::L),
    (vk::ANSI_M, GuestKey::M),
    (vk::ANSI_N, GuestKey::N),
    (vk::ANSI_O, GuestKey::O),
    (vk::ANSI_P, GuestKey::P),
    (vk::ANSI_Q, GuestKey::Q),
    (vk::ANSI_R, GuestKey::R),
    (vk::ANSI_S, GuestKey::S),
    (vk::ANSI_T, GuestKey::T),
    (vk::ANSI_U, GuestKey::U),
    (vk::ANSI_V, GuestKey::V),
    (vk::ANSI_W, GuestKey::W),
    (vk::ANSI_X, GuestKey::X),
    (vk::ANSI_Y, GuestKey::Y),
    (vk::ANSI_Z, GuestKey::Z),
    (vk::ANSI_0, GuestKey::Num0),
    (vk::ANSI_1, GuestKey::Num1),
    (vk::ANSI_2, GuestKey::Num2),
    (vk::ANSI_3, GuestKey::Num3),
    (vk::ANSI_4, GuestKey::Num4),
    (vk::ANSI_5, GuestKey::Num5),
    (vk::ANSI_6, GuestKey::Num6),
    (vk::ANSI_7, GuestKey::Num7),
    (vk::ANSI_8, GuestKey::Num8),
    (vk::ANSI_9, GuestKey::Num9),
    (vk::ANSI_GRAVE, GuestKey::GraveAccent),
    (vk::ANSI_MINUS, GuestKey::Minus),
    (vk::ANSI_EQUAL, GuestKey::Equal),
    (vk::DELETE, GuestKey::Backspace),
    (vk::TAB, GuestKey::Tab),
    (vk::ANSI_LEFT_BRACKET, GuestKey::BracketLeft),
    (vk::ANSI_RIGHT_BRACKET, GuestKey::BracketRight),
    (vk::ANSI_BACKSLASH, GuestKey::Backslash),
    (vk::ANSI_SEMICOLON, GuestKey::Semicolon),
    (vk::ANSI_QUOTE, GuestKey::Apostrophe),
    (vk::RETURN, GuestKey::Ret),
    (vk::ANSI_COMMA, GuestKey::Comma),
    (vk::ANSI_PERIOD, GuestKey::Dot),
    (vk::ANSI_SLASH, GuestKey::Slash),
    (vk::SPACE, GuestKey::Spc),
    (vk::ISO_SECTION, GuestKey::Less),
    (vk::ESCAPE, GuestKey::Esc),
    (vk::SHIFT, GuestKey::Shift),
    (vk::RIGHT_SHIFT, GuestKey::ShiftR),
    (vk::CONTROL, GuestKey::Ctrl),
    (vk::RIGHT_CONTROL, GuestKey::CtrlR),
    (vk::OPTION, GuestKey::Alt),
    (vk::RIGHT_OPTION, GuestKey::AltR),
    (vk::COMMAND, GuestKey::MetaL),
    (vk::RIGHT_COMMAND, GuestKey::MetaR),
    (vk::CAPS_LOCK, GuestKey::CapsLock),
    (vk::KEYPAD_CLEAR, GuestKey::NumLock),
    (vk::F1, GuestKey::F1),
    (vk::F2, GuestKey::F2),
    (vk::F3, GuestKey::F3),
    (vk::F4, GuestKey::F4),
    (vk::F5, GuestKey::F5),
    (vk::F6, GuestKey::F6),
    (vk::F7, GuestKey::F7),
    (vk::F8, GuestKey::F8),
    (vk::F9, GuestKey::F9),
    (vk::F10, GuestKey::F10),
    (vk::F11, GuestKey::F11),
    (vk::F12, GuestKey::F12),
    (vk::F13, GuestKey::Print),
    (vk::F14, GuestKey::ScrollLock),
    (vk::F15, GuestKey::Pause),
    (vk::HELP, GuestKey::Insert),
    (vk::FORWARD_DELETE, GuestKey::Delete),
    (vk::HOME, GuestKey::Home),
    (vk::END, GuestKey::End),
    (vk::PAGE_UP, GuestKey::PgUp),
    (vk::PAGE_DOWN, GuestKey::PgDn),
    (vk::UP_ARROW, GuestKey::Up),
    (vk::DOWN_ARROW, GuestKey::Down),
    (vk::LEFT_ARROW, GuestKey::Left),
    (vk::RIGHT_ARROW, GuestKey::Right),
    (vk::KEYPAD_0, GuestKey::Kp0),
    (vk::KEYPAD_1, GuestKey::Kp1),
    (vk::KEYPAD_2, GuestKey::Kp2),
    (vk::KEYPAD_3, GuestKey::Kp3),
    (vk::KEYPAD_4, GuestKey::Kp4),
    (vk::KEYPAD_5, GuestKey::Kp5),
    (vk::KEYPAD_6, GuestKey::Kp6),
    (vk::KEYPAD_7, GuestKey::Kp7),
    (vk::KEYPAD_8, GuestKey::Kp8),
    (vk::KEYPAD_9, GuestKey::Kp9),
    (vk::KEYPAD_DECIMAL, GuestKey::KpDecimal),
    (vk::KEYPAD_PLUS, GuestKey::KpAdd),
    (vk::KEYPAD_MINUS, GuestKey::KpSubtract),
    (vk::KEYPAD_MULTIPLY, GuestKey::KpMultiply),
    (vk::KEYPAD_DIVIDE, GuestKey::KpDivide),
    (vk::KEYPAD_ENTER, GuestKey::KpEnter),
    (vk::KEYPAD_EQUALS, GuestKey::KpEquals),
    (vk::JIS_KEYPAD_COMMA, GuestKey::KpComma),
    (vk::CONTEXTUAL_MENU, GuestKey::Menu),
    (vk::JIS_UNDERSCORE, GuestKey::Ro),
    (vk::JIS_YEN, GuestKey::Yen),
    (vk::JIS_EISU, GuestKey::Henkan),
    (vk::JIS_KANA, GuestKey::Hiragana),
    (vk::MUTE, GuestKey::AudioMute),
    (vk::VOLUME_UP, GuestKey::VolumeUp),
    (vk::VOLUME_DOWN, GuestKey::VolumeDown),
];

const TABLE_SIZE: usize = 256;

/// Host key code to guest key lookup.
#[derive(Debug, Clone)]
pub struct Keymap {
    table: Vec<Option<GuestKey>>,
}

impl Default for Keymap {
    fn default() -> Self {
        let mut table = vec![None; TABLE_SIZE];
        for (host, guest) in DEFAULT_TABLE {
            table[usize::from(*host)] = Some(*guest);
        }
        Self { table }
    }
}

impl Keymap {
    /// Default table with `overrides` applied on top. Codes outside the
    /// table are ignored.
    pub fn with_overrides(overrides: &HashMap<u16, GuestKey>) -> Self {
        let mut keymap = Self::default();
        for (host, guest) in overrides {
            match keymap.table.get_mut(usize::from(*host)) {
                Some(slot) => *slot = Some(*guest),
                None => tracing::warn!(host_code = host, "key override out of range"),
            }
        }
        keymap
    }

    pub fn translate(&self, host_code: u16) -> Option<GuestKey> {
        self.table.get(usize::from(host_code)).copied().flatten()
    }
}
