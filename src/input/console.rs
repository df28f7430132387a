use super::keycodes::GuestKey;

/// One keystroke for a text console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleKey {
    Char(char),
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Delete,
    Backspace,
    CtrlUp,
    CtrlDown,
    CtrlLeft,
    CtrlRight,
    CtrlHome,
    CtrlEnd,
    CtrlPageUp,
    CtrlPageDown,
}

fn plain(key: GuestKey) -> Option<ConsoleKey> {
    let mapped = match key {
        GuestKey::Up => ConsoleKey::Up,
        GuestKey::Down => ConsoleKey::Down,
        GuestKey::Left => ConsoleKey::Left,
        GuestKey::Right => ConsoleKey::Right,
        GuestKey::Home => ConsoleKey::Home,
        GuestKey::End => ConsoleKey::End,
        GuestKey::PgUp => ConsoleKey::PageUp,
        GuestKey::PgDn => ConsoleKey::PageDown,
        GuestKey::Delete => ConsoleKey::Delete,
        GuestKey::Backspace => ConsoleKey::Backspace,
        _ => return None,
    };
    Some(mapped)
}

fn with_control(key: GuestKey) -> Option<ConsoleKey> {
    let mapped = match key {
        GuestKey::Up => ConsoleKey::CtrlUp,
        GuestKey::Down => ConsoleKey::CtrlDown,
        GuestKey::Left => ConsoleKey::CtrlLeft,
        GuestKey::Right => ConsoleKey::CtrlRight,
        GuestKey::Home => ConsoleKey::CtrlHome,
        GuestKey::End => ConsoleKey::CtrlEnd,
        GuestKey::PgUp => ConsoleKey::CtrlPageUp,
        GuestKey::PgDn => ConsoleKey::CtrlPageDown,
        _ => return None,
    };
    Some(mapped)
}

/// Translate a key press for a text console. Navigation and editing keys
/// use the fixed tables; anything else sends the first composed character.
pub fn translate(key: Option<GuestKey>, control: bool, text: Option<&str>) -> Option<ConsoleKey> {
    let special = key.and_then(|key| if control { with_control(key) } else { plain(key) });
    special.or_else(|| text.and_then(|t| t.chars().next()).map(ConsoleKey::Char))
}
