//! Pointer and keyboard input consumed by the selection manager.

use super::SelectionDelta;

/// Modifier keys held during a click or key press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    /// Control key held
    pub ctrl: bool,
    /// Command/Windows key held
    pub meta: bool,
    /// Shift key held
    pub shift: bool,
    /// Alt key held
    pub alt: bool,
}

impl Modifiers {
    /// No modifiers
    pub const NONE: Self = Self {
        ctrl: false,
        meta: false,
        shift: false,
        alt: false,
    };

    /// Control only
    pub const CTRL: Self = Self { ctrl: true, ..Self::NONE };

    /// Command only
    pub const META: Self = Self { meta: true, ..Self::NONE };

    /// Shift only
    pub const SHIFT: Self = Self { shift: true, ..Self::NONE };

    /// Check if any modifier is active
    pub fn any(&self) -> bool {
        self.ctrl || self.meta || self.shift || self.alt
    }

    /// Ctrl or Cmd, the platform toggle/command modifier.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Keys the selection manager reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Character key
    Char(char),
    /// Escape
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Enter,
    Tab,
    Space,
}

impl Key {
    /// The navigation this key requests, if any.
    pub fn navigation(&self) -> Option<NavigationKey> {
        match self {
            Key::Up => Some(NavigationKey::Up),
            Key::Down => Some(NavigationKey::Down),
            Key::Left => Some(NavigationKey::Left),
            Key::Right => Some(NavigationKey::Right),
            Key::Home => Some(NavigationKey::Home),
            Key::End => Some(NavigationKey::End),
            Key::PageUp => Some(NavigationKey::PageUp),
            Key::PageDown => Some(NavigationKey::PageDown),
            _ => None,
        }
    }
}

/// A key press with its modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// Key press without modifiers
    pub const fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    /// Key press with modifiers
    pub const fn with_modifiers(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// Ctrl+A or Cmd+A.
    pub fn is_select_all(&self) -> bool {
        self.modifiers.command() && matches!(self.key, Key::Char('a') | Key::Char('A'))
    }
}

/// Directional movement the host applies to its own grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationKey {
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
}

/// What a key press did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Escape cleared the selection.
    Cleared(SelectionDelta),
    /// Ctrl/Cmd+A selected everything the mode allows.
    SelectedAll(SelectionDelta),
    /// A navigation key; moving the focus is up to the host.
    Navigate(NavigationKey),
    /// The key has no selection meaning in the current mode.
    Ignored,
}

/// Row order and cell grid current at the time of a key press.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyContext<'a> {
    /// Visible row ids in display order.
    pub row_ids: &'a [String],
    /// Visible cell ids, one inner vec per row.
    pub grid: &'a [Vec<String>],
}
