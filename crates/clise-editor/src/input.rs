//! Input abstraction layer.
//!
//! Normalizes pointer, wheel and keyboard events from the host into a
//! unified `InputEvent` consumed by the interaction machine. Positions are
//! CSS pixels relative to the canvas' top-left corner.

use clise_core::Point;
use serde::{Deserialize, Serialize};

/// Keyboard modifier state captured with each event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ..Modifiers::NONE
    };

    pub const ALT: Modifiers = Modifiers {
        alt: true,
        ..Modifiers::NONE
    };

    /// Ctrl on Windows/Linux, ⌘ on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

impl PointerButton {
    /// Map a DOM `MouseEvent.button` value.
    pub fn from_dom(button: i16) -> Self {
        match button {
            1 => PointerButton::Middle,
            2 => PointerButton::Secondary,
            _ => PointerButton::Primary,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown {
        x: f64,
        y: f64,
        button: PointerButton,
        modifiers: Modifiers,
    },
    PointerMove {
        x: f64,
        y: f64,
        modifiers: Modifiers,
    },
    PointerUp {
        x: f64,
        y: f64,
        modifiers: Modifiers,
    },
    DoubleClick {
        x: f64,
        y: f64,
        modifiers: Modifiers,
    },
    /// Wheel or trackpad scroll. With ctrl/⌘ (or a pinch) it zooms at
    /// `(x, y)`; otherwise it pans.
    Wheel {
        x: f64,
        y: f64,
        dx: f64,
        dy: f64,
        modifiers: Modifiers,
    },
    /// `key` is the DOM `KeyboardEvent.key` value.
    KeyDown { key: String, modifiers: Modifiers },
    KeyUp { key: String, modifiers: Modifiers },
}

impl InputEvent {
    pub fn pointer_down(x: f64, y: f64, modifiers: Modifiers) -> Self {
        Self::PointerDown {
            x,
            y,
            button: PointerButton::Primary,
            modifiers,
        }
    }

    pub fn pointer_move(x: f64, y: f64, modifiers: Modifiers) -> Self {
        Self::PointerMove { x, y, modifiers }
    }

    pub fn pointer_up(x: f64, y: f64, modifiers: Modifiers) -> Self {
        Self::PointerUp { x, y, modifiers }
    }

    pub fn key_down(key: &str, modifiers: Modifiers) -> Self {
        Self::KeyDown {
            key: key.to_string(),
            modifiers,
        }
    }

    pub fn key_up(key: &str) -> Self {
        Self::KeyUp {
            key: key.to_string(),
            modifiers: Modifiers::NONE,
        }
    }

    /// Screen position if this is a pointer event.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. }
            | Self::DoubleClick { x, y, .. }
            | Self::Wheel { x, y, .. } => Some(Point::new(*x, *y)),
            Self::KeyDown { .. } | Self::KeyUp { .. } => None,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        match self {
            Self::PointerDown { modifiers, .. }
            | Self::PointerMove { modifiers, .. }
            | Self::PointerUp { modifiers, .. }
            | Self::DoubleClick { modifiers, .. }
            | Self::Wheel { modifiers, .. }
            | Self::KeyDown { modifiers, .. }
            | Self::KeyUp { modifiers, .. } => *modifiers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn position_only_for_pointer_events() {
        let down = InputEvent::pointer_down(3.0, 4.0, Modifiers::NONE);
        assert_eq!(down.position(), Some(Point::new(3.0, 4.0)));
        assert_eq!(InputEvent::key_up(" ").position(), None);
    }

    #[test]
    fn command_is_ctrl_or_meta() {
        assert!(!Modifiers::SHIFT.command());
        let meta = Modifiers {
            meta: true,
            ..Modifiers::NONE
        };
        assert!(meta.command());
    }

    #[test]
    fn dom_buttons() {
        assert_eq!(PointerButton::from_dom(0), PointerButton::Primary);
        assert_eq!(PointerButton::from_dom(1), PointerButton::Middle);
        assert_eq!(PointerButton::from_dom(2), PointerButton::Secondary);
    }
}
