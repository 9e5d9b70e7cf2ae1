//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. The map lives
//! in Rust so every host (wasm, native, tests) shares it.
//!
//! - Tab toggles between the two most recent tools
//! - Space held turns any drag into a pan (handled by the interaction machine)
//! - Shift on arrows nudges by 10 instead of 1

use crate::input::Modifiers;
use crate::tools::ToolKind;

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShortcutAction {
    // ── Tool switching ──
    Tool(ToolKind),
    ToggleLastTool,

    // ── Edit ──
    Undo,
    Redo,
    Delete,
    SelectAll,
    Duplicate,
    Copy,
    Cut,
    Paste,
    Group,
    Ungroup,
    Nudge { dx: f64, dy: f64 },

    // ── View ──
    ZoomIn,
    ZoomOut,
    ZoomToFit,
    ZoomReset,
    NextIsland,
    PreviousIsland,

    // ── Z-order ──
    SendBackward,
    BringForward,
    SendToBack,
    BringToFront,

    Deselect,
}

/// Resolves key events into shortcut actions.
///
/// On macOS `meta` is ⌘; elsewhere `ctrl` plays the same role.
pub struct ShortcutMap;

impl ShortcutMap {
    /// `key` is the `KeyboardEvent.key` value (e.g. `"z"`, `"Delete"`).
    /// Returns `None` if the combo has no binding.
    pub fn resolve(key: &str, modifiers: Modifiers) -> Option<ShortcutAction> {
        let cmd = modifiers.command();
        let shift = modifiers.shift;

        if let Some(action) = Self::nudge(key, shift) {
            return Some(action);
        }

        // ── Modifier combos first (most specific) ──
        if cmd && shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                "g" | "G" => Some(ShortcutAction::Ungroup),
                "[" | "{" => Some(ShortcutAction::SendToBack),
                "]" | "}" => Some(ShortcutAction::BringToFront),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                "a" | "A" => Some(ShortcutAction::SelectAll),
                "d" | "D" => Some(ShortcutAction::Duplicate),
                "c" | "C" => Some(ShortcutAction::Copy),
                "x" | "X" => Some(ShortcutAction::Cut),
                "v" | "V" => Some(ShortcutAction::Paste),
                "g" | "G" => Some(ShortcutAction::Group),
                "=" | "+" => Some(ShortcutAction::ZoomIn),
                "-" => Some(ShortcutAction::ZoomOut),
                "0" => Some(ShortcutAction::ZoomReset),
                "1" => Some(ShortcutAction::ZoomToFit),
                "[" => Some(ShortcutAction::SendBackward),
                "]" => Some(ShortcutAction::BringForward),
                _ => None,
            };
        }

        if shift {
            return match key {
                "!" | "1" => Some(ShortcutAction::ZoomToFit),
                _ => None,
            };
        }

        // ── Single keys (no modifiers) ──
        let tool = match key {
            "v" | "V" => ToolKind::Select,
            "h" | "H" => ToolKind::Hand,
            "r" | "R" => ToolKind::Rect,
            "o" | "O" => ToolKind::Ellipse,
            "f" | "F" => ToolKind::Frame,
            "l" | "L" => ToolKind::Line,
            "p" | "P" => ToolKind::Path,
            "t" | "T" => ToolKind::Text,
            "Tab" => return Some(ShortcutAction::ToggleLastTool),
            "Delete" | "Backspace" => return Some(ShortcutAction::Delete),
            "Escape" => return Some(ShortcutAction::Deselect),
            "." => return Some(ShortcutAction::NextIsland),
            "," => return Some(ShortcutAction::PreviousIsland),
            _ => return None,
        };
        Some(ShortcutAction::Tool(tool))
    }

    fn nudge(key: &str, shift: bool) -> Option<ShortcutAction> {
        let step = if shift { 10.0 } else { 1.0 };
        let (dx, dy) = match key {
            "ArrowLeft" => (-step, 0.0),
            "ArrowRight" => (step, 0.0),
            "ArrowUp" => (0.0, -step),
            "ArrowDown" => (0.0, step),
            _ => return None,
        };
        Some(ShortcutAction::Nudge { dx, dy })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CMD: Modifiers = Modifiers {
        meta: true,
        ..Modifiers::NONE
    };
    const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };
    const CMD_SHIFT: Modifiers = Modifiers {
        meta: true,
        shift: true,
        ..Modifiers::NONE
    };

    #[test]
    fn resolve_tool_shortcuts() {
        assert_eq!(
            ShortcutMap::resolve("v", Modifiers::NONE),
            Some(ShortcutAction::Tool(ToolKind::Select))
        );
        assert_eq!(
            ShortcutMap::resolve("R", Modifiers::NONE),
            Some(ShortcutAction::Tool(ToolKind::Rect))
        );
        assert_eq!(
            ShortcutMap::resolve("p", Modifiers::NONE),
            Some(ShortcutAction::Tool(ToolKind::Path))
        );
        assert_eq!(
            ShortcutMap::resolve("Tab", Modifiers::NONE),
            Some(ShortcutAction::ToggleLastTool)
        );
    }

    #[test]
    fn resolve_undo_redo() {
        assert_eq!(ShortcutMap::resolve("z", CMD), Some(ShortcutAction::Undo));
        assert_eq!(ShortcutMap::resolve("z", CTRL), Some(ShortcutAction::Undo));
        assert_eq!(ShortcutMap::resolve("Z", CMD_SHIFT), Some(ShortcutAction::Redo));
        assert_eq!(ShortcutMap::resolve("y", CTRL), Some(ShortcutAction::Redo));
    }

    #[test]
    fn resolve_grouping() {
        assert_eq!(ShortcutMap::resolve("g", CMD), Some(ShortcutAction::Group));
        assert_eq!(ShortcutMap::resolve("G", CMD_SHIFT), Some(ShortcutAction::Ungroup));
    }

    #[test]
    fn resolve_z_order() {
        assert_eq!(ShortcutMap::resolve("[", CMD), Some(ShortcutAction::SendBackward));
        assert_eq!(ShortcutMap::resolve("]", CMD), Some(ShortcutAction::BringForward));
        assert_eq!(ShortcutMap::resolve("[", CMD_SHIFT), Some(ShortcutAction::SendToBack));
        assert_eq!(ShortcutMap::resolve("]", CMD_SHIFT), Some(ShortcutAction::BringToFront));
    }

    #[test]
    fn resolve_nudges() {
        assert_eq!(
            ShortcutMap::resolve("ArrowLeft", Modifiers::NONE),
            Some(ShortcutAction::Nudge { dx: -1.0, dy: 0.0 })
        );
        assert_eq!(
            ShortcutMap::resolve("ArrowDown", Modifiers::SHIFT),
            Some(ShortcutAction::Nudge { dx: 0.0, dy: 10.0 })
        );
    }

    #[test]
    fn resolve_view() {
        assert_eq!(ShortcutMap::resolve("=", CMD), Some(ShortcutAction::ZoomIn));
        assert_eq!(ShortcutMap::resolve("-", CMD), Some(ShortcutAction::ZoomOut));
        assert_eq!(ShortcutMap::resolve("0", CMD), Some(ShortcutAction::ZoomReset));
        assert_eq!(
            ShortcutMap::resolve("!", Modifiers::SHIFT),
            Some(ShortcutAction::ZoomToFit)
        );
        assert_eq!(
            ShortcutMap::resolve(".", Modifiers::NONE),
            Some(ShortcutAction::NextIsland)
        );
    }

    #[test]
    fn resolve_unknown_key() {
        assert_eq!(ShortcutMap::resolve("q", Modifiers::NONE), None);
        assert_eq!(ShortcutMap::resolve("z", Modifiers::NONE), None);
        assert_eq!(ShortcutMap::resolve("q", CMD), None);
    }
}
