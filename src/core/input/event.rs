//=========================================================================
// Input Event Types
//
// Portable representation of the raw input routed to the top state.
//
// Responsibilities:
// - Represent keyboard and mouse inputs independently of the windowing
//   backend
// - Carry the typed character of a key press (text entry in message
//   boxes)
// - Support modifier key combinations (Shift, Ctrl, Alt)
//
// Event Flow:
// ```text
// Platform Layer (Winit)
//         ↓
//    InputEvent (this module)
//         ↓
//    StateManager::key_down / mouse_down / ...
//         ↓
//    top-of-stack GameState
// ```
//
//=========================================================================

//=== MouseButton =========================================================

/// Physical mouse button identifier.
///
/// The `Other` variant covers side buttons, macro buttons, and any
/// non-standard inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary button (typically left).
    Left,

    /// Secondary button (typically right).
    Right,

    /// Middle button (wheel click).
    Middle,

    /// Any other button.
    Other,
}

//=== KeyCode =============================================================

/// Physical keyboard key identifier.
///
/// Represents the physical key location, not the character produced.
/// The produced character travels separately in [`InputEvent::KeyDown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    //--- Numeric Keys -----------------------------------------------------

    /// Number row: 0-9
    Digit0, Digit1, Digit2, Digit3, Digit4,
    Digit5, Digit6, Digit7, Digit8, Digit9,

    //--- Alphabetic Keys --------------------------------------------------

    /// Letter keys: A-Z (physical location, not character)
    KeyA, KeyB, KeyC, KeyD, KeyE, KeyF, KeyG, KeyH, KeyI,
    KeyJ, KeyK, KeyL, KeyM, KeyN, KeyO, KeyP, KeyQ, KeyR,
    KeyS, KeyT, KeyU, KeyV, KeyW, KeyX, KeyY, KeyZ,

    //--- Arrow Keys -------------------------------------------------------

    ArrowDown,
    ArrowLeft,
    ArrowRight,
    ArrowUp,

    //--- Function Keys ----------------------------------------------------

    F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,

    //--- Special Keys -----------------------------------------------------

    Space,
    Enter,
    Escape,
    Tab,
    Backspace,
    Delete,

    /// Fallback for keys not explicitly mapped by the input layer.
    Unidentified,
}

impl KeyCode {
    /// Keys that activate the focused widget.
    pub fn is_confirm(self) -> bool {
        matches!(self, Self::Enter | Self::Space)
    }
}

//=== Modifiers ===========================================================

/// Modifier key state (Shift, Ctrl, Alt).
///
/// The system does not distinguish between left/right variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    /// Shift key held (either left or right).
    pub shift: bool,

    /// Ctrl key held (either left or right, Command on macOS).
    pub ctrl: bool,

    /// Alt key held (either left or right, Option on macOS).
    pub alt: bool,
}

impl Modifiers {
    /// No modifiers held.
    pub const NONE: Self = Self { shift: false, ctrl: false, alt: false };

    /// Shift only.
    pub const SHIFT: Self = Self { shift: true, ctrl: false, alt: false };

    /// Ctrl only.
    pub const CTRL: Self = Self { shift: false, ctrl: true, alt: false };

    /// Alt only.
    pub const ALT: Self = Self { shift: false, ctrl: false, alt: true };
}

//=== InputEvent ==========================================================

/// Low-level input event from the platform layer.
///
/// Only discrete events exist: cursor motion is not routed to states.
/// Consecutive identical events are coalesced by the platform buffer,
/// which relies on the derived equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InputEvent {
    /// Key pressed down, with the character it produced (if printable).
    KeyDown {
        key: KeyCode,
        modifiers: Modifiers,
        character: Option<char>,
    },

    /// Key released.
    KeyUp {
        key: KeyCode,
        modifiers: Modifiers,
    },

    /// Mouse button pressed.
    MouseButtonDown {
        button: MouseButton,
        modifiers: Modifiers,
    },

    /// Mouse button released.
    MouseButtonUp {
        button: MouseButton,
        modifiers: Modifiers,
    },

    /// Second press of the same button within the double-click window.
    ///
    /// Always emitted right after the matching `MouseButtonDown`.
    MouseDoubleClick {
        button: MouseButton,
        modifiers: Modifiers,
    },

    /// Unrecognized or unsupported event.
    Unidentified,
}

impl InputEvent {
    /// Shorthand for a key press without modifiers or text.
    pub fn key(key: KeyCode) -> Self {
        Self::KeyDown {
            key,
            modifiers: Modifiers::NONE,
            character: None,
        }
    }

    /// Shorthand for a printable key press.
    pub fn typed(key: KeyCode, character: char) -> Self {
        Self::KeyDown {
            key,
            modifiers: Modifiers::NONE,
            character: Some(character),
        }
    }

    /// Returns the modifiers carried by the event, if any.
    pub fn modifiers(&self) -> Option<Modifiers> {
        match self {
            Self::KeyDown { modifiers, .. }
            | Self::KeyUp { modifiers, .. }
            | Self::MouseButtonDown { modifiers, .. }
            | Self::MouseButtonUp { modifiers, .. }
            | Self::MouseDoubleClick { modifiers, .. } => Some(*modifiers),
            Self::Unidentified => None,
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
