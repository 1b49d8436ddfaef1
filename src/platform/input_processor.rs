//=========================================================================
// Input Processor
//=========================================================================
//
// Converts Winit events into engine `InputEvent`s.
//
// Architecture:
//   Winit Events → InputProcessor → InputEvent → InputBuffer
//
// Stateful parts: the modifier state from ModifiersChanged is applied to
// every later event, and the last mouse press is remembered to detect
// double clicks. Unmapped keys (F13-F24, media keys) are filtered.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::time::{Duration, Instant};

use winit::{
    event::ElementState,
    event::{KeyEvent, MouseButton as WinitMouseButton},
    keyboard::{KeyCode as WinitKeyCode, ModifiersState, PhysicalKey},
};

//=== Internal Dependencies ===============================================

use crate::core::input::{InputEvent, KeyCode, Modifiers, MouseButton};

//=== InputProcessor ======================================================

/// Converts Winit events with modifier tracking and double-click detection.
pub(crate) struct InputProcessor {
    current_modifiers: Modifiers,
    double_click: Duration,
    last_press: Option<(MouseButton, Instant)>,
}

impl InputProcessor {
    //--- Construction -----------------------------------------------------

    pub(crate) fn new(double_click: Duration) -> Self {
        Self {
            current_modifiers: Modifiers::NONE,
            double_click,
            last_press: None,
        }
    }

    //--- Modifier State Management ----------------------------------------

    /// Updates cached modifier state (applied to subsequent events).
    pub(crate) fn update_modifiers(&mut self, modifiers_state: ModifiersState) {
        self.current_modifiers = Modifiers::from(modifiers_state);
    }

    pub(crate) fn current_modifiers(&self) -> Modifiers {
        self.current_modifiers
    }

    //--- Event Processing -------------------------------------------------

    /// Converts a Winit key event (filters unmapped keys).
    pub(crate) fn process_key_event(&self, key_event: &KeyEvent) -> Option<InputEvent> {
        let key_code = match key_event.physical_key {
            PhysicalKey::Code(code) => KeyCode::from(code),
            _ => return None,
        };

        if matches!(key_code, KeyCode::Unidentified) {
            return None;
        }

        let character = key_event
            .text
            .as_ref()
            .and_then(|text| text.chars().next());

        Some(self.create_key_input_event(key_code, key_event.state, character))
    }

    /// Converts a Winit mouse button event (with modifiers).
    pub(crate) fn process_mouse_button(
        &self,
        button: WinitMouseButton,
        state: ElementState,
    ) -> InputEvent {
        let button = MouseButton::from(button);

        match state {
            ElementState::Pressed => InputEvent::MouseButtonDown {
                button,
                modifiers: self.current_modifiers,
            },
            ElementState::Released => InputEvent::MouseButtonUp {
                button,
                modifiers: self.current_modifiers,
            },
        }
    }

    /// Records a press of `button` at `at`; returns a double click when
    /// the previous press was the same button within the window.
    ///
    /// A detected double click resets the tracker, so a triple click
    /// yields a single double click.
    pub(crate) fn detect_double_click(
        &mut self,
        button: WinitMouseButton,
        at: Instant,
    ) -> Option<InputEvent> {
        let button = MouseButton::from(button);

        match self.last_press {
            Some((previous, pressed_at))
                if previous == button
                    && at.saturating_duration_since(pressed_at) <= self.double_click =>
            {
                self.last_press = None;
                Some(InputEvent::MouseDoubleClick {
                    button,
                    modifiers: self.current_modifiers,
                })
            }
            _ => {
                self.last_press = Some((button, at));
                None
            }
        }
    }

    //--- Internal Helpers -------------------------------------------------

    fn create_key_input_event(
        &self,
        key: KeyCode,
        state: ElementState,
        character: Option<char>,
    ) -> InputEvent {
        match state {
            ElementState::Pressed => InputEvent::KeyDown {
                key,
                modifiers: self.current_modifiers,
                character: character.filter(|c| !c.is_control()),
            },
            ElementState::Released => InputEvent::KeyUp {
                key,
                modifiers: self.current_modifiers,
            },
        }
    }
}

//=========================================================================
// Winit Conversions
//=========================================================================

/// Winit normalizes platform keys (macOS Cmd → Ctrl, Option → Alt).
impl From<ModifiersState> for Modifiers {
    fn from(state: ModifiersState) -> Self {
        Self {
            shift: state.shift_key(),
            ctrl: state.control_key(),
            alt: state.alt_key(),
        }
    }
}

/// Maps A-Z, 0-9, F1-F12, arrows and the editing keys. Everything else
/// becomes `KeyCode::Unidentified`.
impl From<WinitKeyCode> for KeyCode {
    fn from(code: WinitKeyCode) -> Self {
        use WinitKeyCode::*;
        match code {
            Digit0 => KeyCode::Digit0, Digit1 => KeyCode::Digit1,
            Digit2 => KeyCode::Digit2, Digit3 => KeyCode::Digit3,
            Digit4 => KeyCode::Digit4, Digit5 => KeyCode::Digit5,
            Digit6 => KeyCode::Digit6, Digit7 => KeyCode::Digit7,
            Digit8 => KeyCode::Digit8, Digit9 => KeyCode::Digit9,

            KeyA => KeyCode::KeyA, KeyB => KeyCode::KeyB, KeyC => KeyCode::KeyC,
            KeyD => KeyCode::KeyD, KeyE => KeyCode::KeyE, KeyF => KeyCode::KeyF,
            KeyG => KeyCode::KeyG, KeyH => KeyCode::KeyH, KeyI => KeyCode::KeyI,
            KeyJ => KeyCode::KeyJ, KeyK => KeyCode::KeyK, KeyL => KeyCode::KeyL,
            KeyM => KeyCode::KeyM, KeyN => KeyCode::KeyN, KeyO => KeyCode::KeyO,
            KeyP => KeyCode::KeyP, KeyQ => KeyCode::KeyQ, KeyR => KeyCode::KeyR,
            KeyS => KeyCode::KeyS, KeyT => KeyCode::KeyT, KeyU => KeyCode::KeyU,
            KeyV => KeyCode::KeyV, KeyW => KeyCode::KeyW, KeyX => KeyCode::KeyX,
            KeyY => KeyCode::KeyY, KeyZ => KeyCode::KeyZ,

            F1 => KeyCode::F1, F2 => KeyCode::F2, F3 => KeyCode::F3,
            F4 => KeyCode::F4, F5 => KeyCode::F5, F6 => KeyCode::F6,
            F7 => KeyCode::F7, F8 => KeyCode::F8, F9 => KeyCode::F9,
            F10 => KeyCode::F10, F11 => KeyCode::F11, F12 => KeyCode::F12,

            ArrowUp => KeyCode::ArrowUp,
            ArrowDown => KeyCode::ArrowDown,
            ArrowLeft => KeyCode::ArrowLeft,
            ArrowRight => KeyCode::ArrowRight,

            Space => KeyCode::Space,
            Enter | NumpadEnter => KeyCode::Enter,
            Escape => KeyCode::Escape,
            Tab => KeyCode::Tab,
            Backspace => KeyCode::Backspace,
            Delete => KeyCode::Delete,

            _ => KeyCode::Unidentified,
        }
    }
}

/// Back/Forward/Other collapse into `Other`.
impl From<WinitMouseButton> for MouseButton {
    fn from(button: WinitMouseButton) -> Self {
        match button {
            WinitMouseButton::Left => MouseButton::Left,
            WinitMouseButton::Right => MouseButton::Right,
            WinitMouseButton::Middle => MouseButton::Middle,
            _ => MouseButton::Other,
        }
    }
}

//=========================================================================
// Tests
//=========================================================================
