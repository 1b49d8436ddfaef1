//=========================================================================
// Menu GUI
//=========================================================================
//
// Minimal button-list model shared by the menu states.
//
// Architecture:
//   KeyDown / MouseDown → MenuGui::handle_key / handle_mouse → Option<B>
//                                   │
//   (key, modifiers) → HashMap → B  (shortcuts)
//   arrows / Tab     → focus moves over enabled buttons, wrapping
//   Enter / Space    → focused button activates
//
// A `MenuGui<B>` lives in the `ResourceRegistry`, so there is one per
// button type and it survives repeated entries of the state that uses it.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use log::debug;

//=== Internal Dependencies ===============================================

use crate::core::input::{KeyCode, Modifiers, MouseButton};
use crate::core::render::{MenuEntry, Renderer};
use crate::core::state::StateResource;

//=== MenuButton ==========================================================

/// Marker for the button identifiers of a menu.
///
/// # Example
///
/// ```rust
/// use stratum_engine::core::gui::MenuButton;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum PauseButton { Resume, Quit }
///
/// impl MenuButton for PauseButton {}
/// ```
pub trait MenuButton: Copy + Eq + Hash + Debug + Send + 'static {}

//=== MenuGui =============================================================

#[derive(Debug, Clone)]
struct MenuItem<B> {
    id: B,
    label: String,
    enabled: bool,
}

/// Vertical list of buttons with keyboard focus.
#[derive(Debug, Clone)]
pub struct MenuGui<B: MenuButton> {
    title: String,
    items: Vec<MenuItem<B>>,
    focus: usize,
    shortcuts: HashMap<(KeyCode, Modifiers), B>,
}

impl<B: MenuButton> MenuGui<B> {
    //--- Construction -----------------------------------------------------

    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            items: Vec::new(),
            focus: 0,
            shortcuts: HashMap::new(),
        }
    }

    pub fn with_button(mut self, id: B, label: impl Into<String>) -> Self {
        self.items.push(MenuItem {
            id,
            label: label.into(),
            enabled: true,
        });
        self
    }

    /// Activates `id` when `key` is pressed without modifiers.
    pub fn with_shortcut(mut self, key: KeyCode, id: B) -> Self {
        self.shortcuts.insert((key, Modifiers::NONE), id);
        self
    }

    //--- Configuration ----------------------------------------------------

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Enables or disables `id`. Focus leaves a button being disabled.
    pub fn set_enabled(&mut self, id: B, enabled: bool) {
        if let Some(item) = self.items.iter_mut().find(|item| item.id == id) {
            item.enabled = enabled;
        }
        if !self.items.get(self.focus).is_some_and(|item| item.enabled) {
            self.move_focus(true);
        }
    }

    pub fn is_enabled(&self, id: B) -> bool {
        self.items.iter().any(|item| item.id == id && item.enabled)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    //--- Focus ------------------------------------------------------------

    pub fn focused(&self) -> Option<B> {
        self.items
            .get(self.focus)
            .filter(|item| item.enabled)
            .map(|item| item.id)
    }

    pub fn focus(&mut self, id: B) {
        if let Some(position) = self.items.iter().position(|item| item.id == id && item.enabled) {
            self.focus = position;
        }
    }

    /// Moves focus back to the first enabled button.
    pub fn reset_focus(&mut self) {
        self.focus = self.items.iter().position(|item| item.enabled).unwrap_or(0);
    }

    fn move_focus(&mut self, forward: bool) {
        let count = self.items.len();
        for step in 1..=count {
            let candidate = if forward {
                (self.focus + step) % count
            } else {
                (self.focus + count - step % count) % count
            };
            if self.items[candidate].enabled {
                self.focus = candidate;
                return;
            }
        }
    }

    //--- Input ------------------------------------------------------------

    /// Handles a key press. Returns the button it activated, if any.
    pub fn handle_key(&mut self, key: KeyCode, modifiers: Modifiers) -> Option<B> {
        if let Some(id) = self.shortcuts.get(&(key, modifiers)).copied() {
            return self.is_enabled(id).then_some(id);
        }

        match key {
            KeyCode::ArrowUp | KeyCode::ArrowLeft => self.move_focus(false),
            KeyCode::ArrowDown | KeyCode::ArrowRight | KeyCode::Tab => self.move_focus(true),
            key if key.is_confirm() => {
                let activated = self.focused();
                if let Some(id) = activated {
                    debug!("Menu '{}' activated {:?}", self.title, id);
                }
                return activated;
            }
            _ => {}
        }
        None
    }

    /// Handles a mouse press. The left button activates the focused entry.
    pub fn handle_mouse(&mut self, button: MouseButton) -> Option<B> {
        match button {
            MouseButton::Left => self.focused(),
            _ => None,
        }
    }

    //--- Rendering --------------------------------------------------------

    pub fn entries(&self) -> Vec<MenuEntry<'_>> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| MenuEntry {
                label: &item.label,
                enabled: item.enabled,
                focused: index == self.focus,
            })
            .collect()
    }

    pub fn render(&self, renderer: &mut dyn Renderer) {
        renderer.draw_menu(&self.title, &self.entries());
    }
}

impl<B: MenuButton> StateResource for MenuGui<B> {
    fn shutdown(&mut self) {
        debug!("Releasing menu '{}'", self.title);
        self.items.clear();
        self.shortcuts.clear();
        self.focus = 0;
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::ResourceRegistry;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum TestButton {
        Play,
        Replays,
        Quit,
    }

    impl MenuButton for TestButton {}

    fn menu() -> MenuGui<TestButton> {
        MenuGui::new("Main")
            .with_button(TestButton::Play, "Play")
            .with_button(TestButton::Replays, "Replays")
            .with_button(TestButton::Quit, "Quit")
            .with_shortcut(KeyCode::Escape, TestButton::Quit)
    }

    #[test]
    fn arrows_wrap_around() {
        let mut gui = menu();
        gui.handle_key(KeyCode::ArrowUp, Modifiers::NONE);
        assert_eq!(gui.focused(), Some(TestButton::Quit));

        gui.handle_key(KeyCode::ArrowDown, Modifiers::NONE);
        assert_eq!(gui.focused(), Some(TestButton::Play));
    }

    #[test]
    fn focus_skips_disabled_buttons() {
        let mut gui = menu();
        gui.set_enabled(TestButton::Replays, false);

        gui.handle_key(KeyCode::ArrowDown, Modifiers::NONE);
        assert_eq!(gui.focused(), Some(TestButton::Quit));
    }

    #[test]
    fn disabling_focused_button_moves_focus() {
        let mut gui = menu();
        gui.set_enabled(TestButton::Play, false);
        assert_eq!(gui.focused(), Some(TestButton::Replays));
    }

    #[test]
    fn enter_activates_focused_button() {
        let mut gui = menu();
        gui.handle_key(KeyCode::Tab, Modifiers::NONE);
        assert_eq!(
            gui.handle_key(KeyCode::Enter, Modifiers::NONE),
            Some(TestButton::Replays)
        );
    }

    #[test]
    fn shortcut_activates_directly() {
        let mut gui = menu();
        assert_eq!(
            gui.handle_key(KeyCode::Escape, Modifiers::NONE),
            Some(TestButton::Quit)
        );
        assert_eq!(gui.handle_key(KeyCode::Escape, Modifiers::SHIFT), None);
    }

    #[test]
    fn registry_keeps_one_gui_per_button_type() {
        let mut registry = ResourceRegistry::new();
        registry
            .get_or_init(menu)
            .handle_key(KeyCode::ArrowDown, Modifiers::NONE);

        let gui = registry.get_or_init(|| MenuGui::<TestButton>::new("unused"));
        assert_eq!(gui.title(), "Main");
        assert_eq!(gui.focused(), Some(TestButton::Replays));

        registry.shutdown();
        assert!(registry.is_empty());
    }
}
