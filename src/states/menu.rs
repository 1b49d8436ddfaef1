//=========================================================================
// Menu Behavior
//=========================================================================
//
// Components shared by the menu states.
//
// - `MenuBehavior<B>`: routes input and rendering through the registry
//   owned `MenuGui<B>`
// - `CommandReply`: command chosen in an overlay menu, posted to the
//   receiver once the overlay has left the stack
// - quit confirmation helpers
//
//=========================================================================

//=== Internal Dependencies ===============================================

use crate::core::gui::{MenuButton, MenuGui};
use crate::core::input::{KeyCode, Modifiers, MouseButton};
use crate::core::messaging::{Message, MessageBoxResult, MsgBoxButton, MsgBoxButtons, MsgBoxId};
use crate::core::render::Renderer;
use crate::core::state::{MessageBoxState, StateContext, StateId};

//=== MenuBehavior ========================================================

/// Menu component; the GUI itself lives in the resource registry.
pub struct MenuBehavior<B: MenuButton> {
    build: fn() -> MenuGui<B>,
}

impl<B: MenuButton> MenuBehavior<B> {
    /// `build` creates the GUI the first time any state of this type
    /// needs it.
    pub fn new(build: fn() -> MenuGui<B>) -> Self {
        Self { build }
    }

    pub fn gui<'c>(&self, ctx: &'c mut StateContext<'_>) -> &'c mut MenuGui<B> {
        ctx.resources().get_or_init(self.build)
    }

    pub fn key_down(
        &self,
        ctx: &mut StateContext<'_>,
        key: KeyCode,
        modifiers: Modifiers,
    ) -> Option<B> {
        self.gui(ctx).handle_key(key, modifiers)
    }

    pub fn mouse_down(&self, ctx: &mut StateContext<'_>, button: MouseButton) -> Option<B> {
        self.gui(ctx).handle_mouse(button)
    }

    pub fn render(&self, ctx: &mut StateContext<'_>, renderer: &mut dyn Renderer) {
        self.gui(ctx).render(renderer);
    }
}

//=== CommandReply ========================================================

/// Level command chosen in an overlay menu.
///
/// The command is posted from `leave()`, so the receiver handles it once
/// the overlay is gone.
#[derive(Debug)]
pub struct CommandReply {
    receiver: StateId,
    pending: Option<Message>,
}

impl CommandReply {
    pub fn new(receiver: StateId) -> Self {
        Self {
            receiver,
            pending: None,
        }
    }

    pub fn receiver(&self) -> StateId {
        self.receiver
    }

    /// Records `message`; a later choice overrides an earlier one.
    pub fn set(&mut self, message: Message) {
        self.pending = Some(message);
    }

    pub fn pending(&self) -> Option<&Message> {
        self.pending.as_ref()
    }

    /// Posts the recorded command, at most once.
    pub fn deliver(&mut self, ctx: &mut StateContext<'_>) {
        if let Some(message) = self.pending.take() {
            ctx.post(message, self.receiver);
        }
    }
}

//=== Quit Confirmation ===================================================

/// Pushes the "quit the game" confirmation, answered to the caller.
pub fn confirm_quit(ctx: &mut StateContext<'_>) {
    let receiver = ctx.id();
    ctx.push(
        MessageBoxState::new(MsgBoxId::Quit, "Quit the game ?", MsgBoxButtons::YES_NO)
            .with_receiver(receiver),
    );
}

pub fn is_quit_confirmed(message: &Message) -> bool {
    matches!(
        message,
        Message::MessageBox(MessageBoxResult {
            id: MsgBoxId::Quit,
            button: MsgBoxButton::Yes,
            ..
        })
    )
}

/// Pushes an error box reporting `text`.
pub fn report_error(ctx: &mut StateContext<'_>, text: impl Into<String>) {
    ctx.push(MessageBoxState::error(text));
}

//=========================================================================
// Unit Tests
//=========================================================================
