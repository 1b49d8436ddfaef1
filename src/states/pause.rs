//=========================================================================
// Pause State
//=========================================================================
//
// Overlay pushed over a running scene. The scene stays visible but
// frozen; the chosen level command reaches the scene once the overlay
// has been popped.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::debug;

//=== Internal Dependencies ===============================================

use super::menu::{confirm_quit, is_quit_confirmed, CommandReply, MenuBehavior};
use super::Session;
use crate::core::error::StateError;
use crate::core::gui::{MenuButton, MenuGui};
use crate::core::input::{KeyCode, Modifiers, MouseButton};
use crate::core::messaging::Message;
use crate::core::render::Renderer;
use crate::core::state::{GameState, StateContext, StateCore, StateFlags, StateId, StateKind};
use crate::core::world::{self, LevelId};

//=== PauseButton =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PauseButton {
    Resume,
    Restart,
    PlayNext,
    Abort,
    Quit,
}

impl MenuButton for PauseButton {}

fn pause_menu() -> MenuGui<PauseButton> {
    MenuGui::new("Pause")
        .with_button(PauseButton::Resume, "Resume")
        .with_button(PauseButton::Restart, "Restart")
        .with_button(PauseButton::PlayNext, "Play next level")
        .with_button(PauseButton::Abort, "Abort")
        .with_button(PauseButton::Quit, "Quit game")
        .with_shortcut(KeyCode::Escape, PauseButton::Resume)
}

//=== PauseState ==========================================================

pub struct PauseState {
    core: StateCore,
    menu: MenuBehavior<PauseButton>,
    session: Session,
    level: LevelId,
    reply: CommandReply,
}

impl PauseState {
    pub fn new(session: Session, level: LevelId, receiver: StateId) -> Self {
        Self {
            core: StateCore::new("pause", StateFlags::OVERLAY),
            menu: MenuBehavior::new(pause_menu),
            session,
            level,
            reply: CommandReply::new(receiver),
        }
    }

    /// Command that will be sent to the scene when the pause ends.
    pub fn pending_command(&self) -> Option<&Message> {
        self.reply.pending()
    }

    fn activate(&mut self, ctx: &mut StateContext<'_>, button: PauseButton) {
        debug!("Pause: {:?}", button);
        match button {
            PauseButton::Resume => self.core.request_end(),
            PauseButton::Restart => self.finish(Message::Restart),
            PauseButton::PlayNext => self.finish(Message::NextLevel),
            PauseButton::Abort => self.finish(Message::Abort),
            PauseButton::Quit => confirm_quit(ctx),
        }
    }

    fn finish(&mut self, command: Message) {
        self.reply.set(command);
        self.core.request_end();
    }
}

impl GameState for PauseState {
    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn kind(&self) -> StateKind {
        StateKind::Menu
    }

    fn enter(&mut self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        let has_next = world::lock(&self.session.world)?
            .next_level(&self.level)
            .is_some();
        let gui = self.menu.gui(ctx);
        gui.set_enabled(PauseButton::PlayNext, has_next);
        gui.reset_focus();
        Ok(())
    }

    fn leave(&mut self, ctx: &mut StateContext<'_>) {
        self.reply.deliver(ctx);
    }

    fn render(
        &mut self,
        ctx: &mut StateContext<'_>,
        renderer: &mut dyn Renderer,
    ) -> Result<(), StateError> {
        self.menu.render(ctx, renderer);
        Ok(())
    }

    fn key_down(
        &mut self,
        ctx: &mut StateContext<'_>,
        key: KeyCode,
        modifiers: Modifiers,
        _character: Option<char>,
    ) {
        if let Some(button) = self.menu.key_down(ctx, key, modifiers) {
            self.activate(ctx, button);
        }
    }

    fn mouse_down(&mut self, ctx: &mut StateContext<'_>, button: MouseButton) {
        if let Some(button) = self.menu.mouse_down(ctx, button) {
            self.activate(ctx, button);
        }
    }

    fn on_message(
        &mut self,
        ctx: &mut StateContext<'_>,
        message: Message,
    ) -> Result<(), StateError> {
        if is_quit_confirmed(&message) {
            ctx.request_quit();
            self.core.request_end();
        }
        Ok(())
    }
}
