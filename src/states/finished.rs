//=========================================================================
// Finished State
//=========================================================================
//
// Menu pushed over the scene when a player reaches the end of the level.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::{info, warn};

//=== Internal Dependencies ===============================================

use super::menu::{confirm_quit, is_quit_confirmed, report_error, CommandReply, MenuBehavior};
use super::Session;
use crate::core::error::StateError;
use crate::core::gui::{MenuButton, MenuGui};
use crate::core::input::{KeyCode, Modifiers, MouseButton};
use crate::core::messaging::{
    Message, MessageBoxResult, MsgBoxButton, MsgBoxButtons, MsgBoxId,
};
use crate::core::render::Renderer;
use crate::core::state::{
    GameState, MessageBoxState, StateContext, StateCore, StateFlags, StateId, StateKind,
};
use crate::core::world::{self, LevelId};

//=== FinishedButton ======================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinishedButton {
    PlayNext,
    SaveReplay,
    TryAgain,
    Abort,
    Quit,
}

impl MenuButton for FinishedButton {}

fn finished_menu() -> MenuGui<FinishedButton> {
    MenuGui::new("Finished!")
        .with_button(FinishedButton::PlayNext, "Play next level")
        .with_button(FinishedButton::SaveReplay, "Save replay")
        .with_button(FinishedButton::TryAgain, "Try again")
        .with_button(FinishedButton::Abort, "Abort")
        .with_button(FinishedButton::Quit, "Quit game")
        .with_shortcut(KeyCode::Escape, FinishedButton::Abort)
}

//=== FinishedState =======================================================

pub struct FinishedState {
    core: StateCore,
    menu: MenuBehavior<FinishedButton>,
    session: Session,
    level: LevelId,
    reply: CommandReply,
    time: std::time::Duration,
}

impl FinishedState {
    pub fn new(session: Session, level: LevelId, receiver: StateId) -> Self {
        Self {
            core: StateCore::new("finished", StateFlags::OVERLAY),
            menu: MenuBehavior::new(finished_menu),
            session,
            level,
            reply: CommandReply::new(receiver),
            time: std::time::Duration::ZERO,
        }
    }

    fn activate(&mut self, ctx: &mut StateContext<'_>, button: FinishedButton) {
        match button {
            FinishedButton::PlayNext => self.finish(Message::NextLevel),
            FinishedButton::TryAgain => self.finish(Message::Restart),
            FinishedButton::Abort => self.finish(Message::Finish),
            FinishedButton::SaveReplay => {
                let receiver = ctx.id();
                ctx.push(
                    MessageBoxState::new(
                        MsgBoxId::SaveReplay,
                        "Save the replay as:",
                        MsgBoxButtons::OK_CANCEL,
                    )
                    .with_input(format!("{}-best", self.level))
                    .with_receiver(receiver)
                    .exitable(true),
                );
            }
            FinishedButton::Quit => confirm_quit(ctx),
        }
    }

    fn finish(&mut self, command: Message) {
        self.reply.set(command);
        self.core.request_end();
    }
}

impl GameState for FinishedState {
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
        let (has_next, time) = {
            let world = world::lock(&self.session.world)?;
            (world.next_level(&self.level).is_some(), world.game_time())
        };
        self.time = time;
        info!("Finished {} in {:.2}s", self.level, time.as_secs_f32());

        let gui = self.menu.gui(ctx);
        gui.set_enabled(FinishedButton::PlayNext, has_next);
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
        renderer.draw_text(&format!("Time: {:.2}s", self.time.as_secs_f32()));
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
            return Ok(());
        }

        if let Message::MessageBox(MessageBoxResult {
            id: MsgBoxId::SaveReplay,
            button: MsgBoxButton::Ok,
            input,
        }) = message
        {
            let name = input.trim();
            let saved = world::lock(&self.session.world)?.save_replay(name);
            if let Err(err) = saved {
                warn!("Replay '{}' not saved: {}", name, err);
                report_error(ctx, err.to_string());
            }
        }
        Ok(())
    }
}
