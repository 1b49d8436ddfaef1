//=========================================================================
// Dead States
//=========================================================================
//
// What follows the death of every player.
//
//   DeadJustState: replaces PlayingState, keeps the scene running for the
//                  death animation, pushes DeadMenuState after a delay
//                  (or on Escape / Enter)
//   DeadMenuState: try again / save replay / play next / abort / quit,
//                  the choice is posted to the scene state below
//
//=========================================================================

//=== External Dependencies ===============================================

use log::{debug, info, warn};

//=== Internal Dependencies ===============================================

use super::menu::{confirm_quit, is_quit_confirmed, report_error, CommandReply, MenuBehavior};
use super::scene::SceneBehavior;
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

//=== DeadJustState =======================================================

pub struct DeadJustState {
    core: StateCore,
    scene: SceneBehavior,
    level: LevelId,
    entered_at: std::time::Duration,
    menu_pushed: bool,
    closing: bool,
}

impl DeadJustState {
    pub fn new(session: Session, level: LevelId) -> Self {
        Self {
            core: StateCore::new("dead_just", StateFlags::OPAQUE.without_cursor()),
            scene: SceneBehavior::new(session),
            level,
            entered_at: std::time::Duration::ZERO,
            menu_pushed: false,
            closing: false,
        }
    }

    fn push_menu(&mut self, ctx: &mut StateContext<'_>) {
        if self.menu_pushed {
            return;
        }
        self.menu_pushed = true;

        let receiver = ctx.id();
        ctx.push(DeadMenuState::new(
            self.scene.session().clone(),
            self.level.clone(),
            receiver,
        ));
    }
}

impl GameState for DeadJustState {
    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn kind(&self) -> StateKind {
        StateKind::Scene
    }

    fn enter(&mut self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        self.core.set_update_fps(ctx.config().scene_update_fps);
        self.entered_at = ctx.now();
        self.scene.resync(ctx.now());
        Ok(())
    }

    fn enter_after_pop(&mut self, ctx: &mut StateContext<'_>) {
        self.scene.resync(ctx.now());
    }

    fn update(&mut self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        if self.closing || !self.core.do_update(ctx.now()) {
            return Ok(());
        }

        self.scene.advance(ctx)?;

        if ctx.now().saturating_sub(self.entered_at) >= ctx.config().dead_menu_delay() {
            self.push_menu(ctx);
        }
        Ok(())
    }

    fn render(
        &mut self,
        ctx: &mut StateContext<'_>,
        renderer: &mut dyn Renderer,
    ) -> Result<(), StateError> {
        if !self.core.do_render(ctx.now()) {
            return Ok(());
        }
        self.scene.render(renderer, 1.0)
    }

    fn key_down(
        &mut self,
        ctx: &mut StateContext<'_>,
        key: KeyCode,
        _modifiers: Modifiers,
        _character: Option<char>,
    ) {
        if key == KeyCode::Escape || key == KeyCode::Enter {
            self.push_menu(ctx);
        }
    }

    fn on_message(
        &mut self,
        ctx: &mut StateContext<'_>,
        message: Message,
    ) -> Result<(), StateError> {
        let level = self.level.clone();
        if self.scene.execute_command(&mut self.core, ctx, &level, &message)? {
            self.closing = true;
        }
        Ok(())
    }
}

//=== DeadMenuState =======================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeadButton {
    TryAgain,
    SaveReplay,
    PlayNext,
    Abort,
    Quit,
}

impl MenuButton for DeadButton {}

fn dead_menu() -> MenuGui<DeadButton> {
    MenuGui::new("You are dead")
        .with_button(DeadButton::TryAgain, "Try again")
        .with_button(DeadButton::SaveReplay, "Save replay")
        .with_button(DeadButton::PlayNext, "Play next level")
        .with_button(DeadButton::Abort, "Abort")
        .with_button(DeadButton::Quit, "Quit game")
        .with_shortcut(KeyCode::Escape, DeadButton::Abort)
}

/// Menu shown over the scene once every player is dead.
pub struct DeadMenuState {
    core: StateCore,
    menu: MenuBehavior<DeadButton>,
    session: Session,
    level: LevelId,
    reply: CommandReply,
}

impl DeadMenuState {
    pub fn new(session: Session, level: LevelId, receiver: StateId) -> Self {
        Self {
            core: StateCore::new("dead_menu", StateFlags::TRANSPARENT),
            menu: MenuBehavior::new(dead_menu),
            session,
            level,
            reply: CommandReply::new(receiver),
        }
    }

    fn activate(&mut self, ctx: &mut StateContext<'_>, button: DeadButton) {
        debug!("Dead menu: {:?}", button);
        match button {
            DeadButton::TryAgain => self.finish(Message::Restart),
            DeadButton::PlayNext => self.finish(Message::NextLevel),
            DeadButton::Abort => self.finish(Message::Abort),
            DeadButton::SaveReplay => {
                let receiver = ctx.id();
                ctx.push(
                    MessageBoxState::new(
                        MsgBoxId::SaveReplay,
                        "Save the replay as:",
                        MsgBoxButtons::OK_CANCEL,
                    )
                    .with_input(format!("{}-run", self.level))
                    .with_receiver(receiver)
                    .exitable(true),
                );
            }
            DeadButton::Quit => confirm_quit(ctx),
        }
    }

    fn finish(&mut self, command: Message) {
        self.reply.set(command);
        self.core.request_end();
    }

    fn save_replay(&self, ctx: &mut StateContext<'_>, name: &str) {
        let saved = world::lock(&self.session.world).and_then(|mut world| world.save_replay(name));
        match saved {
            Ok(()) => info!("Replay saved as '{}'", name),
            Err(err) => {
                warn!("Replay '{}' not saved: {}", name, err);
                report_error(ctx, err.to_string());
            }
        }
    }
}

impl GameState for DeadMenuState {
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
        gui.set_enabled(DeadButton::PlayNext, has_next);
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
            return Ok(());
        }

        if let Message::MessageBox(MessageBoxResult {
            id: MsgBoxId::SaveReplay,
            button: MsgBoxButton::Ok,
            input,
        }) = message
        {
            self.save_replay(ctx, input.trim());
        }
        Ok(())
    }
}
