//=========================================================================
// Playing State
//=========================================================================
//
// Live play of a level.
//
// Flow:
//   update() → fixed physics steps (bounded catch-up)
//            → all players dead → DeadJustState (replace) or DeadMenuState (push)
//            → a player finished → FinishedState (push)
//   Escape   → PauseState pushed, answers come back as level commands
//
// The physics anchor is resynchronized whenever the state comes back on
// top, so time spent under an overlay is not caught up.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::{info, warn};

//=== Internal Dependencies ===============================================

use super::scene::SceneBehavior;
use super::{DeadJustState, DeadMenuState, FinishedState, PauseState, Session};
use crate::core::error::StateError;
use crate::core::input::{KeyCode, Modifiers};
use crate::core::messaging::Message;
use crate::core::render::Renderer;
use crate::core::state::{
    GameState, MessageBoxState, StateContext, StateCore, StateFlags, StateKind,
};
use crate::core::world::{self, LevelId, PlayerStatus};

//=== PlayingState ========================================================

pub struct PlayingState {
    core: StateCore,
    scene: SceneBehavior,
    level: LevelId,
    game_over: bool,
}

impl PlayingState {
    pub fn new(session: Session, level: LevelId) -> Self {
        Self {
            core: StateCore::new("playing", StateFlags::OPAQUE.without_cursor()),
            scene: SceneBehavior::new(session),
            level,
            game_over: false,
        }
    }

    pub fn level(&self) -> &LevelId {
        &self.level
    }

    fn check_players(&mut self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        if self.game_over {
            return Ok(());
        }

        let status = world::lock(&self.scene.session().world)?.player_status();
        let session = self.scene.session().clone();
        let receiver = ctx.id();

        match status {
            PlayerStatus::Playing => {}
            PlayerStatus::Dead => {
                info!("All players dead on {}", self.level);
                self.game_over = true;
                if ctx.config().enable_dead_animation {
                    ctx.replace_self(DeadJustState::new(session, self.level.clone()));
                } else {
                    ctx.push(DeadMenuState::new(session, self.level.clone(), receiver));
                }
            }
            PlayerStatus::Finished => {
                info!("Level {} finished", self.level);
                self.game_over = true;
                ctx.push(FinishedState::new(session, self.level.clone(), receiver));
            }
        }
        Ok(())
    }
}

impl GameState for PlayingState {
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
        self.scene.resync(ctx.now());
        Ok(())
    }

    fn enter_after_pop(&mut self, ctx: &mut StateContext<'_>) {
        self.scene.resync(ctx.now());
        self.core.resync_update(ctx.now());
    }

    fn update(&mut self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        if !self.core.do_update(ctx.now()) {
            return Ok(());
        }

        if self.game_over {
            return Ok(());
        }

        if let Err(err) = self.scene.advance(ctx) {
            warn!("Simulation of {} failed: {}", self.level, err);
            self.game_over = true;
            self.scene.close_playing()?;
            ctx.replace_self(MessageBoxState::error(err.to_string()));
            return Ok(());
        }

        self.check_players(ctx)
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
        if self.game_over {
            return;
        }

        match key {
            KeyCode::Escape => {
                let receiver = ctx.id();
                ctx.push(PauseState::new(self.scene.session().clone(), self.level.clone(), receiver));
            }
            KeyCode::Backspace => {
                let receiver = ctx.id();
                ctx.post(Message::Restart, receiver);
            }
            _ => {}
        }
    }

    fn on_message(
        &mut self,
        ctx: &mut StateContext<'_>,
        message: Message,
    ) -> Result<(), StateError> {
        let level = self.level.clone();
        if self.scene.execute_command(&mut self.core, ctx, &level, &message)? {
            self.game_over = true;
        }
        Ok(())
    }
}
