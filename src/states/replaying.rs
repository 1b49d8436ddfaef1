//=========================================================================
// Replaying State
//=========================================================================
//
// Plays a recorded run back through the world.
//
// Updates at the scene rate, renders at the replay rate. Ends by itself
// when the replay is over; Escape ends it early, Space pauses it.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::{info, warn};

//=== Internal Dependencies ===============================================

use super::scene::SceneBehavior;
use super::Session;
use crate::core::error::StateError;
use crate::core::input::{KeyCode, Modifiers};
use crate::core::render::Renderer;
use crate::core::state::{
    GameState, MessageBoxState, StateContext, StateCore, StateFlags, StateKind,
};
use crate::core::world;

//=== ReplayingState ======================================================

pub struct ReplayingState {
    core: StateCore,
    scene: SceneBehavior,
    replay: String,
    running: bool,
}

impl ReplayingState {
    pub fn new(session: Session, replay: impl Into<String>) -> Self {
        Self {
            core: StateCore::new("replaying", StateFlags::OPAQUE.without_cursor()),
            scene: SceneBehavior::new(session),
            replay: replay.into(),
            running: false,
        }
    }

    pub fn replay(&self) -> &str {
        &self.replay
    }

    fn stop(&mut self) -> Result<(), StateError> {
        if self.running {
            self.running = false;
            self.scene.close_playing()?;
        }
        self.core.request_end();
        Ok(())
    }
}

impl GameState for ReplayingState {
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
        self.core.set_render_fps(ctx.config().replay_render_fps);

        let loaded = world::lock(&self.scene.session().world)?.load_replay(&self.replay);
        if let Err(err) = loaded {
            warn!("Replay '{}' cannot be loaded: {}", self.replay, err);
            ctx.replace_self(MessageBoxState::error(err.to_string()));
            return Ok(());
        }

        info!("Replaying '{}'", self.replay);
        self.running = true;
        self.scene.resync(ctx.now());
        Ok(())
    }

    fn enter_after_pop(&mut self, ctx: &mut StateContext<'_>) {
        self.scene.resync(ctx.now());
    }

    fn update(&mut self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        if !self.running || !self.core.do_update(ctx.now()) {
            return Ok(());
        }

        self.scene.advance(ctx)?;

        let finished = world::lock(&self.scene.session().world)?.replay_finished();
        if finished {
            info!("Replay '{}' over", self.replay);
            self.stop()?;
        }
        Ok(())
    }

    fn render(
        &mut self,
        ctx: &mut StateContext<'_>,
        renderer: &mut dyn Renderer,
    ) -> Result<(), StateError> {
        if !self.running || !self.core.do_render(ctx.now()) {
            return Ok(());
        }
        self.scene.render(renderer, 1.0)?;
        if self.scene.is_locked() {
            renderer.draw_text("Paused");
        }
        Ok(())
    }

    fn key_down(
        &mut self,
        ctx: &mut StateContext<'_>,
        key: KeyCode,
        _modifiers: Modifiers,
        _character: Option<char>,
    ) {
        match key {
            KeyCode::Escape => {
                if let Err(err) = self.stop() {
                    warn!("Replay '{}' did not stop cleanly: {}", self.replay, err);
                }
            }
            KeyCode::Space => {
                let locked = self.scene.is_locked();
                self.scene.lock_scene(!locked, ctx.now());
            }
            _ => {}
        }
    }
}
