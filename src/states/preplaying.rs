//=========================================================================
// Preplaying State
//=========================================================================
//
// Loads a level and plays the camera intro, then hands over to play.
//
// Flow:
//   enter()  → load level ──failure──→ replaced by an error box
//            → [optional] push ghost download, intro paused until the
//              TaskFinished answer arrives; the ghost is installed then
//   update() → intro done or interrupted → replaced by PlayingState
//
// Drawn over the menu it was started from; the menu keeps updating.
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{bounded, Receiver};
use log::{debug, warn};

//=== Internal Dependencies ===============================================

use super::scene::{IntroAnimation, SceneBehavior};
use super::{PlayingState, Session, TaskProgressState};
use crate::core::error::StateError;
use crate::core::input::{KeyCode, Modifiers, MouseButton};
use crate::core::messaging::{Message, TaskKind};
use crate::core::render::Renderer;
use crate::core::state::{
    GameState, MessageBoxState, StateContext, StateCore, StateFlags, StateKind,
};
use crate::core::world::{self, Ghost, LevelId};

//=== PreplayingState =====================================================

pub struct PreplayingState {
    core: StateCore,
    scene: SceneBehavior,
    level: LevelId,
    intro: IntroAnimation,
    loaded: bool,
    ghost: Option<Receiver<Ghost>>,
}

impl PreplayingState {
    pub fn new(session: Session, level: LevelId) -> Self {
        Self {
            core: StateCore::new("preplaying", StateFlags::TRANSPARENT.without_cursor()),
            scene: SceneBehavior::new(session),
            level,
            intro: IntroAnimation::new(std::time::Duration::ZERO),
            loaded: false,
            ghost: None,
        }
    }

    pub fn level(&self) -> &LevelId {
        &self.level
    }

    /// Pauses the intro behind a download overlay. The job owns its copy of
    /// the level and hands the ghost back over a channel.
    fn start_ghost_download(&mut self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        let Some(fetch) = world::lock(&self.scene.session().world)?.ghost_fetch(&self.level) else {
            return Ok(());
        };

        let (sender, receiver) = bounded(1);
        self.ghost = Some(receiver);
        self.intro.pause(ctx.now());

        let owner = ctx.id();
        ctx.push(TaskProgressState::new(
            TaskKind::GhostDownload,
            owner,
            move |reporter| {
                let ghost = fetch(reporter)?;
                sender
                    .send(ghost)
                    .map_err(|_| "ghost receiver gone".to_string())
            },
        ));
        Ok(())
    }

    fn install_ghost(&mut self) -> Result<(), StateError> {
        let Some(ghost) = self.ghost.take().and_then(|receiver| receiver.try_recv().ok()) else {
            return Ok(());
        };
        world::lock(&self.scene.session().world)?.install_ghost(ghost)
    }

    fn skip_intro(&mut self) {
        if self.loaded && !self.intro.is_paused() {
            debug!("Intro of {} interrupted", self.level);
            self.intro.interrupt();
        }
    }
}

impl GameState for PreplayingState {
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
        let loaded = world::lock(&self.scene.session().world)?.load_level(&self.level);
        if let Err(err) = loaded {
            warn!("Level {} cannot be loaded: {}", self.level, err);
            ctx.replace_self(MessageBoxState::error(err.to_string()));
            return Ok(());
        }

        self.loaded = true;
        self.scene.lock_scene(true, ctx.now());

        let duration = if ctx.config().enable_intro_zoom {
            ctx.config().intro_duration()
        } else {
            std::time::Duration::ZERO
        };
        self.intro = IntroAnimation::new(duration);
        self.intro.start(ctx.now());

        if self.scene.session().download_ghosts {
            self.start_ghost_download(ctx)?;
        }

        Ok(())
    }

    fn update(&mut self, ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        if !self.loaded || !self.core.do_update(ctx.now()) {
            return Ok(());
        }

        if self.intro.is_done(ctx.now()) {
            world::lock(&self.scene.session().world)?.start_play()?;
            debug!("Intro of {} done, starting play", self.level);
            self.loaded = false;
            ctx.replace_self(PlayingState::new(self.scene.session().clone(), self.level.clone()));
        }
        Ok(())
    }

    fn render(
        &mut self,
        ctx: &mut StateContext<'_>,
        renderer: &mut dyn Renderer,
    ) -> Result<(), StateError> {
        if !self.loaded || !self.core.do_render(ctx.now()) {
            return Ok(());
        }
        self.scene.render(renderer, self.intro.zoom(ctx.now()))?;
        renderer.draw_text(&format!("Level {}", self.level));
        Ok(())
    }

    fn key_down(
        &mut self,
        _ctx: &mut StateContext<'_>,
        _key: KeyCode,
        _modifiers: Modifiers,
        _character: Option<char>,
    ) {
        self.skip_intro();
    }

    fn mouse_down(&mut self, _ctx: &mut StateContext<'_>, _button: MouseButton) {
        self.skip_intro();
    }

    fn on_message(
        &mut self,
        ctx: &mut StateContext<'_>,
        message: Message,
    ) -> Result<(), StateError> {
        if let Message::TaskFinished(outcome) = message {
            if outcome.kind == TaskKind::GhostDownload {
                if outcome.succeeded {
                    if let Err(err) = self.install_ghost() {
                        warn!("Ghost of {} rejected: {}", self.level, err);
                    }
                } else {
                    warn!("Ghost of {} unavailable, playing without it", self.level);
                }
                self.ghost = None;
                self.intro.resume(ctx.now());
            }
        }
        Ok(())
    }
}
