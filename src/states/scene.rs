//=========================================================================
// Scene Behavior
//=========================================================================
//
// Component shared by the states that drive a live simulation.
//
// Architecture:
//   SceneBehavior
//     ├─ session:      world + profiles shared with the application
//     ├─ last_physics: fixed-step anchor (scheduler time)
//     └─ locked:       no physics while set (intro, frozen scene)
//
//   advance(ctx): while anchor + step <= now and steps < max catch-up
//                     world.step_physics(step); anchor += step
//
// Resynchronizing moves the anchor to "now", so a state resumed after a
// pause does not replay the missed steps.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::time::Duration;

use log::{debug, info};

//=== Internal Dependencies ===============================================

use super::{PreplayingState, Session};
use crate::core::error::StateError;
use crate::core::messaging::Message;
use crate::core::render::Renderer;
use crate::core::state::{StateContext, StateCore};
use crate::core::world::{self, LevelId};

//=== SceneBehavior =======================================================

pub struct SceneBehavior {
    session: Session,
    last_physics: Option<Duration>,
    locked: bool,
}

impl SceneBehavior {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            last_physics: None,
            locked: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    //--- Physics ----------------------------------------------------------

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Freezes or unfreezes the simulation. Unfreezing resynchronizes.
    pub fn lock_scene(&mut self, locked: bool, now: Duration) {
        self.locked = locked;
        if !locked {
            self.resync(now);
        }
    }

    /// Forgets the steps missed before `now`.
    pub fn resync(&mut self, now: Duration) {
        self.last_physics = Some(now);
    }

    /// Runs the physics steps due at the context time. Returns how many
    /// steps ran.
    pub fn advance(&mut self, ctx: &StateContext<'_>) -> Result<u32, StateError> {
        if self.locked {
            return Ok(0);
        }

        let now = ctx.now();
        let step = ctx.config().physics_step();
        let max_steps = ctx.config().max_physics_catch_up;
        let mut last = *self.last_physics.get_or_insert(now);

        let mut world = world::lock(&self.session.world)?;
        let mut steps = 0;
        while last + step <= now && steps < max_steps {
            world.step_physics(step)?;
            last += step;
            steps += 1;
        }

        self.last_physics = Some(last);
        Ok(steps)
    }

    //--- Rendering --------------------------------------------------------

    pub fn render(&self, renderer: &mut dyn Renderer, zoom: f32) -> Result<(), StateError> {
        let world = world::lock(&self.session.world)?;
        renderer.draw_scene(&*world, zoom);
        Ok(())
    }

    //--- Commands ---------------------------------------------------------

    /// Ends the running level.
    pub fn close_playing(&self) -> Result<(), StateError> {
        world::lock(&self.session.world)?.end_level();
        Ok(())
    }

    /// Handles the level commands sent to a scene state.
    ///
    /// `Restart`, `NextLevel` and `PreviousLevel` replace the state with a
    /// fresh pre-play of the chosen level; `Abort`, `Finish` and `Error`
    /// end it. Returns `false` for messages that are not level commands.
    pub fn execute_command(
        &mut self,
        core: &mut StateCore,
        ctx: &mut StateContext<'_>,
        level: &LevelId,
        message: &Message,
    ) -> Result<bool, StateError> {
        match message {
            Message::Restart => {
                info!("Restarting level {}", level);
                self.close_playing()?;
                ctx.replace_self(PreplayingState::new(self.session.clone(), level.clone()));
            }
            Message::NextLevel | Message::PreviousLevel => {
                self.close_playing()?;
                let target = {
                    let world = world::lock(&self.session.world)?;
                    if *message == Message::NextLevel {
                        world.next_level(level)
                    } else {
                        world.previous_level(level)
                    }
                };

                match target {
                    Some(target) => {
                        info!("Switching from level {} to {}", level, target);
                        ctx.replace_self(PreplayingState::new(self.session.clone(), target));
                    }
                    None => {
                        debug!("No level after {}, back to the menu", level);
                        core.request_end();
                    }
                }
            }
            Message::Abort | Message::Finish | Message::Error => {
                self.close_playing()?;
                core.request_end();
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

//=== IntroAnimation ======================================================

/// Camera intro shown before play starts.
///
/// Progress runs from 0 to 1 over `duration`; pausing stops the clock.
#[derive(Debug, Clone)]
pub struct IntroAnimation {
    duration: Duration,
    started_at: Option<Duration>,
    paused_at: Option<Duration>,
    interrupted: bool,
}

impl IntroAnimation {
    const START_ZOOM: f32 = 0.25;

    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            started_at: None,
            paused_at: None,
            interrupted: false,
        }
    }

    pub fn start(&mut self, now: Duration) {
        self.started_at = Some(now);
        self.paused_at = None;
        self.interrupted = false;
    }

    pub fn pause(&mut self, now: Duration) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    pub fn resume(&mut self, now: Duration) {
        if let (Some(paused_at), Some(started_at)) = (self.paused_at.take(), self.started_at) {
            self.started_at = Some(started_at + now.saturating_sub(paused_at));
        }
    }

    /// Skips to the end of the animation.
    pub fn interrupt(&mut self) {
        self.interrupted = true;
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn progress(&self, now: Duration) -> f32 {
        if self.interrupted || self.duration.is_zero() {
            return 1.0;
        }
        let Some(started_at) = self.started_at else {
            return 0.0;
        };

        let at = self.paused_at.unwrap_or(now);
        let elapsed = at.saturating_sub(started_at);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    pub fn is_done(&self, now: Duration) -> bool {
        !self.is_paused() && self.progress(now) >= 1.0
    }

    /// Camera zoom for `now`, from a wide view to the play view.
    pub fn zoom(&self, now: Duration) -> f32 {
        Self::START_ZOOM + (1.0 - Self::START_ZOOM) * self.progress(now)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
