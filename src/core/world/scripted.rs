//=========================================================================
// Scripted World
//=========================================================================
//
// Deterministic `World` used by the demo binary and the tests.
//
// Players die or finish after a configured number of physics steps,
// levels whose id starts with "broken" fail to load, and replays end
// after a fixed number of steps. Ghost and level downloads can be slowed
// down to mimic a network.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::debug;

//=== Internal Dependencies ===============================================

use super::{FetchJob, Ghost, LevelId, PlayerStatus, World};
use crate::core::error::StateError;

//=== Constants ===========================================================

const DEFAULT_REPLAY_STEPS: u64 = 500;

//=== ScriptedWorld =======================================================

#[derive(Debug, Clone)]
pub struct ScriptedWorld {
    levels: Vec<LevelId>,
    replays: Vec<String>,
    current: Option<LevelId>,
    playing: bool,
    replaying: bool,
    steps: u64,
    game_time: Duration,
    death_after: Option<u64>,
    finish_after: Option<u64>,
    replay_steps: u64,
    remote_levels: Option<Vec<LevelId>>,
    fetch_delay: Duration,
    ghost_fetches: Arc<AtomicUsize>,
    ghost: Option<Ghost>,
}

impl ScriptedWorld {
    pub fn new<I, S>(levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            levels: levels.into_iter().map(LevelId::new).collect(),
            replays: Vec::new(),
            current: None,
            playing: false,
            replaying: false,
            steps: 0,
            game_time: Duration::ZERO,
            death_after: None,
            finish_after: None,
            replay_steps: DEFAULT_REPLAY_STEPS,
            remote_levels: None,
            fetch_delay: Duration::ZERO,
            ghost_fetches: Arc::new(AtomicUsize::new(0)),
            ghost: None,
        }
    }

    pub fn with_replays<I, S>(mut self, replays: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replays = replays.into_iter().map(Into::into).collect();
        self
    }

    /// Kills every player after `steps` physics steps.
    pub fn with_death_after(mut self, steps: u64) -> Self {
        self.death_after = Some(steps);
        self
    }

    /// Finishes the level after `steps` physics steps.
    pub fn with_finish_after(mut self, steps: u64) -> Self {
        self.finish_after = Some(steps);
        self
    }

    pub fn with_replay_steps(mut self, steps: u64) -> Self {
        self.replay_steps = steps;
        self
    }

    /// Level list served by the next level download.
    pub fn with_remote_levels<I, S>(mut self, levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remote_levels = Some(levels.into_iter().map(LevelId::new).collect());
        self
    }

    /// Time every download job spends on its worker thread.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Physics steps run since the last level or replay load.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_replaying(&self) -> bool {
        self.replaying
    }

    /// Ghost download jobs run so far.
    pub fn ghost_fetches(&self) -> usize {
        self.ghost_fetches.load(Ordering::SeqCst)
    }

    /// Ghost installed for the current level.
    pub fn ghost(&self) -> Option<&Ghost> {
        self.ghost.as_ref()
    }

    fn reset_run(&mut self) {
        self.steps = 0;
        self.game_time = Duration::ZERO;
        self.playing = false;
        self.replaying = false;
    }
}

//=== World Implementation ================================================

impl World for ScriptedWorld {
    fn levels(&self) -> Vec<LevelId> {
        self.levels.clone()
    }

    fn current_level(&self) -> Option<LevelId> {
        self.current.clone()
    }

    fn load_level(&mut self, level: &LevelId) -> Result<(), StateError> {
        if !self.levels.contains(level) {
            return Err(StateError::LevelLoad {
                level: level.to_string(),
                reason: "unknown level".into(),
            });
        }
        if level.as_str().starts_with("broken") {
            return Err(StateError::LevelLoad {
                level: level.to_string(),
                reason: "corrupted level file".into(),
            });
        }

        debug!("Loaded level {}", level);
        self.reset_run();
        if self.ghost.as_ref().is_some_and(|ghost| ghost.level != *level) {
            self.ghost = None;
        }
        self.current = Some(level.clone());
        Ok(())
    }

    fn start_play(&mut self) -> Result<(), StateError> {
        if self.current.is_none() {
            return Err(StateError::Simulation("no level loaded".into()));
        }
        self.playing = true;
        Ok(())
    }

    fn step_physics(&mut self, step: Duration) -> Result<(), StateError> {
        if !self.playing && !self.replaying {
            return Err(StateError::Simulation("no level running".into()));
        }
        self.steps += 1;
        self.game_time += step;
        Ok(())
    }

    fn player_status(&self) -> PlayerStatus {
        if self.replaying {
            return PlayerStatus::Playing;
        }
        if self.finish_after.is_some_and(|after| self.steps >= after) {
            return PlayerStatus::Finished;
        }
        if self.death_after.is_some_and(|after| self.steps >= after) {
            return PlayerStatus::Dead;
        }
        PlayerStatus::Playing
    }

    fn end_level(&mut self) {
        self.playing = false;
        self.replaying = false;
    }

    fn levels_fetch(&self) -> FetchJob<Vec<LevelId>> {
        let levels = self.remote_levels.clone().unwrap_or_else(|| self.levels.clone());
        let delay = self.fetch_delay;
        Box::new(move |reporter| {
            reporter.report(10);
            thread::sleep(delay);
            Ok(levels)
        })
    }

    fn install_levels(&mut self, levels: Vec<LevelId>) -> Result<usize, StateError> {
        debug!("Installing {} levels", levels.len());
        self.levels = levels;
        Ok(self.levels.len())
    }

    fn ghost_fetch(&self, level: &LevelId) -> Option<FetchJob<Ghost>> {
        let level = level.clone();
        let delay = self.fetch_delay;
        let fetches = self.ghost_fetches.clone();
        Some(Box::new(move |reporter| {
            fetches.fetch_add(1, Ordering::SeqCst);
            reporter.report(0);
            thread::sleep(delay);
            if reporter.is_cancelled() {
                return Err("cancelled".into());
            }
            reporter.report(100);
            Ok(Ghost {
                frames: level.as_str().bytes().collect(),
                level,
            })
        }))
    }

    fn install_ghost(&mut self, ghost: Ghost) -> Result<(), StateError> {
        if self.current.as_ref() != Some(&ghost.level) {
            return Err(StateError::Simulation(format!(
                "ghost of {} does not match the loaded level",
                ghost.level
            )));
        }
        self.ghost = Some(ghost);
        Ok(())
    }

    fn replays(&self) -> Vec<String> {
        self.replays.clone()
    }

    fn load_replay(&mut self, name: &str) -> Result<(), StateError> {
        if !self.replays.iter().any(|r| r == name) {
            return Err(StateError::ReplayLoad {
                name: name.to_string(),
                reason: "no such replay".into(),
            });
        }

        self.reset_run();
        self.replaying = true;
        self.current = Some(LevelId::new(name));
        Ok(())
    }

    fn replay_finished(&self) -> bool {
        self.replaying && self.steps >= self.replay_steps
    }

    fn save_replay(&mut self, name: &str) -> Result<(), StateError> {
        if self.current.is_none() {
            return Err(StateError::Simulation("nothing to save".into()));
        }
        if !self.replays.iter().any(|r| r == name) {
            self.replays.push(name.to_string());
        }
        Ok(())
    }

    fn game_time(&self) -> Duration {
        self.game_time
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::worker::ProgressReporter;

    const STEP: Duration = Duration::from_millis(10);

    #[test]
    fn broken_and_unknown_levels_fail_to_load() {
        let mut world = ScriptedWorld::new(["ok", "broken_pipes"]);

        assert!(world.load_level(&"ok".into()).is_ok());
        assert!(matches!(
            world.load_level(&"broken_pipes".into()),
            Err(StateError::LevelLoad { .. })
        ));
        assert!(matches!(
            world.load_level(&"nope".into()),
            Err(StateError::LevelLoad { .. })
        ));
    }

    #[test]
    fn stepping_requires_a_started_level() {
        let mut world = ScriptedWorld::new(["ok"]);
        assert!(world.step_physics(STEP).is_err());

        world.load_level(&"ok".into()).unwrap();
        assert!(world.step_physics(STEP).is_err());

        world.start_play().unwrap();
        world.step_physics(STEP).unwrap();
        assert_eq!(world.steps(), 1);
        assert_eq!(world.game_time(), STEP);
    }

    #[test]
    fn death_after_configured_steps() {
        let mut world = ScriptedWorld::new(["ok"]).with_death_after(2);
        world.load_level(&"ok".into()).unwrap();
        world.start_play().unwrap();

        world.step_physics(STEP).unwrap();
        assert_eq!(world.player_status(), PlayerStatus::Playing);
        world.step_physics(STEP).unwrap();
        assert_eq!(world.player_status(), PlayerStatus::Dead);
    }

    #[test]
    fn replay_ends_after_configured_steps() {
        let mut world = ScriptedWorld::new(["ok"])
            .with_replays(["best"])
            .with_replay_steps(1);
        assert!(world.load_replay("other").is_err());

        world.load_replay("best").unwrap();
        assert!(!world.replay_finished());
        world.step_physics(STEP).unwrap();
        assert!(world.replay_finished());
    }

    #[test]
    fn ghost_fetch_runs_without_the_world() {
        let mut world = ScriptedWorld::new(["ok"]);
        let job = world.ghost_fetch(&"ok".into()).unwrap();
        let ghost = job(&ProgressReporter::detached()).unwrap();
        assert_eq!(world.ghost_fetches(), 1);

        assert!(world.install_ghost(ghost.clone()).is_err());
        world.load_level(&"ok".into()).unwrap();
        world.install_ghost(ghost).unwrap();
        assert_eq!(world.ghost().map(|g| g.level.as_str()), Some("ok"));
    }

    #[test]
    fn level_download_serves_remote_list() {
        let mut world = ScriptedWorld::new(["ok"]).with_remote_levels(["ok", "new"]);
        let levels = world.levels_fetch()(&ProgressReporter::detached()).unwrap();
        assert_eq!(world.levels().len(), 1);

        assert_eq!(world.install_levels(levels).unwrap(), 2);
        assert_eq!(world.levels(), vec![LevelId::new("ok"), LevelId::new("new")]);
    }

    #[test]
    fn saved_replay_is_listed_once() {
        let mut world = ScriptedWorld::new(["ok"]);
        assert!(world.save_replay("run").is_err());

        world.load_level(&"ok".into()).unwrap();
        world.save_replay("run").unwrap();
        world.save_replay("run").unwrap();
        assert_eq!(world.replays(), vec!["run".to_string()]);
    }
}
