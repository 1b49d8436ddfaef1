//=========================================================================
// World Interface
//=========================================================================
//
// Boundary between scene-bound states and the simulation they drive.
//
// Architecture:
//   Application ──owns──→ WorldHandle = Arc<Mutex<dyn World>>
//                              ↑ cloned into
//   PreplayingState / PlayingState / ReplayingState / DeadJustState
//
// The simulation itself (integration, collision, camera) lives behind the
// `World` trait. States only load levels, advance fixed physics steps and
// read the player status.
//
// Downloads are split in two: `*_fetch` hands out an owned job for a
// worker thread, `install_*` applies its result on the scheduler thread.
// The world lock is never held by a worker.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

//=== Internal Dependencies ===============================================

use crate::core::error::StateError;
use crate::core::worker::ProgressReporter;

//=== Module Declarations =================================================

mod profile;
mod scripted;

//=== Public API ==========================================================

pub use profile::{lock_profiles, MemoryProfileStore, ProfileHandle, ProfileStore};
pub use scripted::ScriptedWorld;

//=== LevelId =============================================================

/// Identifier of a playable level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LevelId(String);

impl LevelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LevelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

//=== PlayerStatus ========================================================

/// Aggregated status of the players of the running level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    /// At least one player is still playing.
    Playing,
    /// Every player is dead.
    Dead,
    /// A player reached the end of the level.
    Finished,
}

//=== Downloads ===========================================================

/// Reference run of a level, raced against by the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ghost {
    pub level: LevelId,
    pub frames: Vec<u8>,
}

/// Owned download job handed to a worker thread.
pub type FetchJob<T> = Box<dyn FnOnce(&ProgressReporter) -> Result<T, String> + Send>;

//=== World Trait =========================================================

/// Simulation collaborator driven by the scene-bound states.
pub trait World: Send {
    //--- Levels -----------------------------------------------------------

    /// Levels available to play, in menu order.
    fn levels(&self) -> Vec<LevelId>;

    fn current_level(&self) -> Option<LevelId>;

    /// Prepares `level` for play. The simulation does not advance until
    /// [`start_play`](World::start_play).
    fn load_level(&mut self, level: &LevelId) -> Result<(), StateError>;

    fn start_play(&mut self) -> Result<(), StateError>;

    /// Advances the simulation by one fixed step.
    fn step_physics(&mut self, step: Duration) -> Result<(), StateError>;

    fn player_status(&self) -> PlayerStatus;

    /// Tears down the running level or replay.
    fn end_level(&mut self);

    /// Level following `level` in menu order.
    fn next_level(&self, level: &LevelId) -> Option<LevelId> {
        let levels = self.levels();
        let position = levels.iter().position(|l| l == level)?;
        levels.get(position + 1).cloned()
    }

    /// Level preceding `level` in menu order.
    fn previous_level(&self, level: &LevelId) -> Option<LevelId> {
        let levels = self.levels();
        let position = levels.iter().position(|l| l == level)?;
        position.checked_sub(1).and_then(|p| levels.get(p).cloned())
    }

    //--- Downloads --------------------------------------------------------
    //
    // Fetch jobs run on a worker thread and own everything they need. They
    // never reach back into the world; their result is installed on the
    // scheduler thread once the task has finished.

    /// Job fetching the current level list. Defaults to the known levels.
    fn levels_fetch(&self) -> FetchJob<Vec<LevelId>> {
        let levels = self.levels();
        Box::new(move |_| Ok(levels))
    }

    /// Replaces the level list. Returns the number of levels.
    fn install_levels(&mut self, levels: Vec<LevelId>) -> Result<usize, StateError>;

    /// Job fetching the best ghost of `level`, or `None` when the world
    /// has no ghosts.
    fn ghost_fetch(&self, _level: &LevelId) -> Option<FetchJob<Ghost>> {
        None
    }

    fn install_ghost(&mut self, _ghost: Ghost) -> Result<(), StateError> {
        Ok(())
    }

    //--- Replays ----------------------------------------------------------

    fn replays(&self) -> Vec<String>;

    fn load_replay(&mut self, name: &str) -> Result<(), StateError>;

    /// Whether the loaded replay has played to its end.
    fn replay_finished(&self) -> bool;

    /// Stores the last played run under `name`.
    fn save_replay(&mut self, name: &str) -> Result<(), StateError>;

    /// Simulated time of the running level or replay.
    fn game_time(&self) -> Duration;
}

//=== WorldHandle =========================================================

/// World shared between the application and the scene-bound states.
pub type WorldHandle = Arc<Mutex<dyn World>>;

/// Locks `world`, mapping a poisoned lock to [`StateError::WorldPoisoned`].
pub fn lock(world: &WorldHandle) -> Result<MutexGuard<'_, dyn World + 'static>, StateError> {
    world.lock().map_err(|_| StateError::WorldPoisoned)
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> WorldHandle {
        Arc::new(Mutex::new(ScriptedWorld::new(["first", "second", "third"])))
    }

    #[test]
    fn level_navigation_follows_menu_order() {
        let world = handle();
        let world = lock(&world).unwrap();

        assert_eq!(world.next_level(&"first".into()), Some(LevelId::new("second")));
        assert_eq!(world.next_level(&"third".into()), None);
        assert_eq!(world.previous_level(&"second".into()), Some(LevelId::new("first")));
        assert_eq!(world.previous_level(&"first".into()), None);
        assert_eq!(world.next_level(&"missing".into()), None);
    }

    #[test]
    fn poisoned_lock_maps_to_state_error() {
        let world = handle();
        let clone = world.clone();
        let _ = std::thread::spawn(move || {
            let _guard = clone.lock().unwrap();
            panic!("poison");
        })
        .join();

        assert_eq!(lock(&world).err(), Some(StateError::WorldPoisoned));
    }

    #[test]
    fn level_id_display() {
        assert_eq!(LevelId::new("tut1").to_string(), "tut1");
    }
}
