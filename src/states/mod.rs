//=========================================================================
// Game States
//=========================================================================
//
// Concrete screens scheduled by the `StateManager`.
//
// Transition map:
// ```text
//   MainMenu ──push──→ Preplaying ──replace──→ Playing
//      │                  │                     ├─push──→ Pause
//      │                  └─push→ TaskProgress  ├─replace→ DeadJust ─push→ DeadMenu
//      ├─push→ Replaying                        ├─push──→ DeadMenu
//      ├─push→ EditProfile                      └─push──→ Finished
//      └─push→ TaskProgress
//
//   Pause / DeadMenu / Finished ──(Restart | NextLevel | Abort | Finish)──→ scene
//   scene ──replace──→ Preplaying  |  request end → back to MainMenu
// ```
//
// Scene-bound states share `SceneBehavior`, menu states share
// `MenuBehavior`.
//
//=========================================================================

//=== Module Declarations =================================================

mod dead;
mod edit_profile;
mod finished;
mod main_menu;
mod menu;
mod pause;
mod playing;
mod preplaying;
mod replaying;
mod scene;
mod task_progress;

//=== Public API ==========================================================

pub use dead::{DeadButton, DeadJustState, DeadMenuState};
pub use edit_profile::{EditProfileState, ProfileButton};
pub use finished::{FinishedButton, FinishedState};
pub use main_menu::{MainButton, MainMenuState};
pub use menu::{CommandReply, MenuBehavior};
pub use pause::{PauseButton, PauseState};
pub use playing::PlayingState;
pub use preplaying::PreplayingState;
pub use replaying::ReplayingState;
pub use scene::{IntroAnimation, SceneBehavior};
pub use task_progress::TaskProgressState;

//=== Internal Dependencies ===============================================

use crate::core::world::{ProfileHandle, WorldHandle};

//=== Session =============================================================

/// Collaborators shared by every state of a game session.
#[derive(Clone)]
pub struct Session {
    pub world: WorldHandle,
    pub profiles: ProfileHandle,
    /// Fetch the reference ghost before each level.
    pub download_ghosts: bool,
}

impl Session {
    pub fn new(world: WorldHandle, profiles: ProfileHandle) -> Self {
        Self {
            world,
            profiles,
            download_ghosts: false,
        }
    }

    pub fn with_ghost_downloads(mut self, enabled: bool) -> Self {
        self.download_ghosts = enabled;
        self
    }
}
