//=========================================================================
// State Core
//=========================================================================
//
// Bookkeeping shared by every game state.
//
// Architecture:
//   StateCore
//     ├─ identity: StateId (assigned on push), name
//     ├─ flags:    draw/update states behind, cursor
//     ├─ computed: hidden (written by the manager)
//     ├─ lifecycle: request_for_end
//     └─ cadence:  update/render FpsGovernor, shared max fps
//
// States embed a `StateCore` and expose it through
// `GameState::core()`/`core_mut()`.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::time::Duration;

//=== Internal Dependencies ===============================================

use super::governor::FpsGovernor;

//=== Constants ===========================================================

/// Update and render rate of a state that does not ask for another one.
pub const DEFAULT_STATE_FPS: u32 = 50;

//=== StateId =============================================================

/// Unique identity of a state on the stack.
///
/// Assigned by the manager when the state is pushed. A state that
/// replaces another one inherits its id, so messages addressed to the
/// slot keep reaching whoever occupies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(u64);

impl StateId {
    /// Id carried by a state that has not been pushed yet.
    pub const UNASSIGNED: Self = Self(0);

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn is_assigned(self) -> bool {
        self != Self::UNASSIGNED
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//=== StateKind ===========================================================

/// Capability family of a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    /// Full-screen menu.
    Menu,
    /// Wraps a live simulation.
    Scene,
    /// Transient layer drawn over the states below.
    Overlay,
    /// Anything else.
    Plain,
}

//=== StateFlags ==========================================================

/// Static composition flags of a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateFlags {
    /// States below stay visible while this one is on top.
    pub draw_states_behind: bool,

    /// States below keep updating while this one is on top.
    pub update_states_behind: bool,

    /// Draw the mouse cursor while this state is on top.
    pub show_cursor: bool,
}

impl StateFlags {
    /// Full-screen state that freezes and hides what is below it.
    pub const OPAQUE: Self = Self {
        draw_states_behind: false,
        update_states_behind: false,
        show_cursor: true,
    };

    /// Overlay that keeps the states below visible but frozen.
    pub const OVERLAY: Self = Self {
        draw_states_behind: true,
        update_states_behind: false,
        show_cursor: true,
    };

    /// Overlay that keeps the states below visible and running.
    pub const TRANSPARENT: Self = Self {
        draw_states_behind: true,
        update_states_behind: true,
        show_cursor: true,
    };

    pub const fn without_cursor(self) -> Self {
        Self {
            show_cursor: false,
            ..self
        }
    }
}

//=== StateCore ===========================================================

/// Identity, flags and cadence of a game state.
#[derive(Debug, Clone)]
pub struct StateCore {
    id: StateId,
    name: &'static str,
    flags: StateFlags,
    hidden: bool,
    request_for_end: bool,
    update: FpsGovernor,
    render: FpsGovernor,
    max_fps: u32,
}

impl StateCore {
    //--- Construction -----------------------------------------------------

    pub fn new(name: &'static str, flags: StateFlags) -> Self {
        Self {
            id: StateId::UNASSIGNED,
            name,
            flags,
            hidden: false,
            request_for_end: false,
            update: FpsGovernor::new(DEFAULT_STATE_FPS),
            render: FpsGovernor::new(DEFAULT_STATE_FPS),
            max_fps: DEFAULT_STATE_FPS,
        }
    }

    pub fn with_update_fps(mut self, fps: u32) -> Self {
        self.update.set_fps(fps);
        self
    }

    pub fn with_render_fps(mut self, fps: u32) -> Self {
        self.render.set_fps(fps);
        self
    }

    //--- Identity ---------------------------------------------------------

    pub fn id(&self) -> StateId {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: StateId) {
        self.id = id;
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    //--- Flags ------------------------------------------------------------

    pub fn flags(&self) -> StateFlags {
        self.flags
    }

    pub fn draw_states_behind(&self) -> bool {
        self.flags.draw_states_behind
    }

    pub fn update_states_behind(&self) -> bool {
        self.flags.update_states_behind
    }

    pub fn show_cursor(&self) -> bool {
        self.flags.show_cursor
    }

    /// Whether an opaque state above hides this one.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub(crate) fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    //--- Lifecycle --------------------------------------------------------

    /// Asks the manager to pop this state at the next flush.
    ///
    /// The state stays resident (and keeps receiving hooks) until then.
    pub fn request_end(&mut self) {
        self.request_for_end = true;
    }

    pub fn request_for_end(&self) -> bool {
        self.request_for_end
    }

    //--- Cadence ----------------------------------------------------------

    pub fn update_fps(&self) -> u32 {
        self.update.fps()
    }

    pub fn render_fps(&self) -> u32 {
        self.render.fps()
    }

    pub fn set_update_fps(&mut self, fps: u32) {
        self.update.set_fps(fps);
    }

    pub fn set_render_fps(&mut self, fps: u32) {
        self.render.set_fps(fps);
    }

    /// Rate of the shared loop, as last computed by the manager.
    pub fn max_fps(&self) -> u32 {
        self.max_fps
    }

    pub(crate) fn set_max_fps(&mut self, fps: u32) {
        self.max_fps = fps;
    }

    /// Returns `true` if this state's own update tick is due.
    pub fn do_update(&mut self, now: Duration) -> bool {
        self.update.ready(now)
    }

    /// Returns `true` if this state's own render tick is due.
    pub fn do_render(&mut self, now: Duration) -> bool {
        self.render.ready(now)
    }

    /// Restarts the update cadence at `now` (used on resume).
    pub fn resync_update(&mut self, now: Duration) {
        self.update.resync(now);
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
