//=========================================================================
// Platform Bridge Interface
//=========================================================================
//
// Messages crossing the platform/scheduler thread boundary.
//
// Architecture:
//   Platform ──PlatformEvent──→ scheduler thread
//   Platform ←──CoreCommand─── scheduler thread
//
//=========================================================================

//=== Internal Dependencies ===============================================

use crate::core::input::InputEvent;

//=== PlatformEvent =======================================================

/// Events sent from the platform to the scheduler thread.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PlatformEvent {
    /// Input gathered since the last frame boundary, in arrival order.
    Inputs(Vec<InputEvent>),

    /// The window gained (`true`) or lost keyboard focus.
    FocusChanged(bool),

    /// The window became visible (`true`) or fully occluded.
    VisibilityChanged(bool),

    /// Window close requested.
    WindowClosed,
}

//=== CoreCommand =========================================================

/// Requests sent from the scheduler thread back to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CoreCommand {
    /// The state stack asked to quit; close the window.
    Exit,
}
