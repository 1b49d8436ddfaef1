//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use stratum_engine::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Engine facade
pub use crate::engine::{Engine, EngineBuilder};

// Configuration and errors
pub use crate::core::config::SchedulerConfig;
pub use crate::core::error::{EngineError, StateError};

// State stack
pub use crate::core::state::{
    GameState, MessageBoxState, StateContext, StateCore, StateFlags, StateId, StateKind,
    StateManager,
};

// Messaging
pub use crate::core::messaging::{
    Message, MessageBoxResult, MessageKind, MessageTarget, MsgBoxButton, MsgBoxButtons, MsgBoxId,
};

// Input and rendering
pub use crate::core::input::{InputEvent, KeyCode, Modifiers, MouseButton};
pub use crate::core::render::{NullRenderer, Renderer, TraceRenderer};

// World collaborators
pub use crate::core::world::{
    LevelId, MemoryProfileStore, PlayerStatus, ProfileHandle, ProfileStore, ScriptedWorld, World,
    WorldHandle,
};

// Shipped screens
pub use crate::states::{MainMenuState, Session};
