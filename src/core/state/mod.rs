//=========================================================================
// State System
//=========================================================================
//
// Hierarchical game-state stack and the contract every state follows.
//
// Architecture:
//   StateManager
//     ├─ stack: Vec<Box<dyn GameState>>   (bottom = oldest, top = input)
//     ├─ TransitionQueue                   (deferred push/pop/replace)
//     ├─ Mailbox                           (deferred messages)
//     └─ ResourceRegistry                  (per-state-type GUIs)
//
// Flow (one tick):
//   input → top only
//   update() → mailbox delivery → top-down until !update_states_behind
//   render() → bottom-up, hidden states skipped
//   flush()  → queued transitions, then pop states that requested end
//
//=========================================================================

//=== Module Declarations =================================================

mod context;
mod governor;
mod manager;
mod message_box;
mod resources;
mod state_core;
mod transition_queue;

//=== Public API ==========================================================

pub use context::StateContext;
pub use governor::{FpsCounter, FpsGovernor};
pub use manager::StateManager;
pub use message_box::{BoxPhase, MessageBoxState};
pub use resources::{ResourceRegistry, StateResource};
pub use state_core::{StateCore, StateFlags, StateId, StateKind, DEFAULT_STATE_FPS};
pub use transition_queue::{Transition, TransitionQueue};

//=== Internal Dependencies ===============================================

use crate::core::error::StateError;
use crate::core::input::{KeyCode, Modifiers, MouseButton};
use crate::core::messaging::{Message, MessageKind};
use crate::core::render::Renderer;

//=== GameState Trait =====================================================

/// A screen of the application, scheduled by the [`StateManager`].
///
/// Lifecycle:
///
/// ```text
/// constructed ─push→ enter() ─┬─ leave_after_push()  (another state pushed above)
///                             │   enter_after_pop()   (that state popped)
///                             └─ leave() ─→ returned to the owner, dropped
/// ```
///
/// Only `core()`/`core_mut()` are required; every hook defaults to a
/// no-op. Hooks never mutate the stack directly: they ask through the
/// [`StateContext`], and the manager applies the request at `flush()`.
///
/// # Minimal Implementation
///
/// ```rust
/// use stratum_engine::core::state::{GameState, StateCore, StateFlags};
///
/// struct Splash {
///     core: StateCore,
/// }
///
/// impl GameState for Splash {
///     fn core(&self) -> &StateCore {
///         &self.core
///     }
///
///     fn core_mut(&mut self) -> &mut StateCore {
///         &mut self.core
///     }
/// }
/// ```
pub trait GameState: Send {
    /// Shared bookkeeping (id, flags, cadence).
    fn core(&self) -> &StateCore;

    fn core_mut(&mut self) -> &mut StateCore;

    /// Capability family, used by stack queries.
    fn kind(&self) -> StateKind {
        StateKind::Plain
    }

    //--- Lifecycle --------------------------------------------------------

    /// Called once when the state enters the stack (push or replace).
    ///
    /// Recoverable failures should be handled here by queuing a message
    /// box; an error that escapes makes the manager replace this state
    /// with an error box.
    fn enter(&mut self, _ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        Ok(())
    }

    /// Called once when the state leaves the stack (pop or replace).
    fn leave(&mut self, _ctx: &mut StateContext<'_>) {}

    /// Called when the state above this one was popped.
    fn enter_after_pop(&mut self, _ctx: &mut StateContext<'_>) {}

    /// Called when another state is pushed above this one.
    fn leave_after_push(&mut self, _ctx: &mut StateContext<'_>) {}

    //--- Frame Hooks ------------------------------------------------------

    fn update(&mut self, _ctx: &mut StateContext<'_>) -> Result<(), StateError> {
        Ok(())
    }

    fn render(
        &mut self,
        _ctx: &mut StateContext<'_>,
        _renderer: &mut dyn Renderer,
    ) -> Result<(), StateError> {
        Ok(())
    }

    /// Called on every visible state once the frame has been presented.
    fn on_render_flush(&mut self, _ctx: &mut StateContext<'_>) {}

    /// Keep updating while the window has no focus.
    fn update_when_invisible(&self) -> bool {
        false
    }

    //--- Input (top of stack only) ----------------------------------------

    fn key_down(
        &mut self,
        _ctx: &mut StateContext<'_>,
        _key: KeyCode,
        _modifiers: Modifiers,
        _character: Option<char>,
    ) {
    }

    fn key_up(&mut self, _ctx: &mut StateContext<'_>, _key: KeyCode, _modifiers: Modifiers) {}

    fn mouse_down(&mut self, _ctx: &mut StateContext<'_>, _button: MouseButton) {}

    fn mouse_double_click(&mut self, _ctx: &mut StateContext<'_>, _button: MouseButton) {}

    fn mouse_up(&mut self, _ctx: &mut StateContext<'_>, _button: MouseButton) {}

    //--- Messaging --------------------------------------------------------

    /// Handles a message addressed to this state or broadcast to a kind it
    /// observes.
    fn on_message(
        &mut self,
        _ctx: &mut StateContext<'_>,
        _message: Message,
    ) -> Result<(), StateError> {
        Ok(())
    }

    /// Whether broadcasts of `kind` should be delivered to this state.
    fn observes(&self, _kind: MessageKind) -> bool {
        false
    }
}
