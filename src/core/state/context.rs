//=========================================================================
// State Context
//=========================================================================
//
// Scheduler API handed to every state hook.
//
// Architecture:
//   StateManager
//     └─ StackServices { transitions, mailbox, resources, quit flag }
//           ↑ borrowed for the duration of one hook call
//   StateContext { id, now, is_top, config, &mut services }
//
// Everything a state asks for through the context is deferred: stack
// changes wait for `flush()`, messages wait for the next `update()`.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::time::Duration;

//=== Internal Dependencies ===============================================

use super::resources::ResourceRegistry;
use super::transition_queue::{Transition, TransitionQueue};
use super::{GameState, StateId};
use crate::core::config::SchedulerConfig;
use crate::core::messaging::{Mailbox, Message, MessageTarget};

//=== StackServices =======================================================

/// Deferred-work queues owned by the state manager.
#[derive(Default)]
pub(crate) struct StackServices {
    pub(crate) transitions: TransitionQueue,
    pub(crate) mailbox: Mailbox,
    pub(crate) resources: ResourceRegistry,
    pub(crate) quit_requested: bool,
}

//=== StateContext ========================================================

/// Per-call view of the scheduler given to a state.
pub struct StateContext<'a> {
    id: StateId,
    now: Duration,
    is_top: bool,
    config: &'a SchedulerConfig,
    services: &'a mut StackServices,
}

impl<'a> StateContext<'a> {
    pub(crate) fn new(
        services: &'a mut StackServices,
        config: &'a SchedulerConfig,
        id: StateId,
        now: Duration,
        is_top: bool,
    ) -> Self {
        Self {
            id,
            now,
            is_top,
            config,
            services,
        }
    }

    //--- Queries ----------------------------------------------------------

    /// Id of the state being called.
    pub fn id(&self) -> StateId {
        self.id
    }

    /// Scheduler time of this call.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Whether the called state is the top of the stack.
    pub fn is_top(&self) -> bool {
        self.is_top
    }

    pub fn config(&self) -> &SchedulerConfig {
        self.config
    }

    /// Per-state-type resources (menu GUIs).
    pub fn resources(&mut self) -> &mut ResourceRegistry {
        &mut self.services.resources
    }

    //--- Stack Transitions ------------------------------------------------

    /// Pushes `state` on top of the stack at the next flush.
    pub fn push(&mut self, state: impl GameState + 'static) {
        self.services.transitions.push(Transition::Push(Box::new(state)));
    }

    /// Pops the top of the stack at the next flush.
    pub fn pop_top(&mut self) {
        self.services.transitions.push(Transition::Pop);
    }

    /// Replaces the calling state with `state` at the next flush.
    ///
    /// The new state inherits the caller's id and stack slot.
    pub fn replace_self(&mut self, state: impl GameState + 'static) {
        let target = self.id;
        self.replace(target, Box::new(state));
    }

    /// Replaces the state `target` with `state` at the next flush.
    pub fn replace(&mut self, target: StateId, state: Box<dyn GameState>) {
        self.services
            .transitions
            .push(Transition::Replace { target, state });
    }

    //--- Messaging --------------------------------------------------------

    /// Posts `message` to the state `target`, delivered on a later tick.
    pub fn post(&mut self, message: Message, target: StateId) {
        self.services.mailbox.post(message, MessageTarget::State(target));
    }

    /// Posts `message` to every state observing its kind.
    pub fn broadcast(&mut self, message: Message) {
        self.services.mailbox.post(message, MessageTarget::Broadcast);
    }

    //--- Application ------------------------------------------------------

    /// Asks the application to end after this tick.
    pub fn request_quit(&mut self) {
        self.services.quit_requested = true;
    }
}
