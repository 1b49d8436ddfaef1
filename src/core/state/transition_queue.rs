//=========================================================================
// Transition Queue
//=========================================================================
//
// Stack mutations requested by states.
//
// States queue transitions here from any hook. The state manager applies
// the queue in `flush()`, once per tick, so no traversal ever sees the
// stack change under it.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;

//=== Internal Dependencies ===============================================

use super::{GameState, StateId};

//=== Transition ==========================================================

/// Deferred stack operation.
pub enum Transition {
    /// Pushes a new state on top of the stack.
    Push(Box<dyn GameState>),

    /// Pops the top of the stack.
    Pop,

    /// Puts `state` in the slot of `target`, which it inherits the id of.
    Replace {
        target: StateId,
        state: Box<dyn GameState>,
    },
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push(state) => write!(f, "Push({})", state.core().name()),
            Self::Pop => f.write_str("Pop"),
            Self::Replace { target, state } => {
                write!(f, "Replace({} -> {})", target, state.core().name())
            }
        }
    }
}

//=== Transition Queue ====================================================

/// FIFO of transitions waiting for the next flush.
#[derive(Debug, Default)]
pub struct TransitionQueue {
    queue: Vec<Transition>,
}

impl TransitionQueue {
    /// Creates a new empty transition queue.
    pub fn new() -> Self {
        Self { queue: Vec::new() }
    }

    /// Queues a transition to be applied at the next flush.
    pub fn push(&mut self, transition: Transition) {
        self.queue.push(transition);
    }

    /// Returns an iterator over the queued transitions.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.queue.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Drops all queued transitions (and the states they carry).
    pub fn clear(&mut self) {
        self.queue.clear()
    }

    /// Takes all transitions from the queue, leaving it empty.
    pub fn take(&mut self) -> Vec<Transition> {
        std::mem::take(&mut self.queue)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
