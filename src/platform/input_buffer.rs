//=========================================================================
// Input Buffer
//
// Collects converted input events between two frame boundaries.
//
// Responsibilities:
// - Keep events in arrival order
// - Drop consecutive duplicates (OS key repeat flooding a frame)
// - Hand the frame's events over in one batch via `drain()`
//
// Notes:
// The buffer lives on the platform thread and is emptied on every
// `RedrawRequested`.
//=========================================================================

//=== Internal Modules ====================================================
use crate::core::input::InputEvent;

//=== InputBuffer Struct ==================================================
pub(crate) struct InputBuffer {
    events: Vec<InputEvent>,
}

impl InputBuffer {
    //--- Construction -----------------------------------------------------
    pub(crate) fn new() -> Self {
        const BASE_CAPACITY: usize = 64;

        Self {
            events: Vec::with_capacity(BASE_CAPACITY),
        }
    }

    //--- Event Handling ---------------------------------------------------
    //
    // Appends an event unless it repeats the previous one.
    //
    pub(crate) fn push(&mut self, event: InputEvent) {
        if self.events.last() != Some(&event) {
            self.events.push(event);
        }
    }

    //--- Drain ------------------------------------------------------------
    //
    // Returns the frame's events, or `None` when nothing was buffered.
    //
    pub(crate) fn drain(&mut self) -> Option<Vec<InputEvent>> {
        if self.events.is_empty() {
            return None;
        }
        Some(self.events.drain(..).collect())
    }

    //--- Utilities --------------------------------------------------------
    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
