//=========================================================================
// Mailbox
//=========================================================================
//
// FIFO of messages posted by states.
//
// States post here during any hook. The state manager takes the whole
// queue at the start of `update()` and delivers it; messages posted
// during delivery wait for the next tick.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::VecDeque;

//=== Internal Dependencies ===============================================

use super::{Envelope, Message, MessageTarget};

//=== Mailbox =============================================================

/// Queue of messages awaiting delivery.
#[derive(Debug, Default)]
pub struct Mailbox {
    queue: VecDeque<Envelope>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a message for delivery on the next dispatch.
    pub fn post(&mut self, message: Message, target: MessageTarget) {
        self.queue.push_back(Envelope { target, message });
    }

    /// Returns an iterator over queued envelopes, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Envelope> {
        self.queue.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Drops every pending message.
    pub fn clear(&mut self) {
        self.queue.clear()
    }

    /// Takes all queued envelopes, leaving the mailbox empty.
    pub fn take(&mut self) -> VecDeque<Envelope> {
        std::mem::take(&mut self.queue)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::StateId;

    #[test]
    fn new_mailbox_is_empty() {
        let mailbox = Mailbox::new();
        assert!(mailbox.is_empty());
        assert_eq!(mailbox.len(), 0);
    }

    #[test]
    fn take_preserves_post_order() {
        let mut mailbox = Mailbox::new();
        let target = MessageTarget::State(StateId::from_raw(1));
        mailbox.post(Message::Restart, target);
        mailbox.post(Message::Abort, MessageTarget::Broadcast);

        let taken: Vec<_> = mailbox.take().into_iter().map(|e| e.message).collect();

        assert_eq!(taken, vec![Message::Restart, Message::Abort]);
        assert!(mailbox.is_empty());
    }

    #[test]
    fn clear_drops_pending() {
        let mut mailbox = Mailbox::new();
        mailbox.post(Message::LevelsUpdated, MessageTarget::Broadcast);
        mailbox.clear();
        assert_eq!(mailbox.iter().count(), 0);
    }
}
