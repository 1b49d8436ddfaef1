//=========================================================================
// Messaging
//=========================================================================
//
// Typed asynchronous messages between states.
//
// Architecture:
//   StateContext::post() ──→ Mailbox ──→ StateManager::update()
//                                          └─ GameState::on_message()
//
// A message targets one state by id or is broadcast to every state that
// observes its kind.
//
//=========================================================================

//=== Module Declarations =================================================

mod mailbox;
mod message;

//=== Public API ==========================================================

pub use mailbox::Mailbox;
pub use message::{
    Envelope, Message, MessageBoxResult, MessageKind, MessageTarget, MsgBoxButton,
    MsgBoxButtons, MsgBoxId, TaskKind, TaskOutcome,
};
