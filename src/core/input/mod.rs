//=========================================================================
// Input
//=========================================================================
//
// Engine-side input vocabulary.
//
// The platform converts backend events into `InputEvent`s; the scheduler
// thread hands each one to the top of the state stack.
//
//=========================================================================

//=== Module Declarations =================================================

pub mod event;

//=== Public API ==========================================================

pub use event::{InputEvent, KeyCode, Modifiers, MouseButton};
