//=========================================================================
// Platform Bridge
//=========================================================================
//
// Contract between the windowing backend and the scheduler thread.
//
// Components:
// - `interface`: event and command types exchanged over the channels
// - `event_collector`: scheduler-side draining of platform events
//
//=========================================================================

//=== Module Declarations =================================================

pub(crate) mod event_collector;
pub(crate) mod interface;

//=== Internal API ========================================================

pub(crate) use event_collector::{EventCollector, FrameEvents, TickControl};
pub(crate) use interface::{CoreCommand, PlatformEvent};
