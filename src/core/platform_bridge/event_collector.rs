//=========================================================================
// Event Collector
//=========================================================================
//
// Scheduler-side drain of platform events with bounded polling and
// shutdown detection.
//
// Architecture:
//   Receiver<PlatformEvent> → collect_frame() → FrameEvents → TickControl
//
// Bounded polling prevents starvation. Pacing is left to the frame
// limiter, so an empty queue returns at once.
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{Receiver, TryRecvError};
use log::{debug, warn};

//=== Internal Dependencies ===============================================

use super::PlatformEvent;
use crate::core::input::InputEvent;

//=== TickControl =========================================================

/// Scheduler loop control signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickControl {
    Continue,
    Exit,
}

//=== FrameEvents =========================================================

/// Everything the platform reported since the previous frame.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct FrameEvents {
    pub(crate) inputs: Vec<InputEvent>,
    /// Latest focus change, if any.
    pub(crate) focus: Option<bool>,
    /// Latest visibility change, if any.
    pub(crate) visibility: Option<bool>,
}

//=== EventCollector ======================================================

/// Collects platform events with bounded polling.
pub(crate) struct EventCollector {
    receiver: Receiver<PlatformEvent>,
    frame: FrameEvents,
}

impl EventCollector {
    const MAX_EVENTS_PER_FRAME: usize = 100;

    pub(crate) fn new(receiver: Receiver<PlatformEvent>) -> Self {
        Self {
            receiver,
            frame: FrameEvents {
                inputs: Vec::with_capacity(32),
                ..FrameEvents::default()
            },
        }
    }

    /// Drains pending platform events (bounded to prevent starvation).
    pub(crate) fn collect_frame(&mut self) -> TickControl {
        self.frame.inputs.clear();
        self.frame.focus = None;
        self.frame.visibility = None;

        let mut drained = 0;
        while drained < Self::MAX_EVENTS_PER_FRAME {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.handle_event(event) == TickControl::Exit {
                        return TickControl::Exit;
                    }
                    drained += 1;
                }
                Err(TryRecvError::Disconnected) => {
                    debug!(target: "platform", "Platform channel disconnected");
                    return TickControl::Exit;
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        if drained >= Self::MAX_EVENTS_PER_FRAME {
            warn!("Event queue backlog: drained {} events this frame", drained);
        }

        TickControl::Continue
    }

    /// Events collected by the last `collect_frame()`.
    #[cfg(test)]
    pub(crate) fn frame(&self) -> &FrameEvents {
        &self.frame
    }

    /// Takes the collected events, leaving an empty frame behind.
    pub(crate) fn take_frame(&mut self) -> FrameEvents {
        std::mem::take(&mut self.frame)
    }

    fn handle_event(&mut self, event: PlatformEvent) -> TickControl {
        match event {
            PlatformEvent::Inputs(batch) => {
                self.frame.inputs.extend(batch);
                TickControl::Continue
            }
            PlatformEvent::FocusChanged(focused) => {
                self.frame.focus = Some(focused);
                TickControl::Continue
            }
            PlatformEvent::VisibilityChanged(visible) => {
                self.frame.visibility = Some(visible);
                TickControl::Continue
            }
            PlatformEvent::WindowClosed => TickControl::Exit,
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
