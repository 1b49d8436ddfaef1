//=========================================================================
// Core Systems Orchestrator
//
// Scheduler thread driving the state stack.
//
// Responsibilities:
// - Drain platform events (input, focus, visibility, close)
// - Route input to the top state, then update, render and flush the stack
// - Pace the loop with the frame limiter at the stack's `max_fps()`
// - Tell the platform to close once the stack asks to quit
//
// Notes:
// The orchestrator runs independently from the platform layer and owns
// the `StateManager` and the renderer. Communication with the platform
// happens only through crossbeam channels.
//
//=========================================================================

//=== Module Declarations =================================================

pub mod clock;
pub mod config;
pub mod error;
pub mod frame_limiter;
pub mod gui;
pub mod input;
pub mod messaging;
pub(crate) mod platform_bridge;
pub mod render;
pub mod state;
pub mod worker;
pub mod world;

//=== External Dependencies ===============================================

use std::io;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, trace};

//=== Internal Dependencies ===============================================

use frame_limiter::FrameLimiter;
use input::InputEvent;
use platform_bridge::{CoreCommand, EventCollector, FrameEvents, PlatformEvent, TickControl};
use render::Renderer;
use state::StateManager;

//=== CoreSystemsOrchestrator =============================================

/// Owns the state stack and the renderer on the scheduler thread.
pub(crate) struct CoreSystemsOrchestrator {
    manager: StateManager,
    renderer: Box<dyn Renderer>,
}

impl CoreSystemsOrchestrator {
    //--- Construction -----------------------------------------------------

    pub(crate) fn new(manager: StateManager, renderer: Box<dyn Renderer>) -> Self {
        Self { manager, renderer }
    }

    /// State stack, for setup before the thread starts.
    pub(crate) fn manager_mut(&mut self) -> &mut StateManager {
        &mut self.manager
    }

    //--- spawn_core_thread() ---------------------------------------------
    //
    // Each iteration:
    //  1. Drains platform events (exit on close or disconnect)
    //  2. Ticks the state stack
    //  3. Sleeps to the pace of the fastest visible state
    //
    pub(crate) fn spawn_core_thread(
        mut self,
        receiver: Receiver<PlatformEvent>,
        commands: Sender<CoreCommand>,
    ) -> io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("stratum-scheduler".into())
            .spawn(move || {
                let mut collector = EventCollector::new(receiver);
                let mut limiter = FrameLimiter::new(self.manager.config().max_frame_late());

                loop {
                    if collector.collect_frame() == TickControl::Exit {
                        info!("Platform closed, scheduler exiting");
                        break;
                    }

                    if self.tick(collector.take_frame()) == TickControl::Exit {
                        info!("State stack requested quit");
                        if commands.send(CoreCommand::Exit).is_err() {
                            debug!(target: "platform", "Platform already gone");
                        }
                        break;
                    }

                    limiter.wait(self.manager.max_fps());
                }

                self.manager.shutdown();
                info!("Scheduler thread finished");
            })
    }

    //--- tick() -----------------------------------------------------------

    /// Runs one frame of the stack against the events of `frame`.
    pub(crate) fn tick(&mut self, frame: FrameEvents) -> TickControl {
        if let Some(focused) = frame.focus {
            self.manager.change_focus(focused);
        }
        if let Some(visible) = frame.visibility {
            self.manager.change_visibility(visible);
        }

        for event in frame.inputs {
            self.dispatch_input(event);
        }

        if self.manager.need_update_or_render() {
            self.manager.update();
            self.manager.render(self.renderer.as_mut());
        }
        self.manager.flush();

        if self.manager.quit_requested() {
            TickControl::Exit
        } else {
            TickControl::Continue
        }
    }

    fn dispatch_input(&mut self, event: InputEvent) {
        trace!(target: "platform::input", "Dispatching {:?}", event);
        match event {
            InputEvent::KeyDown {
                key,
                modifiers,
                character,
            } => self.manager.key_down(key, modifiers, character),
            InputEvent::KeyUp { key, modifiers } => self.manager.key_up(key, modifiers),
            InputEvent::MouseButtonDown { button, .. } => self.manager.mouse_down(button),
            InputEvent::MouseButtonUp { button, .. } => self.manager.mouse_up(button),
            InputEvent::MouseDoubleClick { button, .. } => {
                self.manager.mouse_double_click(button)
            }
            InputEvent::Unidentified => {}
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
