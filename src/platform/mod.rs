//=========================================================================
// Platform Subsystem
//
// Bridges Winit (OS-level events) with the scheduler thread.
//
// Architecture:
// ```text
//  Main Thread:                     Scheduler Thread:
//  ┌──────────────────────────┐    ┌──────────────────────┐
//  │  Winit Event Loop        │    │  EventCollector      │
//  │   ↓                      │    │   ↓                  │
//  │  InputProcessor          │    │  StateManager        │
//  │   ├─ Converts Winit      │    │   ├─ input → top     │
//  │   ├─ Tracks modifiers    │    │   ├─ update()        │
//  │   └─ Detects dbl-click   │    │   ├─ render()        │
//  │   ↓                      │    │   └─ flush()         │
//  │  InputBuffer             │    │                      │
//  │   ↓ RedrawRequested      │    │                      │
//  │  PlatformEvent ──────────┼───→│                      │
//  │  CoreCommand ←───────────┼────│  quit requested      │
//  └──────────────────────────┘    └──────────────────────┘
// ```
//
// Focus and occlusion changes are forwarded at once; input is batched
// until the next RedrawRequested. If the scheduler is gone the platform
// logs and keeps running so the window can still be closed.
//
//=========================================================================

//=== Submodules ==========================================================

mod input_buffer;
mod input_processor;

//=== External Crates =====================================================

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use log::*;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowAttributes, WindowId},
};

//=== Internal Imports ====================================================

use crate::core::error::PlatformError;
use crate::core::platform_bridge::{CoreCommand, PlatformEvent};
use input_buffer::InputBuffer;
use input_processor::InputProcessor;

//=== Platform ============================================================

/// Window owner and input aggregator.
///
/// Runs on the main thread (Winit requirement on macOS/iOS) and talks to
/// the scheduler thread only through the two channels.
pub(crate) struct Platform {
    /// OS window handle (None until `resumed()` called).
    window: Option<Window>,
    title: String,
    buffer: InputBuffer,
    event_sender: Sender<PlatformEvent>,
    commands: Receiver<CoreCommand>,
    input_processor: InputProcessor,
}

impl Platform {
    //--- Construction -----------------------------------------------------

    /// Does not create the window yet, that happens in `resumed()`.
    pub fn new(
        event_sender: Sender<PlatformEvent>,
        commands: Receiver<CoreCommand>,
        title: impl Into<String>,
        double_click: Duration,
    ) -> Self {
        info!(target: "platform", "Platform subsystem initialized");
        Self {
            window: None,
            title: title.into(),
            buffer: InputBuffer::new(),
            event_sender,
            commands,
            input_processor: InputProcessor::new(double_click),
        }
    }

    //--- Execution --------------------------------------------------------

    /// Runs the Winit event loop until the window closes or the scheduler
    /// asks to quit.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] if the event loop cannot be created or
    /// fails while running.
    pub fn run(mut self) -> Result<(), PlatformError> {
        debug!(target: "platform", "Starting Winit event loop");

        let event_loop = EventLoop::new().map_err(PlatformError::EventLoopCreation)?;

        event_loop
            .run_app(&mut self)
            .map_err(PlatformError::EventLoopExecution)
    }

    //--- Internal Helpers -------------------------------------------------

    /// Sends buffered input to the scheduler thread.
    ///
    /// Empty buffers are not sent. A disconnected channel drops the events.
    fn flush_input_buffer(&mut self) {
        if let Some(events) = self.buffer.drain() {
            let count = events.len();
            trace!(target: "platform::input", "Flushing {} events", count);

            if self.event_sender.send(PlatformEvent::Inputs(events)).is_err() {
                warn!(
                    target: "platform::input",
                    "Channel disconnected, dropping {} events",
                    count
                );
            }
        }
    }

    fn notify(&self, event: PlatformEvent) {
        if self.event_sender.send(event.clone()).is_err() {
            debug!(target: "platform", "Scheduler gone, {:?} not delivered", event);
        }
    }

    /// Whether the scheduler asked to close.
    fn exit_requested(&self) -> bool {
        match self.commands.try_recv() {
            Ok(CoreCommand::Exit) => true,
            Err(TryRecvError::Disconnected) => true,
            Err(TryRecvError::Empty) => false,
        }
    }

    //--- Test Accessors ---------------------------------------------------

    #[cfg(test)]
    pub(crate) fn window(&self) -> Option<&Window> {
        self.window.as_ref()
    }
}

//=== Winit Integration ===================================================

impl ApplicationHandler for Platform {
    /// Creates the window on first activation (mobile may resume again).
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            debug!(target: "platform", "Window already exists (mobile resume?)");
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title(self.title.clone())
            .with_inner_size(LogicalSize::new(800, 600));

        match event_loop.create_window(attrs) {
            Ok(window) => {
                info!(
                    target: "platform",
                    "Window created: {}x{} @ {}x DPI",
                    window.inner_size().width,
                    window.inner_size().height,
                    window.scale_factor()
                );
                window.request_redraw();
                self.window = Some(window);
            }
            Err(e) => {
                error!(target: "platform", "Window creation failed: {}", e);
                self.notify(PlatformEvent::WindowClosed);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!(target: "platform", "Window close requested");
                self.notify(PlatformEvent::WindowClosed);
                event_loop.exit();
            }

            WindowEvent::Focused(focused) => {
                debug!(target: "platform", "Focus changed: {}", focused);
                self.notify(PlatformEvent::FocusChanged(focused));
            }

            WindowEvent::Occluded(occluded) => {
                debug!(target: "platform", "Occluded: {}", occluded);
                self.notify(PlatformEvent::VisibilityChanged(!occluded));
            }

            WindowEvent::ModifiersChanged(state) => {
                trace!(target: "platform::input", "Modifiers changed: {:?}", state);
                self.input_processor.update_modifiers(state.state());
            }

            WindowEvent::KeyboardInput { event: key_event, .. } => {
                match self.input_processor.process_key_event(&key_event) {
                    Some(event) => self.buffer.push(event),
                    None => trace!(target: "platform::input", "Unmapped key ignored"),
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let event = self.input_processor.process_mouse_button(button, state);
                self.buffer.push(event);

                if state == ElementState::Pressed {
                    if let Some(double) = self.input_processor.detect_double_click(button, Instant::now()) {
                        self.buffer.push(double);
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                self.flush_input_buffer();

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested() {
            info!(target: "platform", "Scheduler requested exit");
            event_loop.exit();
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::input::{InputEvent, KeyCode};
    use crossbeam_channel::unbounded;

    fn platform() -> (Platform, Receiver<PlatformEvent>, Sender<CoreCommand>) {
        let (event_tx, event_rx) = unbounded();
        let (command_tx, command_rx) = unbounded();
        let platform = Platform::new(event_tx, command_rx, "test", Duration::from_millis(400));
        (platform, event_rx, command_tx)
    }

    #[test]
    fn platform_creation() {
        let (platform, _rx, _tx) = platform();
        assert!(platform.window().is_none(), "Window should be created lazily");
    }

    #[test]
    fn flush_empty_buffer_is_noop() {
        let (mut platform, rx, _tx) = platform();

        platform.flush_input_buffer();

        assert!(rx.try_recv().is_err(), "No events should be sent for empty buffer");
    }

    #[test]
    fn flush_sends_buffered_events() {
        let (mut platform, rx, _tx) = platform();
        platform.buffer.push(InputEvent::key(KeyCode::Space));

        platform.flush_input_buffer();

        assert_eq!(
            rx.try_recv().unwrap(),
            PlatformEvent::Inputs(vec![InputEvent::key(KeyCode::Space)])
        );
    }

    #[test]
    fn flush_handles_disconnected_channel() {
        let (mut platform, rx, _tx) = platform();
        platform.buffer.push(InputEvent::key(KeyCode::Space));
        drop(rx);

        platform.flush_input_buffer();
        assert!(platform.buffer.is_empty());
    }

    #[test]
    fn exit_requested_by_command_or_disconnect() {
        let (platform, _rx, tx) = platform();
        assert!(!platform.exit_requested());

        tx.send(CoreCommand::Exit).unwrap();
        assert!(platform.exit_requested());

        drop(tx);
        assert!(platform.exit_requested());
    }

    #[test]
    fn notify_forwards_focus_changes() {
        let (platform, rx, _tx) = platform();

        platform.notify(PlatformEvent::FocusChanged(false));

        assert_eq!(rx.try_recv().unwrap(), PlatformEvent::FocusChanged(false));
    }
}
