//=========================================================================
// Stratum Engine
//
// Main entry point: wires the platform to the scheduler thread.
//
// Architecture:
// ```text
//     EngineBuilder  ──build()──>  Engine  ──init()──>  Engine  ──run()──>  [Runtime]
//         │                          │                    │
//         ├─ with_config()           └─ owns StateManager └─ spawns scheduler thread
//         ├─ with_channel_capacity()                         runs platform
//         ├─ with_renderer()                                 joins on exit
//         └─ with_title()
// ```
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{error, info};

//=== Internal Dependencies ===============================================

use crate::core::config::SchedulerConfig;
use crate::core::error::EngineError;
use crate::core::platform_bridge::{CoreCommand, PlatformEvent};
use crate::core::render::{Renderer, TraceRenderer};
use crate::core::state::StateManager;
use crate::core::CoreSystemsOrchestrator;
use crate::platform::Platform;

//=== EngineBuilder =======================================================

/// Builder for configuring and constructing an [`Engine`].
///
/// # Default Values
///
/// - **Config**: [`SchedulerConfig::default()`]
/// - **Channel capacity**: 128 events
/// - **Renderer**: [`TraceRenderer`]
/// - **Title**: "Stratum"
///
/// # Examples
///
/// ```no_run
/// use stratum_engine::EngineBuilder;
/// use stratum_engine::core::config::SchedulerConfig;
/// use stratum_engine::core::state::{GameState, StateCore, StateFlags};
///
/// struct Title {
///     core: StateCore,
/// }
///
/// impl GameState for Title {
///     fn core(&self) -> &StateCore {
///         &self.core
///     }
///
///     fn core_mut(&mut self) -> &mut StateCore {
///         &mut self.core
///     }
/// }
///
/// let config = SchedulerConfig {
///     show_fps: true,
///     ..SchedulerConfig::default()
/// };
///
/// EngineBuilder::new()
///     .with_config(config)
///     .with_channel_capacity(256)
///     .build()
///     .init(|states| {
///         states.push_state(Box::new(Title {
///             core: StateCore::new("title", StateFlags::OPAQUE),
///         }));
///     })
///     .run()?;
/// # Ok::<(), stratum_engine::core::error::EngineError>(())
/// ```
pub struct EngineBuilder {
    config: SchedulerConfig,
    channel_capacity: usize,
    renderer: Option<Box<dyn Renderer>>,
    title: String,
}

impl EngineBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
            channel_capacity: 128,
            renderer: None,
            title: "Stratum".to_string(),
        }
    }

    /// Sets the scheduler tunables.
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the channel capacity for platform → scheduler communication.
    ///
    /// Larger values absorb frame spikes; the platform blocks when the
    /// scheduler falls this many batches behind.
    ///
    /// Default: 128
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Channel capacity must be positive");
        self.channel_capacity = capacity;
        self
    }

    /// Sets the drawing backend handed to states.
    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Builds the engine. Push the first states with [`Engine::init`].
    pub fn build(self) -> Engine {
        info!(
            "Building engine (channel: {}, min fps: {})",
            self.channel_capacity, self.config.min_fps
        );

        let double_click = self.config.double_click();
        let renderer = self
            .renderer
            .unwrap_or_else(|| Box::new(TraceRenderer::default()));
        let manager = StateManager::new(self.config);

        Engine {
            orchestrator: CoreSystemsOrchestrator::new(manager, renderer),
            channel_capacity: self.channel_capacity,
            title: self.title,
            double_click,
        }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//=== Engine ==============================================================

/// Stratum engine runtime.
///
/// ```text
/// Engine (Main Thread)
///   ├─► CoreSystemsOrchestrator (Scheduler Thread @ stack max_fps)
///   │     └─► StateManager → GameStates → Renderer
///   │
///   └─► Platform (Event Loop)
///         └─► Window, Input Polling
///
/// Communication: crossbeam channels (PlatformEvent →, ← CoreCommand)
/// ```
pub struct Engine {
    orchestrator: CoreSystemsOrchestrator,
    channel_capacity: usize,
    title: String,
    double_click: std::time::Duration,
}

impl Engine {
    //--- Initialization ---------------------------------------------------

    /// Gives access to the state stack before the engine starts, usually
    /// to push the first state.
    pub fn init<F>(mut self, init_fn: F) -> Self
    where
        F: FnOnce(&mut StateManager),
    {
        info!("Initializing state stack");
        init_fn(self.orchestrator.manager_mut());
        info!(
            "State stack initialized with {} states",
            self.orchestrator.manager_mut().number_of_states()
        );
        self
    }

    //--- Execution --------------------------------------------------------

    /// Starts the engine and blocks until the application exits.
    ///
    /// # Lifecycle
    ///
    /// 1. Creates the platform → scheduler and scheduler → platform channels
    /// 2. Spawns the scheduler thread
    /// 3. Runs the platform event loop (blocks here)
    /// 4. On close or quit: the scheduler shuts the stack down and is joined
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SchedulerSpawn`] if the thread cannot start,
    /// [`EngineError::Platform`] if the event loop fails and
    /// [`EngineError::SchedulerPanicked`] if the scheduler thread panicked.
    pub fn run(self) -> Result<(), EngineError> {
        info!("Starting engine runtime");

        //--- 1. Create communication channels ----------------------------
        let (tx, rx): (Sender<PlatformEvent>, Receiver<PlatformEvent>) =
            bounded(self.channel_capacity);
        let (command_tx, command_rx) = bounded::<CoreCommand>(1);

        info!("Channels created (capacity: {})", self.channel_capacity);

        //--- 2. Spawn the scheduler thread --------------------------------
        let core_handle = self
            .orchestrator
            .spawn_core_thread(rx, command_tx)
            .map_err(EngineError::SchedulerSpawn)?;
        info!("Scheduler thread spawned");

        //--- 3. Launch the platform subsystem -----------------------------
        let platform = Platform::new(tx, command_rx, self.title, self.double_click);
        info!("Platform initialized, entering event loop");

        let platform_result = platform.run();
        info!("Platform event loop exited");

        //--- 4. Wait for the scheduler thread to terminate ----------------
        // The platform dropped its sender, so the scheduler sees a
        // disconnect even when the event loop failed.
        let join_result = core_handle.join();

        if let Err(e) = &platform_result {
            error!("Platform error: {}", e);
        }
        platform_result?;

        match join_result {
            Ok(()) => {
                info!("Engine shutdown complete");
                Ok(())
            }
            Err(_) => {
                error!("Scheduler thread panicked");
                Err(EngineError::SchedulerPanicked)
            }
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::render::NullRenderer;
    use crate::core::state::{GameState, StateCore, StateFlags};

    struct Blank {
        core: StateCore,
    }

    impl GameState for Blank {
        fn core(&self) -> &StateCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut StateCore {
            &mut self.core
        }
    }

    //=====================================================================
    // EngineBuilder Tests
    //=====================================================================

    #[test]
    fn builder_defaults() {
        let builder = EngineBuilder::new();
        assert_eq!(builder.channel_capacity, 128);
        assert_eq!(builder.config, SchedulerConfig::default());
        assert_eq!(builder.title, "Stratum");
        assert!(builder.renderer.is_none());
    }

    #[test]
    fn builder_with_channel_capacity() {
        let builder = EngineBuilder::new().with_channel_capacity(256);
        assert_eq!(builder.channel_capacity, 256);
    }

    #[test]
    #[should_panic(expected = "Channel capacity must be positive")]
    fn builder_with_channel_capacity_panics_on_zero() {
        EngineBuilder::new().with_channel_capacity(0);
    }

    #[test]
    fn builder_passes_config_to_engine() {
        let config = SchedulerConfig {
            double_click_ms: 250,
            ..SchedulerConfig::default()
        };
        let engine = EngineBuilder::new()
            .with_config(config)
            .with_renderer(Box::new(NullRenderer))
            .with_title("demo")
            .build();

        assert_eq!(engine.double_click, std::time::Duration::from_millis(250));
        assert_eq!(engine.title, "demo");
    }

    #[test]
    fn init_gives_access_to_the_stack() {
        let mut engine = EngineBuilder::new().build().init(|states| {
            states.push_state(Box::new(Blank {
                core: StateCore::new("blank", StateFlags::OPAQUE),
            }));
        });

        assert_eq!(engine.orchestrator.manager_mut().number_of_states(), 1);
    }
}
