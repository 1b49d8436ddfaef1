//=========================================================================
// Error Types
//=========================================================================
//
// Error taxonomy for the scheduler.
//
// Architecture:
//   StateError    → recoverable, stops at the state boundary
//                   (surfaced to the user as a dismissible message box)
//   PlatformError → window/event-loop failures on the main thread
//   EngineError   → fatal, propagates out of `Engine::run()`
//
//=========================================================================

//=== External Dependencies ===============================================

use std::path::PathBuf;

use thiserror::Error;

//=== Internal Dependencies ===============================================

use crate::core::state::StateId;

//=== StateError ==========================================================

/// Recoverable failure raised inside a state hook.
///
/// States convert these into a local recovery action (usually a message
/// box). Anything that still escapes `enter()`/`update()`/`render()` is
/// caught by the [`StateManager`](crate::core::state::StateManager), which
/// replaces the failing state with an error box.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// Level content could not be loaded.
    #[error("level '{level}' cannot be loaded: {reason}")]
    LevelLoad { level: String, reason: String },

    /// Replay content could not be loaded.
    #[error("replay '{name}' cannot be loaded: {reason}")]
    ReplayLoad { name: String, reason: String },

    /// The simulation rejected a step or a play request.
    #[error("simulation error: {0}")]
    Simulation(String),

    /// A thread panicked while holding the world lock.
    #[error("world lock poisoned")]
    WorldPoisoned,

    /// Profile persistence failed.
    #[error("profile error: {0}")]
    Profile(String),

    /// A background task reported failure.
    #[error("background task '{task}' failed: {reason}")]
    Task { task: String, reason: String },

    /// A transition referenced a state that is no longer on the stack.
    #[error("no state with id {0} on the stack")]
    NoSuchState(StateId),
}

//=== PlatformError =======================================================

/// Platform initialization and runtime errors.
///
/// These are fatal - if the event loop can't be created, the engine
/// cannot run.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Failed to create event loop (rare, indicates OS-level issue).
    #[error("event loop creation failed: {0}")]
    EventLoopCreation(#[source] winit::error::EventLoopError),

    /// Event loop execution error.
    #[error("event loop error: {0}")]
    EventLoopExecution(#[source] winit::error::EventLoopError),
}

//=== EngineError =========================================================

/// Fatal errors returned by [`Engine::run`](crate::Engine::run) and by
/// configuration loading.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("platform failure: {0}")]
    Platform(#[from] PlatformError),

    #[error("cannot read config file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("scheduler thread could not be spawned: {0}")]
    SchedulerSpawn(#[source] std::io::Error),

    #[error("scheduler thread panicked")]
    SchedulerPanicked,
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_error_messages_name_the_content() {
        let err = StateError::LevelLoad {
            level: "canyon".into(),
            reason: "missing block".into(),
        };
        assert_eq!(err.to_string(), "level 'canyon' cannot be loaded: missing block");
    }

    #[test]
    fn no_such_state_reports_id() {
        let err = StateError::NoSuchState(StateId::from_raw(7));
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn engine_error_wraps_io_source() {
        use std::error::Error as _;

        let err = EngineError::ConfigIo {
            path: PathBuf::from("missing.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("missing.json"));
        assert!(err.source().is_some());
    }

    #[test]
    fn errors_are_error_trait() {
        fn assert_error<T: std::error::Error + Send + Sync + 'static>() {}
        assert_error::<StateError>();
        assert_error::<PlatformError>();
        assert_error::<EngineError>();
    }
}
