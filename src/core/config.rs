//=========================================================================
// Scheduler Configuration
//=========================================================================
//
// Tunables for frame pacing, physics catch-up and state behavior.
//
// Values are plain integers (milliseconds, frames per second) so the
// struct round-trips through JSON without custom serde adapters.
// Missing fields fall back to their defaults.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

//=== Internal Dependencies ===============================================

use crate::core::error::EngineError;

//=== SchedulerConfig =====================================================

/// Scheduler and state tunables.
///
/// # Example
///
/// ```
/// use stratum_engine::core::config::SchedulerConfig;
///
/// let config: SchedulerConfig = serde_json::from_str(r#"{ "show_fps": true }"#).unwrap();
/// assert!(config.show_fps);
/// assert_eq!(config.min_fps, 50);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Floor applied to the shared update and render rates.
    pub min_fps: u32,

    /// Update rate of scene-bound states (preplay, play, replay).
    pub scene_update_fps: u32,

    /// Render rate of the replay viewer.
    pub replay_render_fps: u32,

    /// Duration of one physics step.
    pub physics_step_ms: u64,

    /// Upper bound of physics steps run by a single update.
    pub max_physics_catch_up: u32,

    /// Accumulated lateness beyond which the frame limiter gives up
    /// compensating.
    pub max_frame_late_ms: u64,

    /// Length of the camera intro played before a level starts.
    pub intro_duration_ms: u64,

    /// Time spent watching the death animation before the dead menu opens.
    pub dead_menu_delay_ms: u64,

    /// Play the death animation instead of opening the dead menu at once.
    pub enable_dead_animation: bool,

    /// Play the camera intro when a new level is entered.
    pub enable_intro_zoom: bool,

    /// Maximum delay between two presses counted as a double click.
    pub double_click_ms: u64,

    /// Draw the measured update/render rates.
    pub show_fps: bool,

    /// Draw the state stack.
    pub debug_stack: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_fps: 50,
            scene_update_fps: 100,
            replay_render_fps: 50,
            physics_step_ms: 10,
            max_physics_catch_up: 10,
            max_frame_late_ms: 100,
            intro_duration_ms: 1500,
            dead_menu_delay_ms: 3200,
            enable_dead_animation: true,
            enable_intro_zoom: true,
            double_click_ms: 400,
            show_fps: false,
            debug_stack: false,
        }
    }
}

impl SchedulerConfig {
    //--- Loading ----------------------------------------------------------

    /// Reads a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ConfigIo`] if the file cannot be read and
    /// [`EngineError::ConfigParse`] if it is not valid JSON for this struct.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();

        let text = fs::read_to_string(path).map_err(|source| EngineError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = serde_json::from_str(&text).map_err(|source| {
            EngineError::ConfigParse {
                path: path.to_path_buf(),
                source,
            }
        })?;

        info!("Loaded scheduler config from {}", path.display());
        Ok(config)
    }

    //--- Durations --------------------------------------------------------

    pub fn physics_step(&self) -> Duration {
        Duration::from_millis(self.physics_step_ms.max(1))
    }

    pub fn max_frame_late(&self) -> Duration {
        Duration::from_millis(self.max_frame_late_ms)
    }

    pub fn intro_duration(&self) -> Duration {
        Duration::from_millis(self.intro_duration_ms)
    }

    pub fn dead_menu_delay(&self) -> Duration {
        Duration::from_millis(self.dead_menu_delay_ms)
    }

    pub fn double_click(&self) -> Duration {
        Duration::from_millis(self.double_click_ms)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_scheduler_floor() {
        let config = SchedulerConfig::default();
        assert_eq!(config.min_fps, 50);
        assert_eq!(config.scene_update_fps, 100);
        assert_eq!(config.physics_step(), Duration::from_millis(10));
        assert_eq!(config.max_frame_late(), Duration::from_millis(100));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{ "min_fps": 60, "debug_stack": true }"#).unwrap();

        assert_eq!(config.min_fps, 60);
        assert!(config.debug_stack);
        assert_eq!(config.max_physics_catch_up, 10);
    }

    #[test]
    fn zero_physics_step_is_clamped() {
        let config = SchedulerConfig {
            physics_step_ms: 0,
            ..SchedulerConfig::default()
        };
        assert_eq!(config.physics_step(), Duration::from_millis(1));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = SchedulerConfig::load("definitely/not/here.json").unwrap_err();
        assert!(matches!(err, EngineError::ConfigIo { .. }));
    }

    #[test]
    fn load_reads_written_file() {
        let path = std::env::temp_dir().join(format!("stratum-config-{}.json", std::process::id()));
        let config = SchedulerConfig {
            show_fps: true,
            ..SchedulerConfig::default()
        };
        fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        let loaded = SchedulerConfig::load(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn load_reports_invalid_json() {
        let path = std::env::temp_dir().join(format!("stratum-bad-{}.json", std::process::id()));
        fs::write(&path, "{ not json").unwrap();

        let err = SchedulerConfig::load(&path).unwrap_err();
        let _ = fs::remove_file(&path);

        assert!(matches!(err, EngineError::ConfigParse { .. }));
    }
}
