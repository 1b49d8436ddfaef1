//=========================================================================
// Frame Governors
//=========================================================================
//
// Time-based rate gates and rate meters.
//
// `FpsGovernor` answers "is a tick due?" for a target rate. When the
// caller falls more than one period behind, the governor re-anchors on
// the current time instead of granting a burst of back-to-back ticks.
//
// `FpsCounter` measures the achieved rate over one-second windows.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::time::Duration;

//=== FpsGovernor =========================================================

/// Gate that opens at most `fps` times per second.
#[derive(Debug, Clone)]
pub struct FpsGovernor {
    fps: u32,
    period: Duration,
    last_tick: Option<Duration>,
}

impl FpsGovernor {
    pub fn new(fps: u32) -> Self {
        let fps = fps.max(1);
        Self {
            fps,
            period: Duration::from_secs(1) / fps,
            last_tick: None,
        }
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Changes the target rate, keeping the last tick.
    pub fn set_fps(&mut self, fps: u32) {
        let fps = fps.max(1);
        self.fps = fps;
        self.period = Duration::from_secs(1) / fps;
    }

    /// Returns `true` and consumes a tick if one is due at `now`.
    ///
    /// The first call always ticks.
    pub fn ready(&mut self, now: Duration) -> bool {
        let Some(last) = self.last_tick else {
            self.last_tick = Some(now);
            return true;
        };

        let elapsed = now.saturating_sub(last);
        if elapsed < self.period {
            return false;
        }

        self.last_tick = if elapsed >= self.period * 2 {
            Some(now)
        } else {
            Some(last + self.period)
        };
        true
    }

    /// Re-anchors the governor on `now` without ticking.
    pub fn resync(&mut self, now: Duration) {
        self.last_tick = Some(now);
    }
}

//=== FpsCounter ==========================================================

/// Measures ticks per second over one-second windows.
#[derive(Debug, Clone, Default)]
pub struct FpsCounter {
    window_start: Duration,
    frames: u32,
    current: u32,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one tick at `now`.
    pub fn tick(&mut self, now: Duration) {
        self.frames += 1;

        if now.saturating_sub(self.window_start) >= Duration::from_secs(1) {
            self.current = self.frames;
            self.frames = 0;
            self.window_start = now;
        }
    }

    /// Ticks counted in the last complete window.
    pub fn current(&self) -> u32 {
        self.current
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
