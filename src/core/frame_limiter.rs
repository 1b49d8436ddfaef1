//=========================================================================
// Frame Limiter
//=========================================================================
//
// Sleeps the scheduler thread so one loop iteration lasts 1/max_fps.
//
// Oversleep is carried into the next frame as lateness and subtracted
// from its budget; undersleep (a frame that ran long) is carried the
// same way. Lateness beyond `max_late` is forgotten so a single long
// stall (loading, debugger) does not cause a run of zero-sleep frames.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::thread;
use std::time::{Duration, Instant};

use log::trace;

//=== FrameLimiter ========================================================

/// Sleep-compensating frame pacer.
#[derive(Debug)]
pub struct FrameLimiter {
    last_frame: Instant,
    frame_late: Duration,
    max_late: Duration,
}

impl FrameLimiter {
    pub fn new(max_late: Duration) -> Self {
        Self {
            last_frame: Instant::now(),
            frame_late: Duration::ZERO,
            max_late,
        }
    }

    /// Lateness currently carried into the next frame.
    pub fn frame_late(&self) -> Duration {
        self.frame_late
    }

    /// Blocks until the current frame has lasted `1 / max_fps`.
    pub fn wait(&mut self, max_fps: u32) {
        let frame_time = self.last_frame.elapsed();

        if let Some(sleep_for) = self.plan(frame_time, max_fps) {
            let before = Instant::now();
            thread::sleep(sleep_for);
            self.frame_late = before.elapsed().saturating_sub(sleep_for);
        }

        self.last_frame = Instant::now();
    }

    /// Computes how long to sleep for a frame that took `frame_time`.
    ///
    /// Returns `None` when the frame is already over budget; the deficit
    /// is then recorded as lateness for the next frame.
    pub(crate) fn plan(&mut self, frame_time: Duration, max_fps: u32) -> Option<Duration> {
        let frame_min = Duration::from_secs(1) / max_fps.max(1);
        let spent = frame_time + self.frame_late;

        if let Some(remaining) = frame_min.checked_sub(spent) {
            if !remaining.is_zero() {
                return Some(remaining);
            }
        }

        let deficit = spent.saturating_sub(frame_min);
        self.frame_late = if deficit > self.max_late {
            trace!("Frame {:?} late, dropping compensation", deficit);
            Duration::ZERO
        } else {
            deficit
        };

        None
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> FrameLimiter {
        FrameLimiter::new(Duration::from_millis(100))
    }

    #[test]
    fn sleeps_remaining_budget() {
        let mut limiter = limiter();
        let sleep = limiter.plan(Duration::from_millis(5), 50);
        assert_eq!(sleep, Some(Duration::from_millis(15)));
    }

    #[test]
    fn lateness_shortens_next_sleep() {
        let mut limiter = limiter();
        limiter.frame_late = Duration::from_millis(3);

        let sleep = limiter.plan(Duration::from_millis(5), 50);
        assert_eq!(sleep, Some(Duration::from_millis(12)));
    }

    #[test]
    fn long_frame_records_deficit() {
        let mut limiter = limiter();

        assert_eq!(limiter.plan(Duration::from_millis(30), 50), None);
        assert_eq!(limiter.frame_late(), Duration::from_millis(10));
    }

    #[test]
    fn excessive_lateness_is_forgotten() {
        let mut limiter = limiter();

        assert_eq!(limiter.plan(Duration::from_millis(500), 50), None);
        assert_eq!(limiter.frame_late(), Duration::ZERO);
    }

    #[test]
    fn faster_target_shrinks_budget() {
        let mut limiter = limiter();
        let sleep = limiter.plan(Duration::from_millis(2), 100);
        assert_eq!(sleep, Some(Duration::from_millis(8)));
    }

    #[test]
    fn wait_sleeps_at_least_budget() {
        let mut limiter = limiter();
        let start = Instant::now();
        limiter.wait(200);
        assert!(start.elapsed() >= Duration::from_millis(4));
    }
}
