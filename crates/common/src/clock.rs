//! Clock and pacing utilities for frame-sequential processing.
//!
//! Footfall never reads a wall clock inside the analytics core; time is
//! derived from frame indices. This module provides utilities for:
//! - Capturing the run epoch (for reports)
//! - Converting frame indices to stream time
//! - Deciding when to emit progress logs

use std::time::Instant;

/// A run clock anchored to the moment processing started.
#[derive(Debug, Clone)]
pub struct RunClock {
    /// The instant the run started.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339 string).
    epoch_wall: String,
}

impl RunClock {
    /// Create a new run clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Seconds elapsed since the run started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at run start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// Current wall-clock time, formatted like [`RunClock::epoch_wall`].
    pub fn now_wall() -> String {
        chrono::Utc::now().to_rfc3339()
    }
}

/// Maps frame indices to stream time at a fixed frame rate.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    fps: f64,
}

impl FrameClock {
    /// Create a frame clock. Non-positive or non-finite rates fall back to 30 fps.
    pub fn new(fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 30.0 };
        Self { fps }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Presentation time of a frame in seconds.
    pub fn frame_to_secs(&self, frame: u64) -> f64 {
        frame as f64 / self.fps
    }
}

/// Fires once every `interval` processed frames.
#[derive(Debug)]
pub struct ProgressTicker {
    interval: u64,
    processed: u64,
}

impl ProgressTicker {
    /// Create a ticker. An interval of 0 disables ticking.
    pub fn new(interval: u64) -> Self {
        Self {
            interval,
            processed: 0,
        }
    }

    /// Record one processed frame. Returns true when a progress report is due.
    pub fn tick(&mut self) -> bool {
        self.processed += 1;
        self.interval > 0 && self.processed % self.interval == 0
    }

    /// Frames recorded so far.
    pub fn processed(&self) -> u64 {
        self.processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_clock_elapsed() {
        let clock = RunClock::start();
        assert!(clock.elapsed_secs() < 1.0);
        assert!(!clock.epoch_wall().is_empty());
    }

    #[test]
    fn test_frame_clock_conversion() {
        let clock = FrameClock::new(30.0);
        assert!((clock.frame_to_secs(45) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_frame_clock_rejects_bad_rate() {
        assert!((FrameClock::new(0.0).fps() - 30.0).abs() < 1e-9);
        assert!((FrameClock::new(f64::NAN).fps() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_progress_ticker() {
        let mut ticker = ProgressTicker::new(50);
        let fired: Vec<u64> = (1..=120).filter(|_| ticker.tick()).collect();
        assert_eq!(fired.len(), 2);
        assert_eq!(ticker.processed(), 120);

        let mut disabled = ProgressTicker::new(0);
        assert!(!(0..10).any(|_| disabled.tick()));
    }
}
