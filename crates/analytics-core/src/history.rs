//! Per-identity motion history.
//!
//! Each identity keeps only its two most recent centroids, which is all the
//! crossing test needs. Identities are independent of each other.

use std::collections::HashMap;

use footfall_stream_model::observation::{Point, TrackId};

/// Number of samples retained per identity.
pub const HISTORY_LEN: usize = 2;

/// Fixed-size sliding window of an identity's latest centroids.
#[derive(Debug, Clone, Copy)]
pub struct MotionWindow {
    samples: [Point; HISTORY_LEN],
    len: usize,
    last_seen: u64,
}

impl MotionWindow {
    fn new(first: Point, frame: u64) -> Self {
        Self {
            samples: [first, Point::default()],
            len: 1,
            last_seen: frame,
        }
    }

    /// Append a sample, dropping the oldest once full. Returns the sample
    /// that was latest before this one.
    fn push(&mut self, point: Point, frame: u64) -> Option<Point> {
        let previous = self.latest();
        if self.len < HISTORY_LEN {
            self.samples[self.len] = point;
            self.len += 1;
        } else {
            self.samples.rotate_left(1);
            self.samples[HISTORY_LEN - 1] = point;
        }
        self.last_seen = frame;
        previous
    }

    /// Samples oldest first.
    pub fn samples(&self) -> &[Point] {
        &self.samples[..self.len]
    }

    pub fn latest(&self) -> Option<Point> {
        self.samples().last().copied()
    }

    /// Frame of the most recent sample.
    pub fn last_seen(&self) -> u64 {
        self.last_seen
    }
}

/// Bounded motion history for every identity currently remembered.
#[derive(Debug, Default)]
pub struct TrackHistoryStore {
    windows: HashMap<TrackId, MotionWindow>,
    max_idle_frames: Option<u64>,
    evicted: u64,
}

impl TrackHistoryStore {
    /// A store that never forgets identities.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that forgets identities unseen for more than `max_idle_frames`.
    pub fn with_eviction(max_idle_frames: Option<u64>) -> Self {
        Self {
            max_idle_frames,
            ..Self::default()
        }
    }

    /// Record a centroid for an identity.
    ///
    /// Returns `(previous, current)`; `previous` is `None` the first time an
    /// identity is seen (or the first time after eviction).
    pub fn update(&mut self, id: TrackId, centroid: Point, frame: u64) -> (Option<Point>, Point) {
        let previous = match self.windows.get_mut(&id) {
            Some(window) => window.push(centroid, frame),
            None => {
                self.windows.insert(id, MotionWindow::new(centroid, frame));
                None
            }
        };
        (previous, centroid)
    }

    /// Drop identities idle for longer than the configured limit.
    ///
    /// Returns the number of identities evicted. A no-op without a limit.
    pub fn evict_idle(&mut self, current_frame: u64) -> usize {
        let Some(max_idle) = self.max_idle_frames else {
            return 0;
        };
        let before = self.windows.len();
        self.windows
            .retain(|_, w| current_frame.saturating_sub(w.last_seen) <= max_idle);
        let evicted = before - self.windows.len();
        if evicted > 0 {
            self.evicted += evicted as u64;
            tracing::debug!(evicted, remaining = self.windows.len(), "Evicted idle tracks");
        }
        evicted
    }

    /// History of an identity, oldest first. Empty for unknown identities.
    pub fn samples(&self, id: TrackId) -> &[Point] {
        self.windows.get(&id).map(MotionWindow::samples).unwrap_or(&[])
    }

    pub fn window(&self, id: TrackId) -> Option<&MotionWindow> {
        self.windows.get(&id)
    }

    /// Number of identities currently remembered.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Total identities evicted over the store's lifetime.
    pub fn evicted_total(&self) -> u64 {
        self.evicted
    }
}
