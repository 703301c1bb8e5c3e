//! Crossing events, counts, and the end-of-run report.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::line::Direction;
use crate::observation::{Point, TrackId};
use crate::settings::SettingsError;

/// One confirmed, previously uncredited line crossing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossingEvent {
    /// Frame in which the crossing completed.
    pub frame: u64,
    pub track_id: TrackId,
    /// Name of the crossed line.
    pub line: String,
    pub direction: Direction,
    /// Centroid in the previous observation of this identity.
    pub from: Point,
    /// Centroid in the frame where the crossing completed.
    pub to: Point,
}

/// Aggregate directional counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Counts {
    pub in_count: u64,
    pub out_count: u64,
}

impl Counts {
    /// Add one crossing in the given direction.
    pub fn record(&mut self, direction: Direction) {
        match direction {
            Direction::In => self.in_count += 1,
            Direction::Out => self.out_count += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.in_count + self.out_count
    }
}

/// Count for a single (line, direction) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCount {
    pub line: String,
    pub direction: Direction,
    pub count: u64,
}

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// The source was exhausted.
    EndOfStream,
    /// A cancellation request was observed between frames.
    Cancelled,
    /// An output sink failed; partial outputs were flushed.
    Aborted { reason: String },
}

impl Termination {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Aborted { .. })
    }
}

/// Per-run processing statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Frames pulled from the source and processed.
    pub frames_processed: u64,
    /// Frames the source could not decode, processed as empty.
    pub frames_degraded: u64,
    /// Observations that passed the class filter and anomaly checks.
    pub observations_accepted: u64,
    /// Observations dropped as anomalies.
    pub observations_dropped: u64,
    /// Observations of other classes.
    pub observations_filtered: u64,
    /// Identities that started a motion history (new, or returning after
    /// eviction).
    pub identities_seen: u64,
    /// Identities forgotten by idle eviction.
    pub identities_evicted: u64,
}

/// Summary written at the end of every run, including degraded ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Where the observations came from.
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub started_at: String,
    pub finished_at: String,
    pub termination: Termination,
    pub counts: Counts,
    pub lines: Vec<LineCount>,
    pub stats: RunStats,
    /// Output files that were written successfully.
    #[serde(default)]
    pub outputs: Vec<PathBuf>,
}

impl RunReport {
    /// Save as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref().to_path_buf();
        let json = serde_json::to_string_pretty(self).map_err(|e| SettingsError::ParseError {
            path: path.clone(),
            source: e,
        })?;
        std::fs::write(&path, json).map_err(|e| SettingsError::IoError { path, source: e })
    }

    /// Load a previously saved report.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();
        let json = std::fs::read_to_string(&path).map_err(|e| SettingsError::IoError {
            path: path.clone(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| SettingsError::ParseError { path, source: e })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_record() {
        let mut counts = Counts::default();
        counts.record(Direction::In);
        counts.record(Direction::In);
        counts.record(Direction::Out);
        assert_eq!(
            counts,
            Counts {
                in_count: 2,
                out_count: 1
            }
        );
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_termination_tagging() {
        let json = serde_json::to_string(&Termination::Aborted {
            reason: "disk full".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"aborted","reason":"disk full"}"#);
        assert!(!Termination::Aborted {
            reason: String::new()
        }
        .is_success());
        assert!(Termination::Cancelled.is_success());
    }

    #[test]
    fn test_crossing_event_json() {
        let event = CrossingEvent {
            frame: 2,
            track_id: TrackId(9),
            line: "in".to_string(),
            direction: Direction::In,
            from: Point::new(500.0, 280.0),
            to: Point::new(500.0, 305.0),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["track_id"], 9);
        assert_eq!(value["direction"], "in");
        assert_eq!(value["to"][1], 305.0);
    }
}
