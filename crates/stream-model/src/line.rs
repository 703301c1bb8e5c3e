//! Virtual counting lines.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::observation::Point;

/// Crossing direction counted by a line.
///
/// Image coordinates grow downward, so `In` is a top-to-bottom move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Counted when the centroid moves from above the line to on/below it.
    In,
    /// Counted when the centroid moves from below the line to on/above it.
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-defined counting line.
///
/// Only horizontal lines are supported: the crossing test depends on
/// `start.y` alone, and `start`/`end` give the span drawn on overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSpec {
    /// Unique name used in reports and crossing logs.
    pub name: String,

    /// Left end of the drawn span.
    pub start: Point,

    /// Right end of the drawn span.
    pub end: Point,

    /// Which crossing direction this line counts.
    pub direction: Direction,
}

impl LineSpec {
    /// A horizontal line spanning `[x_start, x_end]` at height `y`.
    pub fn horizontal(
        name: impl Into<String>,
        y: f64,
        x_start: f64,
        x_end: f64,
        direction: Direction,
    ) -> Self {
        Self {
            name: name.into(),
            start: Point::new(x_start, y),
            end: Point::new(x_end, y),
            direction,
        }
    }
}

/// The two-line layout of the reference people-counting setup (1920 px wide).
pub fn default_lines() -> Vec<LineSpec> {
    vec![
        LineSpec::horizontal("in", 302.0, 0.0, 1920.0, Direction::In),
        LineSpec::horizontal("out", 702.0, 0.0, 1920.0, Direction::Out),
    ]
}
