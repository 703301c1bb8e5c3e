//! Exactly-once directional line crossing counter.
//!
//! Every configured line counts one direction. Per line, an identity is
//! either not yet credited or credited; credit is write-once for the whole
//! run, so an identity contributes at most one increment per line no matter
//! how often it crosses back and forth.
//!
//! Tracker identity reuse is not reconciled: an entity that comes back under
//! a new identity can be counted again.

use std::collections::{HashMap, HashSet};

use footfall_common::error::{FootfallError, FootfallResult};
use footfall_stream_model::line::{Direction, LineSpec};
use footfall_stream_model::observation::{Point, TrackId};
use footfall_stream_model::report::{Counts, CrossingEvent, LineCount};

use crate::geometry::HorizontalLine;

/// State machine for one (line, direction) pair.
#[derive(Debug)]
pub struct LineCounter {
    line: HorizontalLine,
    credited: HashSet<TrackId>,
    count: u64,
}

impl LineCounter {
    pub fn new(line: HorizontalLine) -> Self {
        Self {
            line,
            credited: HashSet::new(),
            count: 0,
        }
    }

    /// Evaluate one move. Returns true when the move newly credits `id`.
    fn evaluate(&mut self, id: TrackId, previous: &Point, current: &Point) -> bool {
        if !self.line.is_crossed(previous, current) {
            return false;
        }
        if !self.credited.insert(id) {
            tracing::trace!(line = self.line.name(), track = %id, "Repeat crossing suppressed");
            return false;
        }
        self.count += 1;
        true
    }

    pub fn line(&self) -> &HorizontalLine {
        &self.line
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_credited(&self, id: TrackId) -> bool {
        self.credited.contains(&id)
    }
}

/// All line counters of one run.
#[derive(Debug, Default)]
pub struct CrossingCounter {
    counters: Vec<LineCounter>,
    index: HashMap<String, usize>,
    totals: Counts,
}

impl CrossingCounter {
    /// Build counters from validated lines. Line names must be unique.
    pub fn new(lines: Vec<HorizontalLine>) -> FootfallResult<Self> {
        let mut index = HashMap::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            if index.insert(line.name().to_string(), i).is_some() {
                return Err(FootfallError::config(format!(
                    "duplicate line name '{}'",
                    line.name()
                )));
            }
        }

        Ok(Self {
            counters: lines.into_iter().map(LineCounter::new).collect(),
            index,
            totals: Counts::default(),
        })
    }

    /// Validate line specs and build counters.
    pub fn from_specs(specs: &[LineSpec]) -> FootfallResult<Self> {
        let lines = specs
            .iter()
            .map(HorizontalLine::from_spec)
            .collect::<FootfallResult<Vec<_>>>()?;
        Self::new(lines)
    }

    /// Evaluate an identity's latest move against every line.
    ///
    /// Without a previous centroid nothing is evaluated. Non-finite
    /// coordinates are rejected before any state changes. Returns one event
    /// per newly credited (line, direction).
    pub fn evaluate(
        &mut self,
        frame: u64,
        id: TrackId,
        previous: Option<Point>,
        current: Point,
    ) -> FootfallResult<Vec<CrossingEvent>> {
        if !current.is_finite() {
            return Err(FootfallError::anomaly(format!(
                "track {id} has non-finite centroid ({}, {})",
                current.x, current.y
            )));
        }
        let Some(previous) = previous else {
            return Ok(Vec::new());
        };
        if !previous.is_finite() {
            return Err(FootfallError::anomaly(format!(
                "track {id} has non-finite previous centroid"
            )));
        }

        let mut events = Vec::new();
        for counter in &mut self.counters {
            if counter.evaluate(id, &previous, &current) {
                let direction = counter.line.direction();
                self.totals.record(direction);
                events.push(CrossingEvent {
                    frame,
                    track_id: id,
                    line: counter.line.name().to_string(),
                    direction,
                    from: previous,
                    to: current,
                });
            }
        }
        Ok(events)
    }

    /// Aggregate counts over all lines.
    pub fn counts(&self) -> Counts {
        self.totals
    }

    /// Per-line counts in configuration order.
    pub fn line_counts(&self) -> Vec<LineCount> {
        self.counters
            .iter()
            .map(|c| LineCount {
                line: c.line.name().to_string(),
                direction: c.line.direction(),
                count: c.count,
            })
            .collect()
    }

    /// Whether `id` is already credited on the named line.
    pub fn is_credited(&self, line: &str, id: TrackId) -> bool {
        self.counter(line).is_some_and(|c| c.is_credited(id))
    }

    pub fn counter(&self, line: &str) -> Option<&LineCounter> {
        self.index.get(line).map(|&i| &self.counters[i])
    }

    /// Lines in configuration order.
    pub fn lines(&self) -> impl Iterator<Item = &HorizontalLine> {
        self.counters.iter().map(LineCounter::line)
    }

    /// Lines counting the given direction.
    pub fn lines_for(&self, direction: Direction) -> impl Iterator<Item = &HorizontalLine> {
        self.lines().filter(move |l| l.direction() == direction)
    }
}
