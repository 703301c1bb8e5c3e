//! Footfall Observation Sources
//!
//! Supplies the per-frame tracker output the analytics pipeline consumes.
//! Detection and tracking happen upstream; a source only replays what the
//! tracker produced, in presentation order:
//!
//! - **Jsonl:** Lazily reads a recorded observation stream from disk
//! - **Memory:** Serves frames held in memory (tests, embedding)
//! - **Synthetic:** Generates deterministic walkers for demos
//!
//! Streams are written with [`writer::StreamWriter`] in the same JSONL format
//! the [`jsonl::JsonlSource`] reads.

pub mod jsonl;
pub mod synthetic;
pub mod writer;

use std::collections::VecDeque;

use footfall_stream_model::observation::FrameObservations;
use footfall_stream_model::stream::StreamHeader;

pub use jsonl::JsonlSource;
pub use writer::StreamWriter;

/// One item pulled from a source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceFrame {
    /// A frame with the tracker's observations (possibly none).
    Frame(FrameObservations),
    /// A frame whose tracker output could not be decoded. Processed as a
    /// frame with no observations.
    Degraded { frame: u64, reason: String },
}

impl SourceFrame {
    /// Frame index in presentation order.
    pub fn index(&self) -> u64 {
        match self {
            Self::Frame(frame) => frame.frame,
            Self::Degraded { frame, .. } => *frame,
        }
    }

    /// The observations to process; empty for degraded frames.
    pub fn into_observations(self) -> FrameObservations {
        match self {
            Self::Frame(frame) => frame,
            Self::Degraded { frame, .. } => FrameObservations::empty(frame),
        }
    }
}

/// Trait for per-frame observation sources.
///
/// A source is finite and yields frames strictly in presentation order.
/// `None` signals end of stream, which is a normal terminal condition.
pub trait ObservationSource: Send {
    /// Stream metadata; frame dimensions are fixed for the whole stream.
    fn header(&self) -> &StreamHeader;

    /// Pull the next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Option<SourceFrame>;

    /// Source name for logging and reports.
    fn name(&self) -> &str;
}

/// Serves a fixed list of frames from memory.
pub struct MemorySource {
    header: StreamHeader,
    frames: VecDeque<SourceFrame>,
    name: String,
}

impl MemorySource {
    pub fn new(header: StreamHeader, frames: Vec<FrameObservations>) -> Self {
        Self {
            header,
            frames: frames.into_iter().map(SourceFrame::Frame).collect(),
            name: "memory".to_string(),
        }
    }

    /// Build from already classified items, including degraded frames.
    pub fn from_items(header: StreamHeader, items: Vec<SourceFrame>) -> Self {
        Self {
            header,
            frames: items.into(),
            name: "memory".to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Frames not yet pulled.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl ObservationSource for MemorySource {
    fn header(&self) -> &StreamHeader {
        &self.header
    }

    fn next_frame(&mut self) -> Option<SourceFrame> {
        self.frames.pop_front()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_drains_in_order() {
        let header = StreamHeader::new(100, 100, 30.0);
        let mut source = MemorySource::new(
            header,
            vec![FrameObservations::empty(0), FrameObservations::empty(1)],
        );

        assert_eq!(source.remaining(), 2);
        assert_eq!(source.next_frame().map(|f| f.index()), Some(0));
        assert_eq!(source.next_frame().map(|f| f.index()), Some(1));
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn test_degraded_frame_becomes_empty() {
        let degraded = SourceFrame::Degraded {
            frame: 7,
            reason: "bad json".to_string(),
        };
        assert_eq!(degraded.index(), 7);
        assert_eq!(degraded.into_observations(), FrameObservations::empty(7));
    }
}
