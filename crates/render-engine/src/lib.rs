//! Footfall Render Engine
//!
//! Turns the analytics state of each frame into visual outputs:
//!
//! ```text
//! background ──┐
//!              ├── Density overlay (rolling heatmap)
//! surface ─────┘         │
//!                        ├── Annotate (lines, boxes, centroids)
//! observations ──────────┘         │
//!                                  ▼
//!                        Encode (PNG sequence / ffmpeg)
//!
//! end of run ── Finalized heatmap ── heatmap.png
//! crossings ─── crossings.jsonl
//! ```
//!
//! Every output is a [`FrameSink`](footfall_analytics::FrameSink), so the run
//! loop drives them all the same way.

pub mod annotate;
pub mod encoder;
pub mod sinks;

pub use annotate::{annotate_frame, AnnotationStyle};
pub use encoder::{FfmpegEncoder, FrameEncoder, PngSequenceEncoder};
pub use sinks::{CrossingLogSink, HeatmapImageSink, OverlaySink};
