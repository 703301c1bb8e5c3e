//! Footfall Analytics Core
//!
//! Stateful online analytics over a tracker's per-frame output:
//! - **Geometry:** Centroids, footprint anchors, horizontal line side tests
//! - **History:** Per-identity two-sample motion window
//! - **Crossing:** Exactly-once directional line crossing counts
//! - **Density:** Cumulative splat heatmap, rolling overlay, final colorization
//! - **Pipeline:** Per-frame sequencing and the run loop
//!
//! Everything here is synchronous and single-threaded per stream. Run
//! several streams by giving each its own [`FramePipeline`].

pub mod colormap;
pub mod crossing;
pub mod density;
pub mod geometry;
pub mod history;
pub mod pipeline;

pub use crossing::CrossingCounter;
pub use density::{DensityAccumulator, FinalizedHeatmap};
pub use history::TrackHistoryStore;
pub use pipeline::{run, FramePipeline, FrameSink, FrameView, RunOutput};
