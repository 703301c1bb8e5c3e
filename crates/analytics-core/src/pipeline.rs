//! Frame pipeline: per-frame sequencing and the run loop.
//!
//! [`FramePipeline`] owns the three stateful components of one stream (motion
//! history, crossing counter, density accumulator) and applies them to each
//! frame in a fixed order:
//!
//! 1. Class filter
//! 2. Anomaly check (non-finite or inverted boxes, centroids outside the frame)
//! 3. History update and crossing evaluation (tracked observations only)
//! 4. Density accumulation (every accepted observation)
//! 5. Idle eviction
//!
//! [`run`] drives a pipeline from an [`ObservationSource`] into a set of
//! [`FrameSink`]s until the source is exhausted, cancellation is requested,
//! or a sink fails.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use footfall_common::clock::{ProgressTicker, RunClock};
use footfall_common::error::{FootfallError, FootfallResult};
use footfall_source::{ObservationSource, SourceFrame};
use footfall_stream_model::line::Direction;
use footfall_stream_model::observation::{BBox, ClassId, FrameObservations, Point, TrackId};
use footfall_stream_model::report::{
    Counts, CrossingEvent, LineCount, RunReport, RunStats, Termination,
};
use footfall_stream_model::settings::{AnalyticsSettings, ClassFilter, FootprintAnchor};
use footfall_stream_model::stream::StreamHeader;

use crate::crossing::CrossingCounter;
use crate::density::{
    DensityAccumulator, DensitySurface, FinalizeStyle, FinalizedHeatmap, KernelSpec,
    OverlayStyle,
};
use crate::geometry::{self, HorizontalLine};
use crate::history::TrackHistoryStore;

/// An observation that passed the class filter and the anomaly check.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedObservation {
    pub id: Option<TrackId>,
    pub class_id: ClassId,
    pub bbox: BBox,
    /// Crossing sample point (box center).
    pub centroid: Point,
    /// Density splat point.
    pub footprint: Point,
}

/// What happened while processing one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutcome {
    pub frame: u64,
    pub accepted: Vec<AcceptedObservation>,
    /// Crossings credited in this frame.
    pub crossings: Vec<CrossingEvent>,
    /// Observations dropped as anomalies.
    pub dropped: usize,
    /// Observations of a non-qualifying class.
    pub filtered: usize,
    /// Identities evicted after this frame.
    pub evicted: usize,
}

/// Stateful analytics for one stream.
#[derive(Debug)]
pub struct FramePipeline {
    header: StreamHeader,
    class_filter: Option<ClassId>,
    footprint: FootprintAnchor,
    history: TrackHistoryStore,
    crossings: CrossingCounter,
    density: DensityAccumulator,
    overlay: OverlayStyle,
    finalize: FinalizeStyle,
    progress_interval: u64,
    stats: RunStats,
    last_frame: Option<u64>,
}

impl FramePipeline {
    /// Validate settings against the stream header and build a pipeline.
    ///
    /// Frame dimensions are fixed from the header for the pipeline's lifetime.
    pub fn new(settings: &AnalyticsSettings, header: &StreamHeader) -> FootfallResult<Self> {
        let class_filter = resolve_class_filter(settings.class_filter.as_ref(), header)?;
        let crossings = CrossingCounter::from_specs(&settings.lines)?;
        let kernel = KernelSpec::from_settings(&settings.density)?;
        let density = DensityAccumulator::new(header.width, header.height, kernel)?;
        let overlay = OverlayStyle::from_settings(&settings.overlay)?;

        for line in crossings.lines() {
            if line.threshold() < 0.0 || line.threshold() > header.height as f64 {
                tracing::warn!(
                    line = line.name(),
                    y = line.threshold(),
                    height = header.height,
                    "Counting line lies outside the frame"
                );
            }
        }

        tracing::debug!(
            width = header.width,
            height = header.height,
            class_filter = ?class_filter,
            lines = settings.lines.len(),
            radius = kernel.radius(),
            "Frame pipeline ready"
        );

        Ok(Self {
            header: header.clone(),
            class_filter,
            footprint: settings.footprint,
            history: TrackHistoryStore::with_eviction(settings.history.max_idle_frames),
            crossings,
            density,
            overlay,
            finalize: FinalizeStyle::from(&settings.finalize),
            progress_interval: settings.progress_interval_frames,
            stats: RunStats::default(),
            last_frame: None,
        })
    }

    /// Process one frame's observations.
    ///
    /// Anomalous observations are dropped with a warning; the rest of the
    /// frame is still processed. An empty frame only advances eviction.
    pub fn process_frame(&mut self, frame: &FrameObservations) -> FrameOutcome {
        let index = frame.frame;
        if let Some(last) = self.last_frame {
            if index <= last {
                tracing::warn!(frame = index, previous = last, "Frame index out of order");
            }
        }
        self.last_frame = Some(index);

        let mut outcome = FrameOutcome {
            frame: index,
            ..FrameOutcome::default()
        };

        for obs in &frame.observations {
            if self.class_filter.is_some_and(|class| obs.class_id != class) {
                outcome.filtered += 1;
                continue;
            }

            let accepted = match self.check(index, obs.id, obs.class_id, obs.bbox) {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(frame = index, track = ?obs.id, "Dropping observation: {}", e);
                    outcome.dropped += 1;
                    continue;
                }
            };

            if let Some(id) = accepted.id {
                let (previous, current) = self.history.update(id, accepted.centroid, index);
                if previous.is_none() {
                    self.stats.identities_seen += 1;
                }
                match self.crossings.evaluate(index, id, previous, current) {
                    Ok(events) => {
                        for event in &events {
                            tracing::info!(
                                frame = index,
                                track = %id,
                                line = %event.line,
                                direction = %event.direction,
                                "Line crossed"
                            );
                        }
                        outcome.crossings.extend(events);
                    }
                    Err(e) => tracing::warn!(frame = index, track = %id, "Crossing skipped: {}", e),
                }
            }

            if let Err(e) = self.density.splat(accepted.footprint) {
                tracing::warn!(frame = index, "Density splat skipped: {}", e);
            }

            outcome.accepted.push(accepted);
        }

        outcome.evicted = self.history.evict_idle(index);

        self.stats.frames_processed += 1;
        self.stats.observations_accepted += outcome.accepted.len() as u64;
        self.stats.observations_dropped += outcome.dropped as u64;
        self.stats.observations_filtered += outcome.filtered as u64;
        self.stats.identities_evicted = self.history.evicted_total();

        outcome
    }

    /// Record a frame the source could not decode. The caller still
    /// processes it as an empty frame.
    pub fn note_degraded(&mut self, frame: u64, reason: &str) {
        tracing::warn!(frame, reason, "Degraded frame processed as empty");
        self.stats.frames_degraded += 1;
    }

    fn check(
        &self,
        frame: u64,
        id: Option<TrackId>,
        class_id: ClassId,
        bbox: BBox,
    ) -> FootfallResult<AcceptedObservation> {
        if !bbox.is_finite() {
            return Err(FootfallError::anomaly(format!(
                "frame {frame}: non-finite bounding box"
            )));
        }
        if bbox.is_inverted() {
            return Err(FootfallError::anomaly(format!(
                "frame {frame}: inverted bounding box [{}, {}, {}, {}]",
                bbox.x1, bbox.y1, bbox.x2, bbox.y2
            )));
        }
        let centroid = geometry::centroid(&bbox);
        if !geometry::in_frame(&centroid, self.header.width, self.header.height) {
            return Err(FootfallError::anomaly(format!(
                "frame {frame}: centroid ({}, {}) outside {}x{} frame",
                centroid.x, centroid.y, self.header.width, self.header.height
            )));
        }
        let footprint = geometry::anchor_point(&bbox, self.footprint);
        if !footprint.is_finite()
            || !geometry::in_frame(&footprint, self.header.width, self.header.height)
        {
            return Err(FootfallError::anomaly(format!(
                "frame {frame}: footprint ({}, {}) outside {}x{} frame",
                footprint.x, footprint.y, self.header.width, self.header.height
            )));
        }
        Ok(AcceptedObservation {
            id,
            class_id,
            bbox,
            centroid,
            footprint,
        })
    }

    pub fn header(&self) -> &StreamHeader {
        &self.header
    }

    pub fn counts(&self) -> Counts {
        self.crossings.counts()
    }

    pub fn line_counts(&self) -> Vec<LineCount> {
        self.crossings.line_counts()
    }

    pub fn crossings(&self) -> &CrossingCounter {
        &self.crossings
    }

    pub fn history(&self) -> &TrackHistoryStore {
        &self.history
    }

    pub fn density(&self) -> &DensityAccumulator {
        &self.density
    }

    pub fn overlay_style(&self) -> &OverlayStyle {
        &self.overlay
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Resolved class filter; `None` accepts every class.
    pub fn class_filter(&self) -> Option<ClassId> {
        self.class_filter
    }

    pub fn progress_interval(&self) -> u64 {
        self.progress_interval
    }

    /// Normalize and colorize the density surface.
    pub fn finalize(&self) -> FinalizedHeatmap {
        self.density.finalize(&self.finalize)
    }
}

fn resolve_class_filter(
    filter: Option<&ClassFilter>,
    header: &StreamHeader,
) -> FootfallResult<Option<ClassId>> {
    match filter {
        None => Ok(None),
        Some(ClassFilter::Id(id)) => {
            if !header.classes.is_empty() && *id as usize >= header.classes.len() {
                return Err(FootfallError::config(format!(
                    "class filter {id} is not in the stream's class table ({} classes)",
                    header.classes.len()
                )));
            }
            Ok(Some(*id))
        }
        Some(ClassFilter::Name(name)) => header.class_id(name).map(Some).ok_or_else(|| {
            FootfallError::config(format!(
                "class filter '{name}' is not in the stream's class table"
            ))
        }),
    }
}

/// Read-only view of the pipeline after a frame, handed to sinks.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub pipeline: &'a FramePipeline,
    pub outcome: &'a FrameOutcome,
}

impl<'a> FrameView<'a> {
    pub fn frame(&self) -> u64 {
        self.outcome.frame
    }

    pub fn header(&self) -> &'a StreamHeader {
        &self.pipeline.header
    }

    pub fn accepted(&self) -> &'a [AcceptedObservation] {
        &self.outcome.accepted
    }

    /// Crossings credited in this frame.
    pub fn crossings(&self) -> &'a [CrossingEvent] {
        &self.outcome.crossings
    }

    /// Running totals.
    pub fn counts(&self) -> Counts {
        self.pipeline.counts()
    }

    pub fn lines(&self) -> impl Iterator<Item = &'a HorizontalLine> {
        self.pipeline.crossings.lines()
    }

    pub fn lines_for(&self, direction: Direction) -> impl Iterator<Item = &'a HorizontalLine> {
        self.pipeline.crossings.lines_for(direction)
    }

    pub fn density(&self) -> &'a DensityAccumulator {
        &self.pipeline.density
    }

    pub fn surface(&self) -> &'a DensitySurface {
        self.pipeline.density.raw()
    }

    pub fn overlay_style(&self) -> &'a OverlayStyle {
        &self.pipeline.overlay
    }
}

/// Receives every processed frame and the end-of-run results.
pub trait FrameSink: Send {
    /// Sink name for logging.
    fn name(&self) -> &str;

    /// Called once per processed frame, in order.
    fn on_frame(&mut self, view: &FrameView<'_>) -> FootfallResult<()>;

    /// Called once when the run ends, however it ends. Returns the files
    /// written.
    fn finish(
        &mut self,
        report: &RunReport,
        heatmap: &FinalizedHeatmap,
    ) -> FootfallResult<Vec<PathBuf>>;
}

/// Result of [`run`].
#[derive(Debug)]
pub struct RunOutput {
    pub report: RunReport,
    pub heatmap: FinalizedHeatmap,
}

/// Drive `pipeline` from `source` into `sinks`.
///
/// Frames are processed strictly one at a time. `cancel` is checked between
/// frames only. A sink failure stops the loop; every sink's `finish` is still
/// called so partial outputs get flushed, and the report records the abort.
///
/// Fails only when the source's frame size does not match the pipeline's.
pub fn run(
    pipeline: &mut FramePipeline,
    source: &mut dyn ObservationSource,
    sinks: &mut [Box<dyn FrameSink>],
    cancel: &AtomicBool,
) -> FootfallResult<RunOutput> {
    let (width, height) = (source.header().width, source.header().height);
    if (width, height) != (pipeline.header.width, pipeline.header.height) {
        return Err(FootfallError::config(format!(
            "source '{}' is {width}x{height} but the pipeline expects {}x{}",
            source.name(),
            pipeline.header.width,
            pipeline.header.height
        )));
    }

    let clock = RunClock::start();
    let mut ticker = ProgressTicker::new(pipeline.progress_interval);
    let source_name = source.name().to_string();
    tracing::info!(source = %source_name, width, height, sinks = sinks.len(), "Run started");

    let termination = loop {
        if cancel.load(Ordering::Relaxed) {
            tracing::info!(source = %source_name, "Cancellation requested");
            break Termination::Cancelled;
        }

        let Some(item) = source.next_frame() else {
            break Termination::EndOfStream;
        };

        if let SourceFrame::Degraded { frame, reason } = &item {
            pipeline.note_degraded(*frame, reason);
        }
        let frame = item.into_observations();
        let outcome = pipeline.process_frame(&frame);

        let view = FrameView {
            pipeline: &*pipeline,
            outcome: &outcome,
        };
        let failed = sinks.iter_mut().find_map(|sink| {
            sink.on_frame(&view)
                .err()
                .map(|e| format!("sink '{}' failed: {e}", sink.name()))
        });
        if let Some(reason) = failed {
            tracing::error!(source = %source_name, frame = outcome.frame, "{}", reason);
            break Termination::Aborted { reason };
        }

        if ticker.tick() {
            let counts = pipeline.counts();
            tracing::info!(
                source = %source_name,
                frames = ticker.processed(),
                in_count = counts.in_count,
                out_count = counts.out_count,
                "Processed {} frames",
                ticker.processed()
            );
        }
    };

    let heatmap = pipeline.finalize();
    let mut report = RunReport {
        source: source_name.clone(),
        width,
        height,
        fps: pipeline.header.fps,
        started_at: clock.epoch_wall().to_string(),
        finished_at: RunClock::now_wall(),
        termination,
        counts: pipeline.counts(),
        lines: pipeline.line_counts(),
        stats: pipeline.stats(),
        outputs: Vec::new(),
    };

    let mut outputs = Vec::new();
    for sink in sinks.iter_mut() {
        match sink.finish(&report, &heatmap) {
            Ok(paths) => outputs.extend(paths),
            Err(e) => {
                tracing::error!(source = %source_name, sink = sink.name(), "Finish failed: {}", e);
                if report.termination.is_success() {
                    report.termination = Termination::Aborted {
                        reason: format!("sink '{}' failed to finish: {e}", sink.name()),
                    };
                }
            }
        }
    }
    report.outputs = outputs;

    tracing::info!(
        source = %source_name,
        termination = ?report.termination,
        frames = report.stats.frames_processed,
        in_count = report.counts.in_count,
        out_count = report.counts.out_count,
        total_mass = pipeline.density().raw().total_mass(),
        elapsed_secs = clock.elapsed_secs(),
        "Run finished"
    );

    Ok(RunOutput { report, heatmap })
}
