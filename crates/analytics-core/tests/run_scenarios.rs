//! End-to-end runs through the frame pipeline.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use footfall_analytics::density::{DensityAccumulator, KernelSpec};
use footfall_analytics::pipeline::FrameOutcome;
use footfall_analytics::{run, FinalizedHeatmap, FramePipeline, FrameSink, FrameView};
use footfall_common::error::FootfallResult;
use footfall_source::synthetic::{SyntheticConfig, SyntheticSource};
use footfall_source::{MemorySource, ObservationSource};
use footfall_stream_model::line::Direction;
use footfall_stream_model::observation::{BBox, FrameObservations, Observation, Point};
use footfall_stream_model::report::{Counts, RunReport, Termination};
use footfall_stream_model::settings::{AnalyticsSettings, KernelProfile};
use footfall_stream_model::stream::StreamHeader;
use proptest::prelude::*;

fn header() -> StreamHeader {
    StreamHeader::new(1920, 1080, 30.0)
}

fn person_at(id: u64, cx: f64, cy: f64) -> Observation {
    Observation::tracked(id, 0, BBox::centered(cx, cy, 40.0, 80.0))
}

/// Records what the pipeline handed to a sink.
#[derive(Default)]
struct Recorder {
    frames: Arc<Mutex<Vec<u64>>>,
    crossings: Arc<Mutex<Vec<(u64, String)>>>,
    finished: Arc<Mutex<Option<Termination>>>,
}

impl FrameSink for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn on_frame(&mut self, view: &FrameView<'_>) -> FootfallResult<()> {
        self.frames.lock().unwrap().push(view.frame());
        for event in view.crossings() {
            self.crossings
                .lock()
                .unwrap()
                .push((event.frame, event.line.clone()));
        }
        Ok(())
    }

    fn finish(
        &mut self,
        report: &RunReport,
        _heatmap: &FinalizedHeatmap,
    ) -> FootfallResult<Vec<PathBuf>> {
        *self.finished.lock().unwrap() = Some(report.termination.clone());
        Ok(Vec::new())
    }
}

#[test]
fn three_frame_walk_counts_one_in() {
    let frames = vec![
        FrameObservations::new(0, vec![person_at(7, 500.0, 280.0)]),
        FrameObservations::new(1, vec![person_at(7, 500.0, 305.0)]),
        FrameObservations::new(2, vec![person_at(7, 500.0, 320.0)]),
    ];
    let mut source = MemorySource::new(header(), frames);
    let mut pipeline = FramePipeline::new(&AnalyticsSettings::default(), &header()).unwrap();

    let recorder = Recorder::default();
    let crossings = recorder.crossings.clone();
    let finished = recorder.finished.clone();
    let frames_seen = recorder.frames.clone();
    let mut sinks: Vec<Box<dyn FrameSink>> = vec![Box::new(recorder)];

    let output = run(&mut pipeline, &mut source, &mut sinks, &AtomicBool::new(false)).unwrap();

    assert_eq!(
        output.report.counts,
        Counts {
            in_count: 1,
            out_count: 0
        }
    );
    assert_eq!(*crossings.lock().unwrap(), vec![(1, "in".to_string())]);
    assert_eq!(*frames_seen.lock().unwrap(), vec![0, 1, 2]);
    assert_eq!(*finished.lock().unwrap(), Some(Termination::EndOfStream));

    // Density grew around the three centroids and nowhere far from them.
    let surface = pipeline.density().raw();
    assert!(surface.get(500, 305).unwrap() > 0.0);
    assert_eq!(surface.get(100, 900), Some(0.0));
    assert_eq!(output.heatmap.normalized.get_pixel(100, 900)[0], 0);
    assert!(output.heatmap.normalized.get_pixel(500, 300)[0] > 200);
}

#[test]
fn empty_run_finalizes_to_blank_heatmap() {
    let mut source = MemorySource::new(header(), Vec::new());
    let mut pipeline = FramePipeline::new(&AnalyticsSettings::default(), &header()).unwrap();

    let output = run(&mut pipeline, &mut source, &mut [], &AtomicBool::new(false)).unwrap();

    assert_eq!(output.report.termination, Termination::EndOfStream);
    assert_eq!(output.report.counts, Counts::default());
    assert_eq!(output.report.stats.frames_processed, 0);
    assert!(output.heatmap.normalized.pixels().all(|p| p[0] == 0));
    let first = *output.heatmap.colorized.get_pixel(0, 0);
    assert!(output.heatmap.colorized.pixels().all(|p| *p == first));
}

#[test]
fn oscillating_walker_is_counted_once_per_direction() {
    let ys = [250.0, 320.0, 290.0, 330.0, 710.0, 690.0, 720.0, 680.0];
    let frames = ys
        .iter()
        .enumerate()
        .map(|(n, &y)| FrameObservations::new(n as u64, vec![person_at(3, 900.0, y)]))
        .collect();
    let mut source = MemorySource::new(header(), frames);
    let mut pipeline = FramePipeline::new(&AnalyticsSettings::default(), &header()).unwrap();

    let output = run(&mut pipeline, &mut source, &mut [], &AtomicBool::new(false)).unwrap();

    assert_eq!(
        output.report.counts,
        Counts {
            in_count: 1,
            out_count: 1
        }
    );
    assert_eq!(output.report.stats.identities_seen, 1);
}

#[test]
fn synthetic_crowd_counts_every_walker_once() {
    let config = SyntheticConfig::default();
    let walkers = config.walkers as u64;
    let mut source = SyntheticSource::new(config);
    let header = source.header().clone();
    let mut pipeline = FramePipeline::new(&AnalyticsSettings::default(), &header).unwrap();

    let output = run(&mut pipeline, &mut source, &mut [], &AtomicBool::new(false)).unwrap();

    // Even walkers walk down through IN, odd walkers walk up through OUT.
    assert_eq!(output.report.counts.in_count, walkers / 2);
    assert_eq!(output.report.counts.out_count, walkers / 2);
    assert_eq!(output.report.counts.total(), walkers);
    assert_eq!(output.report.stats.observations_dropped, 0);

    let per_line = &output.report.lines;
    assert_eq!(per_line.len(), 2);
    assert_eq!(per_line[0].direction, Direction::In);
    assert_eq!(per_line[1].direction, Direction::Out);
}

#[test]
fn eviction_keeps_credits() {
    let settings = AnalyticsSettings {
        history: footfall_stream_model::settings::HistorySettings {
            max_idle_frames: Some(2),
        },
        ..AnalyticsSettings::default()
    };
    let mut pipeline = FramePipeline::new(&settings, &header()).unwrap();

    let step = |p: &mut FramePipeline, n: u64, obs: Vec<Observation>| -> FrameOutcome {
        p.process_frame(&FrameObservations::new(n, obs))
    };
    step(&mut pipeline, 0, vec![person_at(1, 500.0, 290.0)]);
    step(&mut pipeline, 1, vec![person_at(1, 500.0, 310.0)]);
    assert_eq!(pipeline.counts().in_count, 1);

    for n in 2..6 {
        step(&mut pipeline, n, Vec::new());
    }
    assert!(pipeline.history().is_empty());
    assert_eq!(pipeline.stats().identities_evicted, 1);

    // The identity returns above the line and crosses again: history starts
    // over, but the credit on "in" is permanent.
    step(&mut pipeline, 6, vec![person_at(1, 500.0, 290.0)]);
    let outcome = step(&mut pipeline, 7, vec![person_at(1, 500.0, 310.0)]);
    assert!(outcome.crossings.is_empty());
    assert_eq!(pipeline.counts().in_count, 1);
    assert_eq!(pipeline.stats().identities_seen, 2);
}

proptest! {
    #[test]
    fn density_never_decreases(
        points in prop::collection::vec((0.0f64..64.0, 0.0f64..48.0), 1..24),
        pixel in (0u32..64, 0u32..48),
    ) {
        let kernel = KernelSpec::new(6.0, KernelProfile::Smooth, 1.0).unwrap();
        let mut acc = DensityAccumulator::new(64, 48, kernel).unwrap();
        let mut last = 0.0f32;
        for (x, y) in points {
            acc.splat(Point::new(x, y)).unwrap();
            let now = acc.raw().get(pixel.0, pixel.1).unwrap();
            prop_assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn density_is_local_to_kernel_radius(
        x in 0.0f64..200.0,
        y in 0.0f64..200.0,
        pixel in (0u32..200, 0u32..200),
    ) {
        let radius = 10.0;
        let kernel = KernelSpec::new(radius, KernelProfile::Smooth, 1.0).unwrap();
        let mut acc = DensityAccumulator::new(200, 200, kernel).unwrap();
        acc.splat(Point::new(x, y)).unwrap();

        let dx = pixel.0 as f64 - x.floor();
        let dy = pixel.1 as f64 - y.floor();
        let value = acc.raw().get(pixel.0, pixel.1).unwrap();
        if (dx * dx + dy * dy).sqrt() >= radius {
            prop_assert_eq!(value, 0.0);
        } else {
            prop_assert!(value > 0.0);
        }
    }

    #[test]
    fn repeated_crossings_never_exceed_one_credit(
        ys in prop::collection::vec(0.0f64..1080.0, 2..40),
    ) {
        let frames = ys
            .iter()
            .enumerate()
            .map(|(n, &y)| FrameObservations::new(n as u64, vec![person_at(9, 800.0, y)]))
            .collect();
        let mut source = MemorySource::new(header(), frames);
        let mut pipeline = FramePipeline::new(&AnalyticsSettings::default(), &header()).unwrap();
        let output = run(&mut pipeline, &mut source, &mut [], &AtomicBool::new(false)).unwrap();
        prop_assert!(output.report.counts.in_count <= 1);
        prop_assert!(output.report.counts.out_count <= 1);
    }
}
