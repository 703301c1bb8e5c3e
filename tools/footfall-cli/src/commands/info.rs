//! Show stream or run report information.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use footfall_analytics::geometry;
use footfall_source::{JsonlSource, ObservationSource, SourceFrame};
use footfall_stream_model::observation::{ClassId, TrackId};
use footfall_stream_model::report::RunReport;
use footfall_stream_model::stream::StreamHeader;

/// Aggregate contents of an observation stream.
#[derive(Debug, Default)]
pub struct StreamSummary {
    pub frames: u64,
    pub first_frame: Option<u64>,
    pub last_frame: Option<u64>,
    pub out_of_order: u64,
    pub degraded: Vec<(u64, String)>,
    pub observations: u64,
    pub untracked: u64,
    /// Observations the pipeline would drop as anomalies.
    pub unusable: u64,
    pub identities: BTreeSet<TrackId>,
    pub per_class: BTreeMap<ClassId, u64>,
}

impl StreamSummary {
    /// Drain a source and summarize it.
    pub fn collect(source: &mut dyn ObservationSource) -> Self {
        let (width, height) = (source.header().width, source.header().height);
        let mut summary = Self::default();
        while let Some(item) = source.next_frame() {
            let index = item.index();
            if summary.last_frame.is_some_and(|last| index <= last) {
                summary.out_of_order += 1;
            }
            summary.first_frame.get_or_insert(index);
            summary.last_frame = Some(index);
            summary.frames += 1;

            match item {
                SourceFrame::Frame(frame) => {
                    for obs in &frame.observations {
                        summary.observations += 1;
                        *summary.per_class.entry(obs.class_id).or_default() += 1;
                        let usable = obs.bbox.is_finite()
                            && !obs.bbox.is_inverted()
                            && geometry::in_frame(&geometry::centroid(&obs.bbox), width, height);
                        if !usable {
                            summary.unusable += 1;
                        }
                        match obs.id {
                            Some(id) => {
                                summary.identities.insert(id);
                            }
                            None => summary.untracked += 1,
                        }
                    }
                }
                SourceFrame::Degraded { frame, reason } => summary.degraded.push((frame, reason)),
            }
        }
        summary
    }
}

pub fn run(path: PathBuf, json: bool) -> anyhow::Result<()> {
    if is_report(&path) {
        let report = RunReport::load(&path)
            .map_err(|e| anyhow::anyhow!("Failed to load report: {e}"))?;
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        return Ok(());
    }

    let mut source = JsonlSource::open(&path)?;
    let header = source.header().clone();
    let summary = StreamSummary::collect(&mut source);

    if json {
        let value = serde_json::json!({
            "header": header,
            "frames": summary.frames,
            "first_frame": summary.first_frame,
            "last_frame": summary.last_frame,
            "out_of_order": summary.out_of_order,
            "degraded": summary.degraded.len(),
            "observations": summary.observations,
            "untracked": summary.untracked,
            "unusable": summary.unusable,
            "identities": summary.identities.len(),
            "per_class": summary.per_class,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print_stream(&path, &header, &summary);
    }
    Ok(())
}

fn is_report(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

fn print_stream(path: &Path, header: &StreamHeader, summary: &StreamSummary) {
    println!("Stream: {}", path.display());
    println!("  Schema: {}", header.schema_version);
    println!(
        "  Resolution: {}x{} @ {}fps",
        header.width, header.height, header.fps
    );
    if let Some(source) = &header.source {
        println!("  Source: {source}");
    }
    if let Some(created) = &header.created_at {
        println!("  Created: {created}");
    }
    println!();

    println!("Frames:");
    println!("  Count: {}", summary.frames);
    if let (Some(first), Some(last)) = (summary.first_frame, summary.last_frame) {
        println!("  Range: {first}..={last}");
        let secs = footfall_common::clock::FrameClock::new(header.fps).frame_to_secs(last + 1);
        println!("  Duration: {secs:.1}s");
    }
    println!("  Degraded: {}", summary.degraded.len());
    println!("  Out of order: {}", summary.out_of_order);
    println!();

    println!("Observations:");
    println!("  Total: {}", summary.observations);
    println!("  Untracked: {}", summary.untracked);
    println!("  Unusable: {}", summary.unusable);
    println!("  Identities: {}", summary.identities.len());
    for (class, count) in &summary.per_class {
        let name = header.class_name(*class).unwrap_or("?");
        println!("    class {class} ({name}): {count}");
    }
}

fn print_report(report: &RunReport) {
    println!("Run: {}", report.source);
    println!(
        "  Resolution: {}x{} @ {}fps",
        report.width, report.height, report.fps
    );
    println!("  Started: {}", report.started_at);
    println!("  Finished: {}", report.finished_at);
    println!("  Termination: {:?}", report.termination);
    println!();

    println!("Counts:");
    println!("  IN: {}", report.counts.in_count);
    println!("  OUT: {}", report.counts.out_count);
    for line in &report.lines {
        println!("    {} ({}): {}", line.line, line.direction, line.count);
    }
    println!();

    let s = &report.stats;
    println!("Stats:");
    println!("  Frames: {} ({} degraded)", s.frames_processed, s.frames_degraded);
    println!(
        "  Observations: {} accepted, {} dropped, {} filtered",
        s.observations_accepted, s.observations_dropped, s.observations_filtered
    );
    println!(
        "  Identities: {} seen, {} evicted",
        s.identities_seen, s.identities_evicted
    );

    if !report.outputs.is_empty() {
        println!();
        println!("Outputs:");
        for path in &report.outputs {
            println!("  {}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use footfall_source::MemorySource;
    use footfall_stream_model::observation::{BBox, FrameObservations, Observation};

    #[test]
    fn test_stream_summary() {
        let bbox = BBox::new(0.0, 0.0, 10.0, 10.0);
        let mut source = MemorySource::from_items(
            StreamHeader::new(100, 100, 25.0),
            vec![
                SourceFrame::Frame(FrameObservations::new(
                    0,
                    vec![
                        Observation::tracked(1, 0, bbox),
                        Observation::untracked(2, bbox),
                        Observation::tracked(3, 0, BBox::new(500.0, 0.0, 510.0, 10.0)),
                    ],
                )),
                SourceFrame::Degraded {
                    frame: 1,
                    reason: "bad".into(),
                },
                SourceFrame::Frame(FrameObservations::new(
                    1,
                    vec![Observation::tracked(1, 0, bbox), Observation::tracked(4, 0, bbox)],
                )),
            ],
        );

        let summary = StreamSummary::collect(&mut source);
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.first_frame, Some(0));
        assert_eq!(summary.out_of_order, 1);
        assert_eq!(summary.degraded.len(), 1);
        assert_eq!(summary.observations, 5);
        assert_eq!(summary.untracked, 1);
        assert_eq!(summary.unusable, 1);
        assert_eq!(summary.identities.len(), 3);
        assert_eq!(summary.per_class.get(&0), Some(&4));
    }

    #[test]
    fn test_report_detection() {
        assert!(is_report(Path::new("out/report.json")));
        assert!(!is_report(Path::new("walkers.jsonl")));
    }
}
