//! Validate an observation stream against analytics settings.

use std::path::PathBuf;

use footfall_analytics::FramePipeline;
use footfall_source::{JsonlSource, ObservationSource};

use super::info::StreamSummary;

pub fn run(path: PathBuf, settings_path: Option<PathBuf>) -> anyhow::Result<()> {
    println!("Validating stream at: {}", path.display());

    let settings = super::load_settings(settings_path.as_deref())?;
    let mut source = JsonlSource::open(&path)?;
    let header = source.header().clone();

    println!("  Schema: {}", header.schema_version);
    println!(
        "  Resolution: {}x{} @ {}fps",
        header.width, header.height, header.fps
    );

    // Settings are checked against the header before any frame is read.
    let pipeline = FramePipeline::new(&settings, &header)
        .map_err(|e| anyhow::anyhow!("Settings rejected: {e}"))?;
    match pipeline.class_filter() {
        Some(class) => println!(
            "  Class filter: {class} ({})",
            header.class_name(class).unwrap_or("unnamed")
        ),
        None => println!("  Class filter: all classes"),
    }
    for line in pipeline.crossings().lines() {
        println!(
            "  Line '{}': y = {} ({})",
            line.name(),
            line.threshold(),
            line.direction()
        );
    }

    let summary = StreamSummary::collect(&mut source);
    println!("  Frames: {}", summary.frames);
    println!("  Observations: {}", summary.observations);
    println!("  Identities: {}", summary.identities.len());

    let mut issues = Vec::new();
    for (frame, reason) in &summary.degraded {
        issues.push(format!("frame {frame}: undecodable ({reason})"));
    }
    if summary.out_of_order > 0 {
        issues.push(format!("{} frame(s) out of order", summary.out_of_order));
    }
    if summary.unusable > 0 {
        issues.push(format!(
            "{} observation(s) would be dropped (non-finite, inverted or outside the frame)",
            summary.unusable
        ));
    }

    if issues.is_empty() {
        println!("\nStream is valid.");
    } else {
        println!("\nValidation issues:");
        for issue in &issues {
            println!("  - {issue}");
        }
        println!(
            "\n{} issue(s) found. The stream can still be processed; affected frames count as empty.",
            issues.len()
        );
    }

    Ok(())
}
