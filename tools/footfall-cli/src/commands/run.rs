//! Process observation streams into counts, heatmaps and overlays.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::ValueEnum;
use footfall_analytics::{FramePipeline, FrameSink};
use footfall_render::{
    CrossingLogSink, FfmpegEncoder, FrameEncoder, HeatmapImageSink, OverlaySink,
    PngSequenceEncoder,
};
use footfall_source::{JsonlSource, ObservationSource};
use footfall_stream_model::report::RunReport;
use footfall_stream_model::settings::AnalyticsSettings;

/// Annotated overlay output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VideoMode {
    /// No overlay output
    None,
    /// Overlay video encoded by ffmpeg
    Mp4,
    /// Numbered PNG frames
    Frames,
}

pub struct RunArgs {
    pub inputs: Vec<PathBuf>,
    pub settings: Option<PathBuf>,
    pub output: PathBuf,
    pub video: VideoMode,
    pub background: Option<PathBuf>,
    pub display: Option<(u32, u32)>,
    pub codec: String,
    pub normalized: bool,
    /// Frame rate for encoded video when a stream header has none.
    pub fallback_fps: f64,
}

/// Output options shared by every stream of one invocation.
#[derive(Debug, Clone)]
struct OutputOptions {
    video: VideoMode,
    background: Option<PathBuf>,
    display: Option<(u32, u32)>,
    codec: String,
    normalized: bool,
    fallback_fps: f64,
}

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let settings = super::load_settings(args.settings.as_deref())?;
    let options = OutputOptions {
        video: args.video,
        background: args.background,
        display: args.display,
        codec: args.codec,
        normalized: args.normalized,
        fallback_fps: args.fallback_fps,
    };

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nStopping after the current frame...");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    let multiple = args.inputs.len() > 1;
    let mut tasks = Vec::with_capacity(args.inputs.len());
    for input in args.inputs {
        let out_dir = if multiple {
            args.output.join(stream_stem(&input))
        } else {
            args.output.clone()
        };
        let settings = settings.clone();
        let options = options.clone();
        let cancel = cancel.clone();
        let name = input.display().to_string();
        let task = tokio::task::spawn_blocking(move || {
            process_stream(&input, &settings, &out_dir, &options, &cancel)
        });
        tasks.push((name, task));
    }

    let mut failures = 0usize;
    for (name, task) in tasks {
        match task.await {
            Ok(Ok(report)) => {
                print_summary(&name, &report);
                if !report.termination.is_success() {
                    failures += 1;
                }
            }
            Ok(Err(e)) => {
                eprintln!("{name}: {e:#}");
                failures += 1;
            }
            Err(e) => {
                eprintln!("{name}: worker panicked: {e}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} stream(s) did not complete");
    }
    Ok(())
}

fn process_stream(
    input: &Path,
    settings: &AnalyticsSettings,
    out_dir: &Path,
    options: &OutputOptions,
    cancel: &AtomicBool,
) -> anyhow::Result<RunReport> {
    let mut source = JsonlSource::open(input)?;
    let header = source.header().clone();
    let mut pipeline = FramePipeline::new(settings, &header)?;

    std::fs::create_dir_all(out_dir)?;
    let mut sinks: Vec<Box<dyn FrameSink>> = Vec::new();

    if let Some(overlay) = build_overlay(&header, out_dir, options)? {
        sinks.push(overlay);
    }
    sinks.push(Box::new(CrossingLogSink::create(out_dir.join("crossings.jsonl"))?));
    let mut heatmap = HeatmapImageSink::new(out_dir.join("heatmap.png"));
    if options.normalized {
        heatmap = heatmap.with_normalized(out_dir.join("heatmap_normalized.png"));
    }
    sinks.push(Box::new(heatmap));

    let output = footfall_analytics::run(&mut pipeline, &mut source, &mut sinks, cancel)?;
    drop(sinks);

    let mut report = output.report;
    let report_path = out_dir.join("report.json");
    report.outputs.push(report_path.clone());
    report
        .save(&report_path)
        .map_err(|e| anyhow::anyhow!("Failed to write report: {e}"))?;

    Ok(report)
}

fn build_overlay(
    header: &footfall_stream_model::stream::StreamHeader,
    out_dir: &Path,
    options: &OutputOptions,
) -> anyhow::Result<Option<Box<dyn FrameSink>>> {
    let (width, height) = options.display.unwrap_or((header.width, header.height));
    let encoder: Box<dyn FrameEncoder> = match options.video {
        VideoMode::None => return Ok(None),
        VideoMode::Mp4 => {
            let fps = if header.fps.is_finite() && header.fps > 0.0 {
                header.fps
            } else {
                options.fallback_fps
            };
            Box::new(FfmpegEncoder::spawn(
                out_dir.join("overlay.mp4"),
                width,
                height,
                fps,
                &options.codec,
            )?)
        }
        VideoMode::Frames => Box::new(PngSequenceEncoder::new(
            out_dir.join("frames"),
            "overlay",
            width,
            height,
        )?),
    };

    let mut sink = OverlaySink::new(header.width, header.height, encoder);
    if let Some(path) = &options.background {
        sink = sink.with_background(path)?;
    }
    if let Some((w, h)) = options.display {
        sink = sink.with_display_size(w, h);
    }
    Ok(Some(Box::new(sink)))
}

fn stream_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stream".to_string())
}

fn print_summary(name: &str, report: &RunReport) {
    println!("{name}");
    println!("  Termination: {:?}", report.termination);
    println!(
        "  Frames: {} ({} degraded)",
        report.stats.frames_processed, report.stats.frames_degraded
    );
    println!("  IN: {}", report.counts.in_count);
    println!("  OUT: {}", report.counts.out_count);
    for line in &report.lines {
        println!("    {} ({}): {}", line.line, line.direction, line.count);
    }
    for path in &report.outputs {
        println!("  Wrote {}", path.display());
    }
}

/// Parse `WIDTHxHEIGHT`.
pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let w: u32 = w.trim().parse().map_err(|e| format!("bad width '{w}': {e}"))?;
    let h: u32 = h.trim().parse().map_err(|e| format!("bad height '{h}': {e}"))?;
    if w == 0 || h == 0 {
        return Err("size must be non-zero".to_string());
    }
    Ok((w, h))
}
