//! Generate a synthetic walker stream.

use std::path::PathBuf;

use footfall_source::synthetic::{SyntheticConfig, SyntheticSource};
use footfall_source::{ObservationSource, StreamWriter};

pub fn run(
    output: PathBuf,
    frames: u64,
    walkers: u32,
    width: u32,
    height: u32,
    fps: f64,
) -> anyhow::Result<()> {
    if width == 0 || height == 0 {
        anyhow::bail!("Frame size must be non-zero, got {width}x{height}");
    }

    let config = SyntheticConfig {
        width,
        height,
        fps,
        frames,
        walkers,
        ..SyntheticConfig::default()
    };
    let mut source = SyntheticSource::new(config);
    let mut writer = StreamWriter::new(output.clone(), source.header())?;

    while let Some(frame) = source.next_frame() {
        writer.write_frame(&frame.into_observations())?;
    }
    writer.flush()?;

    println!("Synthetic stream written:");
    println!("  Path: {}", output.display());
    println!("  Frames: {}", writer.frames_written());
    println!("  Walkers: {walkers}");
    println!("  Resolution: {width}x{height} @ {fps}fps");
    println!();
    println!("Process it with: footfall run {}", output.display());

    Ok(())
}
