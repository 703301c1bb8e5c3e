//! Write an analytics settings file with default values.

use std::path::PathBuf;

use footfall_stream_model::settings::AnalyticsSettings;

pub fn run(path: PathBuf, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let settings = AnalyticsSettings::default();
    settings
        .save(&path)
        .map_err(|e| anyhow::anyhow!("Failed to write settings: {e}"))?;

    println!("Settings written to {}", path.display());
    println!("  Lines:");
    for line in &settings.lines {
        println!(
            "    {} at y = {} ({})",
            line.name, line.start.y, line.direction
        );
    }
    println!("  Kernel radius: {}", settings.density.radius);
    println!(
        "  Overlay: opacity {}, blur {}",
        settings.overlay.opacity, settings.overlay.kernel_size
    );
    println!();
    println!("Edit the line positions to match your camera, then run:");
    println!("  footfall run --settings {} <STREAM>", path.display());

    Ok(())
}
