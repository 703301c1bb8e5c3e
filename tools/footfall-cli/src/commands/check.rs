//! Check system capabilities.

use footfall_common::config::{config_file_path, AppConfig};
use footfall_render::encoder::command_exists;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Footfall System Check");
    println!("{}", "=".repeat(50));

    let config_path = config_file_path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!(
            "[OK] Config: defaults ({} not found)",
            config_path.display()
        );
    }
    println!("     Output directory: {}", config.output_dir.display());
    println!("     Log level: {}", config.logging.level);

    let ffmpeg = command_exists("ffmpeg");
    if ffmpeg {
        println!("[OK] ffmpeg found (--video mp4 available)");
    } else {
        println!("[WARN] ffmpeg not found: --video mp4 is unavailable, use --video frames");
    }

    let writable = std::fs::create_dir_all(&config.output_dir).is_ok();
    if writable {
        println!("[OK] Output directory is writable");
    } else {
        println!("[WARN] Cannot create {}", config.output_dir.display());
    }

    println!();
    if writable {
        println!("Footfall is ready.");
    } else {
        println!("Some checks failed. See above for fixes.");
    }

    Ok(())
}
