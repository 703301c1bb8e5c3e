//! Footfall CLI: people counting and density heatmaps from tracker output.
//!
//! Usage:
//!   footfall run <INPUT>...       Count crossings and build heatmaps
//!   footfall validate <INPUT>     Check a stream against analytics settings
//!   footfall info <PATH>          Show stream or run report information
//!   footfall synth <OUTPUT>       Write a synthetic walker stream
//!   footfall init [PATH]          Write default analytics settings
//!   footfall check                Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::run::{RunArgs, VideoMode};

#[derive(Parser)]
#[command(
    name = "footfall",
    about = "Directional people counting and footfall heatmaps from tracked detections",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit structured JSON logs
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one or more observation streams
    Run {
        /// Observation streams (JSONL). Each is processed independently.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Analytics settings file
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Output directory (defaults to the configured output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Annotated overlay output
        #[arg(long, value_enum, default_value = "none")]
        video: VideoMode,

        /// Background image for the overlay (same size as the stream)
        #[arg(long)]
        background: Option<PathBuf>,

        /// Downscale overlay frames, e.g. 960x540
        #[arg(long, value_parser = commands::run::parse_size)]
        display: Option<(u32, u32)>,

        /// ffmpeg video codec for --video mp4
        #[arg(long)]
        codec: Option<String>,

        /// Also write the grayscale normalized heatmap
        #[arg(long)]
        normalized: bool,
    },

    /// Validate an observation stream against analytics settings
    Validate {
        /// Path to the observation stream
        path: PathBuf,

        /// Analytics settings file
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },

    /// Show information about a stream or a run report
    Info {
        /// Observation stream (.jsonl) or run report (.json)
        path: PathBuf,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a synthetic walker stream
    Synth {
        /// Output stream path
        output: PathBuf,

        /// Number of frames
        #[arg(long, default_value = "600")]
        frames: u64,

        /// Number of walkers
        #[arg(long, default_value = "12")]
        walkers: u32,

        /// Frame width
        #[arg(long, default_value = "1920")]
        width: u32,

        /// Frame height
        #[arg(long, default_value = "1080")]
        height: u32,

        /// Frame rate
        #[arg(long, default_value = "30")]
        fps: f64,
    },

    /// Write an analytics settings file with default values
    Init {
        /// Settings file path
        #[arg(default_value = "footfall.json")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check system capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let app_config = footfall_common::config::AppConfig::load();

    // Initialize logging
    let mut logging = app_config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    if cli.json_logs {
        logging.json = true;
    }
    footfall_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Run {
            inputs,
            settings,
            output,
            video,
            background,
            display,
            codec,
            normalized,
        } => {
            let args = RunArgs {
                inputs,
                settings,
                output: output.unwrap_or_else(|| app_config.output_dir.clone()),
                video,
                background,
                display,
                codec: codec.unwrap_or_else(|| app_config.output.video_codec.clone()),
                normalized: normalized || app_config.output.write_normalized_heatmap,
                fallback_fps: app_config.output.fps,
            };
            commands::run::run(args).await
        }
        Commands::Validate { path, settings } => commands::validate::run(path, settings),
        Commands::Info { path, json } => commands::info::run(path, json),
        Commands::Synth {
            output,
            frames,
            walkers,
            width,
            height,
            fps,
        } => commands::synth::run(output, frames, walkers, width, height, fps),
        Commands::Init { path, force } => commands::init::run(path, force),
        Commands::Check => commands::check::run(&app_config),
    }
}
