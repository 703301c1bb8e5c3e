//! Output sinks driven by the analytics run loop.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use footfall_analytics::{FinalizedHeatmap, FrameSink, FrameView};
use footfall_common::error::{FootfallError, FootfallResult};
use footfall_stream_model::report::RunReport;
use image::imageops::FilterType;
use image::{Rgb, RgbImage};

use crate::annotate::{annotate_frame, AnnotationStyle};
use crate::encoder::FrameEncoder;

fn create_parent(path: &Path) -> FootfallResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            FootfallError::resource(format!("cannot create {}: {e}", parent.display()))
        })?;
    }
    Ok(())
}

/// Renders the rolling heatmap overlay with annotations and encodes it.
pub struct OverlaySink {
    background: RgbImage,
    encoder: Box<dyn FrameEncoder>,
    style: AnnotationStyle,
    display_size: Option<(u32, u32)>,
    frames: u64,
}

impl OverlaySink {
    /// Overlay onto a black canvas of the stream's size.
    pub fn new(width: u32, height: u32, encoder: Box<dyn FrameEncoder>) -> Self {
        Self {
            background: RgbImage::from_pixel(width, height, Rgb([0, 0, 0])),
            encoder,
            style: AnnotationStyle::default(),
            display_size: None,
            frames: 0,
        }
    }

    /// Use an image (typically a still of the scene) as the canvas. It must
    /// match the stream's frame size.
    pub fn with_background(mut self, path: impl AsRef<Path>) -> FootfallResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FootfallError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let image = image::open(path)?.to_rgb8();
        if image.dimensions() != self.background.dimensions() {
            return Err(FootfallError::config(format!(
                "background {} is {}x{} but frames are {}x{}",
                path.display(),
                image.width(),
                image.height(),
                self.background.width(),
                self.background.height()
            )));
        }
        self.background = image;
        Ok(self)
    }

    /// Downscale every frame before encoding. The encoder must have been
    /// created with the same size.
    pub fn with_display_size(mut self, width: u32, height: u32) -> Self {
        self.display_size = Some((width, height));
        self
    }

    pub fn with_style(mut self, style: AnnotationStyle) -> Self {
        self.style = style;
        self
    }

    /// Compose the annotated overlay for one frame.
    pub fn compose(&self, view: &FrameView<'_>) -> FootfallResult<RgbImage> {
        let mut frame = view
            .density()
            .render_overlay(&self.background, view.overlay_style())?;
        annotate_frame(&mut frame, view, &self.style);
        Ok(match self.display_size {
            Some((w, h)) if (w, h) != frame.dimensions() => {
                image::imageops::resize(&frame, w, h, FilterType::Triangle)
            }
            _ => frame,
        })
    }
}

impl FrameSink for OverlaySink {
    fn name(&self) -> &str {
        "overlay"
    }

    fn on_frame(&mut self, view: &FrameView<'_>) -> FootfallResult<()> {
        let frame = self.compose(view)?;
        self.encoder.write_frame(&frame)?;
        self.frames += 1;
        Ok(())
    }

    fn finish(
        &mut self,
        _report: &RunReport,
        _heatmap: &FinalizedHeatmap,
    ) -> FootfallResult<Vec<PathBuf>> {
        tracing::debug!(frames = self.frames, encoder = self.encoder.name(), "Closing overlay encoder");
        self.encoder.finish()
    }
}

/// Appends every crossing event as one JSON line.
pub struct CrossingLogSink {
    path: PathBuf,
    writer: BufWriter<File>,
    events: u64,
}

impl CrossingLogSink {
    pub fn create(path: impl Into<PathBuf>) -> FootfallResult<Self> {
        let path = path.into();
        create_parent(&path)?;
        let file = File::create(&path).map_err(|e| {
            FootfallError::resource(format!("cannot create {}: {e}", path.display()))
        })?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            events: 0,
        })
    }

    pub fn events(&self) -> u64 {
        self.events
    }
}

impl FrameSink for CrossingLogSink {
    fn name(&self) -> &str {
        "crossing-log"
    }

    fn on_frame(&mut self, view: &FrameView<'_>) -> FootfallResult<()> {
        for event in view.crossings() {
            serde_json::to_writer(&mut self.writer, event)?;
            self.writer.write_all(b"\n").map_err(|e| {
                FootfallError::resource(format!("cannot write {}: {e}", self.path.display()))
            })?;
            self.events += 1;
        }
        Ok(())
    }

    fn finish(
        &mut self,
        _report: &RunReport,
        _heatmap: &FinalizedHeatmap,
    ) -> FootfallResult<Vec<PathBuf>> {
        self.writer.flush().map_err(|e| {
            FootfallError::resource(format!("cannot flush {}: {e}", self.path.display()))
        })?;
        tracing::debug!(events = self.events, path = %self.path.display(), "Crossing log closed");
        Ok(vec![self.path.clone()])
    }
}

/// Writes the finalized heatmap when the run ends.
pub struct HeatmapImageSink {
    colorized: PathBuf,
    normalized: Option<PathBuf>,
}

impl HeatmapImageSink {
    pub fn new(colorized: impl Into<PathBuf>) -> Self {
        Self {
            colorized: colorized.into(),
            normalized: None,
        }
    }

    /// Also write the grayscale normalized surface.
    pub fn with_normalized(mut self, path: impl Into<PathBuf>) -> Self {
        self.normalized = Some(path.into());
        self
    }
}

impl FrameSink for HeatmapImageSink {
    fn name(&self) -> &str {
        "heatmap"
    }

    fn on_frame(&mut self, _view: &FrameView<'_>) -> FootfallResult<()> {
        Ok(())
    }

    fn finish(
        &mut self,
        _report: &RunReport,
        heatmap: &FinalizedHeatmap,
    ) -> FootfallResult<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(2);

        create_parent(&self.colorized)?;
        heatmap.colorized.save(&self.colorized).map_err(|e| {
            FootfallError::resource(format!("cannot write {}: {e}", self.colorized.display()))
        })?;
        written.push(self.colorized.clone());

        if let Some(path) = &self.normalized {
            create_parent(path)?;
            heatmap.normalized.save(path).map_err(|e| {
                FootfallError::resource(format!("cannot write {}: {e}", path.display()))
            })?;
            written.push(path.clone());
        }

        tracing::info!(
            path = %self.colorized.display(),
            max_mass = heatmap.max_mass,
            "Heatmap written"
        );
        Ok(written)
    }
}
