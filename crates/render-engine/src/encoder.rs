//! Frame encoders for the annotated overlay stream.

use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use footfall_common::error::{FootfallError, FootfallResult};
use image::RgbImage;

/// Trait for sequential frame encoders.
pub trait FrameEncoder: Send {
    /// Append one frame. Every frame must have the encoder's dimensions.
    fn write_frame(&mut self, frame: &RgbImage) -> FootfallResult<()>;

    /// Flush and close the output. Returns the files written.
    fn finish(&mut self) -> FootfallResult<Vec<PathBuf>>;

    /// Human-readable name.
    fn name(&self) -> &str;
}

fn check_dimensions(frame: &RgbImage, width: u32, height: u32) -> FootfallResult<()> {
    if frame.dimensions() != (width, height) {
        return Err(FootfallError::resource(format!(
            "frame is {}x{} but the encoder expects {width}x{height}",
            frame.width(),
            frame.height()
        )));
    }
    Ok(())
}

/// Writes numbered PNG files (`{prefix}_000000.png`, ...) into a directory.
pub struct PngSequenceEncoder {
    dir: PathBuf,
    prefix: String,
    width: u32,
    height: u32,
    written: Vec<PathBuf>,
}

impl PngSequenceEncoder {
    pub fn new(
        dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        width: u32,
        height: u32,
    ) -> FootfallResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            FootfallError::resource(format!("cannot create {}: {e}", dir.display()))
        })?;
        Ok(Self {
            dir,
            prefix: prefix.into(),
            width,
            height,
            written: Vec::new(),
        })
    }

    fn frame_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}_{index:06}.png", self.prefix))
    }
}

impl FrameEncoder for PngSequenceEncoder {
    fn write_frame(&mut self, frame: &RgbImage) -> FootfallResult<()> {
        check_dimensions(frame, self.width, self.height)?;
        let path = self.frame_path(self.written.len());
        frame.save(&path).map_err(|e| {
            FootfallError::resource(format!("cannot write {}: {e}", path.display()))
        })?;
        self.written.push(path);
        Ok(())
    }

    fn finish(&mut self) -> FootfallResult<Vec<PathBuf>> {
        tracing::debug!(frames = self.written.len(), dir = %self.dir.display(), "PNG sequence closed");
        Ok(std::mem::take(&mut self.written))
    }

    fn name(&self) -> &str {
        "png-sequence"
    }
}

/// Pipes raw RGB frames into an `ffmpeg` child process.
pub struct FfmpegEncoder {
    output: PathBuf,
    width: u32,
    height: u32,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_task: Option<JoinHandle<String>>,
    frames: u64,
}

impl FfmpegEncoder {
    /// Start `ffmpeg` writing `output` with the given codec (`mpeg4`,
    /// `libx264`, ...).
    pub fn spawn(
        output: impl Into<PathBuf>,
        width: u32,
        height: u32,
        fps: f64,
        codec: &str,
    ) -> FootfallResult<Self> {
        let output = output.into();
        if !command_exists("ffmpeg") {
            return Err(FootfallError::resource("ffmpeg not found in PATH"));
        }
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                FootfallError::resource(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let args = ffmpeg_args(&output, width, height, fps, codec);
        tracing::debug!(args = ?args, "Running ffmpeg");
        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FootfallError::resource(format!("Failed to start ffmpeg: {e}")))?;

        tracing::info!(
            pid = child.id(),
            output = %output.display(),
            width,
            height,
            codec,
            "ffmpeg process started"
        );

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| FootfallError::resource("Failed to capture ffmpeg stdin"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| FootfallError::resource("Failed to capture ffmpeg stderr"))?;

        // ffmpeg blocks once its stderr pipe fills, so drain it on a thread.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        Ok(Self {
            output,
            width,
            height,
            child: Some(child),
            stdin: Some(stdin),
            stderr_task: Some(stderr_task),
            frames: 0,
        })
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    fn close(&mut self) -> FootfallResult<()> {
        drop(self.stdin.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let status = child
            .wait()
            .map_err(|e| FootfallError::resource(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = self
            .stderr_task
            .take()
            .map(|task| {
                task.join()
                    .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
            })
            .unwrap_or_default();

        if !status.success() {
            return Err(FootfallError::resource(format!(
                "ffmpeg encode failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }
        Ok(())
    }
}

impl FrameEncoder for FfmpegEncoder {
    fn write_frame(&mut self, frame: &RgbImage) -> FootfallResult<()> {
        check_dimensions(frame, self.width, self.height)?;
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| FootfallError::resource("ffmpeg encoder already finished"))?;
        stdin
            .write_all(frame.as_raw())
            .map_err(|e| FootfallError::resource(format!("Failed writing frame to ffmpeg: {e}")))?;
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> FootfallResult<Vec<PathBuf>> {
        self.close()?;
        tracing::info!(frames = self.frames, output = %self.output.display(), "Overlay video written");
        Ok(vec![self.output.clone()])
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        if self.child.is_some() {
            if let Err(e) = self.close() {
                tracing::warn!("ffmpeg did not shut down cleanly: {}", e);
            }
        }
    }
}

fn ffmpeg_args(output: &Path, width: u32, height: u32, fps: f64, codec: &str) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgb24".to_string(),
        "-s".to_string(),
        format!("{width}x{height}"),
        "-r".to_string(),
        format!("{fps}"),
        "-i".to_string(),
        "-".to_string(),
    ];
    args.extend(codec_args(codec));
    args.push(output.to_string_lossy().into_owned());
    args
}

fn codec_args(codec: &str) -> Vec<String> {
    match codec {
        "libx264" | "h264" => vec![
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "medium".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ],
        other => vec![
            "-c:v".to_string(),
            other.to_string(),
            "-q:v".to_string(),
            "5".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ],
    }
}

/// Whether `binary` resolves on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
