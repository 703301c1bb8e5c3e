//! Append-only writer for observation streams.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use footfall_common::error::{FootfallError, FootfallResult};
use footfall_stream_model::observation::FrameObservations;
use footfall_stream_model::stream::{header_line, StreamHeader};

/// Writes frames to a JSONL stream file, header first.
pub struct StreamWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    frames_written: u64,
}

impl StreamWriter {
    /// Create a new stream file, writing the header as the first line.
    pub fn new(path: PathBuf, header: &StreamHeader) -> FootfallResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| {
                FootfallError::resource(format!("Failed to create {}: {e}", path.display()))
            })?;

        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", header_line(header)?)
            .map_err(|e| FootfallError::resource(format!("Failed to write header: {e}")))?;

        Ok(Self {
            writer,
            path,
            frames_written: 0,
        })
    }

    /// Write a single frame as a JSONL line.
    pub fn write_frame(&mut self, frame: &FrameObservations) -> FootfallResult<()> {
        let json = serde_json::to_string(frame)?;
        writeln!(self.writer, "{json}")
            .map_err(|e| FootfallError::resource(format!("Failed to write frame: {e}")))?;
        self.frames_written += 1;

        if self.frames_written % 500 == 0 {
            self.flush()?;
        }

        Ok(())
    }

    /// Flush buffered writes to disk.
    pub fn flush(&mut self) -> FootfallResult<()> {
        self.writer
            .flush()
            .map_err(|e| FootfallError::resource(format!("Failed to flush stream: {e}")))
    }

    /// Number of frames written.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Path to the output file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Drop for StreamWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
