//! File-backed JSONL observation source.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use footfall_common::error::{FootfallError, FootfallResult};
use footfall_stream_model::stream::{parse_line, StreamHeader, StreamLine};

use crate::{ObservationSource, SourceFrame};

/// Reads an observation stream lazily, one frame per line.
///
/// Opening fails when the file is unreadable or has no header. After that
/// the source never fails: an undecodable line becomes a degraded frame and
/// a read error ends the stream early.
pub struct JsonlSource {
    reader: BufReader<File>,
    header: StreamHeader,
    path: PathBuf,
    name: String,
    line_buf: String,
    line_no: u64,
    next_index: u64,
    finished: bool,
}

impl JsonlSource {
    /// Open a stream and read its header.
    pub fn open(path: impl AsRef<Path>) -> FootfallResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(FootfallError::FileNotFound { path });
        }
        let file = File::open(&path).map_err(|e| FootfallError::source_open(&path, e.to_string()))?;

        let mut reader = BufReader::new(file);
        let mut line = String::new();
        let mut line_no = 0u64;

        let header = loop {
            line.clear();
            let bytes = reader
                .read_line(&mut line)
                .map_err(|e| FootfallError::source_open(&path, e.to_string()))?;
            if bytes == 0 {
                return Err(FootfallError::source_open(&path, "stream has no header"));
            }
            line_no += 1;

            match parse_line(&line) {
                Ok(StreamLine::Skip) => continue,
                Ok(StreamLine::Header(header)) => break header,
                Ok(StreamLine::Frame(_)) => {
                    return Err(FootfallError::source_open(
                        &path,
                        "first line must be the stream header",
                    ))
                }
                Err(e) => {
                    return Err(FootfallError::source_open(
                        &path,
                        format!("invalid header: {e}"),
                    ))
                }
            }
        };

        let name = path.display().to_string();
        tracing::info!(
            path = %path.display(),
            width = header.width,
            height = header.height,
            fps = header.fps,
            "Opened observation stream"
        );

        Ok(Self {
            reader,
            header,
            path,
            name,
            line_buf: String::new(),
            line_no,
            next_index: 0,
            finished: false,
        })
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ObservationSource for JsonlSource {
    fn header(&self) -> &StreamHeader {
        &self.header
    }

    fn next_frame(&mut self) -> Option<SourceFrame> {
        while !self.finished {
            self.line_buf.clear();
            match self.reader.read_line(&mut self.line_buf) {
                Ok(0) => self.finished = true,
                Ok(_) => {
                    self.line_no += 1;
                    match parse_line(&self.line_buf) {
                        Ok(StreamLine::Skip) => continue,
                        Ok(StreamLine::Frame(frame)) => {
                            if frame.frame != self.next_index {
                                tracing::debug!(
                                    expected = self.next_index,
                                    got = frame.frame,
                                    "Frame index gap in stream"
                                );
                            }
                            self.next_index = frame.frame.saturating_add(1);
                            return Some(SourceFrame::Frame(frame));
                        }
                        Ok(StreamLine::Header(_)) => {
                            let frame = self.next_index;
                            self.next_index = self.next_index.saturating_add(1);
                            return Some(SourceFrame::Degraded {
                                frame,
                                reason: format!("unexpected header at line {}", self.line_no),
                            });
                        }
                        Err(e) => {
                            let frame = self.next_index;
                            self.next_index = self.next_index.saturating_add(1);
                            return Some(SourceFrame::Degraded {
                                frame,
                                reason: format!("line {}: {e}", self.line_no),
                            });
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = self.line_no,
                        error = %e,
                        "Read error, ending stream early"
                    );
                    self.finished = true;
                }
            }
        }
        None
    }

    fn name(&self) -> &str {
        &self.name
    }
}
