//! Observation stream framing.
//!
//! Streams are JSONL: the first non-blank line is the header written as a
//! comment (`# {...}`), followed by one [`FrameObservations`] object per
//! line in presentation order.

use serde::{Deserialize, Serialize};

use crate::observation::{ClassId, FrameObservations};

/// Current stream schema version.
pub const STREAM_SCHEMA_VERSION: &str = "1.0";

/// Prefix marking the header line.
pub const HEADER_PREFIX: char = '#';

/// Metadata describing an observation stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamHeader {
    /// Schema version for forward compatibility.
    pub schema_version: String,

    /// Frame width in pixels. Fixed for the whole stream.
    pub width: u32,

    /// Frame height in pixels. Fixed for the whole stream.
    pub height: u32,

    /// Nominal frame rate.
    pub fps: f64,

    /// Class names indexed by class id. May be empty.
    #[serde(default)]
    pub classes: Vec<String>,

    /// Free-form description of where the stream came from (video path, camera).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Wall-clock creation time (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl StreamHeader {
    /// Create a header for a stream of the given frame geometry.
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        Self {
            schema_version: STREAM_SCHEMA_VERSION.to_string(),
            width,
            height,
            fps,
            classes: Vec::new(),
            source: None,
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    pub fn with_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes = classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Look up a class id by name.
    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.classes
            .iter()
            .position(|c| c == name)
            .map(|idx| idx as ClassId)
    }

    /// Look up a class name by id.
    pub fn class_name(&self, id: ClassId) -> Option<&str> {
        self.classes.get(id as usize).map(String::as_str)
    }
}

/// A classified stream line.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamLine {
    Header(StreamHeader),
    Frame(FrameObservations),
    /// Blank line.
    Skip,
}

/// Parse one line of a stream.
pub fn parse_line(line: &str) -> Result<StreamLine, serde_json::Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(StreamLine::Skip);
    }
    if let Some(rest) = trimmed.strip_prefix(HEADER_PREFIX) {
        return serde_json::from_str(rest.trim()).map(StreamLine::Header);
    }
    serde_json::from_str(trimmed).map(StreamLine::Frame)
}

/// Format the header line (without trailing newline).
pub fn header_line(header: &StreamHeader) -> Result<String, serde_json::Error> {
    Ok(format!("{HEADER_PREFIX} {}", serde_json::to_string(header)?))
}

/// Serialize a whole stream to JSONL.
pub fn serialize_stream(
    header: &StreamHeader,
    frames: &[FrameObservations],
) -> Result<String, serde_json::Error> {
    let mut output = header_line(header)?;
    output.push('\n');
    for frame in frames {
        output.push_str(&serde_json::to_string(frame)?);
        output.push('\n');
    }
    Ok(output)
}
