//! Per-frame observations produced by the upstream detector/tracker.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Tracker-assigned identity of one tracked entity.
///
/// Opaque: the tracker may reuse an identity after losing an entity, and
/// nothing downstream tries to tell the two apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Detector class index (e.g. `0` = person for COCO models).
pub type ClassId = u32;

/// A point in frame pixel coordinates.
///
/// Serialized as a two-element array `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// Axis-aligned bounding box in left-top-right-bottom form.
///
/// Serialized as `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build a box of the given size centered on `(cx, cy)`.
    pub fn centered(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
        }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn is_finite(&self) -> bool {
        self.x1.is_finite() && self.y1.is_finite() && self.x2.is_finite() && self.y2.is_finite()
    }

    /// A box whose right/bottom edge lies before its left/top edge.
    pub fn is_inverted(&self) -> bool {
        self.x2 < self.x1 || self.y2 < self.y1
    }
}

impl From<[f64; 4]> for BBox {
    fn from([x1, y1, x2, y2]: [f64; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// One detected entity in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Tracker identity. Absent when the tracker could not assign one; such
    /// observations feed the heatmap but never the line counters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TrackId>,

    /// Detector class index.
    #[serde(rename = "class")]
    pub class_id: ClassId,

    /// Bounding box in frame pixels.
    pub bbox: BBox,

    /// Detector confidence, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl Observation {
    /// Create a tracked observation.
    pub fn tracked(id: u64, class_id: ClassId, bbox: BBox) -> Self {
        Self {
            id: Some(TrackId(id)),
            class_id,
            bbox,
            confidence: None,
        }
    }

    /// Create an observation without tracker identity.
    pub fn untracked(class_id: ClassId, bbox: BBox) -> Self {
        Self {
            id: None,
            class_id,
            bbox,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// All observations reported by the tracker for one frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameObservations {
    /// Zero-based frame index in presentation order.
    pub frame: u64,

    /// Observations in this frame, possibly empty.
    #[serde(default)]
    pub observations: Vec<Observation>,
}

impl FrameObservations {
    pub fn new(frame: u64, observations: Vec<Observation>) -> Self {
        Self {
            frame,
            observations,
        }
    }

    /// A frame with no observations.
    pub fn empty(frame: u64) -> Self {
        Self {
            frame,
            observations: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_wire_format() {
        let json = r#"{"id":7,"class":0,"bbox":[480.0,240.0,520.0,320.0],"confidence":0.8}"#;
        let obs: Observation = serde_json::from_str(json).unwrap();
        assert_eq!(obs.id, Some(TrackId(7)));
        assert_eq!(obs.class_id, 0);
        assert_eq!(obs.bbox, BBox::new(480.0, 240.0, 520.0, 320.0));
        assert_eq!(obs.confidence, Some(0.8));
    }

    #[test]
    fn test_observation_without_id() {
        let obs: Observation = serde_json::from_str(r#"{"class":2,"bbox":[0,0,10,10]}"#).unwrap();
        assert!(obs.id.is_none());

        let json = serde_json::to_string(&obs).unwrap();
        assert!(!json.contains("\"id\""));
    }

    #[test]
    fn test_point_serializes_as_pair() {
        let json = serde_json::to_string(&Point::new(0.0, 302.0)).unwrap();
        assert_eq!(json, "[0.0,302.0]");
    }

    #[test]
    fn test_bbox_helpers() {
        let b = BBox::centered(500.0, 300.0, 40.0, 80.0);
        assert_eq!(b, BBox::new(480.0, 260.0, 520.0, 340.0));
        assert!((b.width() - 40.0).abs() < f64::EPSILON);
        assert!(!b.is_inverted());
        assert!(BBox::new(10.0, 0.0, 5.0, 5.0).is_inverted());
        assert!(!BBox::new(f64::NAN, 0.0, 5.0, 5.0).is_finite());
    }

    #[test]
    fn test_frame_defaults_to_no_observations() {
        let frame: FrameObservations = serde_json::from_str(r#"{"frame":3}"#).unwrap();
        assert_eq!(frame, FrameObservations::empty(3));
        assert!(frame.is_empty());
    }
}
