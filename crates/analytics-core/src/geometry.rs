//! Geometry helpers: sample points and horizontal counting lines.

use footfall_common::error::{FootfallError, FootfallResult};
use footfall_stream_model::line::{Direction, LineSpec};
use footfall_stream_model::observation::{BBox, Point};
use footfall_stream_model::settings::FootprintAnchor;

/// Center of a bounding box. This is the crossing sample point.
pub fn centroid(bbox: &BBox) -> Point {
    Point::new((bbox.x1 + bbox.x2) / 2.0, (bbox.y1 + bbox.y2) / 2.0)
}

/// Density footprint of a bounding box for the given anchor.
pub fn anchor_point(bbox: &BBox, anchor: FootprintAnchor) -> Point {
    match anchor {
        FootprintAnchor::Center => centroid(bbox),
        FootprintAnchor::BottomCenter => Point::new((bbox.x1 + bbox.x2) / 2.0, bbox.y2),
    }
}

/// Whether a point lies inside a `width x height` frame, edges included.
pub fn in_frame(point: &Point, width: u32, height: u32) -> bool {
    point.is_finite()
        && point.x >= 0.0
        && point.y >= 0.0
        && point.x <= width as f64
        && point.y <= height as f64
}

/// Position of a point relative to a horizontal line.
///
/// Image coordinates: `Above` means a smaller `y` than the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSide {
    Above,
    On,
    Below,
}

/// A validated horizontal counting line.
#[derive(Debug, Clone, PartialEq)]
pub struct HorizontalLine {
    name: String,
    start: Point,
    end: Point,
    threshold: f64,
    direction: Direction,
}

impl HorizontalLine {
    /// Validate a line spec.
    ///
    /// The line must have a name, finite endpoints, a non-zero span and
    /// equal `y` at both ends.
    pub fn from_spec(spec: &LineSpec) -> FootfallResult<Self> {
        if spec.name.trim().is_empty() {
            return Err(FootfallError::config("line name must not be empty"));
        }
        if !spec.start.is_finite() || !spec.end.is_finite() {
            return Err(FootfallError::config(format!(
                "line '{}' has non-finite coordinates",
                spec.name
            )));
        }
        if spec.start.y != spec.end.y {
            return Err(FootfallError::config(format!(
                "line '{}' must be horizontal (start y {} != end y {})",
                spec.name, spec.start.y, spec.end.y
            )));
        }
        if spec.start.x == spec.end.x {
            return Err(FootfallError::config(format!(
                "line '{}' has zero length",
                spec.name
            )));
        }

        let (start, end) = if spec.start.x <= spec.end.x {
            (spec.start, spec.end)
        } else {
            (spec.end, spec.start)
        };

        Ok(Self {
            name: spec.name.clone(),
            start,
            end,
            threshold: spec.start.y,
            direction: spec.direction,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Left end of the drawn span.
    pub fn start(&self) -> Point {
        self.start
    }

    /// Right end of the drawn span.
    pub fn end(&self) -> Point {
        self.end
    }

    /// The `y` value crossings are tested against.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Side of the line a point is on. Only `y` matters.
    pub fn side_of(&self, point: &Point) -> LineSide {
        if point.y < self.threshold {
            LineSide::Above
        } else if point.y > self.threshold {
            LineSide::Below
        } else {
            LineSide::On
        }
    }

    /// Whether the move `previous -> current` completes a crossing in this
    /// line's direction.
    ///
    /// The arriving side is closed and the departing side open: landing
    /// exactly on the threshold counts, starting on it does not.
    pub fn is_crossed(&self, previous: &Point, current: &Point) -> bool {
        let from = self.side_of(previous);
        let to = self.side_of(current);
        match self.direction {
            Direction::In => from == LineSide::Above && to != LineSide::Above,
            Direction::Out => from == LineSide::Below && to != LineSide::Below,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_line(y: f64) -> HorizontalLine {
        HorizontalLine::from_spec(&LineSpec::horizontal("in", y, 0.0, 1920.0, Direction::In))
            .unwrap()
    }

    #[test]
    fn test_centroid_and_anchor() {
        let bbox = BBox::new(480.0, 240.0, 520.0, 320.0);
        assert_eq!(centroid(&bbox), Point::new(500.0, 280.0));
        assert_eq!(
            anchor_point(&bbox, FootprintAnchor::BottomCenter),
            Point::new(500.0, 320.0)
        );
    }

    #[test]
    fn test_in_frame_bounds() {
        assert!(in_frame(&Point::new(0.0, 0.0), 100, 50));
        assert!(in_frame(&Point::new(100.0, 50.0), 100, 50));
        assert!(!in_frame(&Point::new(-0.5, 10.0), 100, 50));
        assert!(!in_frame(&Point::new(10.0, 50.5), 100, 50));
        assert!(!in_frame(&Point::new(f64::NAN, 10.0), 100, 50));
    }

    #[test]
    fn test_side_of() {
        let line = in_line(302.0);
        assert_eq!(line.side_of(&Point::new(0.0, 301.9)), LineSide::Above);
        assert_eq!(line.side_of(&Point::new(0.0, 302.0)), LineSide::On);
        assert_eq!(line.side_of(&Point::new(0.0, 302.1)), LineSide::Below);
    }

    #[test]
    fn test_in_crossing_boundary_policy() {
        let line = in_line(302.0);
        let p = |y| Point::new(500.0, y);
        assert!(line.is_crossed(&p(300.0), &p(302.0)));
        assert!(line.is_crossed(&p(100.0), &p(310.0)));
        assert!(!line.is_crossed(&p(302.0), &p(304.0)));
        assert!(!line.is_crossed(&p(310.0), &p(290.0)));
        assert!(!line.is_crossed(&p(280.0), &p(290.0)));
    }

    #[test]
    fn test_out_crossing_boundary_policy() {
        let line = HorizontalLine::from_spec(&LineSpec::horizontal(
            "out",
            702.0,
            0.0,
            1920.0,
            Direction::Out,
        ))
        .unwrap();
        let p = |y| Point::new(500.0, y);
        assert!(line.is_crossed(&p(710.0), &p(702.0)));
        assert!(line.is_crossed(&p(710.0), &p(650.0)));
        assert!(!line.is_crossed(&p(702.0), &p(690.0)));
        assert!(!line.is_crossed(&p(650.0), &p(710.0)));
    }

    #[test]
    fn test_invalid_geometry_is_config_error() {
        let slanted = LineSpec {
            name: "slanted".to_string(),
            start: Point::new(0.0, 300.0),
            end: Point::new(100.0, 310.0),
            direction: Direction::In,
        };
        let err = HorizontalLine::from_spec(&slanted).unwrap_err();
        assert!(matches!(err, FootfallError::Config { .. }));

        let point = LineSpec::horizontal("dot", 300.0, 50.0, 50.0, Direction::In);
        assert!(HorizontalLine::from_spec(&point).is_err());

        let nan = LineSpec::horizontal("nan", f64::NAN, 0.0, 10.0, Direction::In);
        assert!(HorizontalLine::from_spec(&nan).is_err());

        let unnamed = LineSpec::horizontal(" ", 300.0, 0.0, 10.0, Direction::In);
        assert!(HorizontalLine::from_spec(&unnamed).is_err());
    }

    #[test]
    fn test_reversed_span_is_normalized() {
        let line = HorizontalLine::from_spec(&LineSpec::horizontal(
            "rev",
            100.0,
            800.0,
            0.0,
            Direction::Out,
        ))
        .unwrap();
        assert_eq!(line.start().x, 0.0);
        assert_eq!(line.end().x, 800.0);
        assert_eq!(line.threshold(), 100.0);
    }
}
