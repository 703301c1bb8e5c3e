//! Frame annotation: counting lines, bounding boxes and centroid dots.

use footfall_analytics::FrameView;
use footfall_stream_model::line::Direction;
use footfall_stream_model::observation::BBox;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

/// Colors and sizes used for annotations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationStyle {
    pub in_line: Rgb<u8>,
    pub out_line: Rgb<u8>,
    pub bbox: Rgb<u8>,
    pub centroid: Rgb<u8>,
    /// Line and box stroke width in pixels.
    pub thickness: u32,
    pub centroid_radius: i32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            in_line: Rgb([0, 255, 0]),
            out_line: Rgb([255, 0, 0]),
            bbox: Rgb([255, 255, 0]),
            centroid: Rgb([0, 255, 0]),
            thickness: 2,
            centroid_radius: 4,
        }
    }
}

impl AnnotationStyle {
    fn line_color(&self, direction: Direction) -> Rgb<u8> {
        match direction {
            Direction::In => self.in_line,
            Direction::Out => self.out_line,
        }
    }
}

/// Draw the counting lines and every accepted observation of `view` onto
/// `canvas`.
pub fn annotate_frame(canvas: &mut RgbImage, view: &FrameView<'_>, style: &AnnotationStyle) {
    for line in view.lines() {
        let color = style.line_color(line.direction());
        let (start, end) = (line.start(), line.end());
        for offset in 0..style.thickness.max(1) {
            let y = (line.threshold() + offset as f64) as f32;
            draw_line_segment_mut(canvas, (start.x as f32, y), (end.x as f32, y), color);
        }
    }

    for obs in view.accepted() {
        draw_box(canvas, &obs.bbox, style.bbox, style.thickness);
        draw_filled_circle_mut(
            canvas,
            (obs.centroid.x as i32, obs.centroid.y as i32),
            style.centroid_radius,
            style.centroid,
        );
    }
}

fn draw_box(canvas: &mut RgbImage, bbox: &BBox, color: Rgb<u8>, thickness: u32) {
    for inset in 0..thickness.max(1) {
        let inset = inset as f64;
        let width = (bbox.width() - 2.0 * inset).round();
        let height = (bbox.height() - 2.0 * inset).round();
        if width < 1.0 || height < 1.0 {
            break;
        }
        let rect = Rect::at((bbox.x1 + inset) as i32, (bbox.y1 + inset) as i32)
            .of_size(width as u32, height as u32);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}
