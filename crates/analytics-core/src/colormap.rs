//! Color mapping for heatmap output.

use footfall_stream_model::settings::ColorMapKind;
use image::Rgb;

/// Map a normalized intensity to a color.
pub fn apply(kind: ColorMapKind, value: u8) -> Rgb<u8> {
    match kind {
        ColorMapKind::Jet => jet(value),
        ColorMapKind::Hot => hot(value),
    }
}

/// Blue → cyan → yellow → red. `0` is dark blue, `255` dark red.
pub fn jet(value: u8) -> Rgb<u8> {
    let t = value as f32 / 255.0;
    let channel = |offset: f32| to_u8(1.5 - (4.0 * t - offset).abs());
    Rgb([channel(3.0), channel(2.0), channel(1.0)])
}

/// Black → red → yellow → white.
pub fn hot(value: u8) -> Rgb<u8> {
    let t = value as f32 / 255.0;
    Rgb([to_u8(3.0 * t), to_u8(3.0 * t - 1.0), to_u8(3.0 * t - 2.0)])
}

/// Fully saturated, full value color for a hue on the half-degree scale
/// (0..180, so 60 is green and 120 blue).
pub fn hue_to_rgb(hue: u8) -> Rgb<u8> {
    let h = (hue as f32 * 2.0).rem_euclid(360.0) / 60.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();
    let (r, g, b) = match h as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    Rgb([to_u8(r), to_u8(g), to_u8(b)])
}

/// Blend `top` over `base` with weight `alpha` in `[0, 1]`.
pub fn blend(top: Rgb<u8>, base: Rgb<u8>, alpha: f32) -> Rgb<u8> {
    let mix = |a: u8, b: u8| (a as f32 * alpha + b as f32 * (1.0 - alpha)).round() as u8;
    Rgb([
        mix(top[0], base[0]),
        mix(top[1], base[1]),
        mix(top[2], base[2]),
    ])
}

fn to_u8(unit: f32) -> u8 {
    (unit.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jet_endpoints() {
        assert_eq!(jet(0), Rgb([0, 0, 128]));
        assert_eq!(jet(255), Rgb([128, 0, 0]));
        let mid = jet(128);
        assert!(mid[1] > 200, "middle of jet should be mostly green: {mid:?}");
    }

    #[test]
    fn test_hot_endpoints() {
        assert_eq!(hot(0), Rgb([0, 0, 0]));
        assert_eq!(hot(255), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_hue_scale() {
        assert_eq!(hue_to_rgb(0), Rgb([255, 0, 0]));
        assert_eq!(hue_to_rgb(60), Rgb([0, 255, 0]));
        assert_eq!(hue_to_rgb(120), Rgb([0, 0, 255]));
        assert_eq!(hue_to_rgb(30), Rgb([255, 255, 0]));
    }

    #[test]
    fn test_blend_weights() {
        let red = Rgb([255, 0, 0]);
        let black = Rgb([0, 0, 0]);
        assert_eq!(blend(red, black, 1.0), red);
        assert_eq!(blend(red, black, 0.0), black);
        assert_eq!(blend(red, black, 0.6), Rgb([153, 0, 0]));
    }
}
