//! Cumulative density surface.
//!
//! Each qualifying footprint splats a radial kernel into a frame-sized grid
//! of raw mass. Mass only ever grows: there is no decay, so every cell is
//! non-decreasing over the run and grows only within the kernel radius of
//! some footprint. Rendering (the rolling overlay and the final colorized
//! image) reads the surface without modifying it.

use footfall_common::error::{FootfallError, FootfallResult};
use footfall_stream_model::observation::Point;
use footfall_stream_model::settings::{
    ColorMapKind, DensitySettings, FinalizeSettings, KernelProfile, Normalization,
    OverlaySettings,
};
use image::{GrayImage, Luma, RgbImage};

use crate::colormap;

/// Validated splat kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelSpec {
    radius: f64,
    profile: KernelProfile,
    amplitude: f32,
}

impl KernelSpec {
    pub fn new(radius: f64, profile: KernelProfile, amplitude: f32) -> FootfallResult<Self> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(FootfallError::config(format!(
                "kernel radius must be positive, got {radius}"
            )));
        }
        if !amplitude.is_finite() || amplitude <= 0.0 {
            return Err(FootfallError::config(format!(
                "kernel amplitude must be positive, got {amplitude}"
            )));
        }
        Ok(Self {
            radius,
            profile,
            amplitude,
        })
    }

    pub fn from_settings(settings: &DensitySettings) -> FootfallResult<Self> {
        Self::new(settings.radius, settings.profile, settings.amplitude)
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn profile(&self) -> KernelProfile {
        self.profile
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    /// Weight at distance `d` from the center, in `[0, 1]`.
    pub fn weight(&self, d: f64) -> f32 {
        let r = self.radius;
        let w = match self.profile {
            KernelProfile::Disc if d <= r => 1.0,
            KernelProfile::Smooth if d < r => {
                let q = 1.0 - (d / r).powi(2);
                q * q
            }
            KernelProfile::Linear if d < r => 1.0 - d / r,
            _ => 0.0,
        };
        w as f32
    }
}

/// Precomputed kernel weights on a `(2 * reach + 1)^2` pixel grid.
#[derive(Debug, Clone)]
struct KernelStamp {
    spec: KernelSpec,
    reach: i64,
    weights: Vec<f32>,
}

impl KernelStamp {
    fn new(spec: KernelSpec) -> Self {
        let reach = spec.radius.ceil() as i64;
        let side = (2 * reach + 1) as usize;
        let mut weights = Vec::with_capacity(side * side);
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let d = ((dx * dx + dy * dy) as f64).sqrt();
                weights.push(spec.weight(d));
            }
        }
        Self {
            spec,
            reach,
            weights,
        }
    }

    fn same_shape(&self, spec: &KernelSpec) -> bool {
        self.spec.radius == spec.radius && self.spec.profile == spec.profile
    }
}

/// Raw accumulated mass, one cell per frame pixel.
#[derive(Debug, Clone)]
pub struct DensitySurface {
    width: u32,
    height: u32,
    mass: Vec<f32>,
    max_mass: f32,
    splats: u64,
}

impl DensitySurface {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            mass: vec![0.0; width as usize * height as usize],
            max_mass: 0.0,
            splats: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major cell values.
    pub fn cells(&self) -> &[f32] {
        &self.mass
    }

    /// Mass at a pixel, or `None` outside the surface.
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.mass[y as usize * self.width as usize + x as usize])
    }

    pub fn max_mass(&self) -> f32 {
        self.max_mass
    }

    pub fn min_mass(&self) -> f32 {
        self.mass.iter().copied().fold(f32::INFINITY, f32::min).min(self.max_mass)
    }

    pub fn total_mass(&self) -> f64 {
        self.mass.iter().map(|&m| m as f64).sum()
    }

    /// Number of footprints splatted so far.
    pub fn splats(&self) -> u64 {
        self.splats
    }

    pub fn is_empty(&self) -> bool {
        self.max_mass <= 0.0
    }
}

/// Rolling overlay parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub opacity: f32,
    pub kernel_size: u32,
    pub low_hue: u8,
    pub high_hue: u8,
}

impl OverlayStyle {
    pub fn from_settings(settings: &OverlaySettings) -> FootfallResult<Self> {
        if !(0.0..=1.0).contains(&settings.opacity) {
            return Err(FootfallError::config(format!(
                "overlay opacity must be within [0, 1], got {}",
                settings.opacity
            )));
        }
        for (label, hue) in [("low_hue", settings.low_hue), ("high_hue", settings.high_hue)] {
            if hue >= 180 {
                return Err(FootfallError::config(format!(
                    "overlay {label} must be below 180, got {hue}"
                )));
            }
        }
        Ok(Self {
            opacity: settings.opacity,
            kernel_size: settings.kernel_size,
            low_hue: settings.low_hue,
            high_hue: settings.high_hue,
        })
    }
}

impl Default for OverlayStyle {
    fn default() -> Self {
        let settings = OverlaySettings::default();
        Self {
            opacity: settings.opacity,
            kernel_size: settings.kernel_size,
            low_hue: settings.low_hue,
            high_hue: settings.high_hue,
        }
    }
}

/// Static end-of-run heatmap.
#[derive(Debug, Clone)]
pub struct FinalizedHeatmap {
    /// Surface mapped to `0..=255`.
    pub normalized: GrayImage,
    /// `normalized` passed through the color map.
    pub colorized: RgbImage,
    pub min_mass: f32,
    pub max_mass: f32,
}

/// Owns the density surface and the splat kernel.
#[derive(Debug, Clone)]
pub struct DensityAccumulator {
    surface: DensitySurface,
    kernel: KernelSpec,
    stamp: KernelStamp,
}

impl DensityAccumulator {
    /// Create a zero-mass surface. Dimensions are fixed for the accumulator's
    /// lifetime.
    pub fn new(width: u32, height: u32, kernel: KernelSpec) -> FootfallResult<Self> {
        if width == 0 || height == 0 {
            return Err(FootfallError::config(format!(
                "frame size must be non-zero, got {width}x{height}"
            )));
        }
        Ok(Self {
            surface: DensitySurface::new(width, height),
            kernel,
            stamp: KernelStamp::new(kernel),
        })
    }

    /// The raw accumulated surface.
    pub fn raw(&self) -> &DensitySurface {
        &self.surface
    }

    /// The configured kernel.
    pub fn kernel(&self) -> &KernelSpec {
        &self.kernel
    }

    /// Splat the configured kernel at a footprint.
    pub fn splat(&mut self, footprint: Point) -> FootfallResult<()> {
        let kernel = self.kernel;
        self.accumulate(footprint, kernel.amplitude, &kernel)
    }

    /// Add `amplitude` times `kernel` centered at `footprint`, clipped to
    /// the surface bounds.
    pub fn accumulate(
        &mut self,
        footprint: Point,
        amplitude: f32,
        kernel: &KernelSpec,
    ) -> FootfallResult<()> {
        if !footprint.is_finite() {
            return Err(FootfallError::anomaly(format!(
                "non-finite footprint ({}, {})",
                footprint.x, footprint.y
            )));
        }
        if !amplitude.is_finite() || amplitude < 0.0 {
            return Err(FootfallError::anomaly(format!(
                "invalid splat amplitude {amplitude}"
            )));
        }

        if !self.stamp.same_shape(kernel) {
            self.stamp = KernelStamp::new(*kernel);
        }

        let stamp = &self.stamp;
        let surface = &mut self.surface;
        // Beyond the kernel reach nothing lands on the surface; this also keeps
        // the integer window below bounded.
        let reach = stamp.reach as f64 + 1.0;
        if footprint.x < -reach
            || footprint.y < -reach
            || footprint.x > surface.width as f64 + reach
            || footprint.y > surface.height as f64 + reach
        {
            surface.splats += 1;
            return Ok(());
        }
        let (w, h) = (surface.width as i64, surface.height as i64);
        let cx = footprint.x.floor() as i64;
        let cy = footprint.y.floor() as i64;
        let side = 2 * stamp.reach + 1;

        let y0 = (cy - stamp.reach).max(0);
        let y1 = (cy + stamp.reach).min(h - 1);
        let x0 = (cx - stamp.reach).max(0);
        let x1 = (cx + stamp.reach).min(w - 1);

        for y in y0..=y1 {
            let sy = y - cy + stamp.reach;
            let row = (y * w) as usize;
            for x in x0..=x1 {
                let sx = x - cx + stamp.reach;
                let weight = stamp.weights[(sy * side + sx) as usize];
                if weight <= 0.0 {
                    continue;
                }
                let cell = &mut surface.mass[row + x as usize];
                *cell += amplitude * weight;
                if *cell > surface.max_mass {
                    surface.max_mass = *cell;
                }
            }
        }
        surface.splats += 1;
        Ok(())
    }

    /// Blend the current surface into `scene` as a hue gradient.
    ///
    /// Cells with mass take the hue `low - mass / max * (low - high)`, the hue
    /// plane is box-blurred by `kernel_size`, and the resulting colors are
    /// blended over the scene with `opacity`. Cells without mass keep the
    /// scene's pixels. The surface itself is not modified.
    pub fn render_overlay(&self, scene: &RgbImage, style: &OverlayStyle) -> FootfallResult<RgbImage> {
        let surface = &self.surface;
        if scene.dimensions() != (surface.width, surface.height) {
            return Err(FootfallError::config(format!(
                "scene is {}x{} but the density surface is {}x{}",
                scene.width(),
                scene.height(),
                surface.width,
                surface.height
            )));
        }

        let mut out = scene.clone();
        if surface.is_empty() {
            return Ok(out);
        }

        let low = style.low_hue as f32;
        let span = low - style.high_hue as f32;
        let max = surface.max_mass;
        let hue = GrayImage::from_fn(surface.width, surface.height, |x, y| {
            let m = surface.mass[y as usize * surface.width as usize + x as usize];
            Luma([(low - m / max * span).clamp(0.0, 179.0) as u8])
        });

        let hue = if style.kernel_size > 1 {
            let r = style.kernel_size / 2;
            imageproc::filter::box_filter(&hue, r, r)
        } else {
            hue
        };

        for (x, y, pixel) in out.enumerate_pixels_mut() {
            let m = surface.mass[y as usize * surface.width as usize + x as usize];
            if m > 0.0 {
                let color = colormap::hue_to_rgb(hue.get_pixel(x, y)[0]);
                *pixel = colormap::blend(color, *pixel, style.opacity);
            }
        }
        Ok(out)
    }

    /// Normalize the surface to `0..=255` and colorize it.
    ///
    /// A flat surface (including one that never received mass) normalizes
    /// to all zeros.
    pub fn finalize(&self, style: &FinalizeStyle) -> FinalizedHeatmap {
        let surface = &self.surface;
        let max = surface.max_mass;
        let min = surface.min_mass();
        let lo = match style.normalization {
            Normalization::MinMax => min,
            Normalization::ZeroMax => 0.0,
        };
        let range = max - lo;

        let normalized = GrayImage::from_fn(surface.width, surface.height, |x, y| {
            if range <= 0.0 {
                return Luma([0]);
            }
            let m = surface.mass[y as usize * surface.width as usize + x as usize];
            Luma([((m - lo) / range * 255.0).round().clamp(0.0, 255.0) as u8])
        });

        let colorized = RgbImage::from_fn(surface.width, surface.height, |x, y| {
            colormap::apply(style.color_map, normalized.get_pixel(x, y)[0])
        });

        FinalizedHeatmap {
            normalized,
            colorized,
            min_mass: if min.is_finite() { min } else { 0.0 },
            max_mass: max,
        }
    }
}

/// End-of-run normalization and color map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FinalizeStyle {
    pub normalization: Normalization,
    pub color_map: ColorMapKind,
}

impl From<&FinalizeSettings> for FinalizeStyle {
    fn from(settings: &FinalizeSettings) -> Self {
        Self {
            normalization: settings.normalization,
            color_map: settings.color_map,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accumulator(w: u32, h: u32, radius: f64, profile: KernelProfile) -> DensityAccumulator {
        DensityAccumulator::new(w, h, KernelSpec::new(radius, profile, 1.0).unwrap()).unwrap()
    }

    #[test]
    fn test_kernel_validation() {
        assert!(KernelSpec::new(0.0, KernelProfile::Smooth, 1.0).is_err());
        assert!(KernelSpec::new(-3.0, KernelProfile::Disc, 1.0).is_err());
        assert!(KernelSpec::new(f64::NAN, KernelProfile::Disc, 1.0).is_err());
        assert!(KernelSpec::new(5.0, KernelProfile::Disc, 0.0).is_err());
        assert!(KernelSpec::new(5.0, KernelProfile::Linear, 2.0).is_ok());
    }

    #[test]
    fn test_kernel_weights() {
        let smooth = KernelSpec::new(10.0, KernelProfile::Smooth, 1.0).unwrap();
        assert_eq!(smooth.weight(0.0), 1.0);
        assert!(smooth.weight(9.9) > 0.0);
        assert_eq!(smooth.weight(10.0), 0.0);
        assert!(smooth.weight(3.0) > smooth.weight(6.0));

        let disc = KernelSpec::new(10.0, KernelProfile::Disc, 1.0).unwrap();
        assert_eq!(disc.weight(10.0), 1.0);
        assert_eq!(disc.weight(10.1), 0.0);
    }

    #[test]
    fn test_splat_is_local_and_peaks_at_center() {
        let mut acc = accumulator(100, 100, 5.0, KernelProfile::Smooth);
        acc.splat(Point::new(50.0, 50.0)).unwrap();

        let surface = acc.raw();
        assert_eq!(surface.get(50, 50), Some(1.0));
        assert!(surface.get(53, 50).unwrap() > 0.0);
        assert_eq!(surface.get(55, 50), Some(0.0));
        assert_eq!(surface.get(60, 60), Some(0.0));
        assert_eq!(surface.max_mass(), 1.0);
        assert_eq!(surface.splats(), 1);
    }

    #[test]
    fn test_splat_clips_at_bounds() {
        let mut acc = accumulator(20, 10, 8.0, KernelProfile::Disc);
        acc.splat(Point::new(0.0, 0.0)).unwrap();
        acc.splat(Point::new(19.5, 9.5)).unwrap();
        acc.splat(Point::new(500.0, 500.0)).unwrap();

        let surface = acc.raw();
        assert_eq!(surface.get(0, 0), Some(1.0));
        assert_eq!(surface.get(19, 9), Some(1.0));
        assert_eq!(surface.splats(), 3);
    }

    #[test]
    fn test_accumulation_is_additive() {
        let mut acc = accumulator(50, 50, 4.0, KernelProfile::Disc);
        acc.splat(Point::new(25.0, 25.0)).unwrap();
        acc.splat(Point::new(25.0, 25.0)).unwrap();
        acc.accumulate(
            Point::new(25.0, 25.0),
            0.5,
            &KernelSpec::new(2.0, KernelProfile::Disc, 1.0).unwrap(),
        )
        .unwrap();
        assert_eq!(acc.raw().get(25, 25), Some(2.5));
        assert_eq!(acc.raw().get(28, 25), Some(2.0));
    }

    #[test]
    fn test_far_away_footprint_adds_nothing() {
        let mut acc = accumulator(100, 100, 5.0, KernelProfile::Smooth);
        acc.splat(Point::new(1e30, 1e30)).unwrap();
        acc.splat(Point::new(-1e300, 50.0)).unwrap();
        acc.splat(Point::new(50.0, f64::MAX)).unwrap();
        assert!(acc.raw().is_empty());
        assert_eq!(acc.raw().total_mass(), 0.0);

        // Just outside the edge the kernel still reaches in.
        acc.splat(Point::new(-3.0, 50.0)).unwrap();
        assert!(acc.raw().get(0, 50).unwrap() > 0.0);
    }

    #[test]
    fn test_tiny_amplitude_still_stretches_to_full_range() {
        let kernel = KernelSpec::new(3.0, KernelProfile::Disc, 1e-8).unwrap();
        let mut acc = DensityAccumulator::new(20, 20, kernel).unwrap();
        acc.splat(Point::new(10.0, 10.0)).unwrap();

        let heatmap = acc.finalize(&FinalizeStyle::default());
        assert!(heatmap.max_mass > 0.0);
        assert_eq!(heatmap.normalized.get_pixel(10, 10)[0], 255);
        assert_eq!(heatmap.normalized.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_non_finite_footprint_rejected() {
        let mut acc = accumulator(10, 10, 2.0, KernelProfile::Smooth);
        let err = acc.splat(Point::new(f64::NAN, 1.0)).unwrap_err();
        assert!(matches!(err, FootfallError::ObservationAnomaly { .. }));
        assert!(acc.raw().is_empty());
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let kernel = KernelSpec::new(2.0, KernelProfile::Smooth, 1.0).unwrap();
        assert!(DensityAccumulator::new(0, 10, kernel).is_err());
    }

    #[test]
    fn test_empty_surface_finalizes_to_zero() {
        let acc = accumulator(32, 16, 4.0, KernelProfile::Smooth);
        for normalization in [Normalization::MinMax, Normalization::ZeroMax] {
            let heatmap = acc.finalize(&FinalizeStyle {
                normalization,
                color_map: ColorMapKind::Jet,
            });
            assert!(heatmap.normalized.pixels().all(|p| p[0] == 0));
            let first = *heatmap.colorized.get_pixel(0, 0);
            assert_eq!(first, colormap::jet(0));
            assert!(heatmap.colorized.pixels().all(|p| *p == first));
            assert_eq!(heatmap.max_mass, 0.0);
            assert_eq!(heatmap.min_mass, 0.0);
        }
    }

    #[test]
    fn test_finalize_stretches_to_full_range() {
        let mut acc = accumulator(40, 40, 3.0, KernelProfile::Disc);
        acc.splat(Point::new(10.0, 10.0)).unwrap();
        acc.splat(Point::new(10.0, 10.0)).unwrap();
        acc.splat(Point::new(30.0, 30.0)).unwrap();

        let heatmap = acc.finalize(&FinalizeStyle::default());
        assert_eq!(heatmap.normalized.get_pixel(10, 10)[0], 255);
        assert_eq!(heatmap.normalized.get_pixel(30, 30)[0], 128);
        assert_eq!(heatmap.normalized.get_pixel(0, 39)[0], 0);
        assert_eq!(*heatmap.colorized.get_pixel(10, 10), colormap::jet(255));
    }

    #[test]
    fn test_overlay_leaves_untouched_pixels_and_surface() {
        let mut acc = accumulator(30, 30, 3.0, KernelProfile::Disc);
        acc.splat(Point::new(15.0, 15.0)).unwrap();
        let before = acc.raw().cells().to_vec();

        let scene = RgbImage::from_pixel(30, 30, image::Rgb([10, 20, 30]));
        let style = OverlayStyle {
            opacity: 1.0,
            kernel_size: 0,
            ..OverlayStyle::default()
        };
        let out = acc.render_overlay(&scene, &style).unwrap();

        assert_eq!(*out.get_pixel(0, 0), image::Rgb([10, 20, 30]));
        assert_eq!(*out.get_pixel(15, 15), colormap::hue_to_rgb(0));
        assert_eq!(acc.raw().cells(), before.as_slice());
    }

    #[test]
    fn test_overlay_rejects_mismatched_scene() {
        let acc = accumulator(30, 30, 3.0, KernelProfile::Disc);
        let scene = RgbImage::new(10, 10);
        assert!(acc.render_overlay(&scene, &OverlayStyle::default()).is_err());
    }

    #[test]
    fn test_overlay_style_validation() {
        let bad_opacity = OverlaySettings {
            opacity: 1.5,
            ..OverlaySettings::default()
        };
        assert!(OverlayStyle::from_settings(&bad_opacity).is_err());

        let bad_hue = OverlaySettings {
            low_hue: 200,
            ..OverlaySettings::default()
        };
        assert!(OverlayStyle::from_settings(&bad_hue).is_err());
    }
}
