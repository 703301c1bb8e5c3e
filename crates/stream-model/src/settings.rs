//! Analytics settings for one run.
//!
//! Stored as pretty JSON (conventionally `footfall.json`). Every field has a
//! default, so a settings file only needs the values that differ. Semantic
//! validation (line geometry, positive radius, known class) happens when the
//! analytics pipeline is built, because the class table comes from the
//! stream header.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::line::{default_lines, LineSpec};
use crate::observation::ClassId;

/// Which detector class qualifies for counting and heatmapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassFilter {
    /// Match by class index.
    Id(ClassId),
    /// Match by name, resolved against the stream header's class table.
    Name(String),
}

/// Point of the bounding box used as the density footprint.
///
/// Crossing detection always samples the box center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FootprintAnchor {
    #[default]
    Center,
    BottomCenter,
}

/// Radial profile of the density splat kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelProfile {
    /// `(1 - (d/r)^2)^2`, smooth and strictly positive inside the radius.
    #[default]
    Smooth,
    /// Constant weight inside the radius (a filled disc).
    Disc,
    /// `1 - d/r`.
    Linear,
}

/// How the raw surface is mapped to the 0..=255 display range at run end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Surface minimum maps to 0, maximum to 255.
    #[default]
    MinMax,
    /// Zero mass maps to 0, maximum to 255.
    ZeroMax,
}

/// Color map applied to the normalized surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMapKind {
    #[default]
    Jet,
    Hot,
}

/// Density splat parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensitySettings {
    /// Kernel radius in pixels.
    pub radius: f64,
    pub profile: KernelProfile,
    /// Mass added at the kernel center per footprint.
    pub amplitude: f32,
}

/// Rolling overlay rendering parameters.
///
/// Hues use the half-degree scale (0..=179): 0 is red, 60 green, 120 blue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    /// Blend weight of the heat colors over the scene, in `[0, 1]`.
    pub opacity: f32,
    /// Box blur size applied to the hue plane. 0 or 1 disables blurring.
    pub kernel_size: u32,
    /// Hue used for the lowest density.
    pub low_hue: u8,
    /// Hue used for the highest density.
    pub high_hue: u8,
}

/// End-of-run heatmap parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalizeSettings {
    pub normalization: Normalization,
    pub color_map: ColorMapKind,
}

/// Per-identity motion history retention.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Forget identities not observed for more than this many frames.
    /// `None` keeps every identity for the whole run.
    pub max_idle_frames: Option<u64>,
}

/// Complete analytics option set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsSettings {
    /// Qualifying class; `None` accepts every class.
    pub class_filter: Option<ClassFilter>,
    pub lines: Vec<LineSpec>,
    pub footprint: FootprintAnchor,
    pub density: DensitySettings,
    pub overlay: OverlaySettings,
    pub finalize: FinalizeSettings,
    pub history: HistorySettings,
    /// Log progress every N frames. 0 disables progress logs.
    pub progress_interval_frames: u64,
}

impl Default for DensitySettings {
    fn default() -> Self {
        Self {
            radius: 40.0,
            profile: KernelProfile::Smooth,
            amplitude: 1.0,
        }
    }
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            opacity: 0.6,
            kernel_size: 25,
            low_hue: 120,
            high_hue: 0,
        }
    }
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            class_filter: Some(ClassFilter::Id(0)),
            lines: default_lines(),
            footprint: FootprintAnchor::Center,
            density: DensitySettings::default(),
            overlay: OverlaySettings::default(),
            finalize: FinalizeSettings::default(),
            history: HistorySettings::default(),
            progress_interval_frames: 50,
        }
    }
}

impl AnalyticsSettings {
    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();
        let json = std::fs::read_to_string(&path).map_err(|e| SettingsError::IoError {
            path: path.clone(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| SettingsError::ParseError { path, source: e })
    }

    /// Save settings as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| SettingsError::ParseError {
            path: path.clone(),
            source: e,
        })?;
        std::fs::write(&path, json).map_err(|e| SettingsError::IoError { path, source: e })
    }
}

/// Errors that can occur when loading or saving settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::Direction;

    #[test]
    fn test_defaults_match_reference_setup() {
        let settings = AnalyticsSettings::default();
        assert_eq!(settings.class_filter, Some(ClassFilter::Id(0)));
        assert_eq!(settings.lines.len(), 2);
        assert!((settings.density.radius - 40.0).abs() < f64::EPSILON);
        assert_eq!(settings.overlay.kernel_size, 25);
        assert_eq!(settings.overlay.low_hue, 120);
        assert_eq!(settings.overlay.high_hue, 0);
        assert_eq!(settings.finalize.color_map, ColorMapKind::Jet);
        assert_eq!(settings.history.max_idle_frames, None);
    }

    #[test]
    fn test_class_filter_accepts_id_or_name() {
        let by_id: AnalyticsSettings = serde_json::from_str(r#"{"class_filter": 2}"#).unwrap();
        assert_eq!(by_id.class_filter, Some(ClassFilter::Id(2)));

        let by_name: AnalyticsSettings =
            serde_json::from_str(r#"{"class_filter": "person"}"#).unwrap();
        assert_eq!(
            by_name.class_filter,
            Some(ClassFilter::Name("person".to_string()))
        );

        let any: AnalyticsSettings = serde_json::from_str(r#"{"class_filter": null}"#).unwrap();
        assert_eq!(any.class_filter, None);
    }

    #[test]
    fn test_partial_settings_keep_other_defaults() {
        let json = r#"{
            "lines": [{"name":"gate","start":[0,500],"end":[800,500],"direction":"out"}],
            "density": {"radius": 12},
            "footprint": "bottom_center"
        }"#;
        let settings: AnalyticsSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.lines.len(), 1);
        assert_eq!(settings.lines[0].direction, Direction::Out);
        assert!((settings.density.radius - 12.0).abs() < f64::EPSILON);
        assert_eq!(settings.density.profile, KernelProfile::Smooth);
        assert_eq!(settings.footprint, FootprintAnchor::BottomCenter);
        assert!((settings.overlay.opacity - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn test_settings_save_and_load() {
        let dir = std::env::temp_dir().join("footfall_test_settings");
        let _ = std::fs::remove_dir_all(&dir);

        let path = dir.join("footfall.json");
        let mut settings = AnalyticsSettings::default();
        settings.history.max_idle_frames = Some(90);
        settings.save(&path).unwrap();

        let loaded = AnalyticsSettings::load(&path).unwrap();
        assert_eq!(loaded, settings);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = AnalyticsSettings::load("/nonexistent/footfall.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/footfall.json"));
    }
}
