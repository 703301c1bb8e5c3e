pub mod check;
pub mod info;
pub mod init;
pub mod run;
pub mod synth;
pub mod validate;

use std::path::Path;

use footfall_stream_model::settings::AnalyticsSettings;

/// Load analytics settings from a file, or use defaults.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<AnalyticsSettings> {
    match path {
        Some(path) => AnalyticsSettings::load(path)
            .map_err(|e| anyhow::anyhow!("Failed to load settings: {e}")),
        None => Ok(AnalyticsSettings::default()),
    }
}
