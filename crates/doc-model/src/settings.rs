use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How page navigation behaves at the first and last page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryPolicy {
    /// Targets are clamped to `[1, total_pages]`.
    #[default]
    Clamp,
    /// Targets past the last page are forwarded and rejected by the rasterizer.
    PassThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    pub progress_interval_ms: u64,
    pub progress_step: u8,
    pub close_delay_ms: u64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self { progress_interval_ms: 500, progress_step: 10, close_delay_ms: 1000 }
    }
}

impl UploadSettings {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }

    pub fn close_delay(&self) -> Duration {
        Duration::from_millis(self.close_delay_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSettings {
    pub width: u32,
    pub height: u32,
    pub jpeg_quality: u8,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self { width: 400, height: 300, jpeg_quality: 80 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    pub boundary_policy: BoundaryPolicy,
    pub target_width: u32,
    pub target_height: u32,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self { boundary_policy: BoundaryPolicy::Clamp, target_width: 1024, target_height: 1366 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub upload: UploadSettings,
    pub preview: PreviewSettings,
    pub viewer: ViewerSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            upload: UploadSettings::default(),
            preview: PreviewSettings::default(),
            viewer: ViewerSettings::default(),
        }
    }
}
