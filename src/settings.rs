//! Process settings (`kiosk.toml`)
//!
//! These are the machine-level knobs: where to listen, which camera to open,
//! where the kiosk document lives. Everything an operator edits from the
//! settings screen lives in the kiosk document instead (see `store`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::camera::CaptureConstraints;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8091,
        }
    }
}

/// Camera device and requested capture mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSettings {
    /// `/dev/videoN`, or an image file to use as a fake camera
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        let c = CaptureConstraints::default();
        Self {
            device: c.device,
            width: c.width,
            height: c.height,
            fps: c.fps,
        }
    }
}

impl CameraSettings {
    pub fn constraints(&self) -> CaptureConstraints {
        CaptureConstraints {
            device: self.device.clone(),
            width: self.width,
            height: self.height,
            fps: self.fps,
        }
    }
}

/// Size of the rendered stage preview (`/api/preview`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            width: 540,
            height: 960,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Kiosk document (JSON)
    pub document: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            document: PathBuf::from("kiosk.json"),
        }
    }
}

/// Share upload endpoint; sharing is off while `endpoint` is empty
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSettings {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout_secs: 30,
        }
    }
}

impl UploadSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterSettings {
    /// CUPS submit command
    pub command: String,
}

impl Default for PrinterSettings {
    fn default() -> Self {
        Self {
            command: "lp".to_string(),
        }
    }
}

/// Main settings structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub camera: CameraSettings,

    #[serde(default)]
    pub stage: StageSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub upload: UploadSettings,

    #[serde(default)]
    pub printer: PrinterSettings,
}

impl Settings {
    /// Load settings from a file, or create default if it doesn't exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings from {:?}", path))?;
            let settings: Settings = toml::from_str(&content)
                .with_context(|| format!("Failed to parse settings from {:?}", path))?;
            tracing::info!("Loaded settings from {:?}", path);
            Ok(settings)
        } else {
            let settings = Settings::default();
            settings.save(path)?;
            tracing::info!("Created default settings at {:?}", path);
            Ok(settings)
        }
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize settings")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory {:?}", parent))?;
        }

        std::fs::write(path, content).with_context(|| format!("Failed to write settings to {:?}", path))?;

        tracing::info!("Saved settings to {:?}", path);
        Ok(())
    }
}
