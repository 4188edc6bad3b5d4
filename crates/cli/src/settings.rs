use std::fs;
use std::path::{Path, PathBuf};

use proctorwatch_core::shared::config::PresenceConfig;
use serde::{Deserialize, Serialize};

/// Settings file contents: the presence configuration plus where to
/// capture from and report to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Exam backend base URL.
    pub endpoint: Option<String>,
    /// Capture device, e.g. `/dev/video0`.
    pub device: Option<String>,
    #[serde(flatten)]
    pub presence: PresenceConfig,
}

impl Settings {
    /// Loads settings from `explicit`, or from the per-user settings file.
    ///
    /// An explicit path must exist and parse. The per-user file is
    /// optional; if it is missing or unreadable the defaults are used.
    pub fn load(explicit: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        if let Some(path) = explicit {
            let contents = fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            let settings = serde_json::from_str(&contents)
                .map_err(|e| format!("invalid settings in {}: {e}", path.display()))?;
            return Ok(settings);
        }

        let Some(path) = Self::path() else {
            return Ok(Self::default());
        };
        Ok(Self::load_or_default(&path))
    }

    fn load_or_default(path: &Path) -> Self {
        let Ok(contents) = fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&contents).unwrap_or_else(|e| {
            log::warn!("Ignoring invalid settings in {}: {e}", path.display());
            Self::default()
        })
    }

    fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ProctorWatch").join("settings.json"))
    }
}
