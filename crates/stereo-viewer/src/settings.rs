use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::media::AutoplayPolicy;

/// Per-machine viewer settings. Playback state is never stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsConfig {
    pub version: u32,
    #[serde(default = "default_width")]
    pub window_width: u32,
    #[serde(default = "default_height")]
    pub window_height: u32,
    #[serde(default)]
    pub fullscreen: bool,
    #[serde(default)]
    pub autoplay: AutoplayPolicy,
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            version: 1,
            window_width: default_width(),
            window_height: default_height(),
            fullscreen: false,
            autoplay: AutoplayPolicy::default(),
        }
    }
}

impl SettingsConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("stereo-viewer").join("settings.json"))
    }

    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                log::warn!("Ignoring corrupt settings at {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) {
        if let Some(path) = Self::default_path() {
            self.save_to(&path);
        }
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        if let Ok(json) = serde_json::to_string_pretty(self) {
            if let Err(e) = std::fs::write(path, json) {
                log::warn!("Failed to save settings to {}: {e}", path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = SettingsConfig::load_from(&dir.path().join("nope.json"));
        assert_eq!(s, SettingsConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let s = SettingsConfig {
            window_width: 1920,
            window_height: 960,
            fullscreen: true,
            autoplay: AutoplayPolicy::RequireGesture,
            ..SettingsConfig::default()
        };
        s.save_to(&path);
        assert_eq!(SettingsConfig::load_from(&path), s);
    }

    #[test]
    fn corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(SettingsConfig::load_from(&path), SettingsConfig::default());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let s: SettingsConfig = serde_json::from_str(r#"{ "version": 1 }"#).unwrap();
        assert_eq!(s.window_width, 1280);
        assert_eq!(s.autoplay, AutoplayPolicy::Allowed);
    }
}
