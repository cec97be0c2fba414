use crate::audio::AmbientTone;
use crate::visual::{CanvasSize, VisualizationMode};
use anyhow::{Context, anyhow};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Mode the visualizer starts in
    #[serde(default)]
    pub mode: VisualizationMode,

    /// Start with the expanded 200x80 canvas instead of the compact 120x40 one
    #[serde(default)]
    pub expanded: bool,

    /// Target frame rate of the render loop
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Root of the ambient drone in Hz
    #[serde(default = "default_tone_root_hz")]
    pub tone_root_hz: f32,

    /// Output gain of the ambient drone (0.0-1.0)
    #[serde(default = "default_tone_gain")]
    pub tone_gain: f32,

    /// Sample rate used when rendering offline
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Where rendered frames are written
    /// If None, frames go under the local data directory
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

fn default_fps() -> u32 {
    60
}

fn default_tone_root_hz() -> f32 {
    AmbientTone::DEFAULT_ROOT_HZ
}

fn default_tone_gain() -> f32 {
    AmbientTone::DEFAULT_GAIN
}

fn default_sample_rate() -> u32 {
    48000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: VisualizationMode::default(),
            expanded: false,
            fps: default_fps(),
            tone_root_hz: default_tone_root_hz(),
            tone_gain: default_tone_gain(),
            sample_rate: default_sample_rate(),
            output_dir: None,
        }
    }
}

impl Settings {
    /// Load config from ~/.config/ambiscope/config.toml
    /// Returns default settings if the file doesn't exist or fails to parse
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            log::warn!("Could not determine config directory, using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(settings) => {
                    log::debug!("Loaded settings from: {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Failed to parse config: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::debug!("No config file found at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Save config to ~/.config/ambiscope/config.toml
    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let Some(path) = config_path() else {
            anyhow::bail!("Could not determine config directory");
        };
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        log::info!("Saved settings to: {}", path.display());
        Ok(())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize settings")
    }

    pub fn canvas(&self) -> CanvasSize {
        CanvasSize::from_expanded(self.expanded)
    }

    /// Directory for rendered frames, created if missing
    pub fn frames_dir(&self) -> anyhow::Result<PathBuf> {
        let dir = match &self.output_dir {
            Some(dir) => dir.clone(),
            None => BaseDirs::new()
                .ok_or_else(|| anyhow!("Could not find data directory"))?
                .data_local_dir()
                .join("ambiscope")
                .join("frames"),
        };

        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
        Ok(dir)
    }
}

pub fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "ambiscope").map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("ambiscope-conf-{}-{}", name, std::process::id()))
            .join("config.toml")
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.mode, VisualizationMode::Bars);
        assert_eq!(settings.canvas(), CanvasSize::Compact);
        assert_eq!(settings.fps, 60);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: Settings = toml::from_str("mode = \"waveform\"\nexpanded = true\n").unwrap();
        assert_eq!(settings.mode, VisualizationMode::Waveform);
        assert_eq!(settings.canvas(), CanvasSize::Expanded);
        assert_eq!(settings.sample_rate, 48000);
        assert_eq!(settings.tone_gain, AmbientTone::DEFAULT_GAIN);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let settings = Settings::load_from(Path::new("/nonexistent/ambiscope/config.toml"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_invalid_file_uses_defaults() {
        let path = temp_path("invalid");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "mode = 42").unwrap();

        assert_eq!(Settings::load_from(&path), Settings::default());
        fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_save_and_reload() {
        let path = temp_path("save");
        let settings = Settings {
            mode: VisualizationMode::Waveform,
            fps: 30,
            output_dir: Some(PathBuf::from("/tmp/frames")),
            ..Settings::default()
        };

        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
        fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
